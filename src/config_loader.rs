use crate::config::{LabConfig, RoutingMode};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::path::Path;

/// Load, parse and validate a lab configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<LabConfig> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open {}", config_path.display()))?;

    let config: LabConfig = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse {}", config_path.display()))?;

    config.validate()?;

    Ok(config)
}

/// CLI arguments that override YAML settings
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub routers: Option<usize>,
    pub anycast: bool,
    pub routing: Option<RoutingMode>,
    pub work_dir: Option<std::path::PathBuf>,
    pub no_interactive: bool,
}

/// Apply CLI overrides to a lab configuration and re-validate it
pub fn apply_overrides(config: &mut LabConfig, overrides: &CliOverrides) -> Result<()> {
    if let Some(routers) = overrides.routers {
        info!("Overriding router count: {} -> {}", config.chain.routers, routers);
        config.chain.routers = routers;
    }

    if overrides.anycast && !config.chain.anycast {
        info!("Enabling anycast from the command line");
        config.chain.anycast = true;
    }

    if let Some(routing) = overrides.routing {
        info!("Overriding routing mode: {} -> {}", config.routing.as_str(), routing.as_str());
        config.routing = routing;
    }

    if let Some(dir) = &overrides.work_dir {
        config.general.work_dir = Some(dir.clone());
    }

    if overrides.no_interactive {
        config.general.interactive = false;
    }

    // Re-validate after applying overrides
    config.validate()?;

    Ok(())
}
