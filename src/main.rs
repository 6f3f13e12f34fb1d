use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::{info, warn, LevelFilter};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use topolab::config::RoutingMode;
use topolab::config_loader::{self, CliOverrides};
use topolab::orchestrator::{Lab, LabPlan};
use topolab::shell::{CommandRunner, RecordingRunner, SystemRunner};
use topolab::utils::validate_daemon_binaries;

/// Router-chain lab bring-up on network namespaces
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the lab configuration YAML file
    #[arg(short, long)]
    config: PathBuf,

    /// Output directory for the lab summary and rendered configs
    #[arg(short, long, default_value = "topolab_output")]
    output: PathBuf,

    /// Override the number of routers in the chain
    #[arg(long)]
    routers: Option<usize>,

    /// Give the last router's outward port the address of r1-eth1
    #[arg(long)]
    anycast: bool,

    /// Override the routing mode
    #[arg(long, value_enum)]
    routing: Option<RoutingMode>,

    /// Directory for per-router daemon files (temporary when unset)
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Record and print every command instead of running it
    #[arg(long)]
    dry_run: bool,

    /// Only write rendered daemon configs and the lab summary
    #[arg(long, conflicts_with = "dry_run")]
    render_only: bool,

    /// Tear down right after bring-up instead of waiting for Enter
    #[arg(long)]
    no_interactive: bool,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            routers: self.routers,
            anycast: self.anycast,
            routing: self.routing,
            work_dir: self.work_dir.clone(),
            no_interactive: self.no_interactive,
        }
    }
}

/// Start logging before anything else runs.
///
/// Without RUST_LOG the logger accepts every record and the level is
/// controlled through the global max level, which starts at `info` and is
/// replaced by the configured level once the config is loaded. Returns
/// whether RUST_LOG is in charge.
fn init_logging() -> bool {
    let from_env = env::var_os("RUST_LOG").is_some();
    env_logger::Builder::from_env(Env::default().default_filter_or("trace")).init();
    if !from_env {
        log::set_max_level(LevelFilter::Info);
    }
    from_env
}

/// Level filter for a configured `log_level`, `info` when unparseable
fn level_filter(level: &str) -> LevelFilter {
    level.parse().unwrap_or(LevelFilter::Info)
}

/// Block until the operator presses Enter
fn wait_for_operator(plan: &LabPlan) -> Result<()> {
    println!();
    println!("Lab is running. Enter a node with: ip netns exec <node> bash");
    for host in &plan.hosts {
        println!("  {:<4} {:<16} via {}", host.host.name(), host.address.to_string(), host.gateway);
    }
    print!("Press Enter to tear down the lab... ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(())
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over the configured level
    let level_from_env = init_logging();

    // Load configuration and apply command-line overrides
    let mut config = config_loader::load_config(&args.config)?;
    config_loader::apply_overrides(&mut config, &args.overrides())?;

    if !level_from_env {
        log::set_max_level(level_filter(&config.general.log_level));
    }

    info!("Starting topolab");
    info!("Configuration file: {:?}", args.config);
    info!("Output directory: {:?}", args.output);

    let plan = LabPlan::build(&config)?;
    plan.write_summary(&args.output)?;

    if args.render_only {
        plan.write_rendered(&args.output, &config.daemons.password)?;
        info!("Render-only run complete");
        return Ok(());
    }

    let recorder = Arc::new(RecordingRunner::new());
    let runner: Arc<dyn CommandRunner> = if args.dry_run {
        recorder.clone()
    } else {
        validate_daemon_binaries(&config.daemons.dir, config.routing.daemons())
            .wrap_err("Routing daemons are not available")?;
        Arc::new(SystemRunner::new())
    };

    let lab = Lab::start(&plan, &config, runner)?;

    if config.general.interactive && !args.dry_run {
        if let Err(e) = wait_for_operator(&plan) {
            warn!("Interactive pause failed: {}", e);
        }
    }

    info!("Shutting down the lab");
    lab.teardown();

    if args.dry_run {
        for command in recorder.commands() {
            println!("{}", command);
        }
    }

    info!("Done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(["topolab", "--config", "lab.yaml"]);

        assert_eq!(args.config, PathBuf::from("lab.yaml"));
        assert_eq!(args.output, PathBuf::from("topolab_output"));
        assert!(!args.dry_run);
        assert_eq!(args.routing, None);
    }

    #[test]
    fn test_override_args() {
        let args = Args::parse_from([
            "topolab",
            "--config",
            "lab.yaml",
            "--routers",
            "5",
            "--anycast",
            "--routing",
            "static",
            "--dry-run",
            "--no-interactive",
        ]);

        let overrides = args.overrides();
        assert_eq!(overrides.routers, Some(5));
        assert!(overrides.anycast);
        assert_eq!(overrides.routing, Some(RoutingMode::Static));
        assert!(overrides.no_interactive);
        assert!(args.dry_run);
    }

    #[test]
    fn test_level_filter() {
        assert_eq!(level_filter("debug"), LevelFilter::Debug);
        assert_eq!(level_filter("WARN"), LevelFilter::Warn);
        assert_eq!(level_filter("off"), LevelFilter::Off);
        assert_eq!(level_filter("loud"), LevelFilter::Info);
    }

    #[test]
    fn test_render_only_conflicts_with_dry_run() {
        let result = Args::try_parse_from(["topolab", "-c", "lab.yaml", "--render-only", "--dry-run"]);
        assert!(result.is_err());
    }
}
