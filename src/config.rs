//! Lab configuration.
//!
//! Loaded from YAML. Every section and field has a default, so an empty
//! file describes a five-router BGP chain.

use crate::emulator::LinkShaping;
use crate::ip::DEFAULT_AS_STEP;
use crate::process::DaemonKind;
use crate::topology::{MAX_ROUTERS, MIN_ROUTERS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How routers learn routes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    /// Precomputed static routes, no daemons
    Static,
    /// zebra + ripd
    Rip,
    /// zebra + bgpd, one AS per router
    #[default]
    Bgp,
}

impl RoutingMode {
    /// Daemons to start on every router, in start order
    pub fn daemons(&self) -> &'static [DaemonKind] {
        match self {
            RoutingMode::Static => &[],
            RoutingMode::Rip => &[DaemonKind::Zebra, DaemonKind::Ripd],
            RoutingMode::Bgp => &[DaemonKind::Zebra, DaemonKind::Bgpd],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingMode::Static => "static",
            RoutingMode::Rip => "rip",
            RoutingMode::Bgp => "bgp",
        }
    }
}

/// Complete lab configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub routing: RoutingMode,
    #[serde(default)]
    pub daemons: DaemonConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default log filter when RUST_LOG is unset
    pub log_level: String,
    /// Directory for per-router daemon files; a temporary directory when
    /// unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,
    /// Pause for the operator between bring-up and teardown
    pub interactive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub routers: usize,
    /// Give the last router's outward port the address of `r1-eth1`
    pub anycast: bool,
    pub as_step: u32,
    /// Shaping of router-to-router links
    pub chain_link: LinkShaping,
    /// Shaping of every router-to-host link, edge hosts included
    pub access_link: LinkShaping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Directory holding the zebra/bgpd/ripd binaries
    pub dir: String,
    /// vty password written into every daemon config
    pub password: String,
    /// Account the daemons drop privileges to
    pub user: String,
    pub group: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            work_dir: None,
            interactive: true,
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            routers: 5,
            anycast: false,
            as_step: DEFAULT_AS_STEP,
            chain_link: LinkShaping::chain_default(),
            access_link: LinkShaping::default(),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            dir: "/usr/lib/frr".to_string(),
            password: "zebra".to_string(),
            user: "frr".to_string(),
            group: "frr".to_string(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid chain configuration: {0}")]
    InvalidChain(String),
    #[error("Invalid daemon configuration: {0}")]
    InvalidDaemons(String),
}

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

impl LabConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        // General settings
        if !LOG_LEVELS.contains(&self.general.log_level.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidGeneral(format!(
                "log_level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.general.log_level
            )));
        }

        // Chain settings
        let chain = &self.chain;
        if !(MIN_ROUTERS..=MAX_ROUTERS).contains(&chain.routers) {
            return Err(ValidationError::InvalidChain(format!(
                "routers must be between {} and {}, got {}",
                MIN_ROUTERS, MAX_ROUTERS, chain.routers
            )));
        }
        if chain.as_step == 0 {
            return Err(ValidationError::InvalidChain("as_step cannot be 0".to_string()));
        }
        if chain.as_step.checked_mul(chain.routers as u32).is_none() {
            return Err(ValidationError::InvalidChain(format!(
                "as_step {} overflows the AS number range for {} routers",
                chain.as_step, chain.routers
            )));
        }
        chain
            .chain_link
            .validate()
            .map_err(|e| ValidationError::InvalidChain(format!("chain_link: {}", e)))?;
        chain
            .access_link
            .validate()
            .map_err(|e| ValidationError::InvalidChain(format!("access_link: {}", e)))?;

        // Daemon settings only matter when daemons run
        if self.routing != RoutingMode::Static {
            if self.daemons.dir.trim().is_empty() {
                return Err(ValidationError::InvalidDaemons(
                    "dir cannot be empty".to_string(),
                ));
            }
            if self.daemons.password.is_empty()
                || self.daemons.password.chars().any(char::is_whitespace)
            {
                return Err(ValidationError::InvalidDaemons(
                    "password must be a single non-empty word".to_string(),
                ));
            }
            for (field, value) in [("user", &self.daemons.user), ("group", &self.daemons.group)] {
                if value.is_empty() || value.chars().any(char::is_whitespace) {
                    return Err(ValidationError::InvalidDaemons(format!(
                        "{} must be a single non-empty word",
                        field
                    )));
                }
            }
        }

        Ok(())
    }
}
