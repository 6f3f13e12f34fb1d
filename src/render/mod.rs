//! Daemon configuration rendering.
//!
//! Each renderer turns a [`RouterConfig`] into the text format its daemon
//! reads. Rendering is deterministic: the same configuration and options
//! always produce byte-identical text.

pub mod router_config;
pub mod zebra;
pub mod bgpd;
pub mod ripd;

use crate::ip::{AddressMap, AsNumberMap};
use crate::process::DaemonKind;
use crate::topology::{NeighborMap, RouterId};
use std::path::PathBuf;

// Re-export the configuration types
pub use router_config::{BgpPeer, InterfaceConfig, RenderError, RouterConfig};

/// Settings shared by every rendered file of a lab
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// vty password
    pub password: String,
    /// Directory for daemon log files; no `log file` line when unset
    pub log_dir: Option<PathBuf>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            password: "zebra".to_string(),
            log_dir: None,
        }
    }
}

/// Rendered text of every daemon of one router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedConfigs {
    pub zebra: String,
    pub bgpd: String,
    pub ripd: String,
}

impl RenderedConfigs {
    pub fn for_daemon(&self, kind: DaemonKind) -> &str {
        match kind {
            DaemonKind::Zebra => &self.zebra,
            DaemonKind::Bgpd => &self.bgpd,
            DaemonKind::Ripd => &self.ripd,
        }
    }
}

/// Render all daemon configs of `config`
pub fn render_all(config: &RouterConfig, options: &RenderOptions) -> RenderedConfigs {
    RenderedConfigs {
        zebra: zebra::render(config, options),
        bgpd: bgpd::render(config, options),
        ripd: ripd::render(config, options),
    }
}

/// Build the configuration of `router` from the lab maps and render it.
///
/// Fails if any neighbor, address or AS lookup for the router misses.
pub fn render_router(
    router: RouterId,
    neighbors: &NeighborMap,
    addresses: &AddressMap,
    as_numbers: &AsNumberMap,
    options: &RenderOptions,
) -> Result<RenderedConfigs, RenderError> {
    let config = RouterConfig::build(router, neighbors, addresses, as_numbers)?;
    Ok(render_all(&config, options))
}

/// Lines every daemon file starts with
fn header(kind: DaemonKind, config: &RouterConfig, options: &RenderOptions) -> Vec<String> {
    let mut lines = vec![
        format!("! {} configuration for {}", kind, config.hostname),
        "!".to_string(),
        format!("hostname {}", config.hostname),
        format!("password {}", options.password),
        format!("enable password {}", options.password),
    ];
    if let Some(dir) = &options.log_dir {
        lines.push(format!("log file {}", dir.join(format!("{}.log", kind)).display()));
    }
    lines.push("!".to_string());
    lines
}

/// Lines every daemon file ends with
fn footer(lines: &mut Vec<String>) {
    lines.push("line vty".to_string());
    lines.push("!".to_string());
}

fn finish(lines: Vec<String>) -> String {
    let mut text = lines.join("\n");
    text.push('\n');
    text
}
