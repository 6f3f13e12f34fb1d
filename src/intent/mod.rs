//! Network configuration intent.
//!
//! A [`NetworkIntent`] states what a node's network setup should be:
//! interface addresses, routes and kernel parameters. [`apply_intent`] is the
//! only place that turns intent into shell commands.

pub mod routes;

use crate::ip::HostAddress;
use crate::render::RouterConfig;
use crate::shell::{NodeShell, ShellError};
use ipnet::Ipv4Net;
use log::debug;
use serde::Serialize;
use std::fmt;
use std::net::Ipv4Addr;

pub use routes::plan_static_routes;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressIntent {
    pub interface: String,
    pub address: Ipv4Net,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Destination {
    Default,
    Prefix(Ipv4Net),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Default => f.write_str("default"),
            Destination::Prefix(net) => write!(f, "{}", net),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteIntent {
    pub destination: Destination,
    pub via: Ipv4Addr,
    pub dev: Option<String>,
}

impl RouteIntent {
    fn command(&self) -> String {
        let mut line = format!("ip route add {} via {}", self.destination, self.via);
        if let Some(dev) = &self.dev {
            line.push_str(" dev ");
            line.push_str(dev);
        }
        line
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SysctlIntent {
    pub key: String,
    pub value: String,
}

/// Desired network state of one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkIntent {
    pub node: String,
    pub addresses: Vec<AddressIntent>,
    pub routes: Vec<RouteIntent>,
    pub sysctls: Vec<SysctlIntent>,
}

impl NetworkIntent {
    /// Router interfaces with reverse-path filtering off, so replies to an
    /// anycast address may leave through a different interface
    pub fn for_router(config: &RouterConfig, routes: Vec<RouteIntent>) -> Self {
        let addresses = config
            .interfaces
            .iter()
            .map(|i| AddressIntent {
                interface: i.name.clone(),
                address: i.address,
            })
            .collect();

        let sysctls = std::iter::once("all".to_string())
            .chain(config.interfaces.iter().map(|i| i.name.clone()))
            .map(|scope| SysctlIntent {
                key: format!("net.ipv4.conf.{}.rp_filter", scope),
                value: "0".to_string(),
            })
            .collect();

        Self {
            node: config.hostname.clone(),
            addresses,
            routes,
            sysctls,
        }
    }

    /// Single-homed host with a default route through its router
    pub fn for_host(host: &HostAddress) -> Self {
        Self {
            node: host.host.name(),
            addresses: vec![AddressIntent {
                interface: host.interface(),
                address: host.address,
            }],
            routes: vec![RouteIntent {
                destination: Destination::Default,
                via: host.gateway,
                dev: None,
            }],
            sysctls: Vec::new(),
        }
    }

    /// Shell lines realising this intent: addresses and links first, then
    /// routes, then kernel parameters
    pub fn commands(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for a in &self.addresses {
            lines.push(format!("ip addr flush dev {}", a.interface));
            lines.push(format!("ip addr add {} dev {}", a.address, a.interface));
            lines.push(format!("ip link set {} up", a.interface));
        }
        lines.extend(self.routes.iter().map(RouteIntent::command));
        for s in &self.sysctls {
            lines.push(format!("sysctl -w {}={}", s.key, s.value));
        }
        lines
    }
}

/// Run every command of `intent` on its node, stopping at the first failure
pub fn apply_intent(shell: &NodeShell, intent: &NetworkIntent) -> Result<(), ShellError> {
    let commands = intent.commands();
    debug!("{}: applying {} intent commands", intent.node, commands.len());
    for line in &commands {
        shell.cmd(line)?;
    }
    Ok(())
}
