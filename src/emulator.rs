//! Network namespace emulator.
//!
//! Every node is a Linux network namespace and every link a veth pair with
//! one end in each namespace. Links can be shaped with a `netem` qdisc
//! (bandwidth, delay, loss) and an MTU. All commands go through the
//! emulator's [`CommandRunner`], so a recording runner turns bring-up into
//! a dry run.

use crate::shell::{CommandRunner, NodeShell, ShellError};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Errors raised while building the emulated network
#[derive(Debug, thiserror::Error)]
pub enum EmulatorError {
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Node already exists: {0}")]
    DuplicateNode(String),

    #[error(transparent)]
    Shell(#[from] ShellError),
}

/// Traffic shaping applied to both ends of a link
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkShaping {
    /// Rate limit in Mbit/s
    pub bandwidth_mbit: Option<f64>,
    /// One-way delay, e.g. "100us" or "2ms"
    #[serde(with = "humantime_serde")]
    pub delay: Option<Duration>,
    /// Random loss in percent
    pub loss_percent: Option<f64>,
    pub mtu: Option<u32>,
}

impl LinkShaping {
    /// 10 Mbit/s with 0.1 ms delay
    pub fn chain_default() -> Self {
        Self {
            bandwidth_mbit: Some(10.0),
            delay: Some(Duration::from_micros(100)),
            loss_percent: None,
            mtu: None,
        }
    }

    /// Arguments for `tc qdisc ... netem`, or None when nothing is shaped
    pub fn netem_args(&self) -> Option<String> {
        let mut args = Vec::new();
        if let Some(delay) = self.delay {
            args.push(format!("delay {}us", delay.as_micros()));
        }
        if let Some(loss) = self.loss_percent {
            args.push(format!("loss {}%", loss));
        }
        if let Some(bw) = self.bandwidth_mbit {
            args.push(format!("rate {}mbit", bw));
        }
        if args.is_empty() {
            None
        } else {
            Some(args.join(" "))
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(bw) = self.bandwidth_mbit {
            if bw.is_nan() || bw <= 0.0 {
                return Err(format!("bandwidth_mbit must be positive, got {}", bw));
            }
        }
        if let Some(loss) = self.loss_percent {
            if !(0.0..=100.0).contains(&loss) {
                return Err(format!("loss_percent must be within 0-100, got {}", loss));
            }
        }
        if let Some(mtu) = self.mtu {
            if mtu < 68 {
                return Err(format!("mtu must be at least 68, got {}", mtu));
            }
        }
        Ok(())
    }
}

/// Namespaces and veth links created so far
#[derive(Debug)]
pub struct Emulator {
    runner: Arc<dyn CommandRunner>,
    host: NodeShell,
    nodes: BTreeMap<String, NodeShell>,
    /// Creation order, for teardown in reverse
    order: Vec<String>,
    link_count: usize,
}

impl Emulator {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            host: NodeShell::host(runner.clone()),
            runner,
            nodes: BTreeMap::new(),
            order: Vec::new(),
            link_count: 0,
        }
    }

    /// Create the namespace `name` with its loopback up
    pub fn add_node(&mut self, name: &str) -> Result<NodeShell, EmulatorError> {
        if self.nodes.contains_key(name) {
            return Err(EmulatorError::DuplicateNode(name.to_string()));
        }

        // Leftover from an aborted run
        self.host.cmd(&format!("ip netns del {} 2>/dev/null || true", name))?;
        self.host.cmd(&format!("ip netns add {}", name))?;
        self.order.push(name.to_string());

        let shell = NodeShell::in_namespace(name, self.runner.clone());
        shell.cmd("ip link set lo up")?;
        self.nodes.insert(name.to_string(), shell.clone());
        debug!("Added node {}", name);
        Ok(shell)
    }

    /// Connect `a_if` on node `a` to `b_if` on node `b`
    pub fn add_link(
        &mut self,
        a: &str,
        a_if: &str,
        b: &str,
        b_if: &str,
        shaping: &LinkShaping,
    ) -> Result<(), EmulatorError> {
        let a_shell = self.node(a)?.clone();
        let b_shell = self.node(b)?.clone();

        self.host
            .cmd(&format!("ip link add {} type veth peer name {}", a_if, b_if))?;
        self.host.cmd(&format!("ip link set {} netns {}", a_if, a))?;
        self.host.cmd(&format!("ip link set {} netns {}", b_if, b))?;

        for (shell, interface) in [(&a_shell, a_if), (&b_shell, b_if)] {
            if let Some(mtu) = shaping.mtu {
                shell.cmd(&format!("ip link set dev {} mtu {}", interface, mtu))?;
            }
            shell.cmd(&format!("ip link set {} up", interface))?;
            if let Some(args) = shaping.netem_args() {
                shell.cmd(&format!("tc qdisc add dev {} root netem {}", interface, args))?;
            }
        }

        self.link_count += 1;
        debug!("Added link {}:{} <-> {}:{}", a, a_if, b, b_if);
        Ok(())
    }

    pub fn node(&self, name: &str) -> Result<&NodeShell, EmulatorError> {
        self.nodes
            .get(name)
            .ok_or_else(|| EmulatorError::UnknownNode(name.to_string()))
    }

    pub fn host(&self) -> &NodeShell {
        &self.host
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.link_count
    }

    /// Delete every namespace created, newest first. Veth ends go with
    /// their namespace. Errors are logged and skipped.
    pub fn shutdown(&mut self) {
        if self.order.is_empty() {
            return;
        }
        info!("Removing {} namespaces", self.order.len());
        while let Some(name) = self.order.pop() {
            if let Err(e) = self.host.cmd(&format!("ip netns del {}", name)) {
                warn!("Failed to delete namespace {}: {}", name, e);
            }
        }
        self.nodes.clear();
        self.link_count = 0;
    }
}

impl Drop for Emulator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::RecordingRunner;

    #[test]
    fn test_netem_args() {
        assert_eq!(LinkShaping::default().netem_args(), None);
        assert_eq!(
            LinkShaping::chain_default().netem_args().as_deref(),
            Some("delay 100us rate 10mbit")
        );
        let lossy = LinkShaping {
            delay: Some(Duration::from_millis(2)),
            loss_percent: Some(1.5),
            ..Default::default()
        };
        assert_eq!(lossy.netem_args().as_deref(), Some("delay 2000us loss 1.5%"));
    }

    #[test]
    fn test_shaping_validation() {
        assert!(LinkShaping::chain_default().validate().is_ok());
        let bad_loss = LinkShaping {
            loss_percent: Some(120.0),
            ..Default::default()
        };
        assert!(bad_loss.validate().is_err());
        let bad_bw = LinkShaping {
            bandwidth_mbit: Some(0.0),
            ..Default::default()
        };
        assert!(bad_bw.validate().is_err());
    }

    #[test]
    fn test_shaping_from_yaml() {
        let shaping: LinkShaping = serde_yaml::from_str("bandwidth_mbit: 100\ndelay: 5ms\nmtu: 1400\n").unwrap();
        assert_eq!(shaping.bandwidth_mbit, Some(100.0));
        assert_eq!(shaping.delay, Some(Duration::from_millis(5)));
        assert_eq!(shaping.mtu, Some(1400));
        assert_eq!(shaping.loss_percent, None);
    }

    #[test]
    fn test_node_and_link_commands() {
        let runner = Arc::new(RecordingRunner::new());
        let mut emulator = Emulator::new(runner.clone());
        emulator.add_node("r1").unwrap();
        emulator.add_node("h1").unwrap();
        assert!(matches!(emulator.add_node("r1"), Err(EmulatorError::DuplicateNode(_))));

        emulator
            .add_link("r1", "r1-eth0", "h1", "h1-eth0", &LinkShaping::chain_default())
            .unwrap();
        assert_eq!(emulator.node_count(), 2);
        assert_eq!(emulator.link_count(), 1);

        let host_lines = runner.lines_in(None);
        assert!(host_lines.contains(&"ip netns add r1".to_string()));
        assert!(host_lines.contains(&"ip link add r1-eth0 type veth peer name h1-eth0".to_string()));
        assert!(host_lines.contains(&"ip link set h1-eth0 netns h1".to_string()));

        assert_eq!(
            runner.lines_in(Some("r1")),
            vec![
                "ip link set lo up",
                "ip link set r1-eth0 up",
                "tc qdisc add dev r1-eth0 root netem delay 100us rate 10mbit",
            ]
        );
    }

    #[test]
    fn test_unknown_node() {
        let mut emulator = Emulator::new(Arc::new(RecordingRunner::new()));
        emulator.add_node("r1").unwrap();
        let result = emulator.add_link("r1", "r1-eth1", "r2", "r2-eth1", &LinkShaping::default());
        assert!(matches!(result, Err(EmulatorError::UnknownNode(name)) if name == "r2"));
    }

    #[test]
    fn test_shutdown_on_drop() {
        let runner = Arc::new(RecordingRunner::new());
        {
            let mut emulator = Emulator::new(runner.clone());
            emulator.add_node("r1").unwrap();
            emulator.add_node("r2").unwrap();
        }
        let host_lines = runner.lines_in(None);
        let n = host_lines.len();
        assert_eq!(host_lines[n - 2], "ip netns del r2");
        assert_eq!(host_lines[n - 1], "ip netns del r1");
    }
}
