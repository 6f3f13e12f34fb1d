//! Scoped IPv4 forwarding on router nodes.

use crate::shell::{NodeShell, ShellError};
use crate::utils::set_sysctl;
use log::{debug, warn};

const IP_FORWARD: &str = "net.ipv4.ip_forward";

/// Keeps IPv4 forwarding enabled on a node for as long as it lives.
///
/// Acquiring sets `net.ipv4.ip_forward=1`; releasing or dropping sets it
/// back to `0`. A failure while disabling on drop is logged, never raised.
#[derive(Debug)]
pub struct ForwardingGuard {
    shell: NodeShell,
    released: bool,
}

impl ForwardingGuard {
    pub fn acquire(shell: NodeShell) -> Result<Self, ShellError> {
        if !set_sysctl(&shell, IP_FORWARD, "1")? {
            warn!("{}: could not confirm {}=1", shell.name(), IP_FORWARD);
        }
        debug!("{}: forwarding enabled", shell.name());
        Ok(Self {
            shell,
            released: false,
        })
    }

    pub fn node(&self) -> &str {
        self.shell.name()
    }

    /// Disable forwarding now and report the result
    pub fn release(mut self) -> Result<(), ShellError> {
        self.released = true;
        self.disable()
    }

    fn disable(&self) -> Result<(), ShellError> {
        if !set_sysctl(&self.shell, IP_FORWARD, "0")? {
            debug!("{}: could not confirm {}=0", self.shell.name(), IP_FORWARD);
        }
        Ok(())
    }
}

impl Drop for ForwardingGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.disable() {
            warn!("{}: failed to disable forwarding: {}", self.shell.name(), e);
        }
    }
}
