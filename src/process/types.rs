//! Routing daemon type definitions.

use std::fmt;

/// External routing daemons a router can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DaemonKind {
    /// Forwarding daemon, owns the kernel routing table and the API socket
    Zebra,
    /// BGP daemon
    Bgpd,
    /// RIP daemon
    Ripd,
}

impl DaemonKind {
    /// Get the binary name of the daemon
    pub fn as_str(&self) -> &'static str {
        match self {
            DaemonKind::Zebra => "zebra",
            DaemonKind::Bgpd => "bgpd",
            DaemonKind::Ripd => "ripd",
        }
    }

    pub fn config_file_name(&self) -> String {
        format!("{}.conf", self.as_str())
    }

    pub fn pid_file_name(&self) -> String {
        format!("{}.pid", self.as_str())
    }

    /// Control socket the daemon leaves behind: the zebra API socket for
    /// zebra, the vty socket for the protocol daemons
    pub fn socket_file_name(&self) -> String {
        match self {
            DaemonKind::Zebra => ZEBRA_API_SOCKET.to_string(),
            other => format!("{}.vty", other.as_str()),
        }
    }

    /// Flag that makes the daemon detach
    pub fn daemonize_flag(&self) -> &'static str {
        match self {
            DaemonKind::Zebra => "--daemon",
            _ => "-d",
        }
    }
}

impl fmt::Display for DaemonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Socket zebra serves and the protocol daemons connect to
pub const ZEBRA_API_SOCKET: &str = "zebra.api";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        assert_eq!(DaemonKind::Bgpd.config_file_name(), "bgpd.conf");
        assert_eq!(DaemonKind::Ripd.pid_file_name(), "ripd.pid");
        assert_eq!(DaemonKind::Zebra.socket_file_name(), "zebra.api");
        assert_eq!(DaemonKind::Bgpd.socket_file_name(), "bgpd.vty");
    }
}
