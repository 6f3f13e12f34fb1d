//! Identifier types for routers, hosts and router ports.
//!
//! Interface names follow the emulator convention `<node>-eth<k>`, where
//! `eth0` is a router's access port, `eth1` faces left along the chain and
//! `eth2` faces right.

use serde::Serialize;
use std::fmt;

/// Identifier of a router node, rendered as `r<id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RouterId(pub u32);

impl RouterId {
    /// Node name used for the namespace and in daemon configs
    pub fn name(self) -> String {
        format!("r{}", self.0)
    }

    /// Name of the interface behind `port`
    pub fn interface(self, port: Port) -> String {
        format!("r{}-eth{}", self.0, port.number())
    }
}

impl fmt::Display for RouterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// One of the three ports every router in the chain carries.
///
/// The ordering (`Access < Left < Right`) fixes the iteration order of every
/// map keyed by port, which keeps rendered configs stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Port {
    /// Link toward the router's dedicated host
    Access,
    /// Link toward the previous router (or the left edge host on `r1`)
    Left,
    /// Link toward the next router (or the right edge host on the last router)
    Right,
}

impl Port {
    pub const ALL: [Port; 3] = [Port::Access, Port::Left, Port::Right];

    /// Interface number used in `<node>-eth<k>`
    pub fn number(self) -> u8 {
        match self {
            Port::Access => 0,
            Port::Left => 1,
            Port::Right => 2,
        }
    }

    /// The port on the adjacent router that faces back toward this one
    pub fn opposite(self) -> Option<Port> {
        match self {
            Port::Access => None,
            Port::Left => Some(Port::Right),
            Port::Right => Some(Port::Left),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Port::Access => "access",
            Port::Left => "left",
            Port::Right => "right",
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of an end host, rendered as `h<id>`.
///
/// `h0` and `h<N+1>` sit on the outward ports of the two end routers; every
/// other host hangs off the access port of the router with the same index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct HostId(pub u32);

impl HostId {
    pub fn name(self) -> String {
        format!("h{}", self.0)
    }

    /// Hosts have a single interface
    pub fn interface(self) -> String {
        format!("h{}-eth0", self.0)
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_names() {
        let r3 = RouterId(3);
        assert_eq!(r3.name(), "r3");
        assert_eq!(r3.interface(Port::Access), "r3-eth0");
        assert_eq!(r3.interface(Port::Left), "r3-eth1");
        assert_eq!(r3.interface(Port::Right), "r3-eth2");
        assert_eq!(HostId(6).interface(), "h6-eth0");
    }

    #[test]
    fn test_port_opposite() {
        assert_eq!(Port::Left.opposite(), Some(Port::Right));
        assert_eq!(Port::Right.opposite(), Some(Port::Left));
        assert_eq!(Port::Access.opposite(), None);
    }
}
