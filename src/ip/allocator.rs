//! IPv4 address allocation for the router chain.
//!
//! Numbering convention, for the router at 1-based position `i` of `N`:
//!
//! - access port: `10.0.(10*i).1/24`, its host `10.0.(10*i).10/24`
//! - chain link between positions `i` and `i+1`: `10.0.i.0/24`, the left
//!   router's right port takes `.1`, the right router's left port takes `.2`
//! - left edge: `r1-eth1` is `10.0.0.2/24`, host `h0` is `10.0.0.1/24`
//! - right edge: the last router's right port is `10.0.(10*(N+1)).1/24`,
//!   host `h(N+1)` is `10.0.(10*(N+1)).10/24`
//!
//! In anycast mode the last router's right port reuses `10.0.0.2/24`, the
//! address of `r1-eth1`, and `h(N+1)` reuses `h0`'s address. That duplicate
//! is deliberate so the routing protocol picks which end serves the prefix.

use crate::topology::{HostId, Port, RouterChain, RouterId};
use ipnet::Ipv4Net;
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

/// Every lab subnet is a /24
pub const SUBNET_PREFIX: u8 = 24;

/// Host byte of a router on its access subnet
const ACCESS_ROUTER_HOST: u8 = 1;
/// Host byte of the end host on an access subnet
const ACCESS_HOST_HOST: u8 = 10;
/// Host byte of the lower-position router on a chain link
const LINK_LOWER_HOST: u8 = 1;
/// Host byte of the higher-position router on a chain link
const LINK_UPPER_HOST: u8 = 2;

/// `10.0.<third_octet>.<host>/24`
fn lab_net(third_octet: u8, host: u8) -> Ipv4Net {
    // SUBNET_PREFIX is a constant below 32
    Ipv4Net::new(Ipv4Addr::new(10, 0, third_octet, host), SUBNET_PREFIX)
        .expect("SUBNET_PREFIX is a valid IPv4 prefix length")
}

/// (router, port) → assigned address with prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressMap {
    entries: BTreeMap<(RouterId, Port), Ipv4Net>,
    anycast: bool,
}

impl AddressMap {
    /// Assign addresses to every port of every router in `chain`
    pub fn build(chain: &RouterChain, anycast: bool) -> Self {
        let n = chain.len() as u8;
        let mut entries = BTreeMap::new();

        for (pos, router) in chain.positions() {
            entries.insert((router, Port::Access), lab_net(10 * pos, ACCESS_ROUTER_HOST));

            // Left port: shared with the previous router, or the h0 edge subnet
            entries.insert((router, Port::Left), lab_net(pos - 1, LINK_UPPER_HOST));

            let right = if pos < n {
                lab_net(pos, LINK_LOWER_HOST)
            } else if anycast {
                lab_net(0, LINK_UPPER_HOST)
            } else {
                lab_net(10 * (n + 1), ACCESS_ROUTER_HOST)
            };
            entries.insert((router, Port::Right), right);
        }

        Self { entries, anycast }
    }

    pub fn get(&self, router: RouterId, port: Port) -> Option<Ipv4Net> {
        self.entries.get(&(router, port)).copied()
    }

    /// Addresses of `router` in port order
    pub fn for_router(&self, router: RouterId) -> impl Iterator<Item = (Port, Ipv4Net)> + '_ {
        self.entries
            .range((router, Port::Access)..=(router, Port::Right))
            .map(|((_, port), addr)| (*port, *addr))
    }

    pub fn iter(&self) -> impl Iterator<Item = (RouterId, Port, Ipv4Net)> + '_ {
        self.entries
            .iter()
            .map(|((router, port), addr)| (*router, *port, *addr))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_anycast(&self) -> bool {
        self.anycast
    }

    /// Subnets in use, each with the router ports attached to it
    pub fn subnets(&self) -> BTreeMap<Ipv4Net, Vec<(RouterId, Port)>> {
        let mut subnets: BTreeMap<Ipv4Net, Vec<(RouterId, Port)>> = BTreeMap::new();
        for (router, port, addr) in self.iter() {
            subnets.entry(addr.trunc()).or_default().push((router, port));
        }
        subnets
    }

    /// Subnets directly attached to `router`
    pub fn connected_networks(&self, router: RouterId) -> Vec<Ipv4Net> {
        let mut networks: Vec<Ipv4Net> = self.for_router(router).map(|(_, addr)| addr.trunc()).collect();
        networks.sort();
        networks.dedup();
        networks
    }
}

/// Address plan of one end host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostAddress {
    pub host: HostId,
    /// Router port the host is cabled to
    pub router: RouterId,
    pub port: Port,
    pub address: Ipv4Net,
    pub gateway: Ipv4Addr,
}

impl HostAddress {
    pub fn interface(&self) -> String {
        self.host.interface()
    }
}

/// Address plan for every host: `h0`, one per router, and `h(N+1)`
pub fn plan_hosts(chain: &RouterChain, anycast: bool) -> Vec<HostAddress> {
    let n = chain.len() as u8;
    let (left_edge, right_edge) = chain.edge_hosts();
    let mut hosts = Vec::with_capacity(chain.len() + 2);

    let edge_address = lab_net(0, 1);
    let edge_gateway = lab_net(0, LINK_UPPER_HOST).addr();

    hosts.push(HostAddress {
        host: left_edge,
        router: chain.first(),
        port: Port::Left,
        address: edge_address,
        gateway: edge_gateway,
    });

    for (pos, router) in chain.positions() {
        hosts.push(HostAddress {
            host: chain.access_host(pos),
            router,
            port: Port::Access,
            address: lab_net(10 * pos, ACCESS_HOST_HOST),
            gateway: lab_net(10 * pos, ACCESS_ROUTER_HOST).addr(),
        });
    }

    let (address, gateway) = if anycast {
        (edge_address, edge_gateway)
    } else {
        (
            lab_net(10 * (n + 1), ACCESS_HOST_HOST),
            lab_net(10 * (n + 1), ACCESS_ROUTER_HOST).addr(),
        )
    };
    hosts.push(HostAddress {
        host: right_edge,
        router: chain.last(),
        port: Port::Right,
        address,
        gateway,
    });

    hosts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(s: &str) -> Ipv4Net {
        s.parse().unwrap()
    }

    #[test]
    fn test_three_router_chain() {
        let chain = RouterChain::new(3).unwrap();
        let map = AddressMap::build(&chain, false);

        assert_eq!(map.get(RouterId(1), Port::Right), Some(net("10.0.1.1/24")));
        assert_eq!(map.get(RouterId(2), Port::Left), Some(net("10.0.1.2/24")));
        assert_eq!(map.get(RouterId(2), Port::Right), Some(net("10.0.2.1/24")));
        assert_eq!(map.get(RouterId(3), Port::Left), Some(net("10.0.2.2/24")));

        assert_eq!(map.get(RouterId(1), Port::Access), Some(net("10.0.10.1/24")));
        assert_eq!(map.get(RouterId(3), Port::Access), Some(net("10.0.30.1/24")));

        // Edge ports
        assert_eq!(map.get(RouterId(1), Port::Left), Some(net("10.0.0.2/24")));
        assert_eq!(map.get(RouterId(3), Port::Right), Some(net("10.0.40.1/24")));
        assert_eq!(map.len(), 9);
    }

    #[test]
    fn test_link_endpoints_share_subnet() {
        let chain = RouterChain::new(3).unwrap();
        let map = AddressMap::build(&chain, false);
        let a = map.get(RouterId(1), Port::Right).unwrap();
        let b = map.get(RouterId(2), Port::Left).unwrap();
        assert_eq!(a.trunc(), b.trunc());
        assert_ne!(a.addr(), b.addr());
    }

    #[test]
    fn test_anycast_duplicate() {
        let chain = RouterChain::new(5).unwrap();
        let map = AddressMap::build(&chain, true);
        assert!(map.is_anycast());
        assert_eq!(map.get(RouterId(5), Port::Right), map.get(RouterId(1), Port::Left));
        assert_eq!(map.get(RouterId(5), Port::Right), Some(net("10.0.0.2/24")));

        let owners = &map.subnets()[&net("10.0.0.0/24")];
        assert_eq!(owners, &vec![(RouterId(1), Port::Left), (RouterId(5), Port::Right)]);
    }

    #[test]
    fn test_without_anycast_no_duplicates() {
        let chain = RouterChain::new(5).unwrap();
        let map = AddressMap::build(&chain, false);
        let mut addrs: Vec<_> = map.iter().map(|(_, _, a)| a.addr()).collect();
        let total = addrs.len();
        addrs.sort();
        addrs.dedup();
        assert_eq!(addrs.len(), total);
    }

    #[test]
    fn test_connected_networks() {
        let chain = RouterChain::new(3).unwrap();
        let map = AddressMap::build(&chain, false);
        assert_eq!(
            map.connected_networks(RouterId(2)),
            vec![net("10.0.1.0/24"), net("10.0.2.0/24"), net("10.0.20.0/24")]
        );
    }

    #[test]
    fn test_host_plan() {
        let chain = RouterChain::new(3).unwrap();
        let hosts = plan_hosts(&chain, false);
        assert_eq!(hosts.len(), 5);

        assert_eq!(hosts[0].host, HostId(0));
        assert_eq!(hosts[0].address, net("10.0.0.1/24"));
        assert_eq!(hosts[0].gateway, "10.0.0.2".parse::<Ipv4Addr>().unwrap());

        assert_eq!(hosts[2].host, HostId(2));
        assert_eq!(hosts[2].address, net("10.0.20.10/24"));
        assert_eq!(hosts[2].gateway, "10.0.20.1".parse::<Ipv4Addr>().unwrap());

        assert_eq!(hosts[4].host, HostId(4));
        assert_eq!(hosts[4].address, net("10.0.40.10/24"));
        assert_eq!(hosts[4].interface(), "h4-eth0");
    }

    #[test]
    fn test_host_plan_anycast() {
        let chain = RouterChain::new(5).unwrap();
        let hosts = plan_hosts(&chain, true);
        let right_edge = hosts.last().unwrap();
        assert_eq!(right_edge.host, HostId(6));
        assert_eq!(right_edge.address, hosts[0].address);
        assert_eq!(right_edge.gateway, hosts[0].gateway);
    }
}
