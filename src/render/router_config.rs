//! Immutable per-router configuration.
//!
//! A [`RouterConfig`] collects everything the daemon renderers need about one
//! router: its AS number, interface addresses and BGP peers. It is built once
//! from the neighbor, address and AS maps, and every lookup that could miss
//! is checked here, so the renderers themselves cannot fail.

use crate::ip::{AddressMap, AsNumberMap};
use crate::topology::{NeighborMap, Port, RouterId};
use ipnet::Ipv4Net;
use serde::Serialize;
use std::net::Ipv4Addr;

/// Errors raised while assembling a router's configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("No AS number assigned to {0}")]
    MissingAsNumber(RouterId),

    #[error("{peer} is a neighbor of {router} but has no link back to it")]
    MissingNeighbor { router: RouterId, peer: RouterId },

    #[error("{router} has no neighbor on port {port}")]
    NoNeighbor { router: RouterId, port: Port },

    #[error("No address assigned to {router} port {port}")]
    MissingAddress { router: RouterId, port: Port },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceConfig {
    pub name: String,
    pub port: Port,
    pub address: Ipv4Net,
}

/// A BGP session toward an adjacent router
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BgpPeer {
    pub router: RouterId,
    /// Peer's address on the shared link
    pub address: Ipv4Addr,
    pub remote_as: u32,
    /// Local port the session runs over
    pub local_port: Port,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouterConfig {
    pub router: RouterId,
    pub hostname: String,
    pub as_number: u32,
    /// BGP router id, the access port address
    pub router_id: Ipv4Addr,
    /// In port order
    pub interfaces: Vec<InterfaceConfig>,
    /// In local port order
    pub peers: Vec<BgpPeer>,
    /// Connected subnets, sorted
    pub networks: Vec<Ipv4Net>,
}

impl RouterConfig {
    pub fn build(
        router: RouterId,
        neighbors: &NeighborMap,
        addresses: &AddressMap,
        as_numbers: &AsNumberMap,
    ) -> Result<Self, RenderError> {
        let as_number = as_numbers
            .get(router)
            .ok_or(RenderError::MissingAsNumber(router))?;

        let interfaces = Port::ALL
            .iter()
            .map(|&port| {
                let address = addresses
                    .get(router, port)
                    .ok_or(RenderError::MissingAddress { router, port })?;
                Ok(InterfaceConfig {
                    name: router.interface(port),
                    port,
                    address,
                })
            })
            .collect::<Result<Vec<_>, RenderError>>()?;

        let mut peers = Vec::new();
        for (local_port, peer) in neighbors.neighbors_of(router) {
            let back = neighbors
                .facing_port(peer, router)
                .ok_or(RenderError::MissingNeighbor { router, peer })?;
            let address = addresses
                .get(peer, back)
                .ok_or(RenderError::MissingAddress { router: peer, port: back })?;
            let remote_as = as_numbers
                .get(peer)
                .ok_or(RenderError::MissingAsNumber(peer))?;
            peers.push(BgpPeer {
                router: peer,
                address: address.addr(),
                remote_as,
                local_port,
            });
        }

        // Access port is always first in port order
        let router_id = interfaces[0].address.addr();

        Ok(Self {
            router,
            hostname: router.name(),
            as_number,
            router_id,
            interfaces,
            peers,
            networks: addresses.connected_networks(router),
        })
    }

    pub fn interface(&self, port: Port) -> Option<&InterfaceConfig> {
        self.interfaces.iter().find(|i| i.port == port)
    }
}
