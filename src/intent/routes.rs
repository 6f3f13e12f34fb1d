//! Static routes along the chain.
//!
//! A router reaches a subnet it is not attached to through the neighbor on
//! the side of the nearest router that is. Only the anycast subnet has
//! owners on both sides; ties between equally near owners go left.

use super::{Destination, RouteIntent};
use crate::ip::AddressMap;
use crate::render::RenderError;
use crate::topology::{NeighborMap, Port, RouterChain, RouterId};
use std::collections::BTreeMap;

/// Next hop toward the neighbor on `port` of `router`
fn next_hop(
    router: RouterId,
    port: Port,
    neighbors: &NeighborMap,
    addresses: &AddressMap,
) -> Result<(std::net::Ipv4Addr, String), RenderError> {
    let peer = neighbors
        .get(router, port)
        .ok_or(RenderError::NoNeighbor { router, port })?;
    let back = neighbors
        .facing_port(peer, router)
        .ok_or(RenderError::MissingNeighbor { router, peer })?;
    let address = addresses
        .get(peer, back)
        .ok_or(RenderError::MissingAddress { router: peer, port: back })?;
    Ok((address.addr(), router.interface(port)))
}

/// Plan the static routes of every router in `chain`
pub fn plan_static_routes(
    chain: &RouterChain,
    neighbors: &NeighborMap,
    addresses: &AddressMap,
) -> Result<BTreeMap<RouterId, Vec<RouteIntent>>, RenderError> {
    let subnets = addresses.subnets();
    let mut plan = BTreeMap::new();

    for (pos, router) in chain.positions() {
        let connected = addresses.connected_networks(router);
        let mut routes = Vec::new();

        for (subnet, owners) in &subnets {
            if connected.contains(subnet) {
                continue;
            }

            // Nearest owner by chain distance, the left one on a tie
            let nearest = owners
                .iter()
                .filter_map(|(owner, _)| chain.position(*owner))
                .min_by_key(|owner_pos| (owner_pos.abs_diff(pos), *owner_pos));
            let Some(owner_pos) = nearest else {
                continue;
            };

            let port = if owner_pos < pos { Port::Left } else { Port::Right };
            let (via, dev) = next_hop(router, port, neighbors, addresses)?;
            routes.push(RouteIntent {
                destination: Destination::Prefix(*subnet),
                via,
                dev: Some(dev),
            });
        }

        log::debug!("{}: {} static routes", router, routes.len());
        plan.insert(router, routes);
    }

    Ok(plan)
}
