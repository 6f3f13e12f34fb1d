//! Consistency checks over the computed lab maps.
//!
//! These run after the neighbor and address maps are built and before any
//! node is created, so a broken plan never reaches the system.

use crate::ip::AddressMap;
use crate::topology::{NeighborMap, Port, RouterChain};
use std::collections::BTreeMap;

/// Validate the address plan for duplicate addresses.
///
/// Every assigned address must be unique, except the anycast pair
/// (`r1-eth1` and the last router's right port) when anycast is enabled.
///
/// # Arguments
/// * `chain` - The router chain the map was built for
/// * `addresses` - The address map to validate
///
/// # Returns
/// * `Ok(())` if validation succeeds
/// * `Err(String)` listing every offending address
pub fn validate_address_plan(chain: &RouterChain, addresses: &AddressMap) -> Result<(), String> {
    let mut owners: BTreeMap<_, Vec<String>> = BTreeMap::new();
    for (router, port, net) in addresses.iter() {
        owners
            .entry(net.addr())
            .or_default()
            .push(router.interface(port));
    }

    let mut anycast_pair = vec![
        chain.first().interface(Port::Left),
        chain.last().interface(Port::Right),
    ];
    anycast_pair.sort();

    let mut problems = Vec::new();
    for (addr, interfaces) in owners.iter_mut() {
        interfaces.sort();
        if interfaces.len() < 2 {
            continue;
        }
        if addresses.is_anycast() && *interfaces == anycast_pair {
            log::info!(
                "Anycast address {} shared by {} and {}",
                addr,
                interfaces[0],
                interfaces[1]
            );
            continue;
        }
        problems.push(format!("{} assigned to {}", addr, interfaces.join(", ")));
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(format!("Duplicate addresses in plan: {}", problems.join("; ")))
    }
}

/// Validate chain links: each link subnet holds exactly the two link
/// endpoints with distinct addresses, and no two links share a subnet.
pub fn validate_chain_links(chain: &RouterChain, addresses: &AddressMap) -> Result<(), String> {
    let mut link_subnets = BTreeMap::new();

    for (left, right) in chain.links() {
        let a = addresses
            .get(left, Port::Right)
            .ok_or_else(|| format!("No address for {}", left.interface(Port::Right)))?;
        let b = addresses
            .get(right, Port::Left)
            .ok_or_else(|| format!("No address for {}", right.interface(Port::Left)))?;

        if a.trunc() != b.trunc() {
            return Err(format!(
                "Link {}-{} endpoints are on different subnets ({} vs {})",
                left, right, a, b
            ));
        }
        if a.addr() == b.addr() {
            return Err(format!(
                "Link {}-{} endpoints share address {}",
                left,
                right,
                a.addr()
            ));
        }
        if let Some((l, r)) = link_subnets.insert(a.trunc(), (left, right)) {
            return Err(format!(
                "Links {}-{} and {}-{} share subnet {}",
                l,
                r,
                left,
                right,
                a.trunc()
            ));
        }
    }

    // No third interface may sit on a link subnet
    let subnets = addresses.subnets();
    for subnet in link_subnets.keys() {
        if let Some(attached) = subnets.get(subnet) {
            if attached.len() != 2 {
                return Err(format!(
                    "Link subnet {} has {} attached interfaces, expected 2",
                    subnet,
                    attached.len()
                ));
            }
        }
    }

    log::debug!("Validated {} chain links", link_subnets.len());
    Ok(())
}

/// Validate that the neighbor map is symmetric
pub fn validate_neighbor_symmetry(neighbors: &NeighborMap) -> Result<(), String> {
    for (router, port, neighbor) in neighbors.iter() {
        let back = port
            .opposite()
            .ok_or_else(|| format!("{} has a neighbor on its {} port", router, port))?;
        if neighbors.get(neighbor, back) != Some(router) {
            return Err(format!(
                "Neighbor map is asymmetric: {} {} -> {}, but {} {} does not point back",
                router, port, neighbor, neighbor, back
            ));
        }
    }
    Ok(())
}
