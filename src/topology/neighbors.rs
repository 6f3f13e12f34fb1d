//! Neighbor map construction.
//!
//! Maps every chain-facing port of every router to the router on the other
//! end of the link. Access ports and the outward ports of the two end routers
//! face hosts, so they have no entry.

use super::chain::{RouterChain, TopologyError};
use super::types::{Port, RouterId};
use std::collections::BTreeMap;

/// (router, local port) → adjacent router.
///
/// Built once from a chain and read-only afterward.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborMap {
    entries: BTreeMap<(RouterId, Port), RouterId>,
}

impl NeighborMap {
    /// Build the map for an ordered router list.
    ///
    /// Fails if fewer than two routers are supplied, since a chain needs at
    /// least one link.
    pub fn build(routers: &[RouterId]) -> Result<Self, TopologyError> {
        let chain = RouterChain::from_routers(routers.to_vec())?;
        Ok(Self::from_chain(&chain))
    }

    pub fn from_chain(chain: &RouterChain) -> Self {
        let mut entries = BTreeMap::new();
        for (left, right) in chain.links() {
            entries.insert((left, Port::Right), right);
            entries.insert((right, Port::Left), left);
        }
        Self { entries }
    }

    /// Map over explicit entries, taken as given with no symmetry check
    pub fn from_entries(entries: impl IntoIterator<Item = (RouterId, Port, RouterId)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(router, port, neighbor)| ((router, port), neighbor))
                .collect(),
        }
    }

    pub fn get(&self, router: RouterId, port: Port) -> Option<RouterId> {
        self.entries.get(&(router, port)).copied()
    }

    /// All (port, neighbor) pairs of `router` in port order
    pub fn neighbors_of(&self, router: RouterId) -> impl Iterator<Item = (Port, RouterId)> + '_ {
        self.entries
            .range((router, Port::Access)..=(router, Port::Right))
            .map(|((_, port), neighbor)| (*port, *neighbor))
    }

    /// The port of `router` whose link leads to `toward`
    pub fn facing_port(&self, router: RouterId, toward: RouterId) -> Option<Port> {
        self.neighbors_of(router)
            .find(|(_, neighbor)| *neighbor == toward)
            .map(|(port, _)| port)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RouterId, Port, RouterId)> + '_ {
        self.entries
            .iter()
            .map(|((router, port), neighbor)| (*router, *port, *neighbor))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry has a matching entry on the opposite port of the neighbor
    pub fn is_symmetric(&self) -> bool {
        self.iter().all(|(router, port, neighbor)| match port.opposite() {
            Some(back) => self.get(neighbor, back) == Some(router),
            None => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routers(n: u32) -> Vec<RouterId> {
        (1..=n).map(RouterId).collect()
    }

    #[test]
    fn test_too_few_routers() {
        assert_eq!(NeighborMap::build(&[]), Err(TopologyError::ChainTooShort(0)));
        assert_eq!(
            NeighborMap::build(&[RouterId(1)]),
            Err(TopologyError::ChainTooShort(1))
        );
    }

    #[test]
    fn test_three_router_chain() {
        let map = NeighborMap::build(&routers(3)).unwrap();

        // End routers have a single chain interface, the middle one has two
        assert_eq!(map.len(), 4);
        assert_eq!(map.get(RouterId(1), Port::Right), Some(RouterId(2)));
        assert_eq!(map.get(RouterId(1), Port::Left), None);
        assert_eq!(map.get(RouterId(2), Port::Left), Some(RouterId(1)));
        assert_eq!(map.get(RouterId(2), Port::Right), Some(RouterId(3)));
        assert_eq!(map.get(RouterId(3), Port::Left), Some(RouterId(2)));
        assert_eq!(map.get(RouterId(3), Port::Right), None);
        assert_eq!(map.get(RouterId(2), Port::Access), None);
    }

    #[test]
    fn test_symmetry_for_all_chain_lengths() {
        for n in 2..=crate::topology::MAX_ROUTERS as u32 {
            let map = NeighborMap::build(&routers(n)).unwrap();
            assert!(map.is_symmetric(), "chain of {} is not symmetric", n);
            assert_eq!(map.len(), 2 * (n as usize - 1));
            for (router, port, neighbor) in map.iter() {
                let back = port.opposite().unwrap();
                assert_eq!(map.get(neighbor, back), Some(router));
            }
        }
    }

    #[test]
    fn test_facing_port_with_custom_order() {
        let map = NeighborMap::build(&[RouterId(7), RouterId(3), RouterId(9)]).unwrap();
        assert_eq!(map.facing_port(RouterId(3), RouterId(7)), Some(Port::Left));
        assert_eq!(map.facing_port(RouterId(3), RouterId(9)), Some(Port::Right));
        assert_eq!(map.facing_port(RouterId(7), RouterId(9)), None);

        let of_middle: Vec<_> = map.neighbors_of(RouterId(3)).collect();
        assert_eq!(of_middle, vec![(Port::Left, RouterId(7)), (Port::Right, RouterId(9))]);
    }
}
