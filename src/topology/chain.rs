//! The ordered router chain `r1..rN`.
//!
//! ```text
//!     h0---r1---r2--- ... ---rN---h(N+1)
//!          |    |            |
//!          h1   h2           hN
//! ```

use super::types::{HostId, RouterId};
use std::collections::HashSet;

/// Smallest chain that still has a router-to-router link
pub const MIN_ROUTERS: usize = 2;

/// Largest chain whose link subnets `10.0.i.0/24` stay clear of the access
/// subnets `10.0.(10*i).0/24`
pub const MAX_ROUTERS: usize = 10;

/// Errors raised while building a chain
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("a router chain needs at least 2 routers, got {0}")]
    ChainTooShort(usize),
    #[error("a router chain supports at most 10 routers, got {0}")]
    ChainTooLong(usize),
    #[error("router {0} appears more than once in the chain")]
    DuplicateRouter(RouterId),
}

/// An ordered sequence of routers.
///
/// Positions are 1-based and drive all address numbering; router ids only
/// name things.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterChain {
    routers: Vec<RouterId>,
}

impl RouterChain {
    /// Chain of `count` routers named `r1..r<count>`
    pub fn new(count: usize) -> Result<Self, TopologyError> {
        Self::from_routers((1..=count as u32).map(RouterId).collect())
    }

    /// Chain over an explicit router order
    pub fn from_routers(routers: Vec<RouterId>) -> Result<Self, TopologyError> {
        if routers.len() < MIN_ROUTERS {
            return Err(TopologyError::ChainTooShort(routers.len()));
        }
        if routers.len() > MAX_ROUTERS {
            return Err(TopologyError::ChainTooLong(routers.len()));
        }

        let mut seen = HashSet::new();
        for router in &routers {
            if !seen.insert(*router) {
                return Err(TopologyError::DuplicateRouter(*router));
            }
        }

        Ok(Self { routers })
    }

    pub fn len(&self) -> usize {
        self.routers.len()
    }

    /// Always false, a chain holds at least two routers
    pub fn is_empty(&self) -> bool {
        self.routers.is_empty()
    }

    pub fn routers(&self) -> &[RouterId] {
        &self.routers
    }

    pub fn first(&self) -> RouterId {
        self.routers[0]
    }

    pub fn last(&self) -> RouterId {
        self.routers[self.routers.len() - 1]
    }

    /// 1-based position of `router`; fits in a `u8` because of `MAX_ROUTERS`
    pub fn position(&self, router: RouterId) -> Option<u8> {
        self.routers
            .iter()
            .position(|r| *r == router)
            .map(|idx| (idx + 1) as u8)
    }

    /// Routers paired with their 1-based position
    pub fn positions(&self) -> impl Iterator<Item = (u8, RouterId)> + '_ {
        self.routers
            .iter()
            .enumerate()
            .map(|(idx, router)| ((idx + 1) as u8, *router))
    }

    /// Adjacent router pairs, left to right
    pub fn links(&self) -> impl Iterator<Item = (RouterId, RouterId)> + '_ {
        self.routers.windows(2).map(|pair| (pair[0], pair[1]))
    }

    pub fn left_of(&self, router: RouterId) -> Option<RouterId> {
        let pos = self.position(router)? as usize;
        if pos > 1 {
            Some(self.routers[pos - 2])
        } else {
            None
        }
    }

    pub fn right_of(&self, router: RouterId) -> Option<RouterId> {
        let pos = self.position(router)? as usize;
        self.routers.get(pos).copied()
    }

    /// Host attached to the access port of the router at `position`
    pub fn access_host(&self, position: u8) -> HostId {
        HostId(position as u32)
    }

    /// Hosts on the outward ports of the first and last router
    pub fn edge_hosts(&self) -> (HostId, HostId) {
        (HostId(0), HostId(self.routers.len() as u32 + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_bounds() {
        assert_eq!(RouterChain::new(0), Err(TopologyError::ChainTooShort(0)));
        assert_eq!(RouterChain::new(1), Err(TopologyError::ChainTooShort(1)));
        assert!(RouterChain::new(2).is_ok());
        assert!(RouterChain::new(MAX_ROUTERS).is_ok());
        assert_eq!(
            RouterChain::new(MAX_ROUTERS + 1),
            Err(TopologyError::ChainTooLong(MAX_ROUTERS + 1))
        );
    }

    #[test]
    fn test_duplicate_router_rejected() {
        let result = RouterChain::from_routers(vec![RouterId(1), RouterId(2), RouterId(1)]);
        assert_eq!(result, Err(TopologyError::DuplicateRouter(RouterId(1))));
    }

    #[test]
    fn test_chain_navigation() {
        let chain = RouterChain::new(3).unwrap();
        assert_eq!(chain.first(), RouterId(1));
        assert_eq!(chain.last(), RouterId(3));
        assert_eq!(chain.position(RouterId(2)), Some(2));
        assert_eq!(chain.position(RouterId(7)), None);
        assert_eq!(chain.left_of(RouterId(1)), None);
        assert_eq!(chain.left_of(RouterId(2)), Some(RouterId(1)));
        assert_eq!(chain.right_of(RouterId(2)), Some(RouterId(3)));
        assert_eq!(chain.right_of(RouterId(3)), None);

        let links: Vec<_> = chain.links().collect();
        assert_eq!(links, vec![(RouterId(1), RouterId(2)), (RouterId(2), RouterId(3))]);
        assert_eq!(chain.edge_hosts(), (HostId(0), HostId(4)));
    }
}
