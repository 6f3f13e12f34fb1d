//! Autonomous System (AS) number assignment.
//!
//! Each router is its own AS, numbered by chain position: the router at
//! position `i` gets `as_step * i` (1000, 2000, ... by default).

use crate::topology::{RouterChain, RouterId};
use std::collections::BTreeMap;

/// Default distance between consecutive AS numbers
pub const DEFAULT_AS_STEP: u32 = 1000;

/// router → AS number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsNumberMap {
    numbers: BTreeMap<RouterId, u32>,
}

impl AsNumberMap {
    pub fn build(chain: &RouterChain, as_step: u32) -> Self {
        let numbers = chain
            .positions()
            .map(|(pos, router)| (router, as_step * pos as u32))
            .collect();
        Self { numbers }
    }

    pub fn get(&self, router: RouterId) -> Option<u32> {
        self.numbers.get(&router).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RouterId, u32)> + '_ {
        self.numbers.iter().map(|(router, asn)| (*router, *asn))
    }
}
