//! Router chain topology.
//!
//! This module contains the identifier types, the ordered router chain and
//! the neighbor map derived from it.

pub mod types;
pub mod chain;
pub mod neighbors;

// Re-export key types for easier access
pub use types::{HostId, Port, RouterId};
pub use chain::{RouterChain, TopologyError, MAX_ROUTERS, MIN_ROUTERS};
pub use neighbors::NeighborMap;
