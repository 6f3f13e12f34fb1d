//! IP address and AS number allocation.
//!
//! This module assigns interface addresses along the router chain, plans the
//! end-host addresses, and numbers the autonomous systems used by BGP.

pub mod allocator;
pub mod as_manager;

// Re-export commonly used types
pub use allocator::{plan_hosts, AddressMap, HostAddress, SUBNET_PREFIX};
pub use as_manager::{AsNumberMap, DEFAULT_AS_STEP};
