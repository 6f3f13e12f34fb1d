//! Shared utilities: plan validation, daemon binaries, sysctl writes.

pub mod binary;
pub mod sysctl;
pub mod validation;

pub use binary::{resolve_daemon_binary, validate_binary, validate_daemon_binaries, BinaryError};
pub use sysctl::set_sysctl;
pub use validation::{validate_address_plan, validate_chain_links, validate_neighbor_symmetry};
