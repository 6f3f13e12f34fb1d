//! Routing daemon and kernel forwarding control.
//!
//! This module starts and stops the external routing daemons of each router
//! and keeps IPv4 forwarding enabled for the lifetime of a lab.

pub mod types;
pub mod daemon;
pub mod forwarding;

// Re-export commonly used items for convenience
pub use types::DaemonKind;
pub use daemon::{
    prepare_router_dir, read_pid_file, start_daemon, stop_daemon, DaemonError, DaemonPaths, DaemonUser, StopOutcome,
};
pub use forwarding::ForwardingGuard;
