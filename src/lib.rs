//! # Topolab - router-chain labs on network namespaces
//!
//! This library builds classroom routing labs: a linear chain of routers,
//! each with a dedicated access host, plus an edge host on both ends of the
//! chain. Routers are configured for static routing, RIP or BGP through the
//! external `zebra`, `ripd` and `bgpd` daemons.
//!
//! ```text
//!     h0---r1---r2--- ... ---rN---h(N+1)
//!          |    |            |
//!          h1   h2           hN
//! ```
//!
//! ## Architecture
//!
//! - `topology`: router chain and neighbor map
//! - `ip`: interface/host addressing and AS numbering
//! - `render`: per-router configuration and daemon config text
//! - `intent`: interface, route and sysctl intent and its application
//! - `shell`: command execution on the host or in a namespace
//! - `emulator`: namespaces, veth links and link shaping
//! - `process`: daemon start/stop and the forwarding guard
//! - `config` / `config_loader`: YAML lab configuration and CLI overrides
//! - `orchestrator`: plan building, bring-up and teardown
//! - `utils`: plan validation, daemon binaries, sysctl writes
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use topolab::config::LabConfig;
//! use topolab::orchestrator::{Lab, LabPlan};
//! use topolab::shell::RecordingRunner;
//!
//! let config = LabConfig::default();
//! let plan = LabPlan::build(&config)?;
//!
//! // Record the commands instead of running them
//! let runner = Arc::new(RecordingRunner::new());
//! let lab = Lab::start(&plan, &config, runner.clone())?;
//! lab.teardown();
//!
//! for command in runner.commands() {
//!     println!("{}", command);
//! }
//! # Ok::<(), color_eyre::Report>(())
//! ```
//!
//! ## Configuration Format
//!
//! ```yaml
//! general:
//!   log_level: info
//!   interactive: true
//!
//! chain:
//!   routers: 5
//!   anycast: false
//!   chain_link:
//!     bandwidth_mbit: 10
//!     delay: 100us
//!
//! routing: bgp          # static | rip | bgp
//!
//! daemons:
//!   dir: /usr/lib/frr
//! ```
//!
//! ## Error Handling
//!
//! Modules report failures with `thiserror` enums. The orchestrator and the
//! binary wrap them in `color_eyre` reports with context.

pub mod config;
pub mod config_loader;
pub mod emulator;
pub mod intent;
pub mod ip;
pub mod orchestrator;
pub mod process;
pub mod render;
pub mod shell;
pub mod topology;
pub mod utils;
