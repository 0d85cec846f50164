//! Node-side wiring for the Zephyr snapshot bootstrap engine.
//!
//! This crate connects the engine in `zephyr-snapshot` to a running node:
//! [`SnapshotServer`] answers chunk requests from peers behind the rate
//! limiter, and [`fetcher::run_snapshot_fetch`] drives a fresh node's
//! download, assembly, and verification before its first full start.

pub mod config;
pub mod fetcher;
pub mod server;
pub mod util;

pub use config::{ConfigError, NodeConfig};
pub use fetcher::{run_snapshot_fetch, FetchOutcome};
pub use server::SnapshotServer;
