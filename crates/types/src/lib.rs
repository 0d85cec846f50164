//! Core types for the Zephyr node.
//!
//! This crate provides the fundamental data structures shared across the
//! Zephyr implementation: the 32-byte hash type used for block hashes and
//! snapshot chunk digests, and the service-flag bitset advertised during
//! the connection handshake.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

pub mod hash;
pub mod service_flags;

pub use hash::Hash256;
pub use service_flags::{ServiceFlags, NODE_NETWORK, NODE_SNAPSHOT};
