//! P2P snapshot bootstrap engine for the Zephyr node.
//!
//! A fresh node can skip the multi-day initial block download by fetching a
//! trusted snapshot of the chainstate and block files from peers that
//! advertise the `NODE_SNAPSHOT` service bit. The snapshot is a gzipped tar
//! archive split into fixed-size chunks, each independently verified against
//! a compile-time manifest of SHA-256 digests. After all chunks arrive the
//! archive is reassembled, extracted into the data directory, and checked
//! against the compile-time checkpoint (block hash, optionally the UTXO set
//! hash) before the node commits to it. Any failure tears down the staged
//! data and falls back to full sync.
//!
//! The crate is split along the two roles a node can play:
//!
//! - **Serving**: [`RateLimiter`] admits or rejects chunk requests,
//!   [`ChunkStore`] supplies the bytes.
//! - **Fetching**: [`DownloadCoordinator`] assigns chunks to peers,
//!   [`DownloadState`] tracks completeness, and the assembler in
//!   [`assembler`] performs extraction and layered verification.
//!
//! Peer connections themselves are out of scope; the engine sees peers only
//! as [`PeerId`]s on the channel-based [`network`] adapter.

pub mod assembler;
pub mod checkpoint;
pub mod config;
pub mod coordinator;
pub mod download;
pub mod error;
pub mod limiter;
pub mod manifest;
pub mod metrics;
pub mod network;
pub mod protocol;
pub mod service;
pub mod store;

pub use assembler::{install_snapshot, ChainstateValidator, UtxoSetInfo};
pub use checkpoint::{builtin_manifest, checkpoint, Checkpoint, SNAPSHOT_CHUNK_SIZE, SNAPSHOT_HEIGHT};
pub use config::SnapshotConfig;
pub use coordinator::{CoordinatorConfig, DownloadCoordinator};
pub use download::DownloadState;
pub use error::{Result, SnapshotError};
pub use limiter::{RateLimiter, RateLimiterConfig, RejectReason};
pub use manifest::{ChunkInfo, Manifest};
pub use network::{IncomingSnapshotEvent, OutgoingSnapshotMessage, SnapshotNetwork, SnapshotNetworkSender};
pub use protocol::{PeerId, SnapshotMessage};
pub use service::can_serve_snapshots;
pub use store::ChunkStore;
