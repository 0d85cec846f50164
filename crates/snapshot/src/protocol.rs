//! Snapshot P2P protocol messages
//!
//! Four message shapes travel over the peer channel. Integers are encoded
//! little-endian with length-prefixed lists (bincode's fixed-int encoding);
//! digests are opaque 32-byte blobs.

use crate::error::{Result, SnapshotError};
use crate::manifest::Manifest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for a connected peer, assigned by the connection layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(pub u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot protocol messages
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotMessage {
    /// Request the serving peer's manifest.
    ///
    /// Vestigial in this release (the manifest is compiled in on both
    /// ends) but kept on the wire for future dynamic manifests.
    GetManifest,

    /// Manifest response
    Manifest(Manifest),

    /// Request a single chunk by number
    GetChunk {
        /// 0-based chunk number
        number: u32,
    },

    /// Chunk data response
    Chunk {
        /// 0-based chunk number
        number: u32,
        /// Raw chunk bytes
        data: Vec<u8>,
    },
}

impl SnapshotMessage {
    /// Message type name for logging
    pub fn message_type(&self) -> &'static str {
        match self {
            Self::GetManifest => "GetManifest",
            Self::Manifest(_) => "Manifest",
            Self::GetChunk { .. } => "GetChunk",
            Self::Chunk { .. } => "Chunk",
        }
    }

    /// Encode to the wire format
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(SnapshotError::serialization)
    }

    /// Decode from the wire format
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(SnapshotError::serialization)
    }
}
