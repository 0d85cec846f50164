//! Snapshot engine error types

use crate::protocol::PeerId;
use std::path::PathBuf;
use thiserror::Error;
use zephyr_types::Hash256;

/// Result type alias for snapshot operations
pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Snapshot error categories
#[derive(Debug, Error)]
pub enum SnapshotError {
    // === Network errors (transient, retried via the coordinator) ===
    /// Peer disconnected while a chunk was in flight
    #[error("peer {0} disconnected")]
    PeerDisconnected(PeerId),

    /// Chunk request timed out
    #[error("chunk {chunk} from peer {peer} timed out")]
    RequestTimeout {
        /// Chunk number that was in flight
        chunk: u32,
        /// Peer the request was assigned to
        peer: PeerId,
    },

    /// Peer sent bytes for a chunk we never requested from it
    #[error("unsolicited chunk {chunk} from peer {peer}")]
    UnsolicitedChunk {
        /// Chunk number received
        chunk: u32,
        /// Peer that sent it
        peer: PeerId,
    },

    // === Integrity errors (chunk rejected, peer marked failed) ===
    /// Chunk payload length does not match the manifest
    #[error("chunk {number} size mismatch: expected {expected}, got {actual}")]
    ChunkSizeMismatch {
        /// Chunk number
        number: u32,
        /// Size listed in the manifest
        expected: u64,
        /// Size actually received
        actual: u64,
    },

    /// Chunk digest does not match the manifest
    #[error("chunk {number} digest mismatch: expected {expected}, got {actual}")]
    ChunkDigestMismatch {
        /// Chunk number
        number: u32,
        /// Digest listed in the manifest
        expected: Hash256,
        /// Digest of the received bytes
        actual: Hash256,
    },

    /// Chunk number outside the manifest range
    #[error("chunk {0} is not in the manifest")]
    UnknownChunk(u32),

    /// Chunk required for assembly is not on disk
    #[error("chunk {0} missing from the snapshot store")]
    MissingChunk(u32),

    /// Manifest failed validation
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    // === Verification errors (fatal: staged data is discarded) ===
    /// Extracted chainstate's block hash differs from the checkpoint
    #[error(
        "block hash mismatch at height {height}: expected {expected}, got {actual}"
    )]
    BlockHashMismatch {
        /// Checkpoint height
        height: u32,
        /// Hash the checkpoint pins
        expected: Hash256,
        /// Hash found in the extracted chainstate
        actual: Hash256,
    },

    /// UTXO set hash differs from the checkpoint
    #[error("utxo set hash mismatch: expected {expected}, got {actual}")]
    UtxoHashMismatch {
        /// Hash the checkpoint pins
        expected: Hash256,
        /// Hash the validator computed
        actual: Hash256,
    },

    /// UTXO set was computed at a different tip than requested
    #[error("utxo set tip mismatch: expected {expected}, got {actual}")]
    UtxoTipMismatch {
        /// Block hash the computation was requested at
        expected: Hash256,
        /// Block hash the validator reported
        actual: Hash256,
    },

    // === Storage errors (fatal during assembly, local otherwise) ===
    /// Filesystem operation failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest or message (de)serialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Archive entry would extract outside the target directory
    #[error("archive entry escapes target directory: {0}")]
    UnsafeArchivePath(PathBuf),

    // === External collaborator ===
    /// The chainstate validator reported an error
    #[error("chainstate validator error: {0}")]
    Validator(String),

    // === Configuration ===
    /// The snapshot subsystem is disabled by the operator
    #[error("snapshot subsystem disabled by configuration")]
    Disabled,
}

impl SnapshotError {
    /// Create a serialization error from any displayable cause
    pub fn serialization(err: impl std::fmt::Display) -> Self {
        Self::Serialization(err.to_string())
    }

    /// Create a validator error from any displayable cause
    pub fn validator(err: impl std::fmt::Display) -> Self {
        Self::Validator(err.to_string())
    }

    /// True if the error should be retried with another peer
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::PeerDisconnected(_) | Self::RequestTimeout { .. } | Self::UnsolicitedChunk { .. }
        )
    }

    /// True if the error indicates the sending peer misbehaved
    pub fn is_peer_misbehavior(&self) -> bool {
        matches!(
            self,
            Self::ChunkSizeMismatch { .. }
                | Self::ChunkDigestMismatch { .. }
                | Self::UnsolicitedChunk { .. }
        )
    }

    /// True if the error aborts the snapshot path entirely and sends the
    /// node to full sync (staged data must already be torn down by then)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::BlockHashMismatch { .. }
                | Self::UtxoHashMismatch { .. }
                | Self::UtxoTipMismatch { .. }
                | Self::Io(_)
                | Self::UnsafeArchivePath(_)
                | Self::Validator(_)
                | Self::Disabled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_classification() {
        assert!(SnapshotError::PeerDisconnected(PeerId(7)).is_retriable());
        assert!(SnapshotError::RequestTimeout {
            chunk: 3,
            peer: PeerId(1)
        }
        .is_retriable());
        assert!(!SnapshotError::MissingChunk(0).is_retriable());
        assert!(!SnapshotError::Disabled.is_retriable());
    }

    #[test]
    fn test_misbehavior_classification() {
        assert!(SnapshotError::ChunkSizeMismatch {
            number: 2,
            expected: 100,
            actual: 99
        }
        .is_peer_misbehavior());
        assert!(SnapshotError::ChunkDigestMismatch {
            number: 2,
            expected: Hash256::ZERO,
            actual: Hash256::compute(b"x"),
        }
        .is_peer_misbehavior());
        assert!(!SnapshotError::RequestTimeout {
            chunk: 0,
            peer: PeerId(1)
        }
        .is_peer_misbehavior());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(SnapshotError::BlockHashMismatch {
            height: 100,
            expected: Hash256::ZERO,
            actual: Hash256::ZERO,
        }
        .is_fatal());
        assert!(SnapshotError::UtxoHashMismatch {
            expected: Hash256::ZERO,
            actual: Hash256::ZERO,
        }
        .is_fatal());
        assert!(SnapshotError::Io(std::io::Error::other("disk full")).is_fatal());
        assert!(!SnapshotError::ChunkDigestMismatch {
            number: 0,
            expected: Hash256::ZERO,
            actual: Hash256::ZERO,
        }
        .is_fatal());
    }

    #[test]
    fn test_display_contains_both_hashes() {
        let expected = Hash256::compute_reversed(b"a");
        let actual = Hash256::compute_reversed(b"b");
        let err = SnapshotError::BlockHashMismatch {
            height: 2_879_438,
            expected,
            actual,
        };
        let msg = err.to_string();
        assert!(msg.contains(&expected.to_hex()));
        assert!(msg.contains(&actual.to_hex()));
        assert!(msg.contains("2879438"));
    }
}
