//! Snapshot manifest types

use serde::{Deserialize, Serialize};
use tracing::warn;
use zephyr_types::Hash256;

/// Description of a single snapshot chunk
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkInfo {
    /// 0-based sequential chunk number
    pub number: u32,
    /// Single SHA-256 of the chunk bytes, in the published (reversed)
    /// orientation
    pub digest: Hash256,
    /// Chunk length in bytes
    pub size: u64,
}

impl ChunkInfo {
    /// Create a new chunk descriptor
    pub fn new(number: u32, digest: Hash256, size: u64) -> Self {
        Self {
            number,
            digest,
            size,
        }
    }
}

/// Complete snapshot manifest: metadata plus the ordered chunk list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Block height the snapshot was taken at
    pub height: u32,
    /// Unix timestamp of snapshot creation
    pub timestamp: u64,
    /// Total archive size in bytes
    pub total_size: u64,
    /// Chunk descriptors, indexed 0..N-1
    pub chunks: Vec<ChunkInfo>,
}

impl Manifest {
    /// Number of chunks in the manifest
    pub fn chunk_count(&self) -> u32 {
        self.chunks.len() as u32
    }

    /// Look up a chunk descriptor by number
    pub fn chunk(&self, number: u32) -> Option<&ChunkInfo> {
        self.chunks.get(number as usize)
    }

    /// Validate the manifest's internal consistency: positive height,
    /// non-empty gap-free chunk list, and sizes that add up to
    /// `total_size`.
    pub fn is_valid(&self) -> bool {
        if self.height == 0 {
            warn!("manifest has zero height");
            return false;
        }
        if self.chunks.is_empty() {
            warn!("manifest has no chunks");
            return false;
        }
        if self.total_size == 0 {
            warn!("manifest has zero total size");
            return false;
        }

        let mut sum = 0u64;
        for (i, chunk) in self.chunks.iter().enumerate() {
            if chunk.number != i as u32 {
                warn!(
                    index = i,
                    number = chunk.number,
                    "manifest chunk has wrong number"
                );
                return false;
            }
            if chunk.size == 0 {
                warn!(number = chunk.number, "manifest chunk has zero size");
                return false;
            }
            sum = sum.saturating_add(chunk.size);
        }

        if sum != self.total_size {
            warn!(
                sum,
                total_size = self.total_size,
                "manifest chunk sizes do not add up to total size"
            );
            return false;
        }

        true
    }
}
