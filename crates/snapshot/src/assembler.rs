//! Snapshot assembly, extraction, and layered verification
//!
//! Once every chunk is on disk the assembler concatenates them into the
//! original gzipped tar archive, extracts it onto the data directory
//! (populating `chainstate/` and `blocks/`), and then verifies the result
//! in layers before the node commits to it:
//!
//! 1. per-chunk digests (already enforced by [`ChunkStore::save_chunk`]),
//! 2. the block hash at the checkpoint height,
//! 3. optionally the deterministic UTXO set hash.
//!
//! Any failure from extraction onward deletes the staged subtrees *and* the
//! chunk directory, leaving the node exactly where a full sync would start.

use crate::checkpoint::Checkpoint;
use crate::error::{Result, SnapshotError};
use crate::store::ChunkStore;
use async_compression::tokio::bufread::GzipDecoder;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::task;
use tokio_stream::StreamExt;
use tracing::{error, info, warn};
use zephyr_types::Hash256;

/// Subtree holding the UTXO database after extraction
const CHAINSTATE_SUBDIR: &str = "chainstate";

/// Subtree holding the block files after extraction
const BLOCKS_SUBDIR: &str = "blocks";

/// Deterministic statistics over the UTXO set at one tip, as computed by
/// the external validation engine
#[derive(Clone, Copy, Debug)]
pub struct UtxoSetInfo {
    /// Serialized hash over the full UTXO set
    pub hash_serialized: Hash256,
    /// Block hash the statistics were computed at
    pub tip_hash: Hash256,
    /// Height of that tip
    pub height: u32,
    /// Transactions with unspent outputs
    pub tx_count: u64,
    /// Unspent transaction outputs
    pub tx_outputs: u64,
}

/// The blockchain validation engine, seen from the snapshot subsystem.
///
/// Two opaque operations over an on-disk chainstate/block directory tree.
/// The engine implementing this trait owns all consensus logic; the
/// snapshot code only compares its answers against the compile-time
/// checkpoint.
#[async_trait]
pub trait ChainstateValidator: Send + Sync {
    /// The block hash stored at `height` in the chainstate under `datadir`
    async fn block_hash_at_height(&self, datadir: &Path, height: u32) -> Result<Hash256>;

    /// Deterministic UTXO set statistics at `block_hash` for the chainstate
    /// under `datadir`
    async fn utxo_set_info(&self, datadir: &Path, block_hash: &Hash256) -> Result<UtxoSetInfo>;
}

/// Assemble, extract, verify, and commit the downloaded snapshot.
///
/// On success the chunk store is removed and the data directory holds the
/// verified chainstate; the caller restarts the node to load it. On any
/// failure after extraction starts, all staged data is removed and the
/// error is returned for the caller to fall back to full sync.
pub async fn install_snapshot(
    store: &Arc<ChunkStore>,
    datadir: &Path,
    validator: &dyn ChainstateValidator,
    checkpoint: &Checkpoint,
) -> Result<()> {
    let archive_path = store.combined_archive_path();

    let concat_store = Arc::clone(store);
    let concat_dest = archive_path.clone();
    let concatenated = match task::spawn_blocking(move || concat_store.assemble_archive(&concat_dest)).await {
        Ok(result) => result,
        Err(join_err) => Err(SnapshotError::Io(std::io::Error::other(join_err))),
    };
    if let Err(err) = concatenated {
        // a missing chunk keeps the partial download; disk failures do not
        if err.is_fatal() {
            error!(%err, "snapshot concatenation failed, discarding staged data");
            teardown(datadir, store).await;
        }
        return Err(err);
    }

    info!(
        archive = %archive_path.display(),
        target = %datadir.display(),
        "extracting snapshot archive"
    );

    if let Err(err) = extract_archive(&archive_path, datadir).await {
        error!(%err, "snapshot extraction failed, discarding staged data");
        let _ = tokio::fs::remove_file(&archive_path).await;
        teardown(datadir, store).await;
        return Err(err);
    }

    if let Err(err) = tokio::fs::remove_file(&archive_path).await {
        warn!(%err, "failed to remove combined archive after extraction");
    }

    // Layer 2: the extracted chainstate must carry the pinned block hash
    let block_hash = match validator.block_hash_at_height(datadir, checkpoint.height).await {
        Ok(hash) => hash,
        Err(err) => {
            error!(%err, "could not read block hash from extracted chainstate");
            teardown(datadir, store).await;
            return Err(err);
        }
    };
    if block_hash != checkpoint.block_hash {
        error!(
            height = checkpoint.height,
            expected = %checkpoint.block_hash,
            actual = %block_hash,
            "snapshot block hash mismatch, discarding staged data"
        );
        teardown(datadir, store).await;
        return Err(SnapshotError::BlockHashMismatch {
            height: checkpoint.height,
            expected: checkpoint.block_hash,
            actual: block_hash,
        });
    }
    info!(height = checkpoint.height, hash = %block_hash, "snapshot block hash verified");

    // Layer 3: UTXO set hash, unless disabled for this release
    if !checkpoint.utxo_verification_enabled() {
        info!("utxo set hash verification skipped (no hash published for this snapshot)");
    } else if let Err(err) = verify_utxo_hash(datadir, validator, checkpoint).await {
        teardown(datadir, store).await;
        return Err(err);
    }

    store.cleanup()?;
    info!(height = checkpoint.height, "snapshot verified and installed");
    Ok(())
}

async fn verify_utxo_hash(
    datadir: &Path,
    validator: &dyn ChainstateValidator,
    checkpoint: &Checkpoint,
) -> Result<()> {
    let utxo = validator
        .utxo_set_info(datadir, &checkpoint.block_hash)
        .await?;

    if utxo.tip_hash != checkpoint.block_hash {
        error!(
            expected = %checkpoint.block_hash,
            actual = %utxo.tip_hash,
            "utxo set computed at unexpected tip"
        );
        return Err(SnapshotError::UtxoTipMismatch {
            expected: checkpoint.block_hash,
            actual: utxo.tip_hash,
        });
    }

    if utxo.hash_serialized != checkpoint.utxo_hash {
        error!(
            expected = %checkpoint.utxo_hash,
            actual = %utxo.hash_serialized,
            "utxo set hash mismatch, discarding staged data"
        );
        return Err(SnapshotError::UtxoHashMismatch {
            expected: checkpoint.utxo_hash,
            actual: utxo.hash_serialized,
        });
    }

    info!(
        hash = %utxo.hash_serialized,
        tx_count = utxo.tx_count,
        outputs = utxo.tx_outputs,
        "utxo set hash verified"
    );
    Ok(())
}

/// Unpack a gzipped tar archive into `target`, entry by entry, refusing
/// any entry that would land outside the target directory
async fn extract_archive(archive_path: &Path, target: &Path) -> Result<()> {
    let file = tokio::fs::File::open(archive_path).await?;
    let decoder = GzipDecoder::new(BufReader::new(file));
    let mut archive = tokio_tar::Archive::new(decoder);

    let mut entries = archive.entries()?;
    while let Some(entry) = entries.next().await {
        let mut entry = entry?;
        if !entry.unpack_in(target).await? {
            let path = entry.path()?.into_owned();
            return Err(SnapshotError::UnsafeArchivePath(path));
        }
    }
    Ok(())
}

/// Remove everything the snapshot path staged: the extracted subtrees and
/// the chunk directory. Best effort; failures are logged, not propagated,
/// since this already runs on an error path.
async fn teardown(datadir: &Path, store: &Arc<ChunkStore>) {
    for subdir in [CHAINSTATE_SUBDIR, BLOCKS_SUBDIR] {
        let path = datadir.join(subdir);
        if path.exists() {
            if let Err(err) = tokio::fs::remove_dir_all(&path).await {
                warn!(path = %path.display(), %err, "failed to remove staged subtree");
            }
        }
    }
    if let Err(err) = store.cleanup() {
        warn!(%err, "failed to remove snapshot chunk directory");
    }
}
