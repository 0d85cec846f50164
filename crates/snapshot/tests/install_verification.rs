//! Layered verification behavior of the snapshot assembler.

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use zephyr_snapshot::error::{Result, SnapshotError};
use zephyr_snapshot::{
    install_snapshot, ChainstateValidator, Checkpoint, ChunkInfo, ChunkStore, Manifest,
    UtxoSetInfo,
};
use zephyr_types::Hash256;

fn noise(len: usize, seed: u32) -> Vec<u8> {
    let mut x = seed | 1;
    (0..len)
        .map(|_| {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (x >> 16) as u8
        })
        .collect()
}

fn build_archive() -> Vec<u8> {
    let mut tar_bytes = Vec::new();
    {
        let mut builder = tar::Builder::new(&mut tar_bytes);
        for (path, contents) in [
            ("chainstate/CURRENT", noise(1024, 3)),
            ("blocks/blk00000.dat", noise(2048, 7)),
        ] {
            let mut header = tar::Header::new_gnu();
            header.set_path(path).expect("path");
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, contents.as_slice()).expect("append");
        }
        builder.finish().expect("finish");
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(&tar_bytes).expect("gzip");
    encoder.finish().expect("gzip finish")
}

/// A complete chunk store over arbitrary archive bytes
fn complete_store(datadir: &Path, archive: &[u8]) -> Arc<ChunkStore> {
    let mid = archive.len() / 2;
    let parts = [&archive[..mid], &archive[mid..]];
    let manifest = Manifest {
        height: 100,
        timestamp: 1,
        total_size: archive.len() as u64,
        chunks: parts
            .iter()
            .enumerate()
            .map(|(i, p)| ChunkInfo::new(i as u32, Hash256::compute_reversed(p), p.len() as u64))
            .collect(),
    };
    let store = Arc::new(ChunkStore::open(datadir, manifest).expect("open"));
    for (i, p) in parts.iter().enumerate() {
        store.save_chunk(i as u32, p).expect("save");
    }
    store
}

fn tip_hash() -> Hash256 {
    Hash256::compute_reversed(b"tip block")
}

/// Validator with a configurable UTXO answer; errors if the UTXO layer is
/// exercised when it should not be
struct ScriptedValidator {
    block_hash: Hash256,
    utxo: Option<UtxoSetInfo>,
}

#[async_trait]
impl ChainstateValidator for ScriptedValidator {
    async fn block_hash_at_height(&self, _datadir: &Path, _height: u32) -> Result<Hash256> {
        Ok(self.block_hash)
    }

    async fn utxo_set_info(&self, _datadir: &Path, _block_hash: &Hash256) -> Result<UtxoSetInfo> {
        self.utxo
            .ok_or_else(|| SnapshotError::Validator("utxo layer should not run".into()))
    }
}

fn checkpoint_with_utxo(utxo_hash: Hash256) -> Checkpoint {
    Checkpoint {
        height: 100,
        block_hash: tip_hash(),
        utxo_hash,
        tx_count: 42,
    }
}

#[tokio::test]
async fn utxo_sentinel_skips_layer_three() {
    // zero sentinel means the UTXO layer never runs; a validator that
    // errors on it proves the skip
    let dir = TempDir::new().expect("tempdir");
    let store = complete_store(dir.path(), &build_archive());
    let validator = ScriptedValidator {
        block_hash: tip_hash(),
        utxo: None,
    };

    install_snapshot(
        &store,
        dir.path(),
        &validator,
        &checkpoint_with_utxo(Hash256::ZERO),
    )
    .await
    .expect("installed without utxo layer");

    assert!(dir.path().join("chainstate").exists());
    assert!(!store.dir().exists());
}

#[tokio::test]
async fn utxo_hash_match_commits() {
    let dir = TempDir::new().expect("tempdir");
    let store = complete_store(dir.path(), &build_archive());
    let utxo_hash = Hash256::compute_reversed(b"utxo serialized");
    let validator = ScriptedValidator {
        block_hash: tip_hash(),
        utxo: Some(UtxoSetInfo {
            hash_serialized: utxo_hash,
            tip_hash: tip_hash(),
            height: 100,
            tx_count: 42,
            tx_outputs: 99,
        }),
    };

    install_snapshot(&store, dir.path(), &validator, &checkpoint_with_utxo(utxo_hash))
        .await
        .expect("installed");
    assert!(dir.path().join("blocks").exists());
}

#[tokio::test]
async fn utxo_hash_mismatch_tears_down() {
    let dir = TempDir::new().expect("tempdir");
    let store = complete_store(dir.path(), &build_archive());
    let validator = ScriptedValidator {
        block_hash: tip_hash(),
        utxo: Some(UtxoSetInfo {
            hash_serialized: Hash256::compute_reversed(b"not the published hash"),
            tip_hash: tip_hash(),
            height: 100,
            tx_count: 42,
            tx_outputs: 99,
        }),
    };
    let checkpoint = checkpoint_with_utxo(Hash256::compute_reversed(b"published hash"));

    let err = install_snapshot(&store, dir.path(), &validator, &checkpoint)
        .await
        .expect_err("mismatch");
    assert!(matches!(err, SnapshotError::UtxoHashMismatch { .. }));
    assert!(err.is_fatal());

    assert!(!dir.path().join("chainstate").exists());
    assert!(!dir.path().join("blocks").exists());
    assert!(!store.dir().exists());
}

#[tokio::test]
async fn utxo_tip_mismatch_tears_down() {
    let dir = TempDir::new().expect("tempdir");
    let store = complete_store(dir.path(), &build_archive());
    let utxo_hash = Hash256::compute_reversed(b"utxo serialized");
    let validator = ScriptedValidator {
        block_hash: tip_hash(),
        utxo: Some(UtxoSetInfo {
            hash_serialized: utxo_hash,
            tip_hash: Hash256::compute_reversed(b"some other tip"),
            height: 100,
            tx_count: 42,
            tx_outputs: 99,
        }),
    };

    let err = install_snapshot(&store, dir.path(), &validator, &checkpoint_with_utxo(utxo_hash))
        .await
        .expect_err("tip mismatch");
    assert!(matches!(err, SnapshotError::UtxoTipMismatch { .. }));
    assert!(!dir.path().join("chainstate").exists());
    assert!(!store.dir().exists());
}

#[tokio::test]
async fn broken_archive_is_storage_fatal() {
    // chunks verify but the assembled bytes are not a gzip archive;
    // extraction fails and everything staged is discarded
    let dir = TempDir::new().expect("tempdir");
    let store = complete_store(dir.path(), &noise(4096, 13));
    let validator = ScriptedValidator {
        block_hash: tip_hash(),
        utxo: None,
    };

    let err = install_snapshot(
        &store,
        dir.path(),
        &validator,
        &checkpoint_with_utxo(Hash256::ZERO),
    )
    .await
    .expect_err("broken archive");
    assert!(err.is_fatal());

    assert!(!dir.path().join("chainstate").exists());
    assert!(!dir.path().join("blocks").exists());
    assert!(!store.dir().exists());
}

#[tokio::test]
async fn validator_error_tears_down() {
    struct FailingValidator;

    #[async_trait]
    impl ChainstateValidator for FailingValidator {
        async fn block_hash_at_height(&self, _datadir: &Path, _height: u32) -> Result<Hash256> {
            Err(SnapshotError::Validator("chainstate unreadable".into()))
        }

        async fn utxo_set_info(
            &self,
            _datadir: &Path,
            _block_hash: &Hash256,
        ) -> Result<UtxoSetInfo> {
            unreachable!("layer 2 failed first")
        }
    }

    let dir = TempDir::new().expect("tempdir");
    let store = complete_store(dir.path(), &build_archive());

    let err = install_snapshot(
        &store,
        dir.path(),
        &FailingValidator,
        &checkpoint_with_utxo(Hash256::ZERO),
    )
    .await
    .expect_err("validator failure");
    assert!(matches!(err, SnapshotError::Validator(_)));
    assert!(!dir.path().join("chainstate").exists());
    assert!(!store.dir().exists());
}
