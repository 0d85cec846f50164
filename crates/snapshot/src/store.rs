//! On-disk chunk and manifest persistence
//!
//! Chunks live in `<datadir>/snapshots/<height>/` as `chunk-NNN.dat` next
//! to the serialized `manifest.dat`. Every write is verify-then-rename:
//! bytes are checked against the manifest before a temp file is renamed
//! into place, so a chunk file either holds exactly the published bytes or
//! does not exist.

use crate::error::{Result, SnapshotError};
use crate::manifest::Manifest;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zephyr_types::Hash256;

/// Subdirectory of the data directory that holds snapshot chunk stores
const SNAPSHOTS_SUBDIR: &str = "snapshots";

/// File name of the persisted manifest
const MANIFEST_FILE: &str = "manifest.dat";

/// File name of the temporary concatenated archive
const COMBINED_ARCHIVE_FILE: &str = "snapshot-combined.tar.gz";

/// Store for the chunks of one snapshot height
pub struct ChunkStore {
    dir: PathBuf,
    manifest: Manifest,
}

impl ChunkStore {
    /// Open (creating if necessary) the store for `manifest.height` under
    /// `datadir`.
    ///
    /// A manifest already persisted in the directory wins over the one
    /// passed in, provided it is valid; otherwise the given manifest is
    /// validated and persisted.
    pub fn open(datadir: &Path, manifest: Manifest) -> Result<Self> {
        let dir = datadir
            .join(SNAPSHOTS_SUBDIR)
            .join(manifest.height.to_string());
        fs::create_dir_all(&dir)?;

        let mut store = Self { dir, manifest };

        match store.load_manifest() {
            Ok(Some(persisted)) => {
                debug!(
                    height = persisted.height,
                    chunks = persisted.chunk_count(),
                    "loaded persisted snapshot manifest"
                );
                store.manifest = persisted;
            }
            Ok(None) => {
                if !store.manifest.is_valid() {
                    return Err(SnapshotError::InvalidManifest(
                        "manifest failed validation".into(),
                    ));
                }
                store.save_manifest()?;
            }
            Err(err) => {
                warn!(%err, "failed to read persisted manifest, rewriting");
                if !store.manifest.is_valid() {
                    return Err(SnapshotError::InvalidManifest(
                        "manifest failed validation".into(),
                    ));
                }
                store.save_manifest()?;
            }
        }

        info!(
            height = store.manifest.height,
            chunks = store.manifest.chunk_count(),
            dir = %store.dir.display(),
            "snapshot store initialized"
        );

        Ok(store)
    }

    /// The manifest this store is keyed by
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// The store's directory on disk
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the temporary concatenated archive used during assembly
    pub(crate) fn combined_archive_path(&self) -> PathBuf {
        self.dir.join(COMBINED_ARCHIVE_FILE)
    }

    fn chunk_path(&self, number: u32) -> PathBuf {
        self.dir.join(format!("chunk-{:03}.dat", number))
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    fn load_manifest(&self) -> Result<Option<Manifest>> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        let manifest: Manifest =
            bincode::deserialize(&bytes).map_err(SnapshotError::serialization)?;
        if !manifest.is_valid() {
            return Err(SnapshotError::InvalidManifest(
                "persisted manifest failed validation".into(),
            ));
        }
        Ok(Some(manifest))
    }

    fn save_manifest(&self) -> Result<()> {
        let bytes = bincode::serialize(&self.manifest).map_err(SnapshotError::serialization)?;
        write_atomic(&self.manifest_path(), &bytes)?;
        Ok(())
    }

    /// True if the chunk file exists on disk
    pub fn has_chunk(&self, number: u32) -> bool {
        number < self.manifest.chunk_count() && self.chunk_path(number).exists()
    }

    /// Check `data` against the manifest entry for `number`: exact size,
    /// then the single SHA-256 digest compared in the published reversed
    /// orientation.
    pub fn verify_chunk(&self, number: u32, data: &[u8]) -> Result<()> {
        let info = self
            .manifest
            .chunk(number)
            .ok_or(SnapshotError::UnknownChunk(number))?;

        if data.len() as u64 != info.size {
            return Err(SnapshotError::ChunkSizeMismatch {
                number,
                expected: info.size,
                actual: data.len() as u64,
            });
        }

        let digest = Hash256::compute_reversed(data);
        if digest != info.digest {
            return Err(SnapshotError::ChunkDigestMismatch {
                number,
                expected: info.digest,
                actual: digest,
            });
        }

        Ok(())
    }

    /// Verify and persist a chunk. Nothing is observable on disk unless
    /// both the size and digest checks pass and the full write succeeds.
    pub fn save_chunk(&self, number: u32, data: &[u8]) -> Result<()> {
        self.verify_chunk(number, data)?;
        write_atomic(&self.chunk_path(number), data)?;
        debug!(
            target: "snapshot",
            chunk = number,
            bytes = data.len(),
            "saved chunk"
        );
        Ok(())
    }

    /// Read a chunk back from disk
    pub fn load_chunk(&self, number: u32) -> Result<Vec<u8>> {
        if number >= self.manifest.chunk_count() {
            return Err(SnapshotError::UnknownChunk(number));
        }
        let path = self.chunk_path(number);
        if !path.exists() {
            return Err(SnapshotError::MissingChunk(number));
        }
        Ok(fs::read(path)?)
    }

    /// Chunk numbers not yet on disk, in ascending order
    pub fn missing_chunks(&self) -> Vec<u32> {
        (0..self.manifest.chunk_count())
            .filter(|n| !self.has_chunk(*n))
            .collect()
    }

    /// True if every chunk in the manifest exists on disk
    pub fn is_complete(&self) -> bool {
        (0..self.manifest.chunk_count()).all(|n| self.has_chunk(n))
    }

    /// Concatenate all chunks, in order, into the archive file at `dest`.
    ///
    /// Requires every chunk to be present. A partial output file is
    /// removed before returning an error.
    pub fn assemble_archive(&self, dest: &Path) -> Result<()> {
        if let Some(missing) = self.missing_chunks().first() {
            return Err(SnapshotError::MissingChunk(*missing));
        }

        let result = self.concatenate_chunks(dest);
        if result.is_err() {
            let _ = fs::remove_file(dest);
        }
        result
    }

    fn concatenate_chunks(&self, dest: &Path) -> Result<()> {
        let mut out = fs::File::create(dest)?;
        for number in 0..self.manifest.chunk_count() {
            let data = self.load_chunk(number)?;
            out.write_all(&data)?;
            debug!(
                target: "snapshot",
                chunk = number + 1,
                total = self.manifest.chunk_count(),
                "combined chunk"
            );
        }
        out.sync_all()?;
        Ok(())
    }

    /// Remove the entire snapshot directory: chunks, manifest, and any
    /// leftover combined archive.
    pub fn cleanup(&self) -> Result<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)?;
            info!(dir = %self.dir.display(), "removed snapshot directory");
        }
        Ok(())
    }
}

/// Write `data` to `path` via a temp sibling and rename, removing the temp
/// file on any failure.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    let result = (|| -> Result<()> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(data)?;
        file.sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}
