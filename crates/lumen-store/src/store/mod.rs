//! Persistent vector store: embeddings, chunk metadata and manifest.
//!
//! A store directory holds three files written with temp-file + rename. Each
//! [`VectorStore`] owns the lock that serializes its writers; readers take it
//! only long enough to copy the current state.

mod data;
mod files;
mod matrix;

pub use data::{LoadOutcome, ResetReason, StoreData};
pub use files::{EMBEDDINGS_FILE, MANIFEST_FILE, METADATA_FILE};
pub use matrix::{EmbeddingMatrix, dot, normalize};

use core::result::Result as CoreResult;
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use files::{MatrixFile, MatrixFileError, StorePaths};
use lumen_core::{ChunkRecord, Manifest, Result};

/// A store directory plus the lock guarding it.
#[derive(Debug)]
pub struct VectorStore {
    /// Store directory
    dir: PathBuf,
    /// Resolved file paths
    paths: StorePaths,
    /// Embedding model recorded in the manifest
    model: String,
    /// Serializes writers and brief reader snapshots
    lock: Mutex<()>,
}

impl VectorStore {
    /// Create a store rooted at `dir`. Nothing is touched on disk until a save.
    pub fn new(dir: impl Into<PathBuf>, model: impl Into<String>) -> Self {
        let dir = dir.into();
        Self {
            paths: StorePaths::new(&dir),
            dir,
            model: model.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Embedding model recorded in the manifest.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Acquire exclusive access for a load → mutate → save sequence.
    pub async fn write(&self) -> StoreWriter<'_> {
        StoreWriter {
            store: self,
            _guard: self.lock.lock().await,
        }
    }

    /// Copy the current state, holding the lock only while reading.
    pub async fn snapshot(&self, expected_dim: usize) -> LoadOutcome {
        let _guard = self.lock.lock().await;
        read_store(&self.paths, expected_dim).await
    }

    /// Delete every store file. Safe to call on an empty store.
    ///
    /// # Errors
    /// Returns an error if a file exists but cannot be removed.
    pub async fn clear(&self) -> Result<()> {
        self.write().await.clear().await
    }

    /// Whether both data files are present.
    pub async fn is_persisted(&self) -> bool {
        files::exists(&self.paths.embeddings).await && files::exists(&self.paths.metadata).await
    }

    /// Read the manifest. Missing or unreadable manifests are `None`.
    pub async fn manifest(&self) -> Option<Manifest> {
        let raw = match async_fs::read(&self.paths.manifest).await {
            Ok(raw) => raw,
            Err(error) => {
                if files::exists(&self.paths.manifest).await {
                    warn!("Manifest unreadable: {error}");
                }
                return None;
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(manifest) => Some(manifest),
            Err(error) => {
                warn!("Manifest unreadable, ignoring: {error}");
                None
            }
        }
    }
}

/// Exclusive handle on a [`VectorStore`]; the lock is released on drop.
#[derive(Debug)]
pub struct StoreWriter<'store> {
    store: &'store VectorStore,
    _guard: MutexGuard<'store, ()>,
}

impl StoreWriter<'_> {
    /// Load the persisted store, validated against `expected_dim`.
    pub async fn load(&self, expected_dim: usize) -> LoadOutcome {
        read_store(&self.store.paths, expected_dim).await
    }

    /// Persist `data` and rewrite the manifest.
    ///
    /// All three files are staged and synced before any is renamed. Renames
    /// run metadata, embeddings, then manifest; a failure while staging leaves
    /// the previous store untouched.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or any file cannot
    /// be written. Staged files are removed on failure.
    pub async fn save(&self, data: StoreData) -> Result<()> {
        let paths = &self.store.paths;
        async_fs::create_dir_all(&self.store.dir).await?;

        let dim = data.dim();
        let count = data.len();
        let (matrix, records) = data.into_parts();

        let metadata_bytes = files::encode_records(&records)?;
        let matrix_bytes = files::encode_matrix(matrix).await?;
        let manifest = Manifest::now(self.store.model.clone(), dim, count);
        let manifest_bytes = files::encode_manifest(&manifest)?;

        let pending = [
            (&paths.metadata, metadata_bytes.as_slice()),
            (&paths.embeddings, matrix_bytes.as_slice()),
            (&paths.manifest, manifest_bytes.as_slice()),
        ];
        let mut staged = Vec::with_capacity(pending.len());
        for (path, bytes) in pending {
            match files::stage(path, bytes).await {
                Ok(temp_path) => staged.push((temp_path, path)),
                Err(error) => {
                    discard_staged(&staged).await;
                    return Err(error);
                }
            }
        }

        for (position, (temp_path, path)) in staged.iter().enumerate() {
            if let Err(error) = files::commit(temp_path, path).await {
                discard_staged(staged.get(position + 1..).unwrap_or_default()).await;
                return Err(error);
            }
        }

        info!(
            "Vector store saved | count={count} dim={dim} dir={}",
            self.store.dir.display()
        );
        Ok(())
    }

    /// Delete every store file, including leftovers from interrupted writes.
    ///
    /// # Errors
    /// Returns an error if a file exists but cannot be removed.
    pub async fn clear(&self) -> Result<()> {
        for path in self.store.paths.all() {
            files::remove_if_exists(path).await?;
            files::remove_if_exists(&files::temp_path_for(path)).await?;
        }
        warn!("Vector store cleared | dir={}", self.store.dir.display());
        Ok(())
    }
}

async fn discard_staged(staged: &[(PathBuf, &PathBuf)]) {
    for (temp_path, _) in staged {
        files::discard_temp(temp_path).await;
    }
}

async fn read_store(paths: &StorePaths, expected_dim: usize) -> LoadOutcome {
    let has_embeddings = files::exists(&paths.embeddings).await;
    let has_metadata = files::exists(&paths.metadata).await;
    match (has_embeddings, has_metadata) {
        (false, false) => return LoadOutcome::Empty(StoreData::empty(expected_dim)),
        (true, true) => {}
        _ => return reset(expected_dim, ResetReason::Incomplete),
    }

    match read_validated(paths, expected_dim).await {
        Ok(data) => LoadOutcome::Loaded(data),
        Err(reason) => reset(expected_dim, reason),
    }
}

async fn read_validated(
    paths: &StorePaths,
    expected_dim: usize,
) -> CoreResult<StoreData, ResetReason> {
    let bytes = async_fs::read(&paths.embeddings)
        .await
        .map_err(|error| ResetReason::Corrupt(format!("Failed to read embeddings: {error}")))?;

    let matrix = match files::decode_matrix(bytes).await {
        Ok(Ok(matrix)) => matrix,
        Ok(Err(MatrixFileError::Version(found))) => {
            return Err(ResetReason::VersionMismatch {
                found,
                expected: MatrixFile::VERSION,
            });
        }
        Ok(Err(MatrixFileError::Corrupt(detail))) => return Err(ResetReason::Corrupt(detail)),
        Err(error) => return Err(ResetReason::Corrupt(error.to_string())),
    };

    if matrix.dim() != expected_dim {
        return Err(ResetReason::DimensionMismatch {
            found: matrix.dim(),
            expected: expected_dim,
        });
    }

    let raw = async_fs::read(&paths.metadata)
        .await
        .map_err(|error| ResetReason::Corrupt(format!("Failed to read metadata: {error}")))?;
    let records: Vec<ChunkRecord> = serde_json::from_slice(&raw)
        .map_err(|error| ResetReason::Corrupt(format!("Failed to parse metadata: {error}")))?;

    if records.len() != matrix.rows() {
        return Err(ResetReason::LengthMismatch {
            rows: matrix.rows(),
            records: records.len(),
        });
    }

    StoreData::new(matrix, records).map_err(|error| ResetReason::Corrupt(error.to_string()))
}

fn reset(expected_dim: usize, reason: ResetReason) -> LoadOutcome {
    warn!("{reason}. Rebuilding store.");
    LoadOutcome::Reset {
        data: StoreData::empty(expected_dim),
        reason,
    }
}
