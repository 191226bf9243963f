//! On-disk format and atomic file writes for the vector store.

use bincode::config::standard as bincode_config;
use bincode::{Decode, Encode, decode_from_slice, encode_to_vec};
use core::result::Result as CoreResult;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self as async_fs, OpenOptions};
use tokio::task::spawn_blocking;
use tracing::debug;

use lumen_core::{ChunkRecord, Error, Manifest, Result};

use super::matrix::EmbeddingMatrix;

/// Dense `f32` embedding matrix, bincode encoded.
pub const EMBEDDINGS_FILE: &str = "embeddings.bin";
/// Ordered JSON array of chunk records.
pub const METADATA_FILE: &str = "metadata.json";
/// JSON manifest describing the last save.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Encoded width of one `f32` value.
const F32_BYTES: u64 = 4;

/// Matrix file as written to disk.
#[derive(Debug, Encode, Decode)]
pub struct MatrixFile {
    /// Format version identifier
    pub version: u32,
    /// Number of rows
    pub rows: u64,
    /// Number of columns
    pub dim: u64,
    /// Row-major values
    pub data: Vec<f32>,
}

impl MatrixFile {
    /// Matrix file format version
    pub const VERSION: u32 = 1;
}

/// Failure to turn a matrix file back into a matrix.
#[derive(Debug)]
pub enum MatrixFileError {
    /// The file was written by another format version
    Version(u32),
    /// The bytes do not describe a consistent matrix
    Corrupt(String),
}

/// Paths of the store files inside a directory.
#[derive(Debug, Clone)]
pub struct StorePaths {
    /// Embedding matrix file
    pub embeddings: PathBuf,
    /// Metadata file
    pub metadata: PathBuf,
    /// Manifest file
    pub manifest: PathBuf,
}

impl StorePaths {
    /// Resolve the store files inside `dir`.
    pub fn new(dir: &Path) -> Self {
        Self {
            embeddings: dir.join(EMBEDDINGS_FILE),
            metadata: dir.join(METADATA_FILE),
            manifest: dir.join(MANIFEST_FILE),
        }
    }

    /// All store files, in the order they are written.
    pub fn all(&self) -> [&Path; 3] {
        [&self.embeddings, &self.metadata, &self.manifest]
    }
}

/// Encode a matrix in a blocking task.
///
/// # Errors
/// Returns an error if serialization fails.
pub async fn encode_matrix(matrix: EmbeddingMatrix) -> Result<Vec<u8>> {
    spawn_blocking(move || {
        let file = MatrixFile {
            version: MatrixFile::VERSION,
            rows: matrix.rows() as u64,
            dim: matrix.dim() as u64,
            data: matrix.into_flat(),
        };
        encode_to_vec(&file, bincode_config())
            .map_err(|error| Error::Encoding(format!("Failed to serialize embeddings: {error}")))
    })
    .await
    .map_err(|error| Error::Other(format!("Task join error: {error}")))?
}

/// Decode matrix bytes in a blocking task.
///
/// # Errors
/// Returns an error only if the blocking task cannot be joined; decoding
/// problems come back as the inner `MatrixFileError`.
pub async fn decode_matrix(
    bytes: Vec<u8>,
) -> Result<CoreResult<EmbeddingMatrix, MatrixFileError>> {
    spawn_blocking(move || decode_matrix_bytes(&bytes))
        .await
        .map_err(|error| Error::Other(format!("Task join error: {error}")))
}

fn decode_matrix_bytes(bytes: &[u8]) -> CoreResult<EmbeddingMatrix, MatrixFileError> {
    let dim = check_matrix_header(bytes)?;

    let (file, _): (MatrixFile, usize) =
        decode_from_slice(bytes, bincode_config()).map_err(|error| {
            MatrixFileError::Corrupt(format!("Failed to deserialize embeddings: {error}"))
        })?;

    if file.data.iter().any(|value| !value.is_finite()) {
        return Err(MatrixFileError::Corrupt(
            "embeddings contain non-finite values".to_owned(),
        ));
    }

    EmbeddingMatrix::from_flat(dim, file.data)
        .map_err(|error| MatrixFileError::Corrupt(error.to_string()))
}

/// Validate the header and the data length prefix before anything is
/// allocated for the values. Returns the row width.
fn check_matrix_header(bytes: &[u8]) -> CoreResult<usize, MatrixFileError> {
    let ((version, rows, dim), header_len): ((u32, u64, u64), usize) =
        decode_from_slice(bytes, bincode_config()).map_err(|error| {
            MatrixFileError::Corrupt(format!("Failed to read embeddings header: {error}"))
        })?;
    if version != MatrixFile::VERSION {
        return Err(MatrixFileError::Version(version));
    }

    let rest = bytes.get(header_len..).unwrap_or_default();
    let (values, prefix_len): (u64, usize) =
        decode_from_slice(rest, bincode_config()).map_err(|error| {
            MatrixFileError::Corrupt(format!("Failed to read embeddings length: {error}"))
        })?;

    if rows.checked_mul(dim) != Some(values) {
        return Err(MatrixFileError::Corrupt(format!(
            "header says {rows}x{dim} but {values} values are declared"
        )));
    }
    let width = usize::try_from(dim)
        .map_err(|_| MatrixFileError::Corrupt(format!("dimension {dim} too large")))?;

    let available = u64::try_from(rest.len().saturating_sub(prefix_len)).unwrap_or(u64::MAX);
    let needed = values.checked_mul(F32_BYTES);
    if needed.is_none_or(|bytes_needed| bytes_needed > available) {
        return Err(MatrixFileError::Corrupt(format!(
            "{values} values declared but only {available} bytes stored"
        )));
    }
    Ok(width)
}

/// Serialize records as pretty JSON.
///
/// # Errors
/// Returns an error if serialization fails.
pub fn encode_records(records: &[ChunkRecord]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(records)?)
}

/// Serialize a manifest as pretty JSON.
///
/// # Errors
/// Returns an error if serialization fails.
pub fn encode_manifest(manifest: &Manifest) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(manifest)?)
}

/// Write `data` to the temporary sibling of `path` and sync it to disk.
///
/// Returns the temporary path, to be moved into place with [`commit`].
///
/// # Errors
/// Returns an error if writing or syncing fails. The temporary file is
/// removed on failure.
pub async fn stage(path: &Path, data: &[u8]) -> Result<PathBuf> {
    let temp_path = temp_path_for(path);
    if let Err(error) = write_and_sync(&temp_path, data).await {
        discard_temp(&temp_path).await;
        return Err(error);
    }
    Ok(temp_path)
}

/// Rename a staged file over `path`. Readers see the old file or the new one.
///
/// # Errors
/// Returns an error if the rename fails; the staged file is removed.
pub async fn commit(temp_path: &Path, path: &Path) -> Result<()> {
    if let Err(error) = async_fs::rename(temp_path, path).await {
        discard_temp(temp_path).await;
        return Err(Error::Io(error));
    }
    Ok(())
}

async fn write_and_sync(temp_path: &Path, data: &[u8]) -> Result<()> {
    async_fs::write(temp_path, data).await?;
    let file = OpenOptions::new().write(true).open(temp_path).await?;
    file.sync_all().await?;
    Ok(())
}

/// Remove a staged file, logging instead of failing.
pub async fn discard_temp(temp_path: &Path) {
    if let Err(error) = remove_if_exists(temp_path).await {
        debug!("Could not remove {}: {error}", temp_path.display());
    }
}

/// Temporary sibling used while writing `path`.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Remove a file, treating an already missing file as success.
///
/// # Errors
/// Returns an error for any failure other than the file not existing.
pub async fn remove_if_exists(path: &Path) -> Result<()> {
    match async_fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
        Err(error) => Err(Error::Io(error)),
    }
}

/// Whether `path` exists. Unreadable metadata counts as missing.
pub async fn exists(path: &Path) -> bool {
    async_fs::try_exists(path).await.unwrap_or(false)
}
