//! Aligned matrix + record pairs and the outcome of loading them.

use std::fmt::{Display, Formatter, Result as FmtResult};

use lumen_core::{ChunkRecord, Error, Result};

use super::matrix::EmbeddingMatrix;

/// Embeddings and their chunk records, kept one row per record.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreData {
    /// Unit-normalized embeddings
    matrix: EmbeddingMatrix,
    /// Metadata, `records[i]` describes `matrix.row(i)`
    records: Vec<ChunkRecord>,
}

impl StoreData {
    /// An empty store of width `dim`.
    pub fn empty(dim: usize) -> Self {
        Self {
            matrix: EmbeddingMatrix::empty(dim),
            records: Vec::default(),
        }
    }

    /// Pair a matrix with its records.
    ///
    /// # Errors
    /// Returns `Misaligned` if row and record counts differ.
    pub fn new(matrix: EmbeddingMatrix, records: Vec<ChunkRecord>) -> Result<Self> {
        check_aligned(&matrix, &records)?;
        Ok(Self { matrix, records })
    }

    /// Append rows and their records. Nothing changes on error.
    ///
    /// # Errors
    /// Returns `Misaligned` if the new rows and records differ in count, or
    /// `DimensionMismatch` if the new rows have a different width.
    pub fn append(&mut self, matrix: EmbeddingMatrix, records: Vec<ChunkRecord>) -> Result<()> {
        check_aligned(&matrix, &records)?;
        self.matrix.append(matrix)?;
        self.records.extend(records);
        Ok(())
    }

    /// The embedding matrix.
    pub fn matrix(&self) -> &EmbeddingMatrix {
        &self.matrix
    }

    /// The chunk records.
    pub fn records(&self) -> &[ChunkRecord] {
        &self.records
    }

    /// Vector dimension.
    pub fn dim(&self) -> usize {
        self.matrix.dim()
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Split into matrix and records.
    pub fn into_parts(self) -> (EmbeddingMatrix, Vec<ChunkRecord>) {
        (self.matrix, self.records)
    }
}

fn check_aligned(matrix: &EmbeddingMatrix, records: &[ChunkRecord]) -> Result<()> {
    if matrix.rows() == records.len() {
        Ok(())
    } else {
        Err(Error::Misaligned {
            rows: matrix.rows(),
            records: records.len(),
        })
    }
}

/// Why a persisted store was discarded on load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetReason {
    /// The stored width differs from the live model's dimension
    DimensionMismatch {
        /// Dimension found on disk
        found: usize,
        /// Dimension of the live model
        expected: usize,
    },
    /// Row and record counts differ
    LengthMismatch {
        /// Matrix rows on disk
        rows: usize,
        /// Metadata records on disk
        records: usize,
    },
    /// The matrix file was written by an incompatible format version
    VersionMismatch {
        /// Version found on disk
        found: u32,
        /// Version this build writes
        expected: u32,
    },
    /// Only one of the embeddings and metadata files exists
    Incomplete,
    /// A file could not be read or parsed
    Corrupt(String),
}

impl Display for ResetReason {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::DimensionMismatch { found, expected } => {
                write!(formatter, "embedding dim mismatch (have={found}, expected={expected})")
            }
            Self::LengthMismatch { rows, records } => write!(
                formatter,
                "metadata length mismatch ({rows} rows, {records} records)"
            ),
            Self::VersionMismatch { found, expected } => write!(
                formatter,
                "store format version {found} is not {expected}"
            ),
            Self::Incomplete => formatter.write_str("store files incomplete"),
            Self::Corrupt(detail) => write!(formatter, "store unreadable: {detail}"),
        }
    }
}

/// Result of loading a persisted store.
///
/// Loading never fails: unusable stores come back empty with the reason attached.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The persisted store was valid
    Loaded(StoreData),
    /// No store has been persisted yet
    Empty(StoreData),
    /// The persisted store was discarded
    Reset {
        /// Empty store of the expected dimension
        data: StoreData,
        /// Why the persisted store was discarded
        reason: ResetReason,
    },
}

impl LoadOutcome {
    /// Borrow the usable store.
    pub fn data(&self) -> &StoreData {
        match self {
            Self::Loaded(data) | Self::Empty(data) | Self::Reset { data, .. } => data,
        }
    }

    /// Take the usable store.
    pub fn into_data(self) -> StoreData {
        match self {
            Self::Loaded(data) | Self::Empty(data) | Self::Reset { data, .. } => data,
        }
    }

    /// The reset reason, if the persisted store was discarded.
    pub fn reset_reason(&self) -> Option<&ResetReason> {
        match self {
            Self::Reset { reason, .. } => Some(reason),
            Self::Loaded(_) | Self::Empty(_) => None,
        }
    }
}
