//! Dense row-major `f32` matrix of embeddings.

use lumen_core::{Error, Result};

/// Added to every norm so zero vectors do not divide by zero.
const NORM_EPSILON: f32 = 1e-12;

/// An N×d matrix of embeddings stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix {
    /// Number of columns
    dim: usize,
    /// Row-major values, `rows * dim` long
    data: Vec<f32>,
}

impl EmbeddingMatrix {
    /// Create a matrix with no rows.
    pub fn empty(dim: usize) -> Self {
        Self {
            dim,
            data: Vec::default(),
        }
    }

    /// Build a matrix from row-major values.
    ///
    /// # Errors
    /// Returns an error if `data` is not a whole number of rows.
    pub fn from_flat(dim: usize, data: Vec<f32>) -> Result<Self> {
        let ragged = if dim == 0 {
            !data.is_empty()
        } else {
            data.len() % dim != 0
        };
        if ragged {
            return Err(Error::InvalidResponse(format!(
                "{} values do not form rows of width {dim}",
                data.len()
            )));
        }
        Ok(Self { dim, data })
    }

    /// Build a matrix from individual rows.
    ///
    /// # Errors
    /// Returns `DimensionMismatch` if any row is not `dim` wide.
    pub fn from_rows(dim: usize, rows: Vec<Vec<f32>>) -> Result<Self> {
        let mut data = Vec::with_capacity(rows.len() * dim);
        for row in rows {
            if row.len() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    found: row.len(),
                });
            }
            data.extend(row);
        }
        Ok(Self { dim, data })
    }

    /// Number of columns.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    /// Whether the matrix has no rows.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow one row.
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        if index >= self.rows() {
            return None;
        }
        let start = index * self.dim;
        self.data.get(start..start + self.dim)
    }

    /// Iterate over rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        // A zero-width matrix holds no data, so the clamp never yields a row.
        self.data.chunks_exact(self.dim.max(1))
    }

    /// Row-major values.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Consume the matrix, returning its row-major values.
    pub fn into_flat(self) -> Vec<f32> {
        self.data
    }

    /// Append every row of `other`.
    ///
    /// # Errors
    /// Returns `DimensionMismatch` if the widths differ.
    pub fn append(&mut self, other: Self) -> Result<()> {
        if other.dim != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                found: other.dim,
            });
        }
        self.data.extend(other.data);
        Ok(())
    }

    /// Scale every row to unit L2 norm.
    pub fn normalize_rows(&mut self) {
        if self.dim == 0 {
            return;
        }
        for row in self.data.chunks_exact_mut(self.dim) {
            normalize(row);
        }
    }

    /// Dot product of every row with `query`.
    ///
    /// With unit rows and a unit query this is cosine similarity.
    pub fn dot(&self, query: &[f32]) -> Vec<f32> {
        self.iter_rows().map(|row| dot(row, query)).collect()
    }
}

/// Scale `vector` to unit L2 norm in place.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt() + NORM_EPSILON;
    for value in vector.iter_mut() {
        *value /= norm;
    }
}

/// Dot product of two equally long vectors.
pub fn dot(left: &[f32], right: &[f32]) -> f32 {
    left.iter().zip(right).map(|(lhs, rhs)| lhs * rhs).sum()
}
