//! Lazily initialized, normalizing wrapper around an [`EmbeddingProvider`].

use tokio::sync::OnceCell;
use tracing::info;

use lumen_core::{Error, Result};

use super::client::{Embedding, EmbeddingProvider};
use crate::store::{EmbeddingMatrix, normalize};

/// Text embedded once on first use to learn the model's dimension.
pub const PROBE_TEXT: &str = "probe";

/// Wraps an embedding provider so every vector handed out is unit length.
///
/// The provider is initialized on first use and its dimension is cached.
/// Construct one adapter at startup and share it by reference.
#[derive(Debug)]
pub struct EmbeddingAdapter<P> {
    provider: P,
    dimension: OnceCell<usize>,
}

impl<P: EmbeddingProvider> EmbeddingAdapter<P> {
    /// Wrap `provider`. No call is made until the first encode.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            dimension: OnceCell::new(),
        }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Identifier of the embedding model.
    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Output dimension of the model, probing it on first use.
    ///
    /// # Errors
    /// Returns `ProviderUnavailable` if the provider cannot be reached or loaded.
    pub async fn dimension(&self) -> Result<usize> {
        self.dimension
            .get_or_try_init(|| self.initialize())
            .await
            .copied()
    }

    async fn initialize(&self) -> Result<usize> {
        info!("Loading embedding model '{}'", self.model_name());
        self.provider.ensure_model_available().await?;

        let probe = self.provider.embed_batch(vec![PROBE_TEXT.to_owned()]).await?;
        let dim = probe
            .first()
            .map(Vec::len)
            .filter(|dim| *dim > 0)
            .ok_or_else(|| {
                Error::ProviderUnavailable(format!(
                    "Model '{}' returned no vector for the probe",
                    self.model_name()
                ))
            })?;

        info!("Model ready | dim={dim}");
        Ok(dim)
    }

    /// Embed `texts` into a matrix with one unit-length row per text.
    ///
    /// The width is whatever the provider returned, which callers compare
    /// against stored data to detect a swapped model.
    ///
    /// # Errors
    /// Returns `ProviderUnavailable` if the provider fails, or `InvalidResponse`
    /// if it returns the wrong number of vectors, vectors of differing width, or
    /// NaN or infinite components.
    pub async fn encode(&self, texts: &[String]) -> Result<EmbeddingMatrix> {
        let dim = self.dimension().await?;
        if texts.is_empty() {
            return Ok(EmbeddingMatrix::empty(dim));
        }

        let vectors = self.provider.embed_batch(texts.to_vec()).await?;
        if vectors.len() != texts.len() {
            return Err(Error::InvalidResponse(format!(
                "Requested {} embeddings, received {}",
                texts.len(),
                vectors.len()
            )));
        }

        let width = vectors.first().map_or(0, Vec::len);
        if width == 0 || vectors.iter().any(|vector| vector.len() != width) {
            return Err(Error::InvalidResponse(
                "Embedding vectors are empty or of differing width".to_owned(),
            ));
        }
        if vectors.iter().any(|vector| !is_finite(vector)) {
            return Err(non_finite());
        }

        let mut matrix = EmbeddingMatrix::from_rows(width, vectors)?;
        matrix.normalize_rows();
        Ok(matrix)
    }

    /// Embed a single text into a unit vector.
    ///
    /// # Errors
    /// Same as [`Self::encode`].
    pub async fn encode_one(&self, text: &str) -> Result<Embedding> {
        self.dimension().await?;
        let mut vectors = self.provider.embed_batch(vec![text.to_owned()]).await?;
        let mut vector = vectors
            .pop()
            .filter(|vector| !vector.is_empty() && vectors.is_empty())
            .ok_or_else(|| {
                Error::InvalidResponse("Expected exactly one embedding".to_owned())
            })?;
        if !is_finite(&vector) {
            return Err(non_finite());
        }
        normalize(&mut vector);
        Ok(vector)
    }
}

fn is_finite(vector: &[f32]) -> bool {
    vector.iter().all(|value| value.is_finite())
}

fn non_finite() -> Error {
    Error::InvalidResponse("Embedding contains NaN or infinite values".to_owned())
}
