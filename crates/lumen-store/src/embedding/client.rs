//! Embedding providers: the trait the adapter consumes and the Ollama client.

use lumen_core::{Device, Error, RagConfig, Result};
use ollama_rs::Ollama;
use ollama_rs::generation::embeddings::request::GenerateEmbeddingsRequest;
use ollama_rs::models::ModelOptions;
#[cfg(test)]
use std::collections::HashMap;
use std::future::Future;
#[cfg(test)]
use std::sync::Arc;
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::process::Command;

/// A single embedding vector
pub type Embedding = Vec<f32>;

/// Maps text to fixed-dimension vectors, deterministically for a given model.
pub trait EmbeddingProvider: Send + Sync {
    /// Identifier of the model producing the vectors
    fn model_name(&self) -> &str;

    /// Ensure the embedding model is available
    ///
    /// # Errors
    /// Returns `ProviderUnavailable` if the model cannot be reached or loaded
    fn ensure_model_available(&self) -> impl Future<Output = Result<()>> + Send;

    /// Embed multiple texts in one call, returning one vector per text in order
    ///
    /// # Errors
    /// Returns `ProviderUnavailable` if the provider cannot serve the request
    fn embed_batch(
        &self,
        texts: Vec<String>,
    ) -> impl Future<Output = Result<Vec<Embedding>>> + Send;
}

/// Ollama embedding client
#[derive(Debug, Clone)]
pub struct OllamaEmbeddingClient {
    ollama: Ollama,
    model: String,
    device: Device,
}

impl OllamaEmbeddingClient {
    /// Create a client for `model` served at `host:port`.
    pub fn new(host: &str, port: u16, model: impl Into<String>, device: Device) -> Self {
        Self {
            ollama: Ollama::builder().host(host).port(port).build(),
            model: model.into(),
            device,
        }
    }

    /// Create a client from the store configuration.
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(
            &config.ollama_host,
            config.ollama_port,
            config.model.clone(),
            config.device,
        )
    }

    fn request(&self, texts: Vec<String>) -> GenerateEmbeddingsRequest {
        let request = GenerateEmbeddingsRequest::new(self.model.clone(), texts.into());
        match self.device {
            // Zero offloaded layers keeps inference on the CPU.
            Device::Cpu => request.options(ModelOptions::default().num_gpu(0)),
            Device::Gpu => request,
        }
    }
}

impl Default for OllamaEmbeddingClient {
    fn default() -> Self {
        Self::from_config(&RagConfig::default())
    }
}

impl EmbeddingProvider for OllamaEmbeddingClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn ensure_model_available(&self) -> Result<()> {
        // Check if Ollama is running by trying to list models
        let models = match self.ollama.list_local_models().await {
            Ok(models) => models,
            Err(error) => {
                return Err(Error::ProviderUnavailable(format!(
                    "Failed to connect to Ollama: {error}.\n\nPlease ensure Ollama is installed and running:\n  - Install from: https://ollama.ai\n  - Start with: ollama serve"
                )));
            }
        };

        let model_available = models.iter().any(|model| model.name.contains(&self.model));
        if model_available {
            return Ok(());
        }

        tracing::info!("Embedding model '{}' not found", self.model);
        tracing::info!("Pulling model from Ollama (this may take a few minutes)...");
        tracing::info!("    Running: ollama pull {}", self.model);

        let status = Command::new("ollama")
            .args(["pull", &self.model])
            .status()
            .await
            .map_err(|error| {
                Error::ProviderUnavailable(format!(
                    "Failed to run 'ollama pull {}': {error}. Is Ollama installed?",
                    self.model
                ))
            })?;

        if !status.success() {
            return Err(Error::ProviderUnavailable(format!(
                "Failed to pull model '{}'. Check Ollama is running.",
                self.model
            )));
        }

        tracing::info!("Pulled embedding model '{}'", self.model);
        Ok(())
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::default());
        }

        let response = self
            .ollama
            .generate_embeddings(self.request(texts))
            .await
            .map_err(|error| {
                let error_str = format!("{error:?}");
                if error_str.contains("model") && error_str.contains("not found") {
                    Error::ProviderUnavailable(format!(
                        "Embedding model '{}' not found. Run: ollama pull {}",
                        self.model, self.model
                    ))
                } else {
                    Error::ProviderUnavailable(format!("Embedding generation failed: {error}"))
                }
            })?;

        Ok(response.embeddings)
    }
}

/// Test-only fake embedding provider (deterministic, hash-based)
///
/// Texts registered with [`FakeEmbeddingClient::with_vector`] get that exact
/// vector; anything else gets a pseudo-random vector seeded by its hash.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct FakeEmbeddingClient {
    dim: usize,
    fixed: HashMap<String, Embedding>,
    unavailable: bool,
    batch_calls: Arc<AtomicUsize>,
}

#[cfg(test)]
impl FakeEmbeddingClient {
    /// Create a fake producing `dim`-wide vectors
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            fixed: HashMap::default(),
            unavailable: false,
            batch_calls: Arc::default(),
        }
    }

    /// Return `vector` whenever `text` is embedded
    #[must_use]
    pub fn with_vector(mut self, text: &str, vector: Embedding) -> Self {
        self.fixed.insert(text.to_owned(), vector);
        self
    }

    /// Fail every call as if the provider were down
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Number of `embed_batch` calls made so far
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    /// Generate fake deterministic embedding for testing
    fn fake_embedding(&self, text: &str) -> Embedding {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash as _, Hasher as _};

        if let Some(vector) = self.fixed.get(text) {
            return vector.clone();
        }

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut state = hasher.finish();

        (0..self.dim)
            .map(|_| {
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                ((state >> 33) % 2000) as f32 / 1000.0 - 1.0
            })
            .collect()
    }
}

#[cfg(test)]
impl EmbeddingProvider for FakeEmbeddingClient {
    fn model_name(&self) -> &str {
        "fake-embedding"
    }

    async fn ensure_model_available(&self) -> Result<()> {
        if self.unavailable {
            return Err(Error::ProviderUnavailable("fake provider is down".to_owned()));
        }
        Ok(())
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Embedding>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(Error::ProviderUnavailable("fake provider is down".to_owned()));
        }
        Ok(texts.iter().map(|text| self.fake_embedding(text)).collect())
    }
}
