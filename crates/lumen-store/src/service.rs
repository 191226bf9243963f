//! The store's public operations, wired from configuration.

use serde::Serialize;
use std::path::PathBuf;

use lumen_core::{Document, Manifest, RagConfig, Result, ScoredChunk};

use crate::embedding::{EmbeddingAdapter, EmbeddingProvider, OllamaEmbeddingClient};
use crate::ingest::{IngestSummary, IngestionPipeline};
use crate::retrieval::{RetrievalEngine, RetrieveOptions};
use crate::store::VectorStore;

/// Diagnostic view of a store directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStatus {
    /// Store directory
    pub dir: PathBuf,
    /// Whether the data files are present
    pub persisted: bool,
    /// Manifest written by the last save, if readable
    pub manifest: Option<Manifest>,
}

/// One adapter and one store, shared by every ingest and retrieve call.
#[derive(Debug)]
pub struct RagService<P> {
    adapter: EmbeddingAdapter<P>,
    store: VectorStore,
    config: RagConfig,
}

impl RagService<OllamaEmbeddingClient> {
    /// Build a service backed by the Ollama server named in `config`.
    pub fn from_config(config: RagConfig) -> Self {
        let provider = OllamaEmbeddingClient::from_config(&config);
        Self::with_provider(config, provider)
    }
}

impl<P: EmbeddingProvider> RagService<P> {
    /// Build a service around an explicit provider.
    pub fn with_provider(config: RagConfig, provider: P) -> Self {
        let store = VectorStore::new(config.store_dir.clone(), provider.model_name());
        Self {
            adapter: EmbeddingAdapter::new(provider),
            store,
            config,
        }
    }

    /// Active configuration.
    pub const fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Shared embedding adapter.
    pub const fn adapter(&self) -> &EmbeddingAdapter<P> {
        &self.adapter
    }

    /// Underlying vector store.
    pub const fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Chunk, embed and append `documents`.
    ///
    /// # Errors
    /// Returns an error if embedding fails or the store cannot be written.
    pub async fn ingest_documents(
        &self,
        documents: &[Document],
        chunk: bool,
    ) -> Result<IngestSummary> {
        IngestionPipeline::new(
            &self.adapter,
            &self.store,
            self.config.chunk_size,
            self.config.chunk_overlap,
        )
        .ingest(documents, chunk)
        .await
    }

    /// Chunks most similar to `query`.
    ///
    /// # Errors
    /// Returns an error if the query cannot be embedded.
    pub async fn retrieve(&self, query: &str, options: RetrieveOptions) -> Result<Vec<ScoredChunk>> {
        RetrievalEngine::new(&self.adapter, &self.store, self.config.mmr_lambda)
            .retrieve(query, options)
            .await
    }

    /// Retrieve with the configured defaults.
    ///
    /// # Errors
    /// Same as [`Self::retrieve`].
    pub async fn retrieve_default(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        self.retrieve(query, RetrieveOptions::from_config(&self.config))
            .await
    }

    /// Delete all persisted data. Safe to repeat.
    ///
    /// # Errors
    /// Returns an error if a store file exists but cannot be removed.
    pub async fn clear_store(&self) -> Result<()> {
        self.store.clear().await
    }

    /// Report where the store lives and what the last save recorded.
    pub async fn status(&self) -> StoreStatus {
        StoreStatus {
            dir: self.store.dir().to_path_buf(),
            persisted: self.store.is_persisted().await,
            manifest: self.store.manifest().await,
        }
    }
}
