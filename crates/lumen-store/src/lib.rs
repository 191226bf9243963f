//! Persistent semantic-search store: chunking, embedding, storage and retrieval.
#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::print_stdout,
        clippy::print_stderr,
        reason = "Test allows"
    )
)]

pub mod chunking;
pub mod embedding;
pub mod ingest;
pub mod retrieval;
mod service;
pub mod store;

pub use chunking::chunk_text;
#[cfg(test)]
pub use embedding::FakeEmbeddingClient;
pub use embedding::{EmbeddingAdapter, EmbeddingProvider, OllamaEmbeddingClient};
pub use ingest::{IngestSummary, IngestionPipeline};
pub use retrieval::{RetrievalEngine, RetrieveOptions};
pub use service::{RagService, StoreStatus};
pub use store::{EmbeddingMatrix, LoadOutcome, ResetReason, StoreData, VectorStore};
