//! Ingestion: chunk documents, embed the chunks and append them to the store.

use serde::Serialize;
use tracing::{info, warn};

use lumen_core::{ChunkRecord, Document, Result};

use crate::chunking::chunk_text;
use crate::embedding::{EmbeddingAdapter, EmbeddingProvider};
use crate::store::{StoreData, VectorStore};

/// Title given to documents that arrive without one.
const UNTITLED: &str = "Untitled";

/// What an ingest call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Documents that contributed at least one chunk
    pub documents: usize,
    /// Chunks appended by this call
    pub chunks: usize,
    /// Chunks stored after this call
    pub total: usize,
    /// Whether prior content was discarded before appending
    pub rebuilt: bool,
}

/// Chunk → embed → append, holding the store's write lock throughout.
#[derive(Debug)]
pub struct IngestionPipeline<'svc, P> {
    adapter: &'svc EmbeddingAdapter<P>,
    store: &'svc VectorStore,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl<'svc, P: EmbeddingProvider> IngestionPipeline<'svc, P> {
    /// Create a pipeline over a shared adapter and store.
    pub const fn new(
        adapter: &'svc EmbeddingAdapter<P>,
        store: &'svc VectorStore,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Self {
        Self {
            adapter,
            store,
            chunk_size,
            chunk_overlap,
        }
    }

    /// Append `documents` to the store.
    ///
    /// With `chunk` false every document is stored as a single chunk.
    /// Documents with blank content are skipped; a batch with nothing to
    /// embed is a logged no-op and writes nothing.
    ///
    /// # Errors
    /// Returns an error if embedding fails or the store cannot be written.
    pub async fn ingest(&self, documents: &[Document], chunk: bool) -> Result<IngestSummary> {
        if documents.is_empty() {
            warn!("No documents provided to ingest.");
            return Ok(IngestSummary::default());
        }

        let dim = self.adapter.dimension().await?;
        let writer = self.store.write().await;
        let outcome = writer.load(dim).await;
        let mut rebuilt = outcome.reset_reason().is_some();
        let mut data = outcome.into_data();

        let batch = build_chunks(
            documents,
            data.len(),
            chunk.then_some((self.chunk_size, self.chunk_overlap)),
        );
        if batch.texts.is_empty() {
            warn!("No text content to embed after preprocessing.");
            return Ok(IngestSummary::default());
        }

        let vectors = self.adapter.encode(&batch.texts).await?;
        if vectors.dim() != data.dim() {
            warn!(
                "Embedding dim changed mid-run (store={}, model={}). Rebuilding store from this batch only; {} existing chunks discarded.",
                data.dim(),
                vectors.dim(),
                data.len()
            );
            data = StoreData::empty(vectors.dim());
            rebuilt = true;
        }

        let chunks = batch.records.len();
        data.append(vectors, batch.records)?;
        let total = data.len();
        writer.save(data).await?;

        info!(
            "Ingested documents | documents={} chunks={chunks} total={total}",
            batch.documents
        );
        Ok(IngestSummary {
            documents: batch.documents,
            chunks,
            total,
            rebuilt,
        })
    }
}

/// Chunk texts and their records, built before embedding.
#[derive(Debug, Default)]
struct ChunkBatch {
    texts: Vec<String>,
    records: Vec<ChunkRecord>,
    documents: usize,
}

/// Split documents into chunk texts and aligned records.
///
/// `existing` is the number of records already stored and seeds generated
/// ids. `chunking` carries `(chunk_size, overlap)`, or `None` to keep each
/// document whole.
fn build_chunks(
    documents: &[Document],
    existing: usize,
    chunking: Option<(usize, usize)>,
) -> ChunkBatch {
    let mut batch = ChunkBatch::default();

    for document in documents {
        let doc_id = match document.id.as_deref() {
            Some(id) if !id.is_empty() => id.to_owned(),
            _ => format!("doc-{}", existing + batch.records.len()),
        };
        let title = if document.title.is_empty() {
            UNTITLED.to_owned()
        } else {
            document.title.clone()
        };
        let content = document.content.trim();
        if content.is_empty() {
            continue;
        }

        let pieces = match chunking {
            Some((size, overlap)) => chunk_text(content, size, overlap),
            None => vec![content.to_owned()],
        };
        let split = pieces.len() > 1;
        for (chunk_index, piece) in pieces.into_iter().enumerate() {
            let id = if split {
                format!("{doc_id}#{chunk_index}")
            } else {
                doc_id.clone()
            };
            batch.records.push(ChunkRecord {
                id,
                doc_id: doc_id.clone(),
                title: title.clone(),
                content: piece.clone(),
                chunk_index,
                source: document.source.clone(),
                tags: document.tags.clone(),
            });
            batch.texts.push(piece);
        }
        batch.documents += 1;
    }

    batch
}
