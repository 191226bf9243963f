use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A caller-supplied document, decomposed into chunks on ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Caller-assigned identifier; generated when absent
    #[serde(default)]
    pub id: Option<String>,
    /// Human readable title
    #[serde(default)]
    pub title: String,
    /// Raw text
    #[serde(default)]
    pub content: String,
    /// Where the document came from
    #[serde(default)]
    pub source: Option<String>,
    /// Free-form labels
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl Document {
    /// Create a document without an id, source or tags.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            content: content.into(),
            source: None,
            tags: None,
        }
    }

    /// Set the document id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the document source.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the document tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }
}

/// Persisted metadata for one stored embedding row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Document id, suffixed with `#<index>` when the document split into several chunks
    pub id: String,
    /// Id of the originating document
    pub doc_id: String,
    /// Title of the originating document
    pub title: String,
    /// Chunk text, used for display and citation
    pub content: String,
    /// Position of the chunk within its document
    pub chunk_index: usize,
    /// Source of the originating document
    pub source: Option<String>,
    /// Tags of the originating document
    pub tags: Option<Vec<String>>,
}

/// A chunk record returned from retrieval together with its similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// The stored record
    #[serde(flatten)]
    pub record: ChunkRecord,
    /// Cosine similarity to the query, in `[-1, 1]`
    pub score: f32,
}

/// Diagnostic record describing how the persisted store was built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Embedding model identifier
    pub model: String,
    /// Vector dimension
    pub dim: usize,
    /// Number of stored rows
    pub count: usize,
    /// Time of the last successful save
    pub updated_at: DateTime<Utc>,
}

impl Manifest {
    /// Create a manifest stamped with the current time.
    pub fn now(model: impl Into<String>, dim: usize, count: usize) -> Self {
        Self {
            model: model.into(),
            dim,
            count,
            updated_at: Utc::now(),
        }
    }
}
