//! Similarity search over the vector store with optional MMR re-ranking.

mod mmr;

pub use mmr::{DEFAULT_LAMBDA, mmr_select, top_k};

use tracing::{debug, info};

use lumen_core::{Error, RagConfig, Result, ScoredChunk};

use crate::embedding::{EmbeddingAdapter, EmbeddingProvider};
use crate::store::VectorStore;

/// Default number of results.
pub const DEFAULT_TOP_K: usize = 3;
/// Default similarity cutoff.
pub const DEFAULT_MIN_SCORE: f32 = 0.25;

/// Per-query retrieval settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrieveOptions {
    /// Maximum number of results
    pub top_k: usize,
    /// Results scoring below this are dropped
    pub min_score: f32,
    /// Re-rank candidates with Maximal Marginal Relevance
    pub use_mmr: bool,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_score: DEFAULT_MIN_SCORE,
            use_mmr: true,
        }
    }
}

impl RetrieveOptions {
    /// Defaults taken from the store configuration.
    pub const fn from_config(config: &RagConfig) -> Self {
        Self {
            top_k: config.top_k,
            min_score: config.min_score,
            use_mmr: true,
        }
    }

    /// Set the result limit.
    #[must_use]
    pub const fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the similarity cutoff.
    #[must_use]
    pub const fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Enable or disable MMR re-ranking.
    #[must_use]
    pub const fn with_mmr(mut self, use_mmr: bool) -> Self {
        self.use_mmr = use_mmr;
        self
    }
}

/// Scores stored chunks against a query.
///
/// The store lock is held only while the snapshot is read; embedding and
/// scoring run on the private copy.
#[derive(Debug)]
pub struct RetrievalEngine<'svc, P> {
    adapter: &'svc EmbeddingAdapter<P>,
    store: &'svc VectorStore,
    lambda: f32,
}

impl<'svc, P: EmbeddingProvider> RetrievalEngine<'svc, P> {
    /// Create an engine over a shared adapter and store.
    pub const fn new(
        adapter: &'svc EmbeddingAdapter<P>,
        store: &'svc VectorStore,
        lambda: f32,
    ) -> Self {
        Self {
            adapter,
            store,
            lambda,
        }
    }

    /// Return up to `options.top_k` chunks most similar to `query`.
    ///
    /// Results come in selection order: descending score without MMR,
    /// relevance and novelty balanced with it. Blank queries and stores with
    /// nothing persisted return no results without calling the provider.
    ///
    /// # Errors
    /// Returns an error if the query cannot be embedded, or if the provider
    /// returns a vector whose width differs from the store's.
    pub async fn retrieve(&self, query: &str, options: RetrieveOptions) -> Result<Vec<ScoredChunk>> {
        if query.trim().is_empty() || options.top_k == 0 {
            return Ok(Vec::new());
        }
        if !self.store.is_persisted().await {
            debug!("No persisted store at {}", self.store.dir().display());
            return Ok(Vec::new());
        }

        let dim = self.adapter.dimension().await?;
        let data = self.store.snapshot(dim).await.into_data();
        if data.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.adapter.encode_one(query).await?;
        if query_vector.len() != data.dim() {
            return Err(Error::DimensionMismatch {
                expected: data.dim(),
                found: query_vector.len(),
            });
        }

        let relevance = data.matrix().dot(&query_vector);
        let limit = options.top_k.min(data.len());
        let selected = if options.use_mmr && options.top_k > 1 && data.len() > options.top_k {
            mmr_select(data.matrix(), &relevance, limit, self.lambda)
        } else {
            top_k(&relevance, limit)
        };

        let records = data.records();
        let results: Vec<ScoredChunk> = selected
            .into_iter()
            .filter_map(|index| {
                let score = relevance.get(index)?.clamp(-1.0, 1.0);
                let record = records.get(index)?;
                (score >= options.min_score).then(|| ScoredChunk {
                    record: record.clone(),
                    score,
                })
            })
            .collect();

        info!(
            "Retrieved | results={} candidates={} mmr={}",
            results.len(),
            data.len(),
            options.use_mmr
        );
        Ok(results)
    }
}
