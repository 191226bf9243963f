//! Deterministic provider and service builders shared by the integration tests.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash as _, Hasher as _};
use std::path::Path;

use lumen_core::{Document, RagConfig, Result};
use lumen_store::{EmbeddingProvider, RagService};

/// Provider that returns pinned vectors for known texts and hash-seeded
/// vectors for everything else.
#[derive(Debug, Clone)]
pub struct ScriptedProvider {
    dim: usize,
    pinned: HashMap<String, Vec<f32>>,
}

impl ScriptedProvider {
    /// A provider producing `dim`-wide vectors.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            pinned: HashMap::new(),
        }
    }

    /// Embed `text` as `vector`.
    #[must_use]
    pub fn pin(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.pinned.insert(text.to_owned(), vector);
        self
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(vector) = self.pinned.get(text) {
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

impl EmbeddingProvider for ScriptedProvider {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn ensure_model_available(&self) -> Result<()> {
        Ok(())
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.vector_for(text)).collect())
    }
}

/// A service storing under `dir` with default settings.
pub fn service_at(dir: &Path, provider: ScriptedProvider) -> RagService<ScriptedProvider> {
    let config = RagConfig {
        store_dir: dir.to_path_buf(),
        ..RagConfig::default()
    };
    RagService::with_provider(config, provider)
}

/// A document whose id and title both equal `text`.
pub fn labelled(text: &str) -> Document {
    Document::new(text, text).with_id(text)
}
