//! Embedding provider interface and the normalizing adapter in front of it.

mod adapter;
mod client;

pub use adapter::{EmbeddingAdapter, PROBE_TEXT};
#[cfg(test)]
pub use client::FakeEmbeddingClient;
pub use client::{Embedding, EmbeddingProvider, OllamaEmbeddingClient};
