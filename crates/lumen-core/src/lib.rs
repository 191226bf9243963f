//! Core types for the lumen retrieval store.
//!
//! This crate provides the error type, configuration and the data records
//! shared by the store engine and the command-line interface.
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Test allows"
    )
)]

/// Configuration with defaults, TOML loading and environment overrides.
pub mod config;
/// Error types and result definitions.
pub mod error;
/// Documents, chunk records, scored results and the manifest.
pub mod types;

pub use config::{Device, RagConfig};
pub use error::{Error, Result};
pub use types::{ChunkRecord, Document, Manifest, ScoredChunk};
