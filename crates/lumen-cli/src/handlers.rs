//! Command handlers for CLI operations

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tracing::info;

use lumen_core::{Document, RagConfig, ScoredChunk};
use lumen_store::{IngestSummary, RagService, RetrieveOptions, StoreStatus};

/// Longest content excerpt shown per result in text output.
const EXCERPT_CHARS: usize = 240;

/// Resolve configuration from the optional file and store override.
///
/// # Errors
/// Returns an error if the config file or environment holds invalid values.
pub fn load_config(path: Option<&Path>, store: Option<PathBuf>) -> Result<RagConfig> {
    let config = RagConfig::load(path).context("Failed to load configuration")?;
    Ok(with_store_override(config, store))
}

/// `--store` beats both the config file and `RAG_STORE_DIR`.
fn with_store_override(mut config: RagConfig, store: Option<PathBuf>) -> RagConfig {
    if let Some(store) = store {
        config.store_dir = store;
    }
    config
}

/// Ingest the documents listed in a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed, or ingestion fails.
pub async fn handle_ingest(config: RagConfig, file: &Path, chunk: bool) -> Result<()> {
    let raw = async_fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let documents: Vec<Document> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of documents", file.display()))?;
    info!("Loaded {} documents from {}", documents.len(), file.display());

    let service = RagService::from_config(config);
    let summary = service.ingest_documents(&documents, chunk).await?;
    emit(&format_summary(&summary));
    Ok(())
}

/// Run a query and print the matches.
///
/// # Errors
/// Returns an error if the query cannot be embedded.
pub async fn handle_query(
    config: RagConfig,
    text: &str,
    top_k: Option<usize>,
    min_score: Option<f32>,
    use_mmr: bool,
    json: bool,
) -> Result<()> {
    let mut options = RetrieveOptions::from_config(&config).with_mmr(use_mmr);
    if let Some(top_k) = top_k {
        options = options.with_top_k(top_k);
    }
    if let Some(min_score) = min_score {
        options = options.with_min_score(min_score);
    }

    let service = RagService::from_config(config);
    let results = service.retrieve(text, options).await?;
    if json {
        emit(&serde_json::to_string_pretty(&results)?);
    } else {
        emit(&format_results(&results));
    }
    Ok(())
}

/// Delete the store.
///
/// # Errors
/// Returns an error if a store file cannot be removed.
pub async fn handle_clear(config: RagConfig) -> Result<()> {
    let service = RagService::from_config(config);
    service.clear_store().await?;
    emit(&format!("Cleared store at {}", service.store().dir().display()));
    Ok(())
}

/// Print the store location and manifest.
///
/// # Errors
/// Returns an error if JSON output cannot be produced.
pub async fn handle_status(config: RagConfig, json: bool) -> Result<()> {
    let status = RagService::from_config(config).status().await;
    if json {
        emit(&serde_json::to_string_pretty(&status)?);
    } else {
        emit(&format_status(&status));
    }
    Ok(())
}

fn format_summary(summary: &IngestSummary) -> String {
    if summary.chunks == 0 {
        return "Nothing to ingest".to_owned();
    }
    let mut out = format!(
        "Ingested {} documents as {} chunks ({} stored)",
        summary.documents, summary.chunks, summary.total
    );
    if summary.rebuilt {
        out.push_str("; previous store was discarded");
    }
    out
}

fn format_results(results: &[ScoredChunk]) -> String {
    if results.is_empty() {
        return "No matches".to_owned();
    }
    results
        .iter()
        .enumerate()
        .map(|(rank, hit)| {
            format!(
                "{}. [{:.3}] {} ({})\n   {}",
                rank + 1,
                hit.score,
                hit.record.title,
                hit.record.id,
                excerpt(&hit.record.content)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_status(status: &StoreStatus) -> String {
    let details = match (&status.manifest, status.persisted) {
        (Some(manifest), _) => format!(
            "Model: {}\nDimension: {}\nChunks: {}\nUpdated: {}",
            manifest.model,
            manifest.dim,
            manifest.count,
            manifest.updated_at.to_rfc3339()
        ),
        (None, true) => "Manifest: missing".to_owned(),
        (None, false) => "Empty".to_owned(),
    };
    format!("Store: {}\n{details}", status.dir.display())
}

fn excerpt(content: &str) -> String {
    let single_line = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= EXCERPT_CHARS {
        return single_line;
    }
    let mut short: String = single_line.chars().take(EXCERPT_CHARS).collect();
    short.push_str("...");
    short
}

#[allow(clippy::print_stdout, reason = "Command output")]
fn emit(text: &str) {
    println!("{text}");
}
