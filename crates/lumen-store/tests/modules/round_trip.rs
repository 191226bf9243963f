//! Ingest → retrieve round trips through the public service.

use lumen_core::Document;
use lumen_store::RetrieveOptions;
use tempfile::TempDir;

use crate::support::{ScriptedProvider, service_at};

/// Querying with a document's exact text finds it with near-perfect similarity.
#[tokio::test]
async fn test_exact_content_is_top_hit() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let service = service_at(temp.path(), ScriptedProvider::new(32));
    let text = "Harm reduction meets patients where they are.";

    service
        .ingest_documents(
            &[
                Document::new("Harm Reduction", text).with_id("hr-101"),
                Document::new("Sleep", "Regular sleep supports recovery.").with_id("sl-7"),
            ],
            true,
        )
        .await
        .unwrap();

    let results = service
        .retrieve(text, RetrieveOptions::default().with_top_k(1))
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].record.id, "hr-101");
    assert_eq!(results[0].record.title, "Harm Reduction");
    assert!(results[0].score > 0.99, "score was {}", results[0].score);
}

/// A long document is stored as numbered chunks that are each retrievable.
#[tokio::test]
async fn test_long_document_chunks_are_retrievable() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let service = service_at(temp.path(), ScriptedProvider::new(32));
    let body: String = (0..60)
        .map(|index| format!("Step {index} of the safety plan is written down. "))
        .collect();

    let summary = service
        .ingest_documents(&[Document::new("Safety Plan", body).with_id("plan")], true)
        .await
        .unwrap();
    assert!(summary.chunks > 1);
    assert_eq!(summary.total, summary.chunks);

    let data = service.store().snapshot(32).await.into_data();
    for (index, record) in data.records().iter().enumerate() {
        assert_eq!(record.id, format!("plan#{index}"));
        assert_eq!(record.chunk_index, index);
        assert!(record.content.chars().count() <= service.config().chunk_size);
    }

    let second = data.records()[1].content.clone();
    let results = service
        .retrieve(&second, RetrieveOptions::default().with_top_k(1))
        .await
        .unwrap();
    assert_eq!(results[0].record.id, "plan#1");
}

/// Ingesting without chunking keeps the whole document as one record.
#[tokio::test]
async fn test_unchunked_ingest_keeps_document_whole() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let service = service_at(temp.path(), ScriptedProvider::new(8));
    let body = "A sentence that repeats. ".repeat(100);

    let summary = service
        .ingest_documents(&[Document::new("Whole", body.clone()).with_id("whole")], false)
        .await
        .unwrap();
    assert_eq!(summary.chunks, 1);

    let data = service.store().snapshot(8).await.into_data();
    assert_eq!(data.records()[0].id, "whole");
    assert_eq!(data.records()[0].content, body.trim());
}
