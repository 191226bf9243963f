//! Concurrent writers and readers on one store.

use std::sync::Arc;

use lumen_core::Document;
use lumen_store::RetrieveOptions;
use tempfile::TempDir;

use crate::support::{ScriptedProvider, labelled, service_at};

/// Concurrent ingests are serialized; no batch is lost.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ingests_keep_every_batch() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let service = Arc::new(service_at(temp.path(), ScriptedProvider::new(16)));

    let handles: Vec<_> = (0..8)
        .map(|batch| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                let documents: Vec<Document> = (0..3)
                    .map(|item| labelled(&format!("batch-{batch}-item-{item}")))
                    .collect();
                service.ingest_documents(&documents, true).await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let data = service.store().snapshot(16).await.into_data();
    assert_eq!(data.len(), 24);
    assert_eq!(data.matrix().rows(), 24);
    assert_eq!(service.status().await.manifest.unwrap().count, 24);
}

/// Readers running alongside a writer always see an aligned store.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reads_during_ingest_see_whole_batches() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let service = Arc::new(service_at(temp.path(), ScriptedProvider::new(16)));
    service.ingest_documents(&[labelled("seed")], true).await.unwrap();

    let writer = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            for round in 0..5 {
                let documents = [
                    labelled(&format!("round-{round}-a")),
                    labelled(&format!("round-{round}-b")),
                ];
                service.ingest_documents(&documents, true).await.unwrap();
            }
        })
    };

    let reader = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            for _ in 0..20 {
                let data = service.store().snapshot(16).await.into_data();
                assert_eq!(data.matrix().rows(), data.records().len());
                assert_eq!(data.len() % 2, 1, "Saw a partial batch: {}", data.len());
                let options = RetrieveOptions::default().with_min_score(-1.0);
                service.retrieve("seed", options).await.unwrap();
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();
    assert_eq!(service.store().snapshot(16).await.data().len(), 11);
}
