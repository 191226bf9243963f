//! Score thresholds and MMR re-ranking.

use lumen_store::RetrieveOptions;
use tempfile::TempDir;

use crate::support::{ScriptedProvider, labelled, service_at};

/// Only the chunk clearing the cutoff is returned.
#[tokio::test]
async fn test_min_score_keeps_strong_match_only() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let provider = ScriptedProvider::new(2)
        .pin("close", vec![0.95, 0.312_25])
        .pin("distant", vec![0.5, 0.866_03])
        .pin("question", vec![1.0, 0.0]);
    let service = service_at(temp.path(), provider);
    service
        .ingest_documents(&[labelled("close"), labelled("distant")], true)
        .await
        .unwrap();

    let results = service
        .retrieve("question", RetrieveOptions::default().with_min_score(0.9))
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].record.id, "close");
    assert!((results[0].score - 0.95).abs() < 1e-3);
}

/// MMR returns one representative of a duplicate cluster plus the outlier.
#[tokio::test]
async fn test_mmr_spreads_results() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let provider = ScriptedProvider::new(2)
        .pin("twin-a", vec![1.0, 0.0])
        .pin("twin-b", vec![0.99, 0.01])
        .pin("twin-c", vec![0.98, 0.02])
        .pin("outlier", vec![0.0, 1.0])
        .pin("question", vec![0.8, 0.6]);
    let service = service_at(temp.path(), provider);
    service
        .ingest_documents(
            &[
                labelled("twin-a"),
                labelled("twin-b"),
                labelled("twin-c"),
                labelled("outlier"),
            ],
            true,
        )
        .await
        .unwrap();

    let options = RetrieveOptions::default().with_top_k(2).with_min_score(0.0);

    let diverse = service.retrieve("question", options).await.unwrap();
    let ids: Vec<&str> = diverse.iter().map(|hit| hit.record.id.as_str()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids[0].starts_with("twin-"));
    assert_eq!(ids[1], "outlier");

    let plain = service
        .retrieve("question", options.with_mmr(false))
        .await
        .unwrap();
    assert_eq!(plain.len(), 2);
    assert!(plain.iter().all(|hit| hit.record.id.starts_with("twin-")));
    assert!(plain[0].score >= plain[1].score);
}

/// Equal scores keep insertion order when MMR is off.
#[tokio::test]
async fn test_ties_prefer_earlier_records() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let provider = ScriptedProvider::new(2)
        .pin("first", vec![0.6, 0.8])
        .pin("second", vec![0.6, 0.8])
        .pin("question", vec![0.6, 0.8]);
    let service = service_at(temp.path(), provider);
    service
        .ingest_documents(&[labelled("first"), labelled("second")], true)
        .await
        .unwrap();

    let options = RetrieveOptions::default().with_top_k(1).with_mmr(false);
    let results = service.retrieve("question", options).await.unwrap();
    assert_eq!(results[0].record.id, "first");
}
