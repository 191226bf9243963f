//! Alignment, manifest bookkeeping and recovery from unusable stores.

use std::fs;

use lumen_store::store::{EMBEDDINGS_FILE, MANIFEST_FILE, METADATA_FILE};
use lumen_store::{LoadOutcome, ResetReason, RetrieveOptions};
use tempfile::TempDir;

use crate::support::{ScriptedProvider, labelled, service_at};

/// Rows, records and manifest count agree after every ingest and clear.
#[tokio::test]
async fn test_counts_stay_aligned() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let service = service_at(temp.path(), ScriptedProvider::new(16));

    for (round, name) in ["alpha", "beta", "gamma"].into_iter().enumerate() {
        let summary = service.ingest_documents(&[labelled(name)], true).await.unwrap();
        let data = service.store().snapshot(16).await.into_data();
        let manifest = service.status().await.manifest.unwrap();

        assert_eq!(summary.total, round + 1);
        assert_eq!(data.matrix().rows(), data.records().len());
        assert_eq!(manifest.count, data.len());
        assert_eq!(manifest.dim, 16);
        assert_eq!(manifest.model, "scripted");
    }

    service.clear_store().await.unwrap();
    let status = service.status().await;
    assert!(!status.persisted);
    assert!(status.manifest.is_none());
}

/// Clearing twice is safe, and retrieval afterwards finds nothing.
#[tokio::test]
async fn test_clear_is_idempotent() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let service = service_at(temp.path(), ScriptedProvider::new(16));
    service.ingest_documents(&[labelled("alpha")], true).await.unwrap();

    service.clear_store().await.unwrap();
    service.clear_store().await.unwrap();

    for name in [EMBEDDINGS_FILE, METADATA_FILE, MANIFEST_FILE] {
        assert!(!temp.path().join(name).exists(), "{name} should be gone");
    }
    let results = service
        .retrieve("alpha", RetrieveOptions::default())
        .await
        .unwrap();
    assert!(results.is_empty());
}

/// A store written at 384 dimensions is discarded by a 768-dimension model.
#[tokio::test]
async fn test_dimension_drift_resets_store() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let old = service_at(temp.path(), ScriptedProvider::new(384));
    old.ingest_documents(&[labelled("alpha"), labelled("beta")], true)
        .await
        .unwrap();

    let new = service_at(temp.path(), ScriptedProvider::new(768));
    let outcome = new.store().snapshot(768).await;
    assert_eq!(
        outcome.reset_reason(),
        Some(&ResetReason::DimensionMismatch {
            found: 384,
            expected: 768
        })
    );
    assert_eq!(outcome.data().dim(), 768);
    assert!(outcome.data().is_empty());

    let results = new.retrieve("alpha", RetrieveOptions::default()).await.unwrap();
    assert!(results.is_empty());

    let summary = new.ingest_documents(&[labelled("gamma")], true).await.unwrap();
    assert!(summary.rebuilt);
    assert_eq!(summary.total, 1);
    assert_eq!(new.status().await.manifest.unwrap().dim, 768);
}

/// Garbage in the matrix file is recovered from instead of raised.
#[tokio::test]
async fn test_corrupt_matrix_is_recovered() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let service = service_at(temp.path(), ScriptedProvider::new(8));
    service.ingest_documents(&[labelled("alpha")], true).await.unwrap();

    fs::write(temp.path().join(EMBEDDINGS_FILE), b"not a matrix").unwrap();

    let outcome = service.store().snapshot(8).await;
    assert!(matches!(
        outcome,
        LoadOutcome::Reset {
            reason: ResetReason::Corrupt(_),
            ..
        }
    ));
    assert!(
        service
            .retrieve("alpha", RetrieveOptions::default())
            .await
            .unwrap()
            .is_empty()
    );

    let summary = service.ingest_documents(&[labelled("beta")], true).await.unwrap();
    assert!(summary.rebuilt);
    assert_eq!(summary.total, 1);
}

/// Metadata that no longer matches the matrix length is discarded.
#[tokio::test]
async fn test_truncated_metadata_is_recovered() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let service = service_at(temp.path(), ScriptedProvider::new(8));
    service
        .ingest_documents(&[labelled("alpha"), labelled("beta")], true)
        .await
        .unwrap();

    fs::write(temp.path().join(METADATA_FILE), b"[]").unwrap();

    let outcome = service.store().snapshot(8).await;
    assert_eq!(
        outcome.reset_reason(),
        Some(&ResetReason::LengthMismatch { rows: 2, records: 0 })
    );
}

/// A deleted manifest does not affect loading.
#[tokio::test]
async fn test_manifest_is_not_authoritative() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let service = service_at(temp.path(), ScriptedProvider::new(8));
    service.ingest_documents(&[labelled("alpha")], true).await.unwrap();

    fs::remove_file(temp.path().join(MANIFEST_FILE)).unwrap();

    let outcome = service.store().snapshot(8).await;
    assert!(matches!(outcome, LoadOutcome::Loaded(_)));
    assert!(service.status().await.manifest.is_none());
    let results = service
        .retrieve("alpha", RetrieveOptions::default())
        .await
        .unwrap();
    assert_eq!(results[0].record.id, "alpha");
}

/// A matrix header declaring far more values than the file holds is corrupt,
/// and loading it does not try to allocate the declared size.
#[tokio::test]
async fn test_oversized_matrix_length_is_recovered() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let service = service_at(temp.path(), ScriptedProvider::new(4));
    service.ingest_documents(&[labelled("alpha")], true).await.unwrap();

    let mut bytes = vec![1u8, 1, 4, 253];
    bytes.extend_from_slice(&(1u64 << 40).to_le_bytes());
    fs::write(temp.path().join(EMBEDDINGS_FILE), bytes).unwrap();

    let outcome = service.store().snapshot(4).await;
    assert!(matches!(
        outcome,
        LoadOutcome::Reset {
            reason: ResetReason::Corrupt(_),
            ..
        }
    ));
}

/// A save that fails part way leaves the previous store loadable.
#[tokio::test]
async fn test_failed_save_keeps_previous_store() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let service = service_at(temp.path(), ScriptedProvider::new(8));
    service
        .ingest_documents(&[labelled("alpha"), labelled("beta")], true)
        .await
        .unwrap();

    let blocker = temp.path().join(format!("{METADATA_FILE}.tmp"));
    fs::create_dir(&blocker).unwrap();
    service
        .ingest_documents(&[labelled("gamma")], true)
        .await
        .unwrap_err();
    fs::remove_dir(&blocker).unwrap();

    let outcome = service.store().snapshot(8).await;
    assert!(matches!(outcome, LoadOutcome::Loaded(_)));
    assert_eq!(outcome.data().len(), 2);
    assert_eq!(service.status().await.manifest.unwrap().count, 2);

    let results = service
        .retrieve("alpha", RetrieveOptions::default())
        .await
        .unwrap();
    assert_eq!(results[0].record.id, "alpha");
}
