//! Snapshot freshness and computation cache behavior through the service

mod helpers;

use helpers::log_capture::capture;
use helpers::{sample_service, sample_store, service_with};
use pcb_engine::query::RecordFilter;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

/// Let spawned refresh tasks run to completion
///
/// Paused time only auto-advances once every task is idle.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_fresh_snapshot_is_reused() {
    let service = sample_service();
    let first = service.aggregated().await.unwrap();
    let version = service.snapshot_version();

    tokio::time::advance(Duration::from_secs(299)).await;
    let second = service.aggregated().await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(service.snapshot_version(), version);
}

#[tokio::test(start_paused = true)]
async fn test_stale_snapshot_served_then_refreshed() {
    let (logs, _guard) = capture();
    let service = sample_service();
    let first = service.aggregated().await.unwrap();
    let version = service.snapshot_version();

    tokio::time::advance(Duration::from_secs(301)).await;
    let stale = service.aggregated().await.unwrap();
    assert!(Arc::ptr_eq(&first, &stale));

    settle().await;
    assert_ne!(service.snapshot_version(), version);
    logs.assert_contains(Level::INFO, "Background refresh complete");

    let refreshed = service.aggregated().await.unwrap();
    assert!(!Arc::ptr_eq(&first, &refreshed));
    assert_eq!(*first, *refreshed);
}

#[tokio::test(start_paused = true)]
async fn test_expired_snapshot_recomputed_inline() {
    let service = service_with(sample_store(), |config| {
        config.cache.stale_after_secs = 10;
        config.cache.max_age_secs = 20;
    });
    service.aggregated().await.unwrap();
    let version = service.snapshot_version();

    tokio::time::advance(Duration::from_secs(21)).await;
    service.aggregated().await.unwrap();

    // replaced before returning, no background task involved
    assert_ne!(service.snapshot_version(), version);
}

#[tokio::test(start_paused = true)]
async fn test_clear_during_refresh_discards_result() {
    let service = sample_service();
    service.aggregated().await.unwrap();

    tokio::time::advance(Duration::from_secs(301)).await;
    service.aggregated().await.unwrap();
    service.clear_cache();
    settle().await;

    assert!(service.snapshot_version().is_none());
}

#[tokio::test]
async fn test_shutdown_leaves_snapshot_usable() {
    let service = sample_service();
    service.aggregated().await.unwrap();
    service.shutdown();
    assert_eq!(service.aggregated().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_filter_results_are_memoized() {
    let service = sample_service();
    let filter = RecordFilter {
        specialty: Some("Urology".to_string()),
        ..Default::default()
    };
    let first = service.filter(&filter).await.unwrap();
    let second = service.filter(&filter).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let entries = service.computation_cache().len();
    service
        .filter(&RecordFilter {
            specialty: Some("Cardiology".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(service.computation_cache().len(), entries + 1);
}

#[tokio::test]
async fn test_cached_normalized_rows_skip_the_store() {
    let service = sample_service();
    service.aggregated_by_year().await.unwrap();
    let requests = service.store().data_requests();

    // different grouping, same normalized rows
    service.aggregated().await.unwrap();
    service.summary().await.unwrap();
    assert_eq!(service.store().data_requests(), requests);
}
