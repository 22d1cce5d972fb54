//! Integration tests for the fetch executor
//!
//! These tests drive the worker pool against an in-memory store and check
//! the guarantees a run gives: one outcome per ref, isolation of failures,
//! the concurrency bound and idempotent re-runs.

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use blob_fetcher::app::executor::{CancelToken, FetchExecutor};
use blob_fetcher::app::store::MemoryStore;
use blob_fetcher::app::{FetchOutcome, ResultAggregator};

use common::{chip_key, executor_config, refs, store_with_chips};

/// Test that every ref yields exactly one outcome
///
/// Uses a chunk size that does not divide the input evenly so the last
/// chunk is partial.
#[tokio::test]
async fn test_n_refs_in_n_outcomes_out() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(store_with_chips(37));
    let keys: Vec<String> = (0..37).map(chip_key).collect();
    let input = refs(&store, &keys);

    let executor =
        FetchExecutor::new(executor_config(5, 4), store.clone(), temp_dir.path()).unwrap();
    let outcomes = executor.run(input.clone()).await;

    assert_eq!(outcomes.len(), 37);
    let seen: HashSet<_> = outcomes.iter().map(|o| o.object().clone()).collect();
    assert_eq!(seen, input.into_iter().collect::<HashSet<_>>());
    assert_eq!(store.fetch_count(), 37);
}

/// Test that a second run over the same cache fetches nothing
#[tokio::test]
async fn test_second_run_is_all_cached() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(store_with_chips(12));
    let keys: Vec<String> = (0..12).map(chip_key).collect();

    let executor =
        FetchExecutor::new(executor_config(3, 2), store.clone(), temp_dir.path()).unwrap();

    let first = executor.run(refs(&store, &keys)).await;
    assert!(first.iter().all(|o| o.is_success() && !o.is_cached()));
    assert_eq!(store.fetch_count(), 12);

    let second = executor.run(refs(&store, &keys)).await;
    assert_eq!(second.len(), 12);
    assert!(second.iter().all(FetchOutcome::is_cached));
    assert_eq!(store.fetch_count(), 12);

    let content = std::fs::read(temp_dir.path().join("data").join(chip_key(3))).unwrap();
    assert_eq!(content, chip_key(3).into_bytes());
}

/// Test that one failing object does not affect its siblings
#[tokio::test]
async fn test_partial_failure_is_isolated() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(
        MemoryStore::new("data")
            .with_object("A.tif", "a")
            .with_object("B.tif", "b")
            .with_object("C.tif", "c")
            .with_failure("B.tif", "Server error: HTTP 500"),
    );
    let keys = vec!["A.tif".to_string(), "B.tif".to_string(), "C.tif".to_string()];

    let executor =
        FetchExecutor::new(executor_config(3, 1), store.clone(), temp_dir.path()).unwrap();
    let outcomes = executor.run(refs(&store, &keys)).await;

    let summary = ResultAggregator::aggregate(outcomes, chrono::Utc::now());
    assert_eq!(summary.total, 3);
    assert_eq!(summary.failure_count(), 1);
    assert_eq!(summary.success_count(), 2);

    let failure = summary.failures().next().unwrap();
    assert_eq!(failure.object().key(), "B.tif");
    assert_eq!(failure.message(), Some("Server error: HTTP 500"));
    assert!(!temp_dir.path().join("data/B.tif").exists());
}

/// Test that no more than `worker_count` fetches run at once
#[tokio::test]
async fn test_in_flight_fetches_are_bounded() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(store_with_chips(10).with_fetch_delay(Duration::from_millis(25)));
    let keys: Vec<String> = (0..10).map(chip_key).collect();

    let executor =
        FetchExecutor::new(executor_config(2, 1), store.clone(), temp_dir.path()).unwrap();
    let outcomes = executor.run(refs(&store, &keys)).await;

    assert_eq!(outcomes.len(), 10);
    assert!(store.max_in_flight() <= 2);
    assert!(store.max_in_flight() >= 1);
}

/// Test that a single worker processes everything sequentially
#[tokio::test]
async fn test_single_worker() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(store_with_chips(6).with_fetch_delay(Duration::from_millis(5)));
    let keys: Vec<String> = (0..6).map(chip_key).collect();

    let executor =
        FetchExecutor::new(executor_config(1, 4), store.clone(), temp_dir.path()).unwrap();
    let outcomes = executor.run(refs(&store, &keys)).await;

    assert_eq!(outcomes.len(), 6);
    assert!(outcomes.iter().all(FetchOutcome::is_success));
    assert_eq!(store.max_in_flight(), 1);
}

/// Test that cancelling mid-run still accounts for every ref
#[tokio::test]
async fn test_cancel_mid_run() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(store_with_chips(30).with_fetch_delay(Duration::from_millis(20)));
    let keys: Vec<String> = (0..30).map(chip_key).collect();

    let cancel = CancelToken::new();
    let executor = FetchExecutor::new(executor_config(2, 3), store.clone(), temp_dir.path())
        .unwrap()
        .with_cancel_token(cancel.clone());

    let mut seen = 0;
    let outcomes = executor
        .run_with_observer(refs(&store, &keys), |_| {
            seen += 1;
            if seen == 4 {
                cancel.cancel();
            }
        })
        .await;

    assert_eq!(outcomes.len(), 30);
    assert_eq!(seen, 30);

    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    assert!(succeeded >= 4);
    assert!(succeeded < 30);
    assert!(outcomes
        .iter()
        .filter(|o| o.is_failure())
        .all(|o| o.message().unwrap().contains("cancelled")));
}
