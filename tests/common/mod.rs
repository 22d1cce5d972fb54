//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use blob_fetcher::app::executor::{ExecutorConfig, ExecutorConfigBuilder};
use blob_fetcher::app::store::{MemoryStore, ObjectStore};
use blob_fetcher::app::RemoteObjectRef;

/// Store with `count` objects named `chips/NNN.tif`
pub fn store_with_chips(count: usize) -> MemoryStore {
    (0..count).fold(MemoryStore::new("data"), |store, i| {
        let key = chip_key(i);
        store.with_object(&key, key.as_bytes().to_vec())
    })
}

pub fn chip_key(i: usize) -> String {
    format!("chips/{:03}.tif", i)
}

/// Resolve keys against a store
pub fn refs(store: &Arc<MemoryStore>, keys: &[String]) -> Vec<RemoteObjectRef> {
    keys.iter()
        .map(|key| store.resolve(key).expect("key resolves"))
        .collect()
}

/// Executor configuration with the given pool shape
pub fn executor_config(worker_count: usize, chunk_size: usize) -> ExecutorConfig {
    ExecutorConfigBuilder::new()
        .worker_count(worker_count)
        .chunk_size(chunk_size)
        .build()
        .expect("valid executor config")
}
