//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dynconf::{ConfigManager, MemoryStore};

pub const PREFIX: &str = "/config";

/// A memory store plus a manager rooted at [`PREFIX`].
pub fn manager() -> (Arc<MemoryStore>, ConfigManager) {
    let store = Arc::new(MemoryStore::new());
    let manager = ConfigManager::new(store.clone(), PREFIX);
    (store, manager)
}

/// Same as [`manager`], with documents written before any group is created.
pub fn seeded_manager(docs: &[(&str, &str)]) -> (Arc<MemoryStore>, ConfigManager) {
    let (store, manager) = manager();
    for (key, yaml) in docs {
        store.put(*key, yaml.as_bytes().to_vec());
    }
    (store, manager)
}

/// Rewrite a document, then touch a child key so the group's watch fires.
pub fn update_document(store: &MemoryStore, key: &str, yaml: &str) {
    store.put(key, yaml.as_bytes().to_vec());
    store.put(format!("{}/rev", key), b"1".to_vec());
}

/// Poll `check` until it holds or two seconds pass.
pub async fn wait_until<F>(mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// Async variant of [`wait_until`].
pub async fn wait_until_async<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check().await
}
