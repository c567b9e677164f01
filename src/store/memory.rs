//! In-process store backend.
//!
//! # Responsibilities
//! - Hold key/value pairs in a concurrent map
//! - Deliver one change batch per mutation to every matching watcher
//! - End all watch streams on close
//!
//! Used by the test suite and by the CLI's seed-directory mode.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::store::{ConfigStore, StoreError, StoreResult, WatchEvent, WatchStream};

struct Watcher {
    prefix: String,
    tx: mpsc::UnboundedSender<Vec<WatchEvent>>,
}

/// A watchable key-value store living in process memory.
#[derive(Default)]
pub struct MemoryStore {
    data: DashMap<String, Vec<u8>>,
    watchers: Mutex<Vec<Watcher>>,
    closed: AtomicBool,
    fail_reads: AtomicBool,
    reads: AtomicUsize,
    watches: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every file under `root` as a key `"{prefix}/{relative path}"`.
    pub fn seed_from_dir(root: &Path, prefix: &str) -> std::io::Result<Self> {
        let store = Self::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for entry in std::fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }
                let relative = path.strip_prefix(root).unwrap_or(&path);
                let segments: Vec<String> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                let key = format!("{}/{}", prefix.trim_end_matches('/'), segments.join("/"));
                store.data.insert(key, std::fs::read(&path)?);
            }
        }
        tracing::info!(root = ?root, keys = store.len(), "Seeded memory store");
        Ok(store)
    }

    /// Insert or replace a key and notify watchers.
    pub fn put(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.put_batch(vec![(key.into(), value.into())]);
    }

    /// Apply several writes, delivered to each watcher as a single batch.
    pub fn put_batch(&self, entries: Vec<(String, Vec<u8>)>) {
        let events: Vec<WatchEvent> = entries
            .into_iter()
            .map(|(key, value)| {
                self.data.insert(key.clone(), value.clone());
                WatchEvent::put(key, value)
            })
            .collect();
        self.dispatch(events);
    }

    /// Remove a key and notify watchers. Returns whether it existed.
    pub fn delete(&self, key: &str) -> bool {
        let existed = self.data.remove(key).is_some();
        if existed {
            self.dispatch(vec![WatchEvent::delete(key)]);
        }
        existed
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Make every subsequent read fail with a backend error (fault injection).
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Total reads served or refused so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Total watch streams opened so far.
    pub fn watch_count(&self) -> usize {
        self.watches.load(Ordering::SeqCst)
    }

    /// Number of watch streams still attached.
    pub fn active_watchers(&self) -> usize {
        self.lock_watchers().len()
    }

    fn lock_watchers(&self) -> std::sync::MutexGuard<'_, Vec<Watcher>> {
        self.watchers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn dispatch(&self, events: Vec<WatchEvent>) {
        if events.is_empty() {
            return;
        }
        let mut watchers = self.lock_watchers();
        watchers.retain(|w| {
            let batch: Vec<WatchEvent> = events
                .iter()
                .filter(|e| e.key.starts_with(&w.prefix))
                .cloned()
                .collect();
            if batch.is_empty() {
                return !w.tx.is_closed();
            }
            w.tx.send(batch).is_ok()
        });
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn read(&self, key: &str) -> StoreResult<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(format!("injected read failure for {}", key)));
        }
        self.data
            .get(key)
            .map(|v| v.value().clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn watch(&self, prefix: &str) -> StoreResult<WatchStream> {
        // `closed` is only flipped under the watchers lock, so a stream is
        // either registered before close drops it or refused.
        let mut watchers = self.lock_watchers();
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        watchers.push(Watcher {
            prefix: prefix.to_string(),
            tx,
        });
        drop(watchers);
        self.watches.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(prefix = %prefix, "Memory store watch registered");
        Ok(rx)
    }

    async fn close(&self) -> StoreResult<()> {
        let dropped = {
            let mut watchers = self.lock_watchers();
            if self.closed.swap(true, Ordering::SeqCst) {
                return Ok(());
            }
            std::mem::take(&mut *watchers)
        };
        tracing::debug!(watchers = dropped.len(), "Memory store closed");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
