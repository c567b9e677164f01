//! A single live configuration document.
//!
//! # Responsibilities
//! - Hold the latest successfully parsed snapshot
//! - Answer permissive path reads and typed decodes against it
//! - Run the watch loop: re-read on every change batch, swap, notify
//! - Dispatch change callbacks without ever blocking the watch loop
//!
//! # Design Decisions
//! - The snapshot is replaced whole (`ArcSwap`), never patched
//! - A failed refresh keeps the previous snapshot (stale over empty)
//! - Each callback runs on its own blocking task; panics are caught and logged

use std::any::type_name;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, RwLock};

use arc_swap::ArcSwap;
use serde::de::DeserializeOwned;
use serde_yaml::Value;

use crate::dynamic::types::{GroupError, GroupResult, GroupState, SubscriptionId};
use crate::dynamic::value;
use crate::observability::metrics;
use crate::store::{ConfigStore, WatchStream};

type Callback = Arc<dyn Fn() + Send + Sync + 'static>;

struct Subscriber {
    id: SubscriptionId,
    callback: Callback,
}

/// One configuration document, kept current by a background watch.
pub struct ConfigGroup {
    key: String,
    snapshot: ArcSwap<Value>,
    subscribers: RwLock<Vec<Subscriber>>,
    state: AtomicU8,
    revision: AtomicU64,
    next_subscriber: AtomicU64,
}

impl ConfigGroup {
    pub(crate) fn new(key: String, initial: Value) -> Self {
        Self {
            key,
            snapshot: ArcSwap::from_pointee(initial),
            subscribers: RwLock::new(Vec::new()),
            state: AtomicU8::new(GroupState::Created as u8),
            revision: AtomicU64::new(0),
            next_subscriber: AtomicU64::new(1),
        }
    }

    /// Full storage key of the document.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Prefix the watch stream is scoped to.
    pub fn watch_prefix(&self) -> String {
        watch_prefix(&self.key)
    }

    pub fn state(&self) -> GroupState {
        GroupState::from(self.state.load(Ordering::SeqCst))
    }

    pub(crate) fn set_state(&self, state: GroupState) {
        let prev = GroupState::from(self.state.swap(state as u8, Ordering::SeqCst));
        if prev != state {
            tracing::debug!(group = %self.key, from = ?prev, to = ?state, "Group state changed");
        }
    }

    /// Number of successful watch-driven refreshes since creation.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<Value> {
        self.snapshot.load_full()
    }

    /// Raw value at a dotted path, `None` if absent or null.
    pub fn get(&self, path: &str) -> Option<Value> {
        value::lookup(&self.snapshot.load(), path).cloned()
    }

    pub fn is_set(&self, path: &str) -> bool {
        value::lookup(&self.snapshot.load(), path).is_some()
    }

    pub fn get_string(&self, path: &str) -> String {
        value::to_string(value::lookup(&self.snapshot.load(), path))
    }

    pub fn get_int(&self, path: &str) -> i64 {
        value::to_int(value::lookup(&self.snapshot.load(), path))
    }

    pub fn get_bool(&self, path: &str) -> bool {
        value::to_bool(value::lookup(&self.snapshot.load(), path))
    }

    pub fn get_float(&self, path: &str) -> f64 {
        value::to_float(value::lookup(&self.snapshot.load(), path))
    }

    pub fn get_string_list(&self, path: &str) -> Vec<String> {
        value::to_string_list(value::lookup(&self.snapshot.load(), path))
    }

    /// Decode the whole snapshot into `T` using its serde field names.
    pub fn unmarshal<T: DeserializeOwned>(&self) -> GroupResult<T> {
        let snapshot = self.snapshot.load_full();
        serde_yaml::from_value(Value::clone(&snapshot)).map_err(|source| GroupError::Decode {
            key: self.key.clone(),
            target: type_name::<T>(),
            source,
        })
    }

    /// Decode into an existing value. An empty snapshot leaves `target` untouched.
    pub fn unmarshal_into<T: DeserializeOwned>(&self, target: &mut T) -> GroupResult<()> {
        if value::is_empty(&self.snapshot.load()) {
            return Ok(());
        }
        *target = self.unmarshal()?;
        Ok(())
    }

    /// Register a callback run after every successful refresh.
    pub fn on_change<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscriber.fetch_add(1, Ordering::SeqCst));
        self.write_subscribers().push(Subscriber {
            id,
            callback: Arc::new(callback),
        });
        id
    }

    /// Remove a callback. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.write_subscribers();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn write_subscribers(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Subscriber>> {
        self.subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Swap in a new snapshot, then fire every callback.
    pub(crate) fn replace_snapshot(&self, doc: Value) {
        self.snapshot.store(Arc::new(doc));
        self.revision.fetch_add(1, Ordering::SeqCst);
        self.notify();
    }

    fn notify(&self) {
        let callbacks: Vec<(SubscriptionId, Callback)> = self
            .subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|s| (s.id, s.callback.clone()))
            .collect();

        for (id, callback) in callbacks {
            let key = self.key.clone();
            tokio::task::spawn_blocking(move || {
                if catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                    metrics::record_callback_panic();
                    tracing::error!(group = %key, subscriber = id.0, "Change callback panicked");
                }
            });
        }
    }

    /// Consume change batches until the store closes the stream.
    pub(crate) async fn run_watch(self: Arc<Self>, store: Arc<dyn ConfigStore>, mut stream: WatchStream) {
        tracing::info!(group = %self.key, watch_key = %self.watch_prefix(), "Watching group for changes");

        while let Some(batch) = stream.recv().await {
            for event in &batch {
                tracing::info!(
                    group = %self.key,
                    key = %event.key,
                    kind = ?event.kind,
                    bytes = event.value.len(),
                    "Configuration change event"
                );
            }

            match fetch_document(store.as_ref(), &self.key).await {
                Ok(doc) => {
                    self.replace_snapshot(doc);
                    metrics::record_refresh(true);
                    tracing::debug!(group = %self.key, revision = self.revision(), "Snapshot refreshed");
                }
                Err(e) => {
                    metrics::record_refresh(false);
                    tracing::error!(group = %self.key, error = %e, "Failed to re-read configuration; keeping previous snapshot");
                }
            }
        }

        self.set_state(GroupState::Closed);
        tracing::info!(group = %self.key, "Watch stream ended");
    }
}

impl std::fmt::Debug for ConfigGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigGroup")
            .field("key", &self.key)
            .field("state", &self.state())
            .field("revision", &self.revision())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Prefix watched for a document key.
pub fn watch_prefix(key: &str) -> String {
    format!("{}/", key)
}

/// Read and decode the document stored at `key`.
pub(crate) async fn fetch_document(store: &dyn ConfigStore, key: &str) -> GroupResult<Value> {
    let bytes = store.read(key).await?;
    value::parse_document(&bytes).map_err(|source| GroupError::Document {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn group(yaml: &str) -> ConfigGroup {
        ConfigGroup::new("/config/a/b/c/content.yaml".into(), value::parse_document(yaml.as_bytes()).unwrap())
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Db {
        host: String,
        port: u16,
    }

    #[test]
    fn test_getters() {
        let g = group("host: db1\nport: 3306\n");
        assert_eq!(g.get_string("host"), "db1");
        assert_eq!(g.get_int("port"), 3306);
        assert!(!g.get_bool("missing"));
        assert!(g.is_set("host"));
        assert!(g.get("missing").is_none());
        assert_eq!(g.state(), GroupState::Created);
    }

    #[test]
    fn test_unmarshal() {
        let g = group("host: db1\nport: 3306\n");
        let db: Db = g.unmarshal().unwrap();
        assert_eq!(db, Db { host: "db1".into(), port: 3306 });
    }

    #[test]
    fn test_unmarshal_type_mismatch() {
        let g = group("host: db1\nport: not-a-port\n");
        let err = g.unmarshal::<Db>().unwrap_err();
        assert!(matches!(err, GroupError::Decode { .. }));
    }

    #[test]
    fn test_unmarshal_into_empty_leaves_target() {
        let g = group("");
        let mut db = Db { host: "keep".into(), port: 1 };
        g.unmarshal_into(&mut db).unwrap();
        assert_eq!(db.host, "keep");
        assert_eq!(g.unmarshal::<Db>().unwrap(), Db::default());
    }

    #[test]
    fn test_watch_prefix() {
        assert_eq!(watch_prefix("/config/a/b/c/content.yaml"), "/config/a/b/c/content.yaml/");
    }

    #[test]
    fn test_unsubscribe() {
        let g = group("");
        let id = g.on_change(|| {});
        assert_eq!(g.subscriber_count(), 1);
        assert!(g.unsubscribe(id));
        assert!(!g.unsubscribe(id));
        assert_eq!(g.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_replace_snapshot_notifies_and_survives_panics() {
        let g = group("v: 1\n");
        let hits = Arc::new(AtomicUsize::new(0));

        g.on_change(|| panic!("subscriber bug"));
        let h = hits.clone();
        g.on_change(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });

        g.replace_snapshot(value::parse_document(b"v: 2\n").unwrap());
        assert_eq!(g.get_int("v"), 2);
        assert_eq!(g.revision(), 1);

        for _ in 0..50 {
            if hits.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
