//! Registry and factory for configuration groups.
//!
//! # Responsibilities
//! - Derive storage keys from (prefix, app, env, group)
//! - Create each group at most once, even under concurrent first access
//! - Perform the initial read and start the group's watch before handing it out
//! - Close the store on shutdown, which ends every watch
//!
//! # Design Decisions
//! - Double-checked creation under one reader/writer lock
//! - A failed initial read still yields a usable, empty group
//! - No process-wide state: managers with different prefixes coexist
//! - Shutdown closes the store under the registry write lock, so no group
//!   created concurrently keeps a live watch

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::{AbortHandle, JoinHandle};

use crate::config::StoreConfig;
use crate::dynamic::group::{fetch_document, watch_prefix, ConfigGroup};
use crate::dynamic::resolver::ConfigSchema;
use crate::dynamic::types::{GroupError, GroupResult, GroupState};
use crate::dynamic::value;
use crate::observability::metrics;
use crate::store::ConfigStore;

/// Storage key of a group document.
pub fn storage_key(prefix: &str, app: &str, env: &str, group: &str) -> String {
    format!("{}/{}/{}/{}/content.yaml", prefix, app, env, group)
}

/// Owns the store handle and every configuration group derived from it.
pub struct ConfigManager {
    store: Arc<dyn ConfigStore>,
    prefix: String,
    groups: RwLock<HashMap<String, Arc<ConfigGroup>>>,
    watch_tasks: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl ConfigManager {
    pub fn new(store: Arc<dyn ConfigStore>, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        tracing::info!(backend = store.name(), prefix = %prefix, "Config manager created");
        Self {
            store,
            prefix,
            groups: RwLock::new(HashMap::new()),
            watch_tasks: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Build from the store section of the application config.
    pub fn from_config(store: Arc<dyn ConfigStore>, config: &StoreConfig) -> Self {
        Self::new(store, config.prefix.clone())
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Storage key this manager derives for a group.
    pub fn storage_key(&self, app: &str, env: &str, group: &str) -> String {
        storage_key(&self.prefix, app, env, group)
    }

    /// Return the group for (app, env, group), creating and watching it on first use.
    pub async fn get_group(&self, app: &str, env: &str, group: &str) -> Arc<ConfigGroup> {
        let key = self.storage_key(app, env, group);

        if let Some(existing) = self.groups.read().await.get(&key) {
            return existing.clone();
        }

        let mut groups = self.groups.write().await;
        if let Some(existing) = groups.get(&key) {
            return existing.clone();
        }

        let initial = match fetch_document(self.store.as_ref(), &key).await {
            Ok(doc) => doc,
            Err(e) => {
                metrics::record_initial_read_failure();
                tracing::warn!(key = %key, error = %e, "Failed to read remote config, starting with empty snapshot");
                value::empty()
            }
        };

        let created = Arc::new(ConfigGroup::new(key.clone(), initial));
        self.start_watch(&created).await;

        groups.insert(key.clone(), created.clone());
        metrics::record_group_count(groups.len());
        tracing::debug!(key = %key, groups = groups.len(), "Config group registered");

        created
    }

    async fn start_watch(&self, group: &Arc<ConfigGroup>) {
        let prefix = watch_prefix(group.key());
        match self.store.watch(&prefix).await {
            Ok(stream) => {
                group.set_state(GroupState::Watching);
                let handle = tokio::spawn(group.clone().run_watch(self.store.clone(), stream));
                self.lock_tasks().push(handle);
            }
            Err(e) => {
                group.set_state(GroupState::Closed);
                tracing::error!(key = %group.key(), watch_key = %prefix, error = %e, "Failed to open watch stream; group will not refresh");
            }
        }
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.watch_tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fetch the group named after `T` and decode its snapshot.
    pub async fn get_typed<T: ConfigSchema>(&self, app: &str, env: &str) -> GroupResult<T> {
        let group = self.get_group(app, env, &T::group_name()).await;
        group.unmarshal::<T>()
    }

    /// Number of registered groups.
    pub async fn group_count(&self) -> usize {
        self.groups.read().await.len()
    }

    /// Storage keys of every registered group, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.groups.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close the store and wait for every watch loop to finish.
    ///
    /// Snapshots stay readable afterwards. Calling this again is a no-op.
    pub async fn shutdown(&self) -> GroupResult<()> {
        self.stop(None).await
    }

    /// Like [`ConfigManager::shutdown`], but gives up on watch loops after `limit`.
    ///
    /// Loops still running at the deadline are aborted, every group is marked
    /// `Closed`, and [`GroupError::ShutdownTimeout`] is returned.
    pub async fn shutdown_with_timeout(&self, limit: Duration) -> GroupResult<()> {
        self.stop(Some(limit)).await
    }

    async fn stop(&self, limit: Option<Duration>) -> GroupResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        // The write lock waits out any group creation in flight, so its watch
        // task is collected below.
        let (result, tasks, groups) = {
            let groups = self.groups.write().await;
            tracing::info!(groups = groups.len(), "Config manager stopping");
            let result = self.store.close().await;
            let tasks = std::mem::take(&mut *self.lock_tasks());
            let registered: Vec<Arc<ConfigGroup>> = groups.values().cloned().collect();
            (result, tasks, registered)
        };

        let aborts: Vec<AbortHandle> = tasks.iter().map(JoinHandle::abort_handle).collect();
        let join_all = async {
            for task in tasks {
                if let Err(e) = task.await {
                    tracing::error!(error = %e, "Watch task ended abnormally");
                }
            }
        };

        match limit {
            None => join_all.await,
            Some(limit) => {
                if tokio::time::timeout(limit, join_all).await.is_err() {
                    for abort in &aborts {
                        abort.abort();
                    }
                    for group in &groups {
                        group.set_state(GroupState::Closed);
                    }
                    tracing::warn!(timeout = ?limit, "Watch tasks did not stop in time; aborted");
                    result?;
                    return Err(GroupError::ShutdownTimeout(limit));
                }
            }
        }

        result?;
        tracing::info!("Config manager stopped");
        Ok(())
    }
}

impl std::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigManager")
            .field("backend", &self.store.name())
            .field("prefix", &self.prefix)
            .field("closed", &self.is_shut_down())
            .finish()
    }
}
