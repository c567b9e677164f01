//! etcd v3 store backend.
//!
//! # Responsibilities
//! - Connect and authenticate against the configured endpoints
//! - Serve point reads of a single key
//! - Forward prefix watches into [`WatchStream`]s until the store is closed
//!
//! # Design Decisions
//! - Connection failure is fatal and surfaces to the caller of `connect`
//! - One forwarding task per watch; all of them exit on the shared shutdown signal
//! - A watch that breaks while the client is open is re-established, resuming
//!   after the last revision seen

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use etcd_client::{Client, ConnectOptions, EventType, WatchOptions, WatchResponse, Watcher};
use tokio::sync::{broadcast, mpsc};

use crate::config::StoreConfig;
use crate::lifecycle::Shutdown;
use crate::store::{ConfigStore, StoreError, StoreResult, WatchEvent, WatchStream};

/// Pause between attempts to re-open a broken watch.
const REWATCH_DELAY: Duration = Duration::from_secs(1);

/// Store client backed by an etcd cluster.
pub struct EtcdStore {
    client: Client,
    shutdown: Shutdown,
    closed: AtomicBool,
}

impl EtcdStore {
    /// Connect to the cluster described by `config`.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let mut options =
            ConnectOptions::new().with_connect_timeout(Duration::from_secs(config.dial_timeout_secs));
        if !config.username.is_empty() {
            options = options.with_user(config.username.clone(), config.password.clone());
        }

        let client = Client::connect(&config.endpoints, Some(options))
            .await
            .map_err(|e| {
                tracing::error!(endpoints = ?config.endpoints, error = %e, "Failed to connect to etcd");
                StoreError::Connection(e.to_string())
            })?;

        tracing::info!(endpoints = ?config.endpoints, "etcd client connected");
        Ok(Self {
            client,
            shutdown: Shutdown::new(),
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for EtcdStore {
    async fn read(&self, key: &str) -> StoreResult<Vec<u8>> {
        self.ensure_open()?;
        let mut client = self.client.clone();
        let resp = client
            .get(key, None)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        resp.kvs()
            .first()
            .map(|kv| kv.value().to_vec())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn watch(&self, prefix: &str) -> StoreResult<WatchStream> {
        // Subscribe before the closed check so a concurrent close is never missed.
        let shutdown = self.shutdown.subscribe();
        self.ensure_open()?;

        let mut client = self.client.clone();
        let (watcher, stream) = client
            .watch(prefix, Some(WatchOptions::new().with_prefix()))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(forward_watch(
            client,
            prefix.to_string(),
            watcher,
            stream,
            tx,
            shutdown,
        ));

        Ok(rx)
    }

    async fn close(&self) -> StoreResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.shutdown.trigger();
        tracing::info!("etcd client closed");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "etcd"
    }
}

/// Translate one watch response into a change batch.
fn to_batch(resp: &WatchResponse) -> Vec<WatchEvent> {
    resp.events()
        .iter()
        .filter_map(|event| {
            let kv = event.kv()?;
            let key = String::from_utf8_lossy(kv.key()).into_owned();
            Some(match event.event_type() {
                EventType::Put => WatchEvent::put(key, kv.value().to_vec()),
                EventType::Delete => WatchEvent::delete(key),
            })
        })
        .collect()
}

/// Revision a re-opened watch starts from, if the last one seen is known.
fn resume_revision(last_seen: i64) -> Option<i64> {
    (last_seen > 0).then(|| last_seen + 1)
}

fn rewatch_options(last_seen: i64) -> WatchOptions {
    let options = WatchOptions::new().with_prefix();
    match resume_revision(last_seen) {
        Some(start) => options.with_start_revision(start),
        None => options,
    }
}

/// Forward etcd watch responses into `tx` until shutdown or the receiver goes away.
///
/// A stream that errors, ends, or is cancelled by the server is re-opened.
/// When the resume revision is unknown (first response never arrived, or the
/// server compacted past it) a resync batch is sent after re-opening so the
/// consumer re-reads its document.
async fn forward_watch(
    mut client: Client,
    prefix: String,
    mut watcher: Watcher,
    mut stream: etcd_client::WatchStream,
    tx: mpsc::UnboundedSender<Vec<WatchEvent>>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut revision: i64 = 0;

    loop {
        // Pump the current stream.
        loop {
            tokio::select! {
                message = stream.message() => {
                    let resp = match message {
                        Ok(Some(resp)) => resp,
                        Ok(None) => {
                            tracing::warn!(prefix = %prefix, "etcd watch stream ended; re-watching");
                            break;
                        }
                        Err(e) => {
                            tracing::warn!(prefix = %prefix, error = %e, "etcd watch stream failed; re-watching");
                            break;
                        }
                    };
                    if resp.canceled() {
                        tracing::warn!(
                            prefix = %prefix,
                            compact_revision = resp.compact_revision(),
                            "etcd watch cancelled by server; re-watching"
                        );
                        if resp.compact_revision() > 0 {
                            revision = 0;
                        }
                        break;
                    }
                    if let Some(header) = resp.header() {
                        revision = revision.max(header.revision());
                    }
                    let batch = to_batch(&resp);
                    if !batch.is_empty() && tx.send(batch).is_err() {
                        let _ = watcher.cancel().await;
                        return;
                    }
                }
                _ = shutdown.recv() => {
                    let _ = watcher.cancel().await;
                    tracing::debug!(prefix = %prefix, "etcd watch forwarder exited");
                    return;
                }
            }
        }
        let _ = watcher.cancel().await;

        // Re-open until it succeeds or we are told to stop.
        loop {
            tokio::select! {
                _ = tokio::time::sleep(REWATCH_DELAY) => {}
                _ = shutdown.recv() => {
                    tracing::debug!(prefix = %prefix, "etcd watch forwarder exited");
                    return;
                }
            }
            if tx.is_closed() {
                return;
            }
            match client.watch(prefix.as_str(), Some(rewatch_options(revision))).await {
                Ok((next_watcher, next_stream)) => {
                    watcher = next_watcher;
                    stream = next_stream;
                    tracing::info!(prefix = %prefix, resume_revision = revision, "etcd watch re-established");
                    if resume_revision(revision).is_none() && tx.send(vec![WatchEvent::put(prefix.clone(), Vec::new())]).is_err() {
                        let _ = watcher.cancel().await;
                        return;
                    }
                    break;
                }
                Err(e) => {
                    tracing::warn!(prefix = %prefix, error = %e, "Failed to re-open etcd watch");
                }
            }
        }
    }
}
