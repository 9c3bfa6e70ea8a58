//! Offline support: durable cache, deferred write queue, connectivity.
//!
//! The [`OfflineManager`] owns a persisted queue of social write actions
//! (comments, likes, posts). Writes attempted while offline or that fail
//! in flight are queued and replayed in FIFO order when connectivity
//! returns. Each item is retried a bounded number of times before being
//! dropped permanently.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use wildflower_core::PostId;

use crate::api::types::NewPost;
use crate::api::{ApiError, CommerceApi};
use crate::storage::{Storage, StorageError};

pub mod cache;
pub mod network;
pub mod queue;

pub use cache::{CacheError, CacheStore};
pub use network::NetworkMonitor;
pub use queue::{SyncAction, SyncActionKind, SyncQueueItem, MAX_SYNC_FAILURES, SYNC_QUEUE_KEY};

// =============================================================================
// Errors & events
// =============================================================================

/// Errors from queue operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A sync was forced while the device is offline.
    #[error("Cannot sync while offline")]
    Offline,

    /// The API rejected the action outright; retrying would not help, so
    /// it was not queued.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The persisted queue could not be read or written.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The queue could not be serialized.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Notifications emitted by the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Connectivity was lost.
    WentOffline,
    /// A drain pass replayed every queued item successfully.
    SyncCompleted {
        /// Items replayed.
        synced: usize,
    },
    /// A drain pass left items behind or dropped some permanently.
    SyncPartial {
        /// Items replayed.
        synced: usize,
        /// Items still queued for a later pass.
        remaining: usize,
        /// Items dropped after exhausting their retries.
        dropped: usize,
    },
}

/// Outcome of one drain pass over the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Items replayed successfully.
    pub synced: usize,
    /// Items still queued.
    pub remaining: usize,
    /// Items dropped permanently.
    pub dropped: usize,
}

/// How a write action left the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The action reached the server.
    Sent,
    /// The action was queued for later sync.
    Queued,
}

// =============================================================================
// OfflineManager
// =============================================================================

struct OfflineInner<A, S> {
    api: A,
    storage: Arc<S>,
    cache: CacheStore<Arc<S>>,
    queue: Mutex<Vec<SyncQueueItem>>,
    network: NetworkMonitor,
    events: broadcast::Sender<SyncEvent>,
}

/// Coordinates the durable cache, the sync queue, and connectivity.
///
/// Cheap to clone; clones share state.
pub struct OfflineManager<A, S> {
    inner: Arc<OfflineInner<A, S>>,
}

impl<A, S> Clone for OfflineManager<A, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, S> OfflineManager<A, S>
where
    A: CommerceApi + 'static,
    S: Storage + 'static,
{
    /// Create a manager over the given API, storage, and connectivity
    /// monitor. Call [`load_queue`](Self::load_queue) afterwards to restore
    /// any queue persisted by a previous run.
    #[must_use]
    pub fn new(api: A, storage: S, network: NetworkMonitor) -> Self {
        let storage = Arc::new(storage);
        let (events, _rx) = broadcast::channel(16);
        Self {
            inner: Arc::new(OfflineInner {
                api,
                cache: CacheStore::new(Arc::clone(&storage)),
                storage,
                queue: Mutex::new(Vec::new()),
                network,
                events,
            }),
        }
    }

    /// The connectivity monitor shared with the platform shell.
    #[must_use]
    pub fn network(&self) -> &NetworkMonitor {
        &self.inner.network
    }

    /// Subscribe to sync notifications.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.inner.events.subscribe()
    }

    /// Number of items currently queued.
    pub async fn queue_len(&self) -> usize {
        self.inner.queue.lock().await.len()
    }

    // =========================================================================
    // Queue
    // =========================================================================

    /// Restore the queue persisted by a previous run. Returns the number of
    /// items restored. An undecodable persisted queue is discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub async fn load_queue(&self) -> Result<usize, SyncError> {
        let Some(raw) = self.inner.storage.get(SYNC_QUEUE_KEY).await? else {
            return Ok(0);
        };

        let items: Vec<SyncQueueItem> = match serde_json::from_str(&raw) {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Discarding undecodable persisted sync queue");
                return Ok(0);
            }
        };

        let count = items.len();
        *self.inner.queue.lock().await = items;
        if count > 0 {
            info!(count, "Restored sync queue");
        }
        Ok(count)
    }

    /// Enqueue an action for later sync.
    ///
    /// Uniqueness is per `(id, kind)`: enqueueing over an existing entry
    /// replaces its payload and timestamp but keeps its retry count, so an
    /// item cannot dodge the retry limit by being re-enqueued.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be persisted.
    #[instrument(skip(self, action), fields(id = %id, kind = ?action.kind()))]
    pub async fn add_to_sync_queue(
        &self,
        id: impl Into<String> + std::fmt::Display,
        action: SyncAction,
    ) -> Result<(), SyncError> {
        let id = id.into();
        let kind = action.kind();

        let mut queue = self.inner.queue.lock().await;
        if let Some(existing) = queue.iter_mut().find(|item| item.same_identity(&id, kind)) {
            existing.action = action;
            existing.enqueued_at = chrono::Utc::now();
            debug!("Updated existing sync queue entry");
        } else {
            queue.push(SyncQueueItem::new(id, action));
            debug!(len = queue.len(), "Enqueued sync action");
        }
        self.persist(&queue).await
    }

    /// Empty the queue. Cached data is untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted queue cannot be deleted.
    pub async fn clear_queue(&self) -> Result<(), SyncError> {
        let mut queue = self.inner.queue.lock().await;
        queue.clear();
        self.inner.storage.remove(SYNC_QUEUE_KEY).await?;
        Ok(())
    }

    /// Replay the queue now, regardless of what triggered it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Offline`] if the device is offline.
    pub async fn force_sync(&self) -> Result<SyncReport, SyncError> {
        if !self.inner.network.is_online() {
            return Err(SyncError::Offline);
        }
        Ok(self.drain_queue().await)
    }

    /// Run one FIFO pass over the queue.
    ///
    /// A replayed item is removed; a failed item's retry count is bumped and
    /// it is requeued, unless it has now failed [`MAX_SYNC_FAILURES`] times,
    /// in which case it is dropped permanently. One aggregate event is
    /// emitted when the pass touched at least one item.
    #[instrument(skip(self))]
    pub async fn drain_queue(&self) -> SyncReport {
        let mut queue = self.inner.queue.lock().await;
        if queue.is_empty() {
            return SyncReport::default();
        }

        let items = std::mem::take(&mut *queue);
        let mut report = SyncReport::default();
        let mut retained = Vec::new();

        for mut item in items {
            match self.dispatch(&item.action).await {
                Ok(()) => {
                    debug!(id = %item.id, kind = ?item.action.kind(), "Synced queued action");
                    report.synced += 1;
                }
                Err(e) => {
                    let failures = item.retry_count + 1;
                    if failures >= MAX_SYNC_FAILURES {
                        warn!(id = %item.id, failures, error = %e, "Dropping sync item");
                        report.dropped += 1;
                    } else {
                        warn!(id = %item.id, failures, error = %e, "Sync item failed, will retry");
                        item.retry_count = failures;
                        retained.push(item);
                    }
                }
            }
        }

        report.remaining = retained.len();
        *queue = retained;
        if let Err(e) = self.persist(&queue).await {
            warn!(error = %e, "Failed to persist sync queue after drain");
        }
        drop(queue);

        if report.synced + report.remaining + report.dropped > 0 {
            let event = if report.remaining == 0 && report.dropped == 0 {
                SyncEvent::SyncCompleted {
                    synced: report.synced,
                }
            } else {
                SyncEvent::SyncPartial {
                    synced: report.synced,
                    remaining: report.remaining,
                    dropped: report.dropped,
                }
            };
            self.emit(event);
        }
        report
    }

    /// Spawn the connectivity watcher: drains the queue when the device
    /// comes back online and emits [`SyncEvent::WentOffline`] when it
    /// disconnects. The task runs until the manager is dropped.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        let manager = self.clone();
        // subscribe() marks the current value seen, so the watcher observes
        // every transition after this point even if it is slow to first poll.
        let mut rx = self.inner.network.subscribe();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                if online {
                    info!("Back online, draining sync queue");
                    let report = manager.drain_queue().await;
                    debug!(?report, "Reconnect drain finished");
                } else {
                    info!("Went offline");
                    manager.emit(SyncEvent::WentOffline);
                }
            }
        })
    }

    // =========================================================================
    // Write actions
    // =========================================================================

    /// Comment on a post, queueing the comment if it cannot be delivered.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the comment outright or the
    /// fallback enqueue fails.
    pub async fn comment(&self, post_id: PostId, content: String) -> Result<Delivery, SyncError> {
        let action = SyncAction::Comment { post_id, content };
        self.send_or_queue(Uuid::new_v4().to_string(), action).await
    }

    /// Toggle a like, queueing the toggle if it cannot be delivered.
    ///
    /// Queued likes are keyed by post, so toggling the same post repeatedly
    /// while offline leaves at most one queued entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the like outright or the
    /// fallback enqueue fails.
    pub async fn like(&self, post_id: PostId) -> Result<Delivery, SyncError> {
        let id = post_id.to_string();
        self.send_or_queue(id, SyncAction::Like { post_id }).await
    }

    /// Publish a post, queueing it if it cannot be delivered.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the post outright or the
    /// fallback enqueue fails.
    pub async fn publish_post(&self, post: NewPost) -> Result<Delivery, SyncError> {
        let action = SyncAction::Post { post };
        self.send_or_queue(Uuid::new_v4().to_string(), action).await
    }

    async fn send_or_queue(&self, id: String, action: SyncAction) -> Result<Delivery, SyncError> {
        if self.inner.network.is_online() {
            match self.dispatch(&action).await {
                Ok(()) => return Ok(Delivery::Sent),
                Err(e) if e.is_transient() => {
                    warn!(error = %e, kind = ?action.kind(), "Delivery failed, queueing for sync");
                }
                Err(e) => {
                    // Contract violations (bad token, missing resource)
                    // would fail every replay; surface them instead.
                    warn!(error = %e, kind = ?action.kind(), "Delivery rejected, not queueing");
                    return Err(e.into());
                }
            }
        }
        self.add_to_sync_queue(id, action).await?;
        Ok(Delivery::Queued)
    }

    async fn dispatch(&self, action: &SyncAction) -> Result<(), ApiError> {
        match action {
            SyncAction::Comment { post_id, content } => {
                self.inner.api.create_comment(post_id, content).await
            }
            SyncAction::Like { post_id } => self.inner.api.like_post(post_id).await,
            SyncAction::Post { post } => self.inner.api.create_post(post).await,
        }
    }

    async fn persist(&self, queue: &[SyncQueueItem]) -> Result<(), SyncError> {
        let json = serde_json::to_string(queue)?;
        self.inner.storage.set(SYNC_QUEUE_KEY, &json).await?;
        Ok(())
    }

    fn emit(&self, event: SyncEvent) {
        // No receivers is fine.
        let _ = self.inner.events.send(event);
    }

    // =========================================================================
    // Cache
    // =========================================================================

    /// Cache a value, optionally expiring after `expiry_minutes`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the storage write fails.
    pub async fn set_cache<T: serde::Serialize>(
        &self,
        key: &str,
        value: &T,
        expiry_minutes: Option<i64>,
    ) -> Result<(), CacheError> {
        self.inner.cache.set(key, value, expiry_minutes).await
    }

    /// Read a cached value. Misses and expired entries yield `None`.
    pub async fn get_cache<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.inner.cache.get(key).await
    }

    /// Delete a cached value.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage delete fails.
    pub async fn remove_cache(&self, key: &str) -> Result<(), CacheError> {
        self.inner.cache.remove(key).await
    }
}
