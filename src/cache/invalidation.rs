use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{keys, PermissionCache};

enum Command {
    Delete(String),
    Flush(oneshot::Sender<()>),
}

/// Fire-and-forget cache invalidation.
///
/// Requests are handed to a background worker over a bounded channel.
/// Delivery is best-effort: when the queue is full or the worker has stopped
/// the request is dropped with a warning, and backend failures are swallowed
/// by [`PermissionCache`]. A dropped request leaves the old entry in place
/// until its TTL expires, which bounds how stale a reader can get.
#[derive(Clone)]
pub struct InvalidationQueue {
    tx: mpsc::Sender<Command>,
}

impl InvalidationQueue {
    /// Starts the worker. Must be called from within a Tokio runtime.
    pub fn spawn(cache: PermissionCache, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Command>(capacity.max(1));

        let handle = tokio::spawn(async move {
            tracing::debug!("cache invalidation worker started");
            while let Some(command) = rx.recv().await {
                match command {
                    Command::Delete(key) => {
                        cache.delete(&key).await;
                        tracing::debug!(key = %key, "cache entry invalidated");
                    }
                    Command::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
            tracing::debug!("cache invalidation worker stopped");
        });

        (Self { tx }, handle)
    }

    /// Enqueues removal of `key` without waiting.
    pub fn invalidate(&self, key: String) {
        if self.tx.try_send(Command::Delete(key.clone())).is_err() {
            tracing::warn!(key = %key, "dropping cache invalidation request");
        }
    }

    pub fn invalidate_role(&self, role_id: Uuid) {
        self.invalidate(keys::role_permissions(role_id));
    }

    pub fn invalidate_company_members(&self, company_id: Uuid) {
        self.invalidate(keys::company_members(company_id));
    }

    pub fn invalidate_catalog(&self) {
        self.invalidate(keys::CATALOG.to_string());
    }

    /// Waits until every request enqueued before this call has been handled.
    /// Returns immediately if the worker is gone.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(ack_tx)).await.is_err() {
            return;
        }
        let _ = ack_rx.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Cache, MemoryCache};
    use crate::config::CacheTtls;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn queued_invalidation_removes_entry_after_flush() {
        let backend = Arc::new(MemoryCache::new());
        let cache = PermissionCache::new(backend.clone(), CacheTtls::default());
        let role_id = Uuid::new_v4();
        let key = keys::role_permissions(role_id);
        backend.set(&key, b"{}".to_vec(), Duration::from_secs(60)).await.unwrap();

        let (queue, _worker) = InvalidationQueue::spawn(cache, 8);
        queue.invalidate_role(role_id);
        queue.flush().await;

        assert!(!backend.contains_key(&key));
    }

    #[tokio::test]
    async fn invalidate_after_worker_stops_does_not_panic() {
        let (queue, worker) = InvalidationQueue::spawn(PermissionCache::disabled(), 1);
        worker.abort();
        let _ = worker.await;

        queue.invalidate_catalog();
        queue.flush().await;
    }
}
