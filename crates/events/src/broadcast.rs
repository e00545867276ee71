//! Listener registry and asynchronous lock update fan-out.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use copydesk_core::LockActionResult;

/// Registration handle returned by [`LockBroadcaster::register`].
pub type ListenerId = Uuid;

// ---------------------------------------------------------------------------
// ListenerFilter
// ---------------------------------------------------------------------------

/// Which resources a listener wants updates for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerFilter {
    /// Updates for one specific resource only.
    Resource(String),
    /// Updates for every resource.
    AllResources,
}

impl ListenerFilter {
    /// Whether an update for `resource_id` passes this filter.
    pub fn matches(&self, resource_id: &str) -> bool {
        match self {
            Self::Resource(id) => id == resource_id,
            Self::AllResources => true,
        }
    }
}

// ---------------------------------------------------------------------------
// LockUpdateListener
// ---------------------------------------------------------------------------

/// An observer of lock state changes.
///
/// Delivery is fire-and-forget on a dedicated task per notification; a
/// listener that hangs or panics affects neither the lock engine nor the
/// other listeners.
#[async_trait]
pub trait LockUpdateListener: Send + Sync {
    /// The listener's resource filter.
    fn filter(&self) -> ListenerFilter;

    /// Called with every successful state change (and denied acquire)
    /// that passes the filter.
    async fn on_lock_update(&self, update: LockActionResult);
}

// ---------------------------------------------------------------------------
// LockBroadcaster
// ---------------------------------------------------------------------------

/// Registry of lock update listeners with asynchronous dispatch.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared between the lock engine and the embedding process.
#[derive(Default)]
pub struct LockBroadcaster {
    listeners: RwLock<HashMap<ListenerId, Arc<dyn LockUpdateListener>>>,
}

impl LockBroadcaster {
    /// Create an empty broadcaster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Returns the id used to unregister it.
    pub async fn register(&self, listener: Arc<dyn LockUpdateListener>) -> ListenerId {
        let id = Uuid::new_v4();
        self.listeners.write().await.insert(id, listener);
        tracing::debug!(listener_id = %id, "Lock update listener registered");
        id
    }

    /// Remove a listener. Returns `false` if the id was not registered.
    pub async fn unregister(&self, id: ListenerId) -> bool {
        let removed = self.listeners.write().await.remove(&id).is_some();
        if removed {
            tracing::debug!(listener_id = %id, "Lock update listener unregistered");
        }
        removed
    }

    /// Current number of registered listeners.
    pub async fn listener_count(&self) -> usize {
        self.listeners.read().await.len()
    }

    /// Fan a result out to every listener whose filter matches the
    /// result's resource.
    ///
    /// Each delivery runs on its own spawned task, so a slow or failing
    /// listener never blocks the caller or its peers. There is no
    /// acknowledgment and no retry.
    pub async fn broadcast(&self, result: &LockActionResult) {
        let Some(resource_id) = result.record.as_ref().map(|r| r.resource_id.clone()) else {
            return;
        };

        let targets: Vec<Arc<dyn LockUpdateListener>> = self
            .listeners
            .read()
            .await
            .values()
            .filter(|listener| listener.filter().matches(&resource_id))
            .cloned()
            .collect();

        tracing::debug!(
            resource_id = %resource_id,
            listeners = targets.len(),
            "Dispatching lock update"
        );

        for listener in targets {
            let update = result.clone();
            tokio::spawn(async move {
                listener.on_lock_update(update).await;
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use copydesk_core::{LockLevel, LockOperation, LockRecord};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingListener {
        filter: ListenerFilter,
        seen: AtomicUsize,
    }

    #[async_trait]
    impl LockUpdateListener for CountingListener {
        fn filter(&self) -> ListenerFilter {
            self.filter.clone()
        }

        async fn on_lock_update(&self, _update: LockActionResult) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn acquired(resource: &str) -> LockActionResult {
        let record = LockRecord::new(resource, "alice", LockLevel::Document, None)
            .unwrap()
            .with_session("s1");
        LockActionResult::new(
            true,
            LockOperation::Acquire,
            Some(record.clone()),
            vec![record],
        )
    }

    async fn settle() {
        // Give spawned delivery tasks a chance to run.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn filter_matching() {
        let specific = ListenerFilter::Resource("doc1".to_string());
        assert!(specific.matches("doc1"));
        assert!(!specific.matches("doc2"));
        assert!(ListenerFilter::AllResources.matches("doc1"));
        assert!(ListenerFilter::AllResources.matches("doc2"));
    }

    #[tokio::test]
    async fn register_and_unregister() {
        let broadcaster = LockBroadcaster::new();
        let listener = Arc::new(CountingListener {
            filter: ListenerFilter::AllResources,
            seen: AtomicUsize::new(0),
        });

        let id = broadcaster.register(listener).await;
        assert_eq!(broadcaster.listener_count().await, 1);

        assert!(broadcaster.unregister(id).await);
        assert_eq!(broadcaster.listener_count().await, 0);
        assert!(!broadcaster.unregister(id).await);
    }

    #[tokio::test]
    async fn broadcast_respects_filters() {
        let broadcaster = LockBroadcaster::new();
        let doc1_listener = Arc::new(CountingListener {
            filter: ListenerFilter::Resource("doc1".to_string()),
            seen: AtomicUsize::new(0),
        });
        let wildcard = Arc::new(CountingListener {
            filter: ListenerFilter::AllResources,
            seen: AtomicUsize::new(0),
        });
        broadcaster.register(doc1_listener.clone()).await;
        broadcaster.register(wildcard.clone()).await;

        broadcaster.broadcast(&acquired("doc1")).await;
        broadcaster.broadcast(&acquired("doc2")).await;
        settle().await;

        assert_eq!(doc1_listener.seen.load(Ordering::SeqCst), 1);
        assert_eq!(wildcard.seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn broadcast_without_record_is_dropped() {
        let broadcaster = LockBroadcaster::new();
        let listener = Arc::new(CountingListener {
            filter: ListenerFilter::AllResources,
            seen: AtomicUsize::new(0),
        });
        broadcaster.register(listener.clone()).await;

        let result = LockActionResult::new(true, LockOperation::Release, None, vec![]);
        broadcaster.broadcast(&result).await;
        settle().await;

        assert_eq!(listener.seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn panicking_listener_does_not_poison_others() {
        struct PanickingListener;

        #[async_trait]
        impl LockUpdateListener for PanickingListener {
            fn filter(&self) -> ListenerFilter {
                ListenerFilter::AllResources
            }

            async fn on_lock_update(&self, _update: LockActionResult) {
                panic!("listener failure");
            }
        }

        let broadcaster = LockBroadcaster::new();
        let healthy = Arc::new(CountingListener {
            filter: ListenerFilter::AllResources,
            seen: AtomicUsize::new(0),
        });
        broadcaster.register(Arc::new(PanickingListener)).await;
        broadcaster.register(healthy.clone()).await;

        broadcaster.broadcast(&acquired("doc1")).await;
        settle().await;

        assert_eq!(healthy.seen.load(Ordering::SeqCst), 1);
    }
}
