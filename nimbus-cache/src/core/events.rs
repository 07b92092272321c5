use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};
use uuid::Uuid;

/// Unique identifier for an emptiness subscriber
pub type SubscriberId = Uuid;

/// Callback invoked when the cache is observed empty
pub type EmptyCacheHandler = Arc<dyn Fn(&EmptyCacheEvent) + Send + Sync>;

/// What observed the empty cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptySource {
    /// A `remove` took out the last entry
    Removal,
    /// An explicit `clear`
    Clear,
    /// Periodic cleaner tick
    Cleaner,
}

/// Payload delivered to every subscriber
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmptyCacheEvent {
    pub source: EmptySource,
    pub raised_at: DateTime<Utc>,
}

impl EmptyCacheEvent {
    pub fn new(source: EmptySource) -> Self {
        Self {
            source,
            raised_at: Utc::now(),
        }
    }
}

/// Delivery counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Notifications raised
    pub notifications: u64,
    /// Handler invocations that returned normally
    pub delivered: u64,
    /// Handler invocations that panicked
    pub failed: u64,
}

/// Emptiness subscribers and notification delivery
pub struct EventDispatcher {
    subscribers: RwLock<Vec<(SubscriberId, EmptyCacheHandler)>>,
    notifications: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            notifications: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Register a handler; handlers run in subscription order
    pub fn subscribe<F>(&self, handler: F) -> SubscriberId
    where
        F: Fn(&EmptyCacheEvent) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.subscribers.write().push((id, Arc::new(handler)));
        debug!("Empty-cache subscriber registered: {}", id);
        id
    }

    /// Remove a handler; false if the id is unknown
    pub fn unsubscribe(&self, id: &SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| sub_id != id);
        let removed = subscribers.len() != before;
        if removed {
            debug!("Empty-cache subscriber removed: {}", id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    /// Drop every handler
    pub fn clear(&self) {
        self.subscribers.write().clear();
    }

    /// Deliver an event to the subscribers registered at call time.
    ///
    /// Handlers run without the subscriber lock held, so they may subscribe
    /// or unsubscribe. A panicking handler is logged and skipped.
    /// Returns the number of handlers that completed.
    pub fn notify(&self, source: EmptySource) -> usize {
        let snapshot: Vec<(SubscriberId, EmptyCacheHandler)> = self
            .subscribers
            .read()
            .iter()
            .map(|(id, handler)| (*id, Arc::clone(handler)))
            .collect();

        self.notifications.fetch_add(1, Ordering::Relaxed);
        let event = EmptyCacheEvent::new(source);
        debug!(
            "Cache empty ({:?}), notifying {} subscribers",
            source,
            snapshot.len()
        );

        let mut completed = 0;
        for (id, handler) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(()) => completed += 1,
                Err(_) => {
                    self.failed.fetch_add(1, Ordering::Relaxed);
                    warn!("Empty-cache subscriber {} panicked during notification", id);
                }
            }
        }

        self.delivered.fetch_add(completed as u64, Ordering::Relaxed);
        completed
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            notifications: self.notifications.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_subscribe_notify() {
        let dispatcher = EventDispatcher::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        dispatcher.subscribe(move |event| {
            assert_eq!(event.source, EmptySource::Clear);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(dispatcher.notify(EmptySource::Clear), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let dispatcher = EventDispatcher::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let id = dispatcher.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(dispatcher.unsubscribe(&id));
        assert!(!dispatcher.unsubscribe(&id));
        assert_eq!(dispatcher.notify(EmptySource::Removal), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_panicking_handler_isolated() {
        let dispatcher = EventDispatcher::new();
        let calls = Arc::new(AtomicUsize::new(0));

        dispatcher.subscribe(|_| panic!("subscriber failure"));
        let counter = Arc::clone(&calls);
        dispatcher.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(dispatcher.notify(EmptySource::Cleaner), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stats = dispatcher.stats();
        assert_eq!(stats.notifications, 1);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.failed, 1);
    }

    #[test]
    fn test_handler_can_unsubscribe_itself() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let slot: Arc<RwLock<Option<SubscriberId>>> = Arc::new(RwLock::new(None));

        let inner = Arc::clone(&dispatcher);
        let own_id = Arc::clone(&slot);
        let id = dispatcher.subscribe(move |_| {
            if let Some(id) = *own_id.read() {
                inner.unsubscribe(&id);
            }
        });
        *slot.write() = Some(id);

        assert_eq!(dispatcher.notify(EmptySource::Removal), 1);
        assert!(dispatcher.is_empty());
    }
}
