use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::debug;

use oer_types::{LifecycleEvent, ObjectKey};

use crate::error::InvalidationResult;

/// A push-invalidation target.
///
/// Implementations must be idempotent: applying the same event more than once
/// has the same effect as applying it once. The dispatcher delivers
/// synchronously and at-least-once (retries plus queue redelivery can both
/// hand a sink the same event again).
pub trait InvalidationSink: Send + Sync {
    /// Apply the event to the sink.
    fn invalidate(&self, event: &LifecycleEvent) -> InvalidationResult<()>;
}

/// In-memory cache invalidator.
///
/// Models a cache keyed by object key: `prime` marks a key as cached, and a
/// `Removed` event evicts it. Evicting an absent key is a no-op, which is
/// what makes repeated delivery safe. `Created` events are ignored (a new
/// object has nothing stale to evict).
#[derive(Default)]
pub struct InMemoryInvalidator {
    cached: Mutex<HashSet<ObjectKey>>,
    evictions: AtomicU64,
}

impl InMemoryInvalidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a key as cached.
    pub fn prime(&self, key: ObjectKey) {
        self.cached.lock().expect("lock poisoned").insert(key);
    }

    /// Whether the key is still cached.
    pub fn is_cached(&self, key: &ObjectKey) -> bool {
        self.cached.lock().expect("lock poisoned").contains(key)
    }

    /// Number of evictions that actually removed an entry.
    pub fn eviction_count(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}

impl InvalidationSink for InMemoryInvalidator {
    fn invalidate(&self, event: &LifecycleEvent) -> InvalidationResult<()> {
        if !event.is_removed() {
            return Ok(());
        }
        let evicted = self
            .cached
            .lock()
            .expect("lock poisoned")
            .remove(&event.key);
        if evicted {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(key = %event.key, "cache entry evicted");
        }
        Ok(())
    }
}
