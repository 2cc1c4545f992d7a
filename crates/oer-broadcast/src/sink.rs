use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::warn;

use oer_types::{LifecycleEvent, ObjectKey};

use crate::error::{BroadcastError, BroadcastResult};

/// A broadcast target.
///
/// The worker delivers at-least-once: a sink may see the same event again
/// after a failure or a visibility expiry, so implementations must tolerate
/// duplicates.
#[async_trait]
pub trait BroadcastSink: Send + Sync {
    /// Deliver one event to the target.
    async fn broadcast(&self, event: &LifecycleEvent) -> BroadcastResult<()>;
}

/// Delivers each event to every child sink.
///
/// All children are attempted even when an earlier one fails; any failure
/// makes the whole fanout fail so the message is redelivered. Children must
/// therefore tolerate re-receiving events they already handled.
pub struct FanoutSink {
    children: Vec<Arc<dyn BroadcastSink>>,
}

impl FanoutSink {
    pub fn new(children: Vec<Arc<dyn BroadcastSink>>) -> Self {
        Self { children }
    }

    /// Number of child sinks.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns `true` if there are no child sinks.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

#[async_trait]
impl BroadcastSink for FanoutSink {
    async fn broadcast(&self, event: &LifecycleEvent) -> BroadcastResult<()> {
        let mut failed = 0;
        for (index, child) in self.children.iter().enumerate() {
            if let Err(e) = child.broadcast(event).await {
                warn!(child = index, key = %event.key, error = %e, "fanout child failed");
                failed += 1;
            }
        }
        if failed > 0 {
            return Err(BroadcastError::PartialFanout {
                failed,
                total: self.children.len(),
            });
        }
        Ok(())
    }
}

/// Recording sink for tests and embedding.
///
/// Records every delivered event; delivery of a key registered via
/// [`fail_on`](Self::fail_on) fails until [`heal`](Self::heal) is called.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LifecycleEvent>>,
    fail_keys: Mutex<HashSet<ObjectKey>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make deliveries for this key fail.
    pub fn fail_on(&self, key: ObjectKey) {
        self.fail_keys.lock().expect("lock poisoned").insert(key);
    }

    /// Stop failing deliveries for this key.
    pub fn heal(&self, key: &ObjectKey) {
        self.fail_keys.lock().expect("lock poisoned").remove(key);
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().expect("lock poisoned").len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().expect("lock poisoned").is_empty()
    }

    /// Snapshot of recorded events, in delivery order.
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl BroadcastSink for RecordingSink {
    async fn broadcast(&self, event: &LifecycleEvent) -> BroadcastResult<()> {
        if self
            .fail_keys
            .lock()
            .expect("lock poisoned")
            .contains(&event.key)
        {
            return Err(BroadcastError::Unavailable(format!(
                "injected failure for {}",
                event.key
            )));
        }
        self.events
            .lock()
            .expect("lock poisoned")
            .push(event.clone());
        Ok(())
    }
}
