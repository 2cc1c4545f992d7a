use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::{EventType, LifecycleEvent};
use crate::key::ObjectKey;

/// Unique identifier for a queued message (UUID v7 for time-ordering).
///
/// Assigned once per materialized enqueue; deduplicated enqueues return the
/// id of the already-materialized message.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(uuid::Uuid);

impl MessageId {
    /// Generate a new time-ordered message id (UUID v7).
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Short representation (first 8 characters of the UUID).
    pub fn short_id(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self.short_id())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle issued on each delivery of a queued message.
///
/// Acknowledgment and visibility extension must present the handle from the
/// **current** delivery; a handle from a superseded delivery is stale.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceiptHandle(uuid::Uuid);

impl ReceiptHandle {
    /// Issue a fresh handle (UUID v4; no ordering significance).
    pub fn issue() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Short representation (first 8 characters of the UUID).
    pub fn short_id(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl fmt::Debug for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReceiptHandle({})", self.short_id())
    }
}

impl fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deduplication key: collapses logically identical events enqueued within
/// the same dedup window.
///
/// Derived from the object key, the event type, and the timestamp truncated
/// to the window (`timestamp_ms / window_ms`). Two events for the same object
/// and type whose timestamps fall in the same window share a key and are
/// collapsed to one queued message.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DedupKey {
    /// Key of the object the event refers to.
    pub key: ObjectKey,
    /// The event classification.
    pub event_type: EventType,
    /// Timestamp truncated to the dedup window.
    pub window_bucket: u64,
}

impl DedupKey {
    /// Derive the key for an event given the dedup window in milliseconds.
    ///
    /// A zero window is treated as one millisecond so the bucket arithmetic
    /// stays defined.
    pub fn derive(event: &LifecycleEvent, window_ms: u64) -> Self {
        let window_ms = window_ms.max(1);
        Self {
            key: event.key.clone(),
            event_type: event.event_type,
            window_bucket: event.timestamp_ms / window_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::BucketId;
    use proptest::prelude::*;

    fn event(key: &str, event_type: EventType, timestamp_ms: u64) -> LifecycleEvent {
        LifecycleEvent::new(
            BucketId::new("b").unwrap(),
            ObjectKey::new(key).unwrap(),
            event_type,
            timestamp_ms,
        )
    }

    #[test]
    fn message_ids_are_unique() {
        let a = MessageId::new();
        let b = MessageId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn message_id_short_id_length() {
        assert_eq!(MessageId::new().short_id().len(), 8);
    }

    #[test]
    fn receipt_handles_are_unique_per_issue() {
        assert_ne!(ReceiptHandle::issue(), ReceiptHandle::issue());
    }

    #[test]
    fn same_window_same_key() {
        let e1 = event("a.png", EventType::Created, 1_000);
        let e2 = event("a.png", EventType::Created, 1_999);
        let window = 1_000;
        assert_eq!(DedupKey::derive(&e1, window), DedupKey::derive(&e2, window));
    }

    #[test]
    fn different_window_different_key() {
        let e1 = event("a.png", EventType::Created, 1_000);
        let e2 = event("a.png", EventType::Created, 2_000);
        assert_ne!(DedupKey::derive(&e1, 1_000), DedupKey::derive(&e2, 1_000));
    }

    #[test]
    fn event_type_distinguishes_keys() {
        let e1 = event("a.png", EventType::Created, 1_000);
        let e2 = event("a.png", EventType::Removed, 1_000);
        assert_ne!(DedupKey::derive(&e1, 1_000), DedupKey::derive(&e2, 1_000));
    }

    #[test]
    fn zero_window_does_not_panic() {
        let e = event("a.png", EventType::Created, 123);
        let key = DedupKey::derive(&e, 0);
        assert_eq!(key.window_bucket, 123);
    }

    proptest! {
        #[test]
        fn derive_is_stable(ts in 0u64..u64::MAX / 2, window in 1u64..100_000) {
            let e = event("a.png", EventType::Created, ts);
            prop_assert_eq!(DedupKey::derive(&e, window), DedupKey::derive(&e, window));
        }

        #[test]
        fn events_within_one_window_collapse(
            base in 0u64..1_000_000u64,
            offset in 0u64..1_000u64,
            window in 1_000u64..10_000u64,
        ) {
            // Align the base to the window so base + offset stays inside it.
            let aligned = base - (base % window);
            let e1 = event("a.png", EventType::Created, aligned);
            let e2 = event("a.png", EventType::Created, aligned + (offset % window));
            prop_assert_eq!(DedupKey::derive(&e1, window), DedupKey::derive(&e2, window));
        }
    }
}
