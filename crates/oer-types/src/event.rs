use std::fmt;

use serde::{Deserialize, Serialize};

use crate::key::{BucketId, ObjectKey};

/// Classification of object lifecycle events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// An object was written (new or overwrite).
    Created,
    /// An object was deleted.
    Removed,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "Created",
            Self::Removed => "Removed",
        };
        write!(f, "{s}")
    }
}

/// Notification that an object was created or removed.
///
/// Emitted by the object store synchronously after every successful mutating
/// operation, and immutable once emitted. Each event is delivered at least
/// once to every registered sink; consumers must tolerate duplicates.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Bucket the mutation happened in.
    pub bucket: BucketId,
    /// Key of the mutated object.
    pub key: ObjectKey,
    /// What happened to the object.
    pub event_type: EventType,
    /// Wall-clock milliseconds since UNIX epoch at emission time.
    pub timestamp_ms: u64,
}

impl LifecycleEvent {
    /// Build an event with explicit fields.
    pub fn new(bucket: BucketId, key: ObjectKey, event_type: EventType, timestamp_ms: u64) -> Self {
        Self {
            bucket,
            key,
            event_type,
            timestamp_ms,
        }
    }

    /// Convenience constructor for a `Created` event.
    pub fn created(bucket: BucketId, key: ObjectKey, timestamp_ms: u64) -> Self {
        Self::new(bucket, key, EventType::Created, timestamp_ms)
    }

    /// Convenience constructor for a `Removed` event.
    pub fn removed(bucket: BucketId, key: ObjectKey, timestamp_ms: u64) -> Self {
        Self::new(bucket, key, EventType::Removed, timestamp_ms)
    }

    /// Returns `true` for `Removed` events.
    pub fn is_removed(&self) -> bool {
        self.event_type == EventType::Removed
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}/{} @ {}ms)",
            self.event_type, self.bucket, self.key, self.timestamp_ms
        )
    }
}
