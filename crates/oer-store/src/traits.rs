use std::sync::Arc;

use oer_types::{LifecycleEvent, ObjectKey};

use crate::error::StoreResult;

/// Callback invoked synchronously after each successful mutation.
pub type MutationHook = Arc<dyn Fn(&LifecycleEvent) + Send + Sync>;

/// Named byte-blob storage.
///
/// All implementations must satisfy these invariants:
/// - A successful `put` or `delete` completes before any lifecycle event for
///   it is emitted; notification can never roll the mutation back.
/// - `put` over an existing key replaces the data (last write wins).
/// - Concurrent reads are always safe.
/// - All I/O errors are propagated, never silently ignored.
pub trait BucketStore: Send + Sync {
    /// Write an object under the given key, replacing any existing data.
    fn put(&self, key: &ObjectKey, data: Vec<u8>) -> StoreResult<()>;

    /// Read an object. Returns `Ok(None)` if the key does not exist.
    fn get(&self, key: &ObjectKey) -> StoreResult<Option<Vec<u8>>>;

    /// Delete an object. Returns `true` if the key existed.
    fn delete(&self, key: &ObjectKey) -> StoreResult<bool>;

    /// Check whether a key exists.
    fn exists(&self, key: &ObjectKey) -> StoreResult<bool>;
}

/// Registration hook for lifecycle event consumers.
///
/// The store invokes every registered hook synchronously after each
/// successful mutating call, in registration order.
pub trait LifecycleSource {
    /// Register a callback for all future mutations.
    fn on_mutation(&self, hook: MutationHook);
}
