use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use oer_types::{BucketId, Clock, EventType, LifecycleEvent, ObjectKey, SystemClock};

use crate::error::StoreResult;
use crate::traits::{BucketStore, LifecycleSource, MutationHook};

/// In-memory, `HashMap`-based bucket.
///
/// Intended for tests and embedding. Objects are held behind a `RwLock` for
/// safe concurrent access; lifecycle events are emitted to registered hooks
/// after the object-map lock has been released.
pub struct InMemoryBucket {
    id: BucketId,
    clock: Arc<dyn Clock>,
    objects: RwLock<HashMap<ObjectKey, Vec<u8>>>,
    hooks: RwLock<Vec<MutationHook>>,
}

impl InMemoryBucket {
    /// Create an empty bucket using the system wall clock.
    pub fn new(id: BucketId) -> Self {
        Self::with_clock(id, Arc::new(SystemClock))
    }

    /// Create an empty bucket with an injected clock (for tests).
    pub fn with_clock(id: BucketId, clock: Arc<dyn Clock>) -> Self {
        Self {
            id,
            clock,
            objects: RwLock::new(HashMap::new()),
            hooks: RwLock::new(Vec::new()),
        }
    }

    /// This bucket's identifier.
    pub fn id(&self) -> &BucketId {
        &self.id
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the bucket is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Invoke every registered hook with the event, in registration order.
    fn emit(&self, event_type: EventType, key: &ObjectKey) {
        let event = LifecycleEvent::new(
            self.id.clone(),
            key.clone(),
            event_type,
            self.clock.now_ms(),
        );
        debug!(bucket = %self.id, key = %key, kind = %event_type, "lifecycle event");

        let hooks = self.hooks.read().expect("lock poisoned");
        for hook in hooks.iter() {
            hook(&event);
        }
    }
}

impl BucketStore for InMemoryBucket {
    fn put(&self, key: &ObjectKey, data: Vec<u8>) -> StoreResult<()> {
        {
            let mut map = self.objects.write().expect("lock poisoned");
            map.insert(key.clone(), data);
        }
        // Mutation is complete; notify. Overwrites also count as Created.
        self.emit(EventType::Created, key);
        Ok(())
    }

    fn get(&self, key: &ObjectKey) -> StoreResult<Option<Vec<u8>>> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.get(key).cloned())
    }

    fn delete(&self, key: &ObjectKey) -> StoreResult<bool> {
        let existed = {
            let mut map = self.objects.write().expect("lock poisoned");
            map.remove(key).is_some()
        };
        if existed {
            self.emit(EventType::Removed, key);
        }
        Ok(existed)
    }

    fn exists(&self, key: &ObjectKey) -> StoreResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(key))
    }
}

impl LifecycleSource for InMemoryBucket {
    fn on_mutation(&self, hook: MutationHook) {
        self.hooks.write().expect("lock poisoned").push(hook);
    }
}

impl std::fmt::Debug for InMemoryBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBucket")
            .field("id", &self.id)
            .field("object_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use oer_types::ManualClock;

    fn bucket() -> InMemoryBucket {
        InMemoryBucket::new(BucketId::new("image-store").unwrap())
    }

    fn key(s: &str) -> ObjectKey {
        ObjectKey::new(s).unwrap()
    }

    /// Hook that records every event it sees.
    fn recording_hook() -> (MutationHook, Arc<Mutex<Vec<LifecycleEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let hook: MutationHook = Arc::new(move |event: &LifecycleEvent| {
            sink.lock().unwrap().push(event.clone());
        });
        (hook, seen)
    }

    // -----------------------------------------------------------------------
    // Core CRUD
    // -----------------------------------------------------------------------

    #[test]
    fn put_and_get() {
        let bucket = bucket();
        bucket.put(&key("a.png"), b"bytes".to_vec()).unwrap();
        assert_eq!(bucket.get(&key("a.png")).unwrap().unwrap(), b"bytes");
        assert!(bucket.exists(&key("a.png")).unwrap());
    }

    #[test]
    fn get_missing_returns_none() {
        let bucket = bucket();
        assert!(bucket.get(&key("missing.png")).unwrap().is_none());
    }

    #[test]
    fn delete_present_and_missing() {
        let bucket = bucket();
        bucket.put(&key("a.png"), vec![1]).unwrap();
        assert!(bucket.delete(&key("a.png")).unwrap());
        assert!(!bucket.exists(&key("a.png")).unwrap());
        assert!(!bucket.delete(&key("a.png")).unwrap());
    }

    #[test]
    fn put_overwrites() {
        let bucket = bucket();
        bucket.put(&key("a.png"), vec![1]).unwrap();
        bucket.put(&key("a.png"), vec![2]).unwrap();
        assert_eq!(bucket.get(&key("a.png")).unwrap().unwrap(), vec![2]);
        assert_eq!(bucket.len(), 1);
    }

    // -----------------------------------------------------------------------
    // Lifecycle event emission
    // -----------------------------------------------------------------------

    #[test]
    fn put_emits_created() {
        let bucket = bucket();
        let (hook, seen) = recording_hook();
        bucket.on_mutation(hook);

        bucket.put(&key("a.png"), vec![1]).unwrap();

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::Created);
        assert_eq!(events[0].key, key("a.png"));
        assert_eq!(events[0].bucket, BucketId::new("image-store").unwrap());
    }

    #[test]
    fn overwrite_emits_created_again() {
        let bucket = bucket();
        let (hook, seen) = recording_hook();
        bucket.on_mutation(hook);

        bucket.put(&key("a.png"), vec![1]).unwrap();
        bucket.put(&key("a.png"), vec![2]).unwrap();

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.event_type == EventType::Created));
    }

    #[test]
    fn delete_emits_removed_only_if_existed() {
        let bucket = bucket();
        let (hook, seen) = recording_hook();
        bucket.on_mutation(hook);

        bucket.delete(&key("ghost.png")).unwrap();
        assert!(seen.lock().unwrap().is_empty());

        bucket.put(&key("a.png"), vec![1]).unwrap();
        bucket.delete(&key("a.png")).unwrap();

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event_type, EventType::Removed);
    }

    #[test]
    fn hooks_fire_in_registration_order() {
        let bucket = bucket();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let order = Arc::clone(&order);
            bucket.on_mutation(Arc::new(move |_event: &LifecycleEvent| {
                order.lock().unwrap().push(tag);
            }));
        }

        bucket.put(&key("a.png"), vec![1]).unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn events_carry_clock_timestamps() {
        let clock = Arc::new(ManualClock::new(5_000));
        let bucket =
            InMemoryBucket::with_clock(BucketId::new("image-store").unwrap(), clock.clone());
        let (hook, seen) = recording_hook();
        bucket.on_mutation(hook);

        bucket.put(&key("a.png"), vec![1]).unwrap();
        clock.advance(250);
        bucket.delete(&key("a.png")).unwrap();

        let events = seen.lock().unwrap();
        assert_eq!(events[0].timestamp_ms, 5_000);
        assert_eq!(events[1].timestamp_ms, 5_250);
    }

    // -----------------------------------------------------------------------
    // Concurrent access
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_puts_are_safe() {
        use std::thread;

        let bucket = Arc::new(bucket());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let bucket = Arc::clone(&bucket);
                thread::spawn(move || {
                    let k = ObjectKey::new(format!("obj-{i}.png")).unwrap();
                    bucket.put(&k, vec![i as u8]).unwrap();
                })
            })
            .collect();

        for h in handles {
            h.join().expect("thread should not panic");
        }
        assert_eq!(bucket.len(), 8);
    }
}
