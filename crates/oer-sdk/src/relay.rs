use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use oer_broadcast::{BroadcastSink, BroadcastWorker, ShutdownHandle};
use oer_dispatch::{Dispatcher, EventTypeFilter, InvalidationSink, PushSubscription};
use oer_queue::{DeliveryQueue, InMemoryDeadLetter, QueueMessage};
use oer_store::{InMemoryBucket, LifecycleSource};
use oer_types::{BucketId, Clock, EventType, SystemClock};

use crate::config::RelayConfig;
use crate::error::RelayResult;

/// A fully wired relay: bucket, dispatcher, delivery queue, and dead-letter
/// sink behind one handle.
///
/// Every successful bucket mutation flows through the dispatcher: matching
/// push subscriptions are invoked synchronously, and the event is enqueued
/// for the broadcast workers. Dispatch outcomes are logged, never surfaced
/// to the mutating caller.
pub struct Relay {
    config: RelayConfig,
    bucket: Arc<InMemoryBucket>,
    queue: Arc<DeliveryQueue>,
    dispatcher: Arc<Dispatcher>,
    dead_letter: Arc<InMemoryDeadLetter>,
}

impl Relay {
    /// Build a relay with no journal, using the system wall clock.
    pub fn in_memory(bucket_id: BucketId, config: RelayConfig) -> Self {
        Self::in_memory_with_clock(bucket_id, config, Arc::new(SystemClock))
    }

    /// Build a journal-less relay with an injected clock (for tests).
    pub fn in_memory_with_clock(
        bucket_id: BucketId,
        config: RelayConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let dead_letter = Arc::new(InMemoryDeadLetter::new());
        let queue = Arc::new(DeliveryQueue::in_memory(
            config.queue.clone(),
            clock.clone(),
            dead_letter.clone(),
        ));
        Self::assemble(bucket_id, config, clock, queue, dead_letter)
    }

    /// Build a relay whose queue journals to `path`, using the system clock.
    /// Messages pending at the last shutdown are recovered.
    pub fn open(bucket_id: BucketId, path: &Path, config: RelayConfig) -> RelayResult<Self> {
        Self::open_with_clock(bucket_id, path, config, Arc::new(SystemClock))
    }

    /// Durable variant with an injected clock (for tests).
    pub fn open_with_clock(
        bucket_id: BucketId,
        path: &Path,
        config: RelayConfig,
        clock: Arc<dyn Clock>,
    ) -> RelayResult<Self> {
        let dead_letter = Arc::new(InMemoryDeadLetter::new());
        let queue = Arc::new(DeliveryQueue::open(
            path,
            config.queue.clone(),
            clock.clone(),
            dead_letter.clone(),
        )?);
        Ok(Self::assemble(bucket_id, config, clock, queue, dead_letter))
    }

    fn assemble(
        bucket_id: BucketId,
        config: RelayConfig,
        clock: Arc<dyn Clock>,
        queue: Arc<DeliveryQueue>,
        dead_letter: Arc<InMemoryDeadLetter>,
    ) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(queue.clone(), config.retry.clone()));
        let bucket = Arc::new(InMemoryBucket::with_clock(bucket_id.clone(), clock));

        let hook_dispatcher = Arc::clone(&dispatcher);
        bucket.on_mutation(Arc::new(move |event| {
            hook_dispatcher.dispatch(event);
        }));

        info!(bucket = %bucket_id, "relay assembled");
        Self {
            config,
            bucket,
            queue,
            dispatcher,
            dead_letter,
        }
    }

    /// The object bucket. Mutations through it feed the pipeline.
    pub fn bucket(&self) -> &Arc<InMemoryBucket> {
        &self.bucket
    }

    /// The delivery queue behind the dispatcher.
    pub fn queue(&self) -> &Arc<DeliveryQueue> {
        &self.queue
    }

    /// The dead-letter sink attached to the queue.
    pub fn dead_letter(&self) -> &Arc<InMemoryDeadLetter> {
        &self.dead_letter
    }

    /// The active configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Register a push subscription on the dispatcher.
    pub fn subscribe(&self, subscription: PushSubscription) {
        self.dispatcher.subscribe(subscription);
    }

    /// Register a cache invalidator: a push subscription receiving only
    /// `Removed` events.
    pub fn subscribe_invalidator(&self, name: impl Into<String>, sink: Arc<dyn InvalidationSink>) {
        self.subscribe(PushSubscription::new(
            name,
            EventTypeFilter::only(EventType::Removed),
            sink,
        ));
    }

    /// Spawn a broadcast worker draining the queue into `sink`.
    ///
    /// Must be called from within a tokio runtime. Multiple workers may run
    /// against the same relay; the queue guarantees no message is shared
    /// between them while leased.
    pub fn spawn_broadcaster(
        &self,
        sink: Arc<dyn BroadcastSink>,
    ) -> (ShutdownHandle, JoinHandle<()>) {
        BroadcastWorker::new(self.queue.clone(), sink, self.config.worker.clone()).spawn()
    }

    /// Messages that exhausted their redelivery budget.
    pub fn poison_messages(&self) -> Vec<QueueMessage> {
        self.dead_letter.messages()
    }
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("bucket", &self.bucket.id())
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}
