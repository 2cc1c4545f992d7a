//! High-level entry point for the Object Event Relay.
//!
//! [`Relay`] wires the whole pipeline: an object bucket whose mutations emit
//! lifecycle events, a dispatcher that pushes removals to cache invalidators
//! and enqueues everything onto the ordered delivery queue, and broadcast
//! workers that drain the queue into downstream sinks.
//!
//! ```no_run
//! use std::sync::Arc;
//! use oer_sdk::{BucketId, BucketStore, ObjectKey, Relay, RelayConfig, RecordingSink};
//!
//! # #[tokio::main] async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let relay = Relay::in_memory(BucketId::new("image-store")?, RelayConfig::default());
//! let sink = Arc::new(RecordingSink::new());
//! let (shutdown, worker) = relay.spawn_broadcaster(sink.clone());
//!
//! relay.bucket().put(&ObjectKey::new("a.png")?, b"bytes".to_vec())?;
//!
//! shutdown.signal();
//! worker.await?;
//! # Ok(()) }
//! ```

mod config;
mod error;
mod relay;

pub use config::RelayConfig;
pub use error::{RelayError, RelayResult};
pub use relay::Relay;

// The surface a typical embedder needs, re-exported from the member crates.
pub use oer_broadcast::{
    BroadcastError, BroadcastSink, BroadcastWorker, FanoutSink, RecordingSink, ShutdownHandle,
    WorkerConfig,
};
pub use oer_dispatch::{
    DispatchReport, Dispatcher, EventTypeFilter, InMemoryInvalidator, InvalidationError,
    InvalidationSink, PushSubscription, RetryPolicy,
};
pub use oer_queue::{
    DeadLetterSink, DeliveryQueue, EventQueue, InMemoryDeadLetter, QueueConfig, QueueError,
    QueueMessage, SyncMode,
};
pub use oer_store::{BucketStore, InMemoryBucket, LifecycleSource, MutationHook, StoreError};
pub use oer_types::{
    BucketId, Clock, EventType, LifecycleEvent, ManualClock, MessageId, ObjectKey, ReceiptHandle,
    SystemClock,
};
