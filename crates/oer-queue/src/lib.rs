//! Ordered, at-least-once delivery queue for object lifecycle events.
//!
//! The queue accepts [`LifecycleEvent`](oer_types::LifecycleEvent)s from the
//! dispatcher and hands them to consumers in batches. Messages for the same
//! object key form an ordering group and are delivered FIFO within it;
//! duplicates within the deduplication window collapse to a single message.
//! Delivered messages are invisible under a visibility lease until
//! acknowledged; unacknowledged messages are redelivered, and messages that
//! exhaust the redelivery budget move to a [`DeadLetterSink`].
//!
//! An optional append-only journal makes pending messages survive restarts.

mod config;
mod dead_letter;
mod error;
mod journal;
mod message;
mod queue;
mod traits;

pub use config::QueueConfig;
pub use dead_letter::{DeadLetterSink, InMemoryDeadLetter};
pub use error::{QueueError, QueueResult};
pub use journal::{Journal, JournalEntry, SyncMode};
pub use message::QueueMessage;
pub use queue::DeliveryQueue;
pub use traits::EventQueue;
