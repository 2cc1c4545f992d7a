use std::time::Duration;

use oer_types::{LifecycleEvent, MessageId, ReceiptHandle};

use crate::error::QueueResult;
use crate::message::QueueMessage;

/// The delivery-queue seam between producers (the dispatcher) and consumers
/// (broadcast workers).
///
/// All implementations must satisfy these invariants:
/// - At-least-once: a message received but never acknowledged before its
///   visibility deadline becomes visible again and is redelivered.
/// - No two concurrent `receive` calls return the same message while its
///   lease is active.
/// - FIFO holds within one ordering group (one object key); cross-group
///   ordering is unspecified.
/// - Acknowledgment is atomic per message; there is no partial ack.
pub trait EventQueue: Send + Sync {
    /// Enqueue an event. Idempotent within the dedup window: a duplicate
    /// returns the id of the already-materialized message.
    fn enqueue(&self, event: &LifecycleEvent) -> QueueResult<MessageId>;

    /// Enqueue with strict duplicate signaling: a duplicate within the window
    /// fails with [`crate::QueueError::DuplicateWindow`].
    fn enqueue_strict(&self, event: &LifecycleEvent) -> QueueResult<MessageId>;

    /// Return up to `max_messages` visible messages, leasing each until
    /// `visibility_timeout` elapses. An empty result is valid.
    fn receive(
        &self,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> QueueResult<Vec<QueueMessage>>;

    /// Permanently remove the message behind the receipt handle.
    fn acknowledge(&self, receipt: ReceiptHandle) -> QueueResult<()>;

    /// Push the visibility deadline of an in-flight message further out.
    fn extend_visibility(&self, receipt: ReceiptHandle, additional: Duration) -> QueueResult<()>;
}
