use serde::{Deserialize, Serialize};

use oer_types::{DedupKey, LifecycleEvent, MessageId, ReceiptHandle};

/// A delivered queue message.
///
/// Issued by `receive`; owned by the queue until acknowledged or until the
/// visibility deadline passes. The receipt handle is valid only for this
/// delivery — a redelivery supersedes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    /// Stable message identifier, assigned at enqueue.
    pub message_id: MessageId,
    /// The wrapped lifecycle event.
    pub event: LifecycleEvent,
    /// Deduplication key the message was enqueued under.
    pub dedup_key: DedupKey,
    /// Handle for acknowledging or extending this delivery.
    pub receipt_handle: ReceiptHandle,
    /// How many times the message has been delivered, this one included.
    pub delivery_count: u32,
    /// Lease expiry: the message becomes visible again after this instant.
    pub visibility_deadline_ms: u64,
}

impl QueueMessage {
    /// Returns `true` if this is a redelivery.
    pub fn is_redelivery(&self) -> bool {
        self.delivery_count > 1
    }
}
