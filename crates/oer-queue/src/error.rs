use oer_types::{MessageId, ReceiptHandle};

/// Errors produced by the ordered delivery queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The durable backing store cannot accept the operation. Transient;
    /// callers retry with backoff and surface exhaustion as an alert.
    #[error("queue unavailable: {0}")]
    Unavailable(String),

    /// The receipt handle is stale: the message was already acknowledged, or
    /// its visibility expired and it was redelivered under a new handle.
    /// Recoverable; callers log and move on.
    #[error("invalid receipt handle: {0}")]
    InvalidReceipt(ReceiptHandle),

    /// Strict enqueue found an un-expired message with the same dedup key.
    /// Informational, not a failure.
    #[error("duplicate enqueue within dedup window; existing message {existing}")]
    DuplicateWindow { existing: MessageId },

    /// Serialization or deserialization failure in the journal.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the journal file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the queue crate.
pub type QueueResult<T> = Result<T, QueueError>;
