use oer_queue::QueueError;
use oer_store::StoreError;

/// Top-level errors surfaced by the relay facade.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience alias for facade results.
pub type RelayResult<T> = Result<T, RelayError>;
