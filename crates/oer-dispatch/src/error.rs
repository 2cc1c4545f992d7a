/// Errors from a push-invalidation target.
#[derive(Debug, thiserror::Error)]
pub enum InvalidationError {
    /// The target cannot be reached right now. Transient; the dispatcher
    /// retries with backoff.
    #[error("invalidation target unavailable: {0}")]
    Unavailable(String),

    /// The target refused the event. Not retried.
    #[error("invalidation rejected: {0}")]
    Rejected(String),
}

impl InvalidationError {
    /// Whether the dispatcher should retry after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Convenience alias for invalidation results.
pub type InvalidationResult<T> = Result<T, InvalidationError>;
