/// Errors from a broadcast target.
#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    /// The target cannot accept the event right now. The worker leaves the
    /// message unacknowledged so the queue redelivers it.
    #[error("broadcast target unavailable: {0}")]
    Unavailable(String),

    /// The target refused the event.
    #[error("broadcast rejected: {0}")]
    Rejected(String),

    /// Some fanout children failed.
    #[error("{failed} of {total} broadcast targets failed")]
    PartialFanout { failed: usize, total: usize },
}

/// Convenience alias for broadcast results.
pub type BroadcastResult<T> = Result<T, BroadcastError>;
