use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::journal::SyncMode;

/// Configuration for the [`crate::DeliveryQueue`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Span during which duplicate enqueues of the same logical event
    /// (same key, type, and timestamp window) collapse to one message.
    pub dedup_window: Duration,
    /// Redeliveries allowed after the initial delivery before a message is
    /// moved to the dead-letter sink.
    pub max_redelivery_count: u32,
    /// Flush strategy for the journal.
    pub sync_mode: SyncMode,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            dedup_window: Duration::from_secs(300),
            max_redelivery_count: 5,
            sync_mode: SyncMode::default(),
        }
    }
}

impl QueueConfig {
    /// The dedup window in milliseconds, floored at one.
    pub fn dedup_window_ms(&self) -> u64 {
        (self.dedup_window.as_millis() as u64).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = QueueConfig::default();
        assert_eq!(config.dedup_window, Duration::from_secs(300));
        assert_eq!(config.max_redelivery_count, 5);
    }

    #[test]
    fn zero_window_floors_to_one_ms() {
        let config = QueueConfig {
            dedup_window: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(config.dedup_window_ms(), 1);
    }
}
