use serde::{Deserialize, Serialize};

use oer_broadcast::WorkerConfig;
use oer_dispatch::RetryPolicy;
use oer_queue::QueueConfig;

/// Full configuration surface of a relay.
///
/// Every section has sensible defaults, so a partial document (or none at
/// all) is valid.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Delivery-queue tuning: dedup window, redelivery budget, journal sync.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Backoff applied to push and enqueue failures at dispatch time.
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Broadcast-worker tuning: batch size, poll interval, visibility.
    #[serde(default)]
    pub worker: WorkerConfig,
}
