use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use oer_queue::{EventQueue, QueueError, QueueMessage};

use crate::sink::BroadcastSink;

/// Tuning for a [`BroadcastWorker`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Maximum messages taken per poll.
    pub batch_size: usize,
    /// Sleep between polls that return nothing.
    pub poll_interval: Duration,
    /// Lease duration requested for each received message.
    pub visibility_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            poll_interval: Duration::from_millis(500),
            visibility_timeout: Duration::from_secs(30),
        }
    }
}

/// Signals a running worker to stop.
///
/// Dropping the handle also stops the worker (the watch channel closes).
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    /// Request shutdown. The worker finishes its in-flight batch first.
    pub fn signal(&self) {
        let _ = self.tx.send(true);
    }
}

/// Polls the delivery queue in batches and broadcasts each message.
///
/// Outcomes are per message: a successful broadcast is acknowledged, a
/// failed one is left unacknowledged so its visibility lease expires and the
/// queue redelivers it. One bad message never blocks the rest of its batch.
pub struct BroadcastWorker {
    queue: Arc<dyn EventQueue>,
    sink: Arc<dyn BroadcastSink>,
    config: WorkerConfig,
}

impl BroadcastWorker {
    pub fn new(
        queue: Arc<dyn EventQueue>,
        sink: Arc<dyn BroadcastSink>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            sink,
            config,
        }
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// Shutdown is checked between batches, never mid-batch: every message
    /// already received is processed before the loop exits.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            batch_size = self.config.batch_size,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "broadcast worker started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let batch = match self
                .queue
                .receive(self.config.batch_size, self.config.visibility_timeout)
            {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(error = %e, "receive failed; backing off");
                    if self.idle(&mut shutdown).await {
                        break;
                    }
                    continue;
                }
            };

            if batch.is_empty() {
                if self.idle(&mut shutdown).await {
                    break;
                }
                continue;
            }

            for message in &batch {
                self.process(message).await;
            }
        }

        info!("broadcast worker stopped");
    }

    /// Spawn the worker on the current runtime.
    pub fn spawn(self) -> (ShutdownHandle, JoinHandle<()>) {
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(self.run(rx));
        (ShutdownHandle { tx }, handle)
    }

    /// Broadcast one message and record its individual outcome.
    async fn process(&self, message: &QueueMessage) {
        match self.sink.broadcast(&message.event).await {
            Ok(()) => match self.queue.acknowledge(message.receipt_handle) {
                Ok(()) => {
                    debug!(id = %message.message_id, key = %message.event.key, "broadcast acknowledged");
                }
                Err(QueueError::InvalidReceipt(_)) => {
                    // Lease expired mid-broadcast and a newer delivery owns
                    // the message now; it will be handled there.
                    debug!(id = %message.message_id, "receipt superseded; skipping ack");
                }
                Err(e) => {
                    warn!(id = %message.message_id, error = %e, "acknowledge failed");
                }
            },
            Err(e) => {
                warn!(
                    id = %message.message_id,
                    key = %message.event.key,
                    delivery = message.delivery_count,
                    error = %e,
                    "broadcast failed; leaving message for redelivery"
                );
            }
        }
    }

    /// Sleep one poll interval, returning `true` if shutdown arrived.
    async fn idle(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.config.poll_interval) => false,
            changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
        }
    }
}
