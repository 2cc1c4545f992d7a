use std::sync::Mutex;

use crate::message::QueueMessage;

/// Terminal sink for messages that exceeded the redelivery limit.
///
/// `record_poison` is infallible by contract: the queue has already removed
/// the message, and the sink must not be able to push it back.
pub trait DeadLetterSink: Send + Sync {
    /// Record a poison message.
    fn record_poison(&self, message: &QueueMessage);
}

/// In-memory dead-letter sink for tests and embedding.
#[derive(Default)]
pub struct InMemoryDeadLetter {
    messages: Mutex<Vec<QueueMessage>>,
}

impl InMemoryDeadLetter {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of poison messages recorded.
    pub fn len(&self) -> usize {
        self.messages.lock().expect("lock poisoned").len()
    }

    /// Returns `true` if no poison messages were recorded.
    pub fn is_empty(&self) -> bool {
        self.messages.lock().expect("lock poisoned").is_empty()
    }

    /// Snapshot of all recorded messages.
    pub fn messages(&self) -> Vec<QueueMessage> {
        self.messages.lock().expect("lock poisoned").clone()
    }
}

impl DeadLetterSink for InMemoryDeadLetter {
    fn record_poison(&self, message: &QueueMessage) {
        self.messages
            .lock()
            .expect("lock poisoned")
            .push(message.clone());
    }
}
