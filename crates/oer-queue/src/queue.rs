use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use oer_types::{Clock, DedupKey, LifecycleEvent, MessageId, ObjectKey, ReceiptHandle};

use crate::config::QueueConfig;
use crate::dead_letter::DeadLetterSink;
use crate::error::{QueueError, QueueResult};
use crate::journal::{Journal, JournalEntry};
use crate::message::QueueMessage;
use crate::traits::EventQueue;

/// Dedup-table sweep threshold: expired entries are evicted in bulk once the
/// table grows past this many keys.
const DEDUP_SWEEP_THRESHOLD: usize = 1024;

/// An active visibility lease on a delivered message.
struct Lease {
    receipt: ReceiptHandle,
    deadline_ms: u64,
}

/// A materialized message owned by the queue.
struct StoredMessage {
    message_id: MessageId,
    event: LifecycleEvent,
    dedup_key: DedupKey,
    delivery_count: u32,
    lease: Option<Lease>,
}

impl StoredMessage {
    /// Delivered view carrying the given receipt and deadline.
    fn to_queue_message(&self, receipt: ReceiptHandle, deadline_ms: u64) -> QueueMessage {
        QueueMessage {
            message_id: self.message_id,
            event: self.event.clone(),
            dedup_key: self.dedup_key.clone(),
            receipt_handle: receipt,
            delivery_count: self.delivery_count,
            visibility_deadline_ms: deadline_ms,
        }
    }
}

/// Live dedup-window entry.
struct DedupEntry {
    message_id: MessageId,
    expires_at_ms: u64,
}

/// All mutable queue state, behind one mutex.
///
/// `groups` maps each ordering group (object key) to its message ids in
/// enqueue order; `receipts` indexes the currently-valid lease handles.
#[derive(Default)]
struct QueueState {
    messages: HashMap<MessageId, StoredMessage>,
    groups: BTreeMap<ObjectKey, VecDeque<MessageId>>,
    dedup: HashMap<DedupKey, DedupEntry>,
    receipts: HashMap<ReceiptHandle, MessageId>,
}

impl QueueState {
    /// Remove a message and all index entries pointing at it.
    fn remove(&mut self, id: MessageId) -> StoredMessage {
        let msg = self.messages.remove(&id).expect("message is indexed");
        if let Some(lease) = &msg.lease {
            self.receipts.remove(&lease.receipt);
        }
        if let Some(group) = self.groups.get_mut(&msg.event.key) {
            group.retain(|m| *m != id);
            if group.is_empty() {
                self.groups.remove(&msg.event.key);
            }
        }
        msg
    }
}

/// What the receive scan decided to do with one message.
enum ScanAction {
    /// Lease still active: the rest of the group is blocked.
    Blocked,
    /// Visible (fresh or expired lease): deliver under a new lease.
    Deliver,
    /// Expired lease and redelivery budget exhausted: dead-letter.
    Poison,
}

/// FIFO-per-group, at-least-once, deduplicating delivery queue.
///
/// Visibility leasing instead of locking: each message carries an optional
/// lease (receipt + deadline) that is checked and swapped under the state
/// mutex, so no two concurrent `receive` calls can return the same message
/// while a lease is active. Durability comes from an append-only
/// [`Journal`]; leases and delivery counts are volatile (a crash redelivers,
/// which at-least-once permits).
pub struct DeliveryQueue {
    config: QueueConfig,
    clock: Arc<dyn Clock>,
    dead_letter: Arc<dyn DeadLetterSink>,
    journal: Option<Journal>,
    state: Mutex<QueueState>,
}

impl DeliveryQueue {
    /// Create a journal-less queue (tests and embedding).
    pub fn in_memory(
        config: QueueConfig,
        clock: Arc<dyn Clock>,
        dead_letter: Arc<dyn DeadLetterSink>,
    ) -> Self {
        Self {
            config,
            clock,
            dead_letter,
            journal: None,
            state: Mutex::new(QueueState::default()),
        }
    }

    /// Open a durable queue, replaying and compacting the journal at `path`.
    ///
    /// Recovered messages revert to visible with a delivery count of zero;
    /// their dedup entries are rebuilt from the event timestamps.
    pub fn open(
        path: &Path,
        config: QueueConfig,
        clock: Arc<dyn Clock>,
        dead_letter: Arc<dyn DeadLetterSink>,
    ) -> QueueResult<Self> {
        let journal = Journal::open(path, config.sync_mode)?;

        // Replay: pending = enqueued minus acknowledged/dead-lettered.
        let mut pending: Vec<(MessageId, LifecycleEvent)> = Vec::new();
        for entry in journal.recover()? {
            match entry {
                JournalEntry::Enqueued { message_id, event } => pending.push((message_id, event)),
                JournalEntry::Acknowledged { message_id }
                | JournalEntry::DeadLettered { message_id } => {
                    pending.retain(|(id, _)| *id != message_id);
                }
            }
        }

        // Compact the file down to the survivors.
        let compacted: Vec<JournalEntry> = pending
            .iter()
            .map(|(message_id, event)| JournalEntry::Enqueued {
                message_id: *message_id,
                event: event.clone(),
            })
            .collect();
        journal.rewrite(&compacted)?;

        let queue = Self {
            config,
            clock,
            dead_letter,
            journal: Some(journal),
            state: Mutex::new(QueueState::default()),
        };

        {
            let window_ms = queue.config.dedup_window_ms();
            let mut state = queue.state.lock().expect("queue lock poisoned");
            for (message_id, event) in &pending {
                let dedup_key = DedupKey::derive(event, window_ms);
                state.dedup.insert(
                    dedup_key.clone(),
                    DedupEntry {
                        message_id: *message_id,
                        expires_at_ms: event.timestamp_ms + window_ms,
                    },
                );
                state
                    .groups
                    .entry(event.key.clone())
                    .or_default()
                    .push_back(*message_id);
                state.messages.insert(
                    *message_id,
                    StoredMessage {
                        message_id: *message_id,
                        event: event.clone(),
                        dedup_key,
                        delivery_count: 0,
                        lease: None,
                    },
                );
            }
        }

        info!(path = %path.display(), recovered = pending.len(), "delivery queue opened");
        Ok(queue)
    }

    /// Messages currently owned by the queue (visible or leased).
    pub fn pending_count(&self) -> usize {
        self.state.lock().expect("queue lock poisoned").messages.len()
    }

    /// Messages currently under an active lease.
    pub fn in_flight_count(&self) -> usize {
        let now = self.clock.now_ms();
        let state = self.state.lock().expect("queue lock poisoned");
        state
            .messages
            .values()
            .filter(|m| matches!(&m.lease, Some(lease) if now < lease.deadline_ms))
            .count()
    }

    /// Number of non-empty ordering groups.
    pub fn group_count(&self) -> usize {
        self.state.lock().expect("queue lock poisoned").groups.len()
    }

    fn journal_append(&self, entry: &JournalEntry) -> QueueResult<()> {
        if let Some(journal) = &self.journal {
            journal
                .append(entry)
                .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        }
        Ok(())
    }

    fn enqueue_inner(&self, event: &LifecycleEvent, strict: bool) -> QueueResult<MessageId> {
        let now = self.clock.now_ms();
        let window_ms = self.config.dedup_window_ms();
        let dedup_key = DedupKey::derive(event, window_ms);

        let mut state = self.state.lock().expect("queue lock poisoned");

        if let Some(entry) = state.dedup.get(&dedup_key) {
            if now < entry.expires_at_ms {
                let existing = entry.message_id;
                debug!(id = %existing, key = %event.key, "duplicate within dedup window");
                if strict {
                    return Err(QueueError::DuplicateWindow { existing });
                }
                return Ok(existing);
            }
        }

        if state.dedup.len() >= DEDUP_SWEEP_THRESHOLD {
            state.dedup.retain(|_, e| now < e.expires_at_ms);
        }

        let message_id = MessageId::new();

        // Journal first (write-ahead); state is untouched on failure.
        self.journal_append(&JournalEntry::Enqueued {
            message_id,
            event: event.clone(),
        })?;

        state.messages.insert(
            message_id,
            StoredMessage {
                message_id,
                event: event.clone(),
                dedup_key: dedup_key.clone(),
                delivery_count: 0,
                lease: None,
            },
        );
        state
            .groups
            .entry(event.key.clone())
            .or_default()
            .push_back(message_id);
        state.dedup.insert(
            dedup_key,
            DedupEntry {
                message_id,
                expires_at_ms: now + window_ms,
            },
        );

        debug!(id = %message_id, key = %event.key, kind = %event.event_type, "enqueued");
        Ok(message_id)
    }
}

impl EventQueue for DeliveryQueue {
    fn enqueue(&self, event: &LifecycleEvent) -> QueueResult<MessageId> {
        self.enqueue_inner(event, false)
    }

    fn enqueue_strict(&self, event: &LifecycleEvent) -> QueueResult<MessageId> {
        self.enqueue_inner(event, true)
    }

    fn receive(
        &self,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> QueueResult<Vec<QueueMessage>> {
        if max_messages == 0 {
            return Ok(Vec::new());
        }

        let now = self.clock.now_ms();
        let visibility_ms = visibility_timeout.as_millis() as u64;
        let max_deliveries = self.config.max_redelivery_count + 1;

        let mut delivered = Vec::new();
        let mut poisoned: Vec<QueueMessage> = Vec::new();

        let mut state = self.state.lock().expect("queue lock poisoned");
        let group_keys: Vec<ObjectKey> = state.groups.keys().cloned().collect();

        'groups: for key in group_keys {
            let ids: Vec<MessageId> = state
                .groups
                .get(&key)
                .map(|g| g.iter().copied().collect())
                .unwrap_or_default();

            for id in ids {
                if delivered.len() >= max_messages {
                    break 'groups;
                }

                let action = {
                    let msg = state.messages.get(&id).expect("group references live message");
                    match &msg.lease {
                        Some(lease) if now < lease.deadline_ms => ScanAction::Blocked,
                        Some(_) if msg.delivery_count >= max_deliveries => ScanAction::Poison,
                        _ => ScanAction::Deliver,
                    }
                };

                match action {
                    // An in-flight head blocks the rest of its group so
                    // redelivery cannot overtake within the group.
                    ScanAction::Blocked => continue 'groups,
                    ScanAction::Poison => {
                        self.journal_append(&JournalEntry::DeadLettered { message_id: id })?;
                        let msg = state.remove(id);
                        let lease = msg.lease.as_ref().expect("poison implies expired lease");
                        warn!(
                            id = %id,
                            key = %msg.event.key,
                            deliveries = msg.delivery_count,
                            "redelivery budget exhausted; dead-lettering"
                        );
                        poisoned.push(msg.to_queue_message(lease.receipt, lease.deadline_ms));
                        // The next message in the group is now its head.
                    }
                    ScanAction::Deliver => {
                        let receipt = ReceiptHandle::issue();
                        let deadline_ms = now + visibility_ms;
                        let msg = state.messages.get_mut(&id).expect("message is indexed");
                        let old_lease = msg.lease.replace(Lease {
                            receipt,
                            deadline_ms,
                        });
                        msg.delivery_count += 1;
                        let view = msg.to_queue_message(receipt, deadline_ms);
                        if let Some(old) = old_lease {
                            state.receipts.remove(&old.receipt);
                        }
                        state.receipts.insert(receipt, id);
                        debug!(
                            id = %id,
                            key = %view.event.key,
                            delivery = view.delivery_count,
                            "delivered"
                        );
                        delivered.push(view);
                    }
                }
            }
        }

        drop(state);

        // Sink callbacks run outside the state lock.
        for message in &poisoned {
            self.dead_letter.record_poison(message);
        }

        Ok(delivered)
    }

    fn acknowledge(&self, receipt: ReceiptHandle) -> QueueResult<()> {
        let mut state = self.state.lock().expect("queue lock poisoned");
        let Some(&id) = state.receipts.get(&receipt) else {
            return Err(QueueError::InvalidReceipt(receipt));
        };

        self.journal_append(&JournalEntry::Acknowledged { message_id: id })?;
        let msg = state.remove(id);
        debug!(id = %id, key = %msg.event.key, "acknowledged");
        Ok(())
    }

    fn extend_visibility(&self, receipt: ReceiptHandle, additional: Duration) -> QueueResult<()> {
        let mut state = self.state.lock().expect("queue lock poisoned");
        let Some(&id) = state.receipts.get(&receipt) else {
            return Err(QueueError::InvalidReceipt(receipt));
        };

        let msg = state.messages.get_mut(&id).expect("message is indexed");
        let lease = msg.lease.as_mut().expect("receipt implies lease");
        lease.deadline_ms += additional.as_millis() as u64;
        debug!(id = %id, deadline_ms = lease.deadline_ms, "visibility extended");
        Ok(())
    }
}

impl std::fmt::Debug for DeliveryQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryQueue")
            .field("pending", &self.pending_count())
            .field("groups", &self.group_count())
            .field("durable", &self.journal.is_some())
            .finish()
    }
}
