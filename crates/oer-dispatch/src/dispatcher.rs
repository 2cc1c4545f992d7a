use std::sync::{Arc, RwLock};

use tracing::{debug, error, warn};

use oer_queue::{EventQueue, QueueError};
use oer_types::{LifecycleEvent, MessageId};

use crate::retry::RetryPolicy;
use crate::subscription::PushSubscription;

/// Outcome of dispatching one event.
///
/// Dispatch never fails as a whole: each branch records its own outcome so a
/// mutation is never blocked by a slow or broken downstream.
#[derive(Clone, Debug, Default)]
pub struct DispatchReport {
    /// Subscriptions that accepted the push, by name.
    pub pushed: Vec<String>,
    /// Subscriptions whose push failed after retries: (name, error).
    pub push_failures: Vec<(String, String)>,
    /// Id of the queued message, when the enqueue branch succeeded.
    pub enqueued: Option<MessageId>,
    /// Error text when the enqueue branch failed after retries.
    pub enqueue_failure: Option<String>,
}

impl DispatchReport {
    /// Both branches completed without a dropped delivery.
    pub fn fully_delivered(&self) -> bool {
        self.push_failures.is_empty() && self.enqueue_failure.is_none()
    }
}

/// Routes each lifecycle event down two independent branches: synchronous
/// push to matching subscriptions, and enqueue onto the delivery queue.
///
/// The branches share nothing but the event. A failure in either one is
/// retried with backoff, logged, and recorded in the report; it never
/// prevents the other branch from running and never surfaces to the caller
/// that mutated the store.
pub struct Dispatcher {
    queue: Arc<dyn EventQueue>,
    subscriptions: RwLock<Vec<PushSubscription>>,
    retry: RetryPolicy,
}

impl Dispatcher {
    pub fn new(queue: Arc<dyn EventQueue>, retry: RetryPolicy) -> Self {
        Self {
            queue,
            subscriptions: RwLock::new(Vec::new()),
            retry,
        }
    }

    /// Register a push subscription. Takes effect for subsequent dispatches.
    pub fn subscribe(&self, subscription: PushSubscription) {
        debug!(name = %subscription.name, "push subscription registered");
        self.subscriptions
            .write()
            .expect("lock poisoned")
            .push(subscription);
    }

    /// Number of registered push subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().expect("lock poisoned").len()
    }

    /// Dispatch one event down both branches.
    pub fn dispatch(&self, event: &LifecycleEvent) -> DispatchReport {
        let mut report = DispatchReport::default();

        // Push branch: each matching subscription gets its own retry budget.
        let subscriptions = self
            .subscriptions
            .read()
            .expect("lock poisoned")
            .iter()
            .filter(|s| s.filter.matches(event))
            .cloned()
            .collect::<Vec<_>>();

        for subscription in subscriptions {
            let outcome = self
                .retry
                .run_if(|| subscription.sink.invalidate(event), |e| e.is_transient());
            match outcome {
                Ok(()) => {
                    debug!(name = %subscription.name, key = %event.key, "pushed");
                    report.pushed.push(subscription.name);
                }
                Err(e) => {
                    warn!(name = %subscription.name, key = %event.key, error = %e, "push failed");
                    report.push_failures.push((subscription.name, e.to_string()));
                }
            }
        }

        // Enqueue branch: runs regardless of what the push branch did.
        let outcome = self.retry.run_if(
            || self.queue.enqueue(event),
            |e| matches!(e, QueueError::Unavailable(_) | QueueError::Io(_)),
        );
        match outcome {
            Ok(id) => {
                debug!(id = %id, key = %event.key, kind = %event.event_type, "enqueued");
                report.enqueued = Some(id);
            }
            Err(e) => {
                error!(key = %event.key, error = %e, "enqueue failed after retries");
                report.enqueue_failure = Some(e.to_string());
            }
        }

        report
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("subscriptions", &self.subscription_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{InvalidationError, InvalidationResult};
    use crate::invalidator::{InMemoryInvalidator, InvalidationSink};
    use crate::subscription::EventTypeFilter;
    use oer_queue::{DeliveryQueue, InMemoryDeadLetter, QueueConfig, QueueMessage, QueueResult};
    use oer_types::{BucketId, EventType, ManualClock, ObjectKey, ReceiptHandle, SystemClock};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn instant_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    fn in_memory_queue() -> Arc<DeliveryQueue> {
        Arc::new(DeliveryQueue::in_memory(
            QueueConfig::default(),
            Arc::new(ManualClock::new(1_000_000)),
            Arc::new(InMemoryDeadLetter::new()),
        ))
    }

    fn removed(key: &str) -> LifecycleEvent {
        LifecycleEvent::removed(
            BucketId::new("image-store").unwrap(),
            ObjectKey::new(key).unwrap(),
            1_000_000,
        )
    }

    fn created(key: &str) -> LifecycleEvent {
        LifecycleEvent::created(
            BucketId::new("image-store").unwrap(),
            ObjectKey::new(key).unwrap(),
            1_000_000,
        )
    }

    /// Queue stub whose every operation fails, for branch-independence tests.
    struct UnavailableQueue;

    impl EventQueue for UnavailableQueue {
        fn enqueue(&self, _event: &LifecycleEvent) -> QueueResult<MessageId> {
            Err(QueueError::Unavailable("backing store offline".into()))
        }
        fn enqueue_strict(&self, _event: &LifecycleEvent) -> QueueResult<MessageId> {
            Err(QueueError::Unavailable("backing store offline".into()))
        }
        fn receive(
            &self,
            _max_messages: usize,
            _visibility_timeout: Duration,
        ) -> QueueResult<Vec<QueueMessage>> {
            Err(QueueError::Unavailable("backing store offline".into()))
        }
        fn acknowledge(&self, _receipt: ReceiptHandle) -> QueueResult<()> {
            Err(QueueError::Unavailable("backing store offline".into()))
        }
        fn extend_visibility(
            &self,
            _receipt: ReceiptHandle,
            _additional: Duration,
        ) -> QueueResult<()> {
            Err(QueueError::Unavailable("backing store offline".into()))
        }
    }

    /// Sink that fails transiently for the first `failures` calls.
    struct FlakySink {
        calls: AtomicU32,
        failures: u32,
    }

    impl FlakySink {
        fn new(failures: u32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures,
            }
        }
    }

    impl InvalidationSink for FlakySink {
        fn invalidate(&self, _event: &LifecycleEvent) -> InvalidationResult<()> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                Err(InvalidationError::Unavailable("flaky".into()))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn removed_event_reaches_both_branches() {
        let queue = in_memory_queue();
        let dispatcher = Dispatcher::new(queue.clone(), instant_retry());
        let invalidator = Arc::new(InMemoryInvalidator::new());
        invalidator.prime(ObjectKey::new("a.png").unwrap());
        dispatcher.subscribe(PushSubscription::new(
            "cache-invalidator",
            EventTypeFilter::only(EventType::Removed),
            invalidator.clone(),
        ));

        let report = dispatcher.dispatch(&removed("a.png"));

        assert!(report.fully_delivered());
        assert_eq!(report.pushed, vec!["cache-invalidator".to_string()]);
        assert!(report.enqueued.is_some());
        assert!(!invalidator.is_cached(&ObjectKey::new("a.png").unwrap()));
        assert_eq!(queue.pending_count(), 1);
    }

    #[test]
    fn created_event_skips_removed_only_subscription() {
        let queue = in_memory_queue();
        let dispatcher = Dispatcher::new(queue.clone(), instant_retry());
        let invalidator = Arc::new(InMemoryInvalidator::new());
        dispatcher.subscribe(PushSubscription::new(
            "cache-invalidator",
            EventTypeFilter::only(EventType::Removed),
            invalidator,
        ));

        let report = dispatcher.dispatch(&created("a.png"));

        assert!(report.pushed.is_empty());
        assert!(report.enqueued.is_some());
        assert_eq!(queue.pending_count(), 1);
    }

    #[test]
    fn push_succeeds_even_when_queue_is_down() {
        let dispatcher = Dispatcher::new(Arc::new(UnavailableQueue), instant_retry());
        let invalidator = Arc::new(InMemoryInvalidator::new());
        invalidator.prime(ObjectKey::new("a.png").unwrap());
        dispatcher.subscribe(PushSubscription::new(
            "cache-invalidator",
            EventTypeFilter::only(EventType::Removed),
            invalidator.clone(),
        ));

        let report = dispatcher.dispatch(&removed("a.png"));

        // The push branch delivered; only the enqueue branch failed.
        assert_eq!(report.pushed.len(), 1);
        assert!(!invalidator.is_cached(&ObjectKey::new("a.png").unwrap()));
        assert!(report.enqueued.is_none());
        assert!(report.enqueue_failure.is_some());
        assert!(!report.fully_delivered());
    }

    #[test]
    fn enqueue_proceeds_when_push_fails() {
        let queue = in_memory_queue();
        let dispatcher = Dispatcher::new(queue.clone(), instant_retry());
        // Fails more times than the retry budget allows.
        dispatcher.subscribe(PushSubscription::new(
            "broken-sink",
            EventTypeFilter::any(),
            Arc::new(FlakySink::new(10)),
        ));

        let report = dispatcher.dispatch(&removed("a.png"));

        assert_eq!(report.push_failures.len(), 1);
        assert_eq!(report.push_failures[0].0, "broken-sink");
        assert!(report.enqueued.is_some());
        assert_eq!(queue.pending_count(), 1);
    }

    #[test]
    fn transient_push_failure_is_retried_within_budget() {
        let queue = in_memory_queue();
        let dispatcher = Dispatcher::new(queue, instant_retry());
        let sink = Arc::new(FlakySink::new(2));
        dispatcher.subscribe(PushSubscription::new(
            "flaky-sink",
            EventTypeFilter::any(),
            sink.clone(),
        ));

        let report = dispatcher.dispatch(&removed("a.png"));

        assert_eq!(report.pushed.len(), 1);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn rejected_push_is_not_retried() {
        struct RejectingSink {
            calls: AtomicU32,
        }
        impl InvalidationSink for RejectingSink {
            fn invalidate(&self, _event: &LifecycleEvent) -> InvalidationResult<()> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Err(InvalidationError::Rejected("bad event".into()))
            }
        }

        let queue = in_memory_queue();
        let dispatcher = Dispatcher::new(queue, instant_retry());
        let sink = Arc::new(RejectingSink {
            calls: AtomicU32::new(0),
        });
        dispatcher.subscribe(PushSubscription::new(
            "rejecting-sink",
            EventTypeFilter::any(),
            sink.clone(),
        ));

        let report = dispatcher.dispatch(&removed("a.png"));

        assert_eq!(report.push_failures.len(), 1);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn multiple_subscriptions_each_get_the_event() {
        let queue = in_memory_queue();
        let dispatcher = Dispatcher::new(queue, instant_retry());
        let first = Arc::new(InMemoryInvalidator::new());
        let second = Arc::new(InMemoryInvalidator::new());
        first.prime(ObjectKey::new("a.png").unwrap());
        second.prime(ObjectKey::new("a.png").unwrap());
        dispatcher.subscribe(PushSubscription::new(
            "first",
            EventTypeFilter::only(EventType::Removed),
            first.clone(),
        ));
        dispatcher.subscribe(PushSubscription::new(
            "second",
            EventTypeFilter::only(EventType::Removed),
            second.clone(),
        ));

        let report = dispatcher.dispatch(&removed("a.png"));

        assert_eq!(report.pushed.len(), 2);
        assert!(!first.is_cached(&ObjectKey::new("a.png").unwrap()));
        assert!(!second.is_cached(&ObjectKey::new("a.png").unwrap()));
    }

    #[test]
    fn dispatch_works_with_a_system_clock_queue() {
        let queue = Arc::new(DeliveryQueue::in_memory(
            QueueConfig::default(),
            Arc::new(SystemClock),
            Arc::new(InMemoryDeadLetter::new()),
        ));
        let dispatcher = Dispatcher::new(queue.clone(), RetryPolicy::default());

        let report = dispatcher.dispatch(&created("a.png"));
        assert!(report.fully_delivered());
        assert_eq!(queue.pending_count(), 1);
    }
}
