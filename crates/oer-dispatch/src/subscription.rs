use std::sync::Arc;

use serde::{Deserialize, Serialize};

use oer_types::{EventType, LifecycleEvent};

use crate::invalidator::InvalidationSink;

/// Which event types a subscription receives.
///
/// `None` means all types.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTypeFilter {
    kinds: Option<Vec<EventType>>,
}

impl EventTypeFilter {
    /// Match every event.
    pub fn any() -> Self {
        Self { kinds: None }
    }

    /// Match a single event type.
    pub fn only(kind: EventType) -> Self {
        Self {
            kinds: Some(vec![kind]),
        }
    }

    /// Match an explicit set of event types.
    pub fn types(kinds: impl IntoIterator<Item = EventType>) -> Self {
        Self {
            kinds: Some(kinds.into_iter().collect()),
        }
    }

    /// Whether the event passes this filter.
    pub fn matches(&self, event: &LifecycleEvent) -> bool {
        match &self.kinds {
            None => true,
            Some(kinds) => kinds.contains(&event.event_type),
        }
    }
}

/// A push subscription: events matching the filter are delivered to the sink
/// synchronously at dispatch time, ahead of the queue path.
#[derive(Clone)]
pub struct PushSubscription {
    /// Name used in logs and dispatch reports.
    pub name: String,
    /// Event types this subscription receives.
    pub filter: EventTypeFilter,
    /// Delivery target.
    pub sink: Arc<dyn InvalidationSink>,
}

impl PushSubscription {
    pub fn new(
        name: impl Into<String>,
        filter: EventTypeFilter,
        sink: Arc<dyn InvalidationSink>,
    ) -> Self {
        Self {
            name: name.into(),
            filter,
            sink,
        }
    }
}

impl std::fmt::Debug for PushSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushSubscription")
            .field("name", &self.name)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}
