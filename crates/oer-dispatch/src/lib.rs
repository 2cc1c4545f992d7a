//! Event dispatcher: fans each object lifecycle event out to push
//! subscriptions and onto the delivery queue.
//!
//! The two branches are independent by design. Push delivery (used for cache
//! invalidation) happens synchronously with bounded retry; the queue branch
//! feeds the broadcast consumers. Neither branch can block the other, and
//! neither failure surfaces to the store mutation that produced the event.

mod dispatcher;
mod error;
mod invalidator;
mod retry;
mod subscription;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use error::{InvalidationError, InvalidationResult};
pub use invalidator::{InMemoryInvalidator, InvalidationSink};
pub use retry::RetryPolicy;
pub use subscription::{EventTypeFilter, PushSubscription};
