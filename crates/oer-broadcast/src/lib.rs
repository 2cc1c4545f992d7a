//! Broadcast consumer: drains the delivery queue and fans events out to
//! downstream targets.
//!
//! A [`BroadcastWorker`] polls in batches and records an outcome per
//! message: success acknowledges, failure leaves the message for redelivery.
//! Shutdown is cooperative through a watch channel and always lets the
//! in-flight batch finish.

mod error;
mod sink;
mod worker;

pub use error::{BroadcastError, BroadcastResult};
pub use sink::{BroadcastSink, FanoutSink, RecordingSink};
pub use worker::{BroadcastWorker, ShutdownHandle, WorkerConfig};
