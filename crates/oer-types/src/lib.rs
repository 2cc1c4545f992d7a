//! Foundation types for the Object Event Relay (OER).
//!
//! This crate provides the core identifier, event, and timing types used
//! throughout the OER system. Every other OER crate depends on `oer-types`.
//!
//! # Key Types
//!
//! - [`ObjectKey`]: name of a stored object; also the ordering-group key
//! - [`BucketId`]: identifier of the bucket an event originated from
//! - [`LifecycleEvent`]: notification that an object was created or removed
//! - [`MessageId`]: UUID v7 time-ordered queue message identifier
//! - [`ReceiptHandle`]: per-delivery acknowledgment handle
//! - [`DedupKey`]: window-bucketed deduplication key
//! - [`Clock`]: injectable time source (system and manual implementations)

pub mod clock;
pub mod error;
pub mod event;
pub mod key;
pub mod message;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::TypeError;
pub use event::{EventType, LifecycleEvent};
pub use key::{BucketId, ObjectKey};
pub use message::{DedupKey, MessageId, ReceiptHandle};
