//! Object store capability for the Object Event Relay.
//!
//! The relay does not implement a storage engine; it consumes one through the
//! [`BucketStore`] trait and the [`LifecycleSource`] event-emission contract.
//! This crate provides both seams plus [`InMemoryBucket`], a `HashMap`-backed
//! bucket for tests and embedding that emits a [`oer_types::LifecycleEvent`]
//! synchronously after every successful mutation.
//!
//! # Design Rules
//!
//! 1. Events are emitted only after the mutation has completed; notification
//!    failure can never roll a mutation back.
//! 2. Hooks are invoked synchronously, in registration order, outside the
//!    object-map lock.
//! 3. Overwriting an existing key still emits `Created` (the mutation
//!    succeeded); deleting a missing key emits nothing.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryBucket;
pub use traits::{BucketStore, LifecycleSource, MutationHook};
