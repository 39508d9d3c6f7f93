//! #  Backend contracts
//!
//! This module provides the interfaces that define the contracts of the order engine *backends*.
//!
//! ## Orders
//! The [`OrderLifecycleDatabase`] trait covers everything the engine persists: order creation with catalog
//! snapshots, guarded status transitions and their attribute log, feedback, the stale-order query used by the timeout
//! sweeper and the re-assignment of guest orders after an identity merge.
//!
//! ## Guest state
//! The [`GuestCache`] trait is a minimal key-value contract for short-lived guest data (merge tokens and carts). The
//! order path never touches the cache.
mod data_objects;
mod guest_cache;
mod order_lifecycle_database;

pub use data_objects::{NewFeedback, OrderScope, SweepFailure, TimeoutSweepResult};
#[cfg(test)]
pub use guest_cache::MockGuestCache;
pub use guest_cache::{CacheError, GuestCache};
pub use order_lifecycle_database::{ErrorKind, OrderFlowError, OrderLifecycleDatabase};
