//! Platter Order Engine
//!
//! The order engine is the core of a multi-tenant restaurant ordering service. It lets customers (either signed-in
//! users or anonymous guest clients) order food items and combos from a restaurant, and drives every order through a
//! guarded lifecycle shared by the customer, the restaurant and a timeout sweeper.
//!
//! The library is divided into these main sections:
//! 1. Database management and control ([`mod@traits`] and the `sqlite` backend). You should never need to access the
//!    database directly. Instead, use the public API provided by the engine. The exception is the data types used in
//!    the database. These are defined in the [`mod@db_types`] module and are public.
//! 2. The order state machine ([`mod@state_machine`]), which encodes exactly which actor may move an order from which
//!    status to which.
//! 3. The public API ([`mod@api`]): placing orders, customer and restaurant actions, feedback, the timeout sweep, the
//!    identity merge protocol and guest carts.
//!
//! Catalog items are copied into immutable snapshots when an order is placed, so later catalog edits never change what
//! an order contains.
//!
//! The engine also provides a set of events that can be subscribed to ([`mod@events`]). For example, when a new order
//! is created, an `OrderCreatedEvent` is emitted with the link the customer must follow to confirm it.
pub mod api;
pub mod cache;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod state_machine;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{
    guest_cart_api::{CartEntry, GuestCartApi},
    identity_merge_api::{cart_merge_hook, IdentityMergeApi, IdentityMergeError},
    order_flow_api::{OrderFlowApi, OrderFlowSettings},
};
#[cfg(feature = "sqlite")]
pub use api::identity_merge_api::order_merge_hook;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{ErrorKind, GuestCache, OrderFlowError, OrderLifecycleDatabase};
