//! # Order engine public API
//!
//! The `api` module exposes the programmatic API of the order engine. The API is modular, so that clients of the API
//! can pick and choose the functionality they want.
//!
//! * [`order_flow_api`] places orders and drives them through the order state machine on behalf of customers,
//!   restaurants and the timeout sweeper.
//! * [`identity_merge_api`] issues and redeems identity merge tokens, and provides the consumers that move guest data
//!   when a merge happens.
//! * [`guest_cart_api`] keeps guest carts in the guest cache.
//!
//! # API usage
//!
//! An API instance is created by supplying the backend it needs, plus the event producers it publishes to.
//!
//! ```rust,ignore
//! use platter_engine::{events::EventProducers, OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = OrderFlowApi::new(db, EventProducers::default());
//! let order = api.order_for_restaurant(order_id, restaurant_id).await?;
//! ```
pub mod guest_cart_api;
pub mod identity_merge_api;
pub mod order_flow_api;
