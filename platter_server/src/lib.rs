//! # Platter server
//! This crate hosts the HTTP server for the Platter order engine. It is responsible for:
//! * Accepting orders from guest clients and moving them through their lifecycle on behalf of customers and
//!   restaurants.
//! * Running the order timeout sweeper, so that orders nobody confirmed are escalated.
//! * The identity merge protocol and guest carts.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/restaurants/{restaurant_id}/orders/...`: Guest order routes. The caller is identified by the
//!   `x-guest-client-id` header.
//! * `/restaurant/orders/...`: Restaurant routes. These require a bearer token issued for the restaurant.
//! * `/identity/merge-token` and `/identity/merge`: The identity merge protocol.
//! * `/cart`: The guest cart.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod routes;
pub mod server;
pub mod timeout_worker;

#[cfg(test)]
mod endpoint_tests;
