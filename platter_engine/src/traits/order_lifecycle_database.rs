use std::fmt::Display;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    db_types::{LineKind, NewOrder, Order, OrderDetails},
    state_machine::Transition,
    traits::data_objects::{NewFeedback, OrderScope},
};

/// This trait defines the behaviour a backend must provide to drive orders through their lifecycle.
///
/// This behaviour includes:
/// * Creating orders together with immutable snapshots of the catalog items they reference
/// * Applying guarded status transitions, each recorded in the order's attribute log
/// * Feedback, reply and visibility bookkeeping
/// * Selecting stale orders for the timeout sweeper, and the lease that keeps sweepers from running concurrently
/// * Moving guest-owned orders to a new guest identity
#[allow(async_fn_in_trait)]
pub trait OrderLifecycleDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Validates every requested line against the live catalog and, in a single atomic transaction,
    /// * creates one item snapshot per distinct catalog item,
    /// * creates the order header in `waiting_confirm_customer`, with a `customer_placed` entry in its attribute log,
    /// * creates one order item per requested line.
    ///
    /// `now` is the wall-clock time in the business timezone. It is used to check serving windows and is recorded as
    /// the creation time of the order. `confirm_within` is only used to describe the deadline in the attribute log.
    ///
    /// Any failure rolls back everything.
    async fn create_order_with_snapshots(
        &self,
        order: NewOrder,
        now: DateTime<FixedOffset>,
        confirm_within: Duration,
    ) -> Result<OrderDetails, OrderFlowError>;

    /// Fetches an order header, if it exists within the given scope.
    async fn fetch_order(&self, order_id: i64, scope: &OrderScope) -> Result<Option<Order>, OrderFlowError>;

    /// Fetches an order with its lines and attribute log, if it exists within the given scope.
    async fn fetch_order_details(
        &self,
        order_id: i64,
        scope: &OrderScope,
    ) -> Result<Option<OrderDetails>, OrderFlowError>;

    /// Applies the transition with a single conditional write, filtered on order id, scope and the statuses the
    /// action may be applied from. The attribute log entry is appended in the same transaction.
    ///
    /// If no order matches, [`OrderFlowError::OrderNotFound`] is returned. This is also the result for the loser of
    /// two concurrent identical transitions.
    async fn apply_transition(
        &self,
        order_id: i64,
        scope: &OrderScope,
        transition: &Transition,
        at: DateTime<Utc>,
    ) -> Result<Order, OrderFlowError>;

    /// Records customer feedback. The order must be `received_customer` or `complaint_done` and may not have feedback
    /// yet.
    async fn submit_feedback(
        &self,
        order_id: i64,
        scope: &OrderScope,
        feedback: &NewFeedback,
        at: DateTime<Utc>,
    ) -> Result<Order, OrderFlowError>;

    /// Records the restaurant's reply to feedback. Only one reply is ever accepted.
    async fn reply_to_feedback(
        &self,
        order_id: i64,
        restaurant_id: i64,
        reply: &str,
        at: DateTime<Utc>,
    ) -> Result<Order, OrderFlowError>;

    /// Flips the public visibility of feedback that has been replied to.
    async fn toggle_feedback_visibility(
        &self,
        order_id: i64,
        restaurant_id: i64,
        at: DateTime<Utc>,
    ) -> Result<Order, OrderFlowError>;

    /// Returns every order still in `waiting_confirm_customer` that was created before `created_before`, oldest first.
    async fn fetch_unconfirmed_orders(&self, created_before: DateTime<Utc>) -> Result<Vec<Order>, OrderFlowError>;

    /// Moves every order of the given kind owned by `old_guest_id` to `new_guest_id` in one transaction.
    /// Returns the number of orders moved. Running this twice is harmless.
    async fn reassign_guest_orders(
        &self,
        kind: LineKind,
        old_guest_id: &str,
        new_guest_id: &str,
    ) -> Result<u64, OrderFlowError>;

    /// Tries to take (or renew) the named lease for `holder`. Succeeds if the lease is free, expired, or already held
    /// by `holder`.
    async fn try_acquire_lease(
        &self,
        name: &str,
        holder: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, OrderFlowError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), OrderFlowError> {
        Ok(())
    }
}

/// The stable classification of every engine error. Callers map these onto transport-level responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    OutOfServiceWindow,
    Conflict,
    Unauthorized,
    Forbidden,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::OutOfServiceWindow => "out_of_service_window",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Internal => "internal",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("No order #{0} matches this request in a status that allows it")]
    OrderNotFound(i64),
    #[error("The {kind} item #{item_id} does not exist or is not available")]
    CatalogItemNotFound { kind: LineKind, item_id: i64 },
    #[error("Option #{option_id} does not exist or is not available for item #{item_id}")]
    CatalogOptionNotFound { item_id: i64, option_id: i64 },
    #[error("{name} is only served between {open} and {close}")]
    OutOfServiceWindow { name: String, open: String, close: String },
    #[error("Invalid quantity. {0}")]
    InvalidQuantity(String),
    #[error("Invalid input. {0}")]
    InvalidInput(String),
    #[error("Feedback has already been submitted for order #{0}")]
    FeedbackAlreadySubmitted(i64),
    #[error("A reply has already been posted for order #{0}")]
    FeedbackAlreadyReplied(i64),
    #[error("Order #{0} has no feedback to reply to")]
    FeedbackNotFound(i64),
    #[error("Order #{0} has no feedback reply yet")]
    FeedbackReplyNotFound(i64),
    #[error("Forbidden. {0}")]
    Forbidden(String),
}

impl OrderFlowError {
    pub fn kind(&self) -> ErrorKind {
        use OrderFlowError::*;
        match self {
            DatabaseError(_) => ErrorKind::Internal,
            OrderNotFound(_) |
            CatalogItemNotFound { .. } |
            CatalogOptionNotFound { .. } |
            FeedbackNotFound(_) |
            FeedbackReplyNotFound(_) => ErrorKind::NotFound,
            OutOfServiceWindow { .. } => ErrorKind::OutOfServiceWindow,
            InvalidQuantity(_) | InvalidInput(_) => ErrorKind::InvalidInput,
            FeedbackAlreadySubmitted(_) | FeedbackAlreadyReplied(_) => ErrorKind::Conflict,
            Forbidden(_) => ErrorKind::Forbidden,
        }
    }
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}
