use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{db_types::{CustomerIdentity, Order}, state_machine::Actor, traits::OrderFlowError};

/// Restricts a lookup or a write to the orders a caller is entitled to see.
///
/// Restaurant calls are scoped to the tenant only. Customer calls are additionally scoped to the identity that placed
/// the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderScope {
    pub restaurant_id: i64,
    pub customer: Option<CustomerIdentity>,
}

impl OrderScope {
    pub fn customer(restaurant_id: i64, identity: CustomerIdentity) -> Self {
        Self { restaurant_id, customer: Some(identity) }
    }

    pub fn restaurant(restaurant_id: i64) -> Self {
        Self { restaurant_id, customer: None }
    }

    /// Checks that an actor may act under this scope. Customer actions need a customer identity and restaurant actions
    /// must not carry one.
    pub fn authorize(&self, actor: Actor) -> Result<(), OrderFlowError> {
        match (actor, &self.customer) {
            (Actor::Customer, Some(_)) | (Actor::Restaurant | Actor::System, None) => Ok(()),
            (Actor::Customer, None) => {
                Err(OrderFlowError::Forbidden("Customer actions require a customer identity".to_string()))
            },
            (_, Some(c)) => Err(OrderFlowError::Forbidden(format!("{c} may not perform {actor} actions"))),
        }
    }
}

impl Display for OrderScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.customer {
            Some(c) => write!(f, "restaurant #{} / {c}", self.restaurant_id),
            None => write!(f, "restaurant #{}", self.restaurant_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFeedback {
    pub star: i64,
    pub content: String,
}

impl NewFeedback {
    pub fn new<S: Into<String>>(star: i64, content: S) -> Result<Self, OrderFlowError> {
        if !(1..=5).contains(&star) {
            return Err(OrderFlowError::InvalidInput(format!("Feedback star must be between 1 and 5, got {star}")));
        }
        Ok(Self { star, content: content.into() })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepFailure {
    pub order_id: i64,
    pub reason: String,
}

/// The outcome of one timeout sweep.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeoutSweepResult {
    /// Orders moved to `over_time_customer` by this sweep
    pub escalated: Vec<Order>,
    /// Orders that left `waiting_confirm_customer` between selection and update. Another actor won the race.
    pub skipped: Vec<i64>,
    pub failed: Vec<SweepFailure>,
}

impl TimeoutSweepResult {
    pub fn is_empty(&self) -> bool {
        self.escalated.is_empty() && self.skipped.is_empty() && self.failed.is_empty()
    }

    pub fn count(&self) -> usize {
        self.escalated.len()
    }
}
