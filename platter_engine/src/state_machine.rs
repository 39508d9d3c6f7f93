//! # Order state machine
//!
//! Every status change an order can undergo is described by an [`OrderAction`]. Each action knows
//! * who may perform it ([`Actor`]),
//! * which statuses it may be applied from (this depends on the [`LineKind`] of the order), and
//! * which status it moves the order into.
//!
//! The table is asymmetric on purpose: combo orders may be marked as delivered after the carrier reported the
//! customer as unreachable, food orders may not.
//!
//! Backends enforce the table with a single conditional write. See
//! [`OrderLifecycleDatabase::apply_transition`](crate::traits::OrderLifecycleDatabase::apply_transition).
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    db_types::{AttributeType, LineKind, OrderStatusType},
    traits::OrderFlowError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    /// The customer that placed the order, identified by user id or guest client id
    Customer,
    /// The restaurant that owns the order
    Restaurant,
    /// The timeout sweeper
    System,
}

impl Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::Customer => write!(f, "customer"),
            Actor::Restaurant => write!(f, "restaurant"),
            Actor::System => write!(f, "system"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    CustomerConfirm,
    CustomerCancel,
    Timeout,
    RestaurantConfirm,
    RestaurantCancel,
    RestaurantConfirmShipping,
    RestaurantDelivered,
    RestaurantCustomerUnreachable,
    CustomerReceive,
    CustomerComplaint,
    CustomerComplaintDone,
}

impl OrderAction {
    pub const ALL: [OrderAction; 11] = [
        OrderAction::CustomerConfirm,
        OrderAction::CustomerCancel,
        OrderAction::Timeout,
        OrderAction::RestaurantConfirm,
        OrderAction::RestaurantCancel,
        OrderAction::RestaurantConfirmShipping,
        OrderAction::RestaurantDelivered,
        OrderAction::RestaurantCustomerUnreachable,
        OrderAction::CustomerReceive,
        OrderAction::CustomerComplaint,
        OrderAction::CustomerComplaintDone,
    ];

    pub fn actor(&self) -> Actor {
        use OrderAction::*;
        match self {
            CustomerConfirm | CustomerCancel | CustomerReceive | CustomerComplaint | CustomerComplaintDone => {
                Actor::Customer
            },
            Timeout => Actor::System,
            RestaurantConfirm |
            RestaurantCancel |
            RestaurantConfirmShipping |
            RestaurantDelivered |
            RestaurantCustomerUnreachable => Actor::Restaurant,
        }
    }

    /// The statuses this action may be applied from, for an order of the given kind.
    pub fn allowed_from(&self, kind: LineKind) -> &'static [OrderStatusType] {
        use OrderAction::*;
        use OrderStatusType as S;
        match (self, kind) {
            (CustomerConfirm | CustomerCancel | Timeout, _) => &[S::WaitingConfirmCustomer],
            (RestaurantConfirm, _) => &[S::WaitingConfirmRestaurant],
            (RestaurantCancel, _) => &[S::WaitingConfirmRestaurant, S::WaitingShipping],
            (RestaurantConfirmShipping, _) => &[S::WaitingShipping],
            (RestaurantDelivered, LineKind::Food) => &[S::Shipping],
            (RestaurantDelivered, LineKind::Combo) => &[S::Shipping, S::CustomerUnreachable],
            (RestaurantCustomerUnreachable, _) => &[S::Shipping],
            (CustomerReceive, _) => &[S::DeliveredCustomer],
            (CustomerComplaint, _) => &[S::ReceivedCustomer],
            (CustomerComplaintDone, _) => &[S::Complaint],
        }
    }

    pub fn target(&self) -> OrderStatusType {
        use OrderAction::*;
        use OrderStatusType as S;
        match self {
            CustomerConfirm => S::WaitingConfirmRestaurant,
            CustomerCancel => S::CancelCustomer,
            Timeout => S::OverTimeCustomer,
            RestaurantConfirm => S::WaitingShipping,
            RestaurantCancel => S::CancelRestaurant,
            RestaurantConfirmShipping => S::Shipping,
            RestaurantDelivered => S::DeliveredCustomer,
            RestaurantCustomerUnreachable => S::CustomerUnreachable,
            CustomerReceive => S::ReceivedCustomer,
            CustomerComplaint => S::Complaint,
            CustomerComplaintDone => S::ComplaintDone,
        }
    }

    pub fn attribute_type(&self) -> AttributeType {
        use OrderAction::*;
        match self {
            CustomerConfirm => AttributeType::CustomerConfirmed,
            CustomerCancel => AttributeType::CustomerCancelled,
            Timeout => AttributeType::OverTime,
            RestaurantConfirm => AttributeType::RestaurantConfirmed,
            RestaurantCancel => AttributeType::RestaurantCancelled,
            RestaurantConfirmShipping => AttributeType::Shipping,
            RestaurantDelivered => AttributeType::Delivered,
            RestaurantCustomerUnreachable => AttributeType::CustomerUnreachable,
            CustomerReceive => AttributeType::CustomerReceived,
            CustomerComplaint => AttributeType::Complaint,
            CustomerComplaintDone => AttributeType::ComplaintDone,
        }
    }

    /// Cancellations need a reason and complaints need content.
    pub fn requires_note(&self) -> bool {
        matches!(self, OrderAction::CustomerCancel | OrderAction::RestaurantCancel | OrderAction::CustomerComplaint)
    }

    /// Whether the action may be applied to an order of the given kind in the given status.
    pub fn is_allowed(&self, kind: LineKind, status: OrderStatusType) -> bool {
        self.allowed_from(kind).contains(&status)
    }

    fn summary(&self) -> &'static str {
        use OrderAction::*;
        match self {
            CustomerConfirm => "customer confirmed the order",
            CustomerCancel => "customer cancelled the order",
            Timeout => "order was not confirmed by the customer in time",
            RestaurantConfirm => "restaurant accepted the order",
            RestaurantCancel => "restaurant cancelled the order",
            RestaurantConfirmShipping => "order handed over to the carrier",
            RestaurantDelivered => "restaurant reported the order as delivered",
            RestaurantCustomerUnreachable => "carrier could not reach the customer",
            CustomerReceive => "customer confirmed receipt of the order",
            CustomerComplaint => "customer raised a complaint",
            CustomerComplaintDone => "customer marked the complaint as resolved",
        }
    }
}

impl Display for OrderAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.summary())
    }
}

/// A validated request to apply an [`OrderAction`] to an order.
///
/// The `note` carries the cancellation reason or complaint content for actions that need one, and optional extra
/// detail for the attribute log otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    action: OrderAction,
    note: Option<String>,
}

impl Transition {
    /// Creates a transition for an action that does not need a reason. Use [`Transition::with_note`] for
    /// cancellations and complaints.
    pub fn new(action: OrderAction) -> Result<Self, OrderFlowError> {
        if action.requires_note() {
            return Err(OrderFlowError::InvalidInput(format!("A reason is required to record that the {action}")));
        }
        Ok(Self { action, note: None })
    }

    pub fn with_note<S: Into<String>>(action: OrderAction, note: S) -> Result<Self, OrderFlowError> {
        let note = note.into().trim().to_string();
        if note.is_empty() {
            return Err(OrderFlowError::InvalidInput(format!("A reason is required to record that the {action}")));
        }
        Ok(Self { action, note: Some(note) })
    }

    pub fn action(&self) -> OrderAction {
        self.action
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// The value to store in the `cancel_reason` column, if this transition sets it.
    pub fn cancel_reason(&self) -> Option<&str> {
        match self.action {
            OrderAction::CustomerCancel | OrderAction::RestaurantCancel => self.note(),
            _ => None,
        }
    }

    /// The value to store in the `complaint` column, if this transition sets it.
    pub fn complaint(&self) -> Option<&str> {
        match self.action {
            OrderAction::CustomerComplaint => self.note(),
            _ => None,
        }
    }

    /// The text recorded in the order's attribute log for this transition.
    pub fn describe(&self) -> String {
        let actor = self.action.actor();
        match &self.note {
            Some(note) => format!("[{actor}] {}: {note}", self.action),
            None => format!("[{actor}] {}", self.action),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db_types::OrderStatusType as S;

    const ALL_STATUSES: [OrderStatusType; 12] = [
        S::WaitingConfirmCustomer,
        S::OverTimeCustomer,
        S::WaitingConfirmRestaurant,
        S::CancelCustomer,
        S::WaitingShipping,
        S::CancelRestaurant,
        S::Shipping,
        S::DeliveredCustomer,
        S::CustomerUnreachable,
        S::ReceivedCustomer,
        S::Complaint,
        S::ComplaintDone,
    ];

    #[test]
    fn terminal_statuses_accept_nothing() {
        let terminal = [S::OverTimeCustomer, S::CancelCustomer, S::CancelRestaurant, S::ComplaintDone];
        for kind in LineKind::ALL {
            for status in terminal {
                for action in OrderAction::ALL {
                    assert!(!action.is_allowed(kind, status), "{action:?} should not apply to {kind} in {status}");
                }
            }
        }
    }

    #[test]
    fn shipping_orders() {
        for kind in LineKind::ALL {
            let allowed = OrderAction::ALL.iter().filter(|a| a.is_allowed(kind, S::Shipping)).copied().collect::<Vec<_>>();
            assert_eq!(allowed, vec![OrderAction::RestaurantDelivered, OrderAction::RestaurantCustomerUnreachable]);
            assert!(!OrderAction::CustomerCancel.is_allowed(kind, S::Shipping));
        }
    }

    #[test]
    fn delivered_after_unreachable_is_combo_only() {
        assert!(OrderAction::RestaurantDelivered.is_allowed(LineKind::Combo, S::CustomerUnreachable));
        assert!(!OrderAction::RestaurantDelivered.is_allowed(LineKind::Food, S::CustomerUnreachable));
        for action in OrderAction::ALL {
            assert!(!action.is_allowed(LineKind::Food, S::CustomerUnreachable));
        }
    }

    #[test]
    fn restaurant_cancel_window() {
        for kind in LineKind::ALL {
            let from = ALL_STATUSES
                .iter()
                .filter(|s| OrderAction::RestaurantCancel.is_allowed(kind, **s))
                .copied()
                .collect::<Vec<_>>();
            assert_eq!(from, vec![S::WaitingConfirmRestaurant, S::WaitingShipping]);
        }
    }

    #[test]
    fn waiting_confirm_customer_exits() {
        let exits = OrderAction::ALL
            .iter()
            .filter(|a| a.is_allowed(LineKind::Food, S::WaitingConfirmCustomer))
            .map(|a| (a.actor(), a.target()))
            .collect::<Vec<_>>();
        assert_eq!(exits, vec![
            (Actor::Customer, S::WaitingConfirmRestaurant),
            (Actor::Customer, S::CancelCustomer),
            (Actor::System, S::OverTimeCustomer),
        ]);
    }

    #[test]
    fn no_action_targets_its_own_source() {
        for kind in LineKind::ALL {
            for action in OrderAction::ALL {
                assert!(!action.allowed_from(kind).contains(&action.target()), "{action:?} loops on {kind}");
            }
        }
    }

    #[test]
    fn notes() {
        assert!(Transition::new(OrderAction::CustomerCancel).is_err());
        assert!(Transition::with_note(OrderAction::RestaurantCancel, "   ").is_err());
        let t = Transition::with_note(OrderAction::CustomerComplaint, " cold soup ").unwrap();
        assert_eq!(t.complaint(), Some("cold soup"));
        assert_eq!(t.cancel_reason(), None);
        assert_eq!(t.describe(), "[customer] customer raised a complaint: cold soup");
        let t = Transition::with_note(OrderAction::RestaurantCancel, "out of rice").unwrap();
        assert_eq!(t.cancel_reason(), Some("out of rice"));
        let t = Transition::new(OrderAction::RestaurantConfirmShipping).unwrap();
        assert_eq!(t.describe(), "[restaurant] order handed over to the carrier");
    }
}
