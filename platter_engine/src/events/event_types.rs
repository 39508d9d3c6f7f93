use serde::{Deserialize, Serialize};

use crate::db_types::{LineKind, Order, Recipient};

/// Published once an order and its snapshots have been committed. Consumers typically email the confirmation link to
/// the recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub restaurant_id: i64,
    pub order_id: i64,
    pub line_kind: LineKind,
    pub recipient: Recipient,
    pub confirmation_link: String,
}

impl OrderCreatedEvent {
    pub fn new(order: &Order, confirmation_link: String) -> Self {
        Self {
            restaurant_id: order.restaurant_id,
            order_id: order.id,
            line_kind: order.line_kind,
            recipient: Recipient {
                name: order.recipient_name.clone(),
                phone: order.recipient_phone.clone(),
                email: order.recipient_email.clone(),
                address: order.recipient_address.clone(),
                note: order.recipient_note.clone(),
            },
            confirmation_link,
        }
    }
}

/// A human-readable notice for the restaurant's dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderNotificationEvent {
    pub restaurant_id: i64,
    pub order_id: i64,
    pub content: String,
}

impl OrderNotificationEvent {
    pub fn new<S: Into<String>>(order: &Order, content: S) -> Self {
        Self { restaurant_id: order.restaurant_id, order_id: order.id, content: content.into() }
    }
}

/// A guest client has proven that it used to be `old_guest_id` and is now `new_guest_id`. Everything owned by the old
/// identity should move to the new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityMergeEvent {
    pub old_guest_id: String,
    pub new_guest_id: String,
}

impl IdentityMergeEvent {
    pub fn new<S: Into<String>>(old_guest_id: S, new_guest_id: S) -> Self {
        Self { old_guest_id: old_guest_id.into(), new_guest_id: new_guest_id.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderCreated(OrderCreatedEvent),
    OrderNotification(OrderNotificationEvent),
    IdentityMerge(IdentityMergeEvent),
}
