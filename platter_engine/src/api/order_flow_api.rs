use std::fmt::Debug;

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use log::*;
use url::Url;

use crate::{
    db_types::{CustomerIdentity, NewOrder, Order, OrderDetails},
    events::{EventProducers, OrderCreatedEvent, OrderNotificationEvent},
    state_machine::{OrderAction, Transition},
    traits::{NewFeedback, OrderFlowError, OrderLifecycleDatabase, OrderScope, SweepFailure, TimeoutSweepResult},
};

pub const DEFAULT_CONFIRM_TIMEOUT_MINUTES: i64 = 10;
pub const SWEEPER_LEASE_NAME: &str = "order_timeout_sweeper";

#[derive(Debug, Clone, Copy)]
pub struct OrderFlowSettings {
    /// The restaurant's local UTC offset. Serving windows are checked against wall-clock time at this offset.
    pub business_offset: FixedOffset,
    /// How long a customer has to confirm a new order before the sweeper escalates it.
    pub confirm_timeout: Duration,
}

impl Default for OrderFlowSettings {
    fn default() -> Self {
        Self { business_offset: Utc.fix(), confirm_timeout: Duration::minutes(DEFAULT_CONFIRM_TIMEOUT_MINUTES) }
    }
}

/// `OrderFlowApi` is the primary API for placing orders and moving them through their lifecycle, on behalf of
/// customers, restaurants and the timeout sweeper.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
    settings: OrderFlowSettings,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({:?})", self.settings)
    }
}

impl<B: Clone> Clone for OrderFlowApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), producers: self.producers.clone(), settings: self.settings }
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, settings: OrderFlowSettings::default() }
    }

    pub fn with_settings(mut self, settings: OrderFlowSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &OrderFlowSettings {
        &self.settings
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

impl<B> OrderFlowApi<B>
where B: OrderLifecycleDatabase
{
    /// Places a new order, snapshotting every referenced catalog item.
    ///
    /// Once the order is committed, an [`OrderCreatedEvent`] carrying the confirmation link and an
    /// [`OrderNotificationEvent`] for the restaurant are published.
    pub async fn place_order(&self, order: NewOrder) -> Result<OrderDetails, OrderFlowError> {
        self.place_order_at(order, Utc::now()).await
    }

    /// Same as [`Self::place_order`], but with an explicit wall-clock time for the serving window checks.
    pub async fn place_order_at(&self, order: NewOrder, at: DateTime<Utc>) -> Result<OrderDetails, OrderFlowError> {
        validate_new_order(&order)?;
        let local = at.with_timezone(&self.settings.business_offset);
        let confirmation_url = order.confirmation_url.clone();
        let details = self.db.create_order_with_snapshots(order, local, self.settings.confirm_timeout).await?;
        let header = &details.order;
        info!(
            "🔄️📦️ Order #{} placed with restaurant #{} ({} lines, total {})",
            header.id,
            header.restaurant_id,
            details.lines.len(),
            details.total_price()
        );
        let link = confirmation_link(&confirmation_url, header);
        self.producers.publish_order_created(OrderCreatedEvent::new(header, link)).await;
        let content = format!("New {} order #{} from {}", header.line_kind, header.id, header.recipient_name);
        self.producers.publish_order_notification(OrderNotificationEvent::new(header, content)).await;
        Ok(details)
    }

    /// Fetches an order with its items and history, as seen by the customer who placed it.
    pub async fn order_for_customer(
        &self,
        order_id: i64,
        restaurant_id: i64,
        customer: CustomerIdentity,
    ) -> Result<OrderDetails, OrderFlowError> {
        let scope = OrderScope::customer(restaurant_id, customer);
        self.db.fetch_order_details(order_id, &scope).await?.ok_or(OrderFlowError::OrderNotFound(order_id))
    }

    /// Fetches an order with its items and history, as seen by the restaurant.
    pub async fn order_for_restaurant(&self, order_id: i64, restaurant_id: i64) -> Result<OrderDetails, OrderFlowError> {
        let scope = OrderScope::restaurant(restaurant_id);
        self.db.fetch_order_details(order_id, &scope).await?.ok_or(OrderFlowError::OrderNotFound(order_id))
    }

    /// Applies a customer action. The order must belong to `customer`.
    pub async fn customer_action(
        &self,
        order_id: i64,
        restaurant_id: i64,
        customer: CustomerIdentity,
        transition: Transition,
    ) -> Result<Order, OrderFlowError> {
        let scope = OrderScope::customer(restaurant_id, customer);
        let order = self.db.apply_transition(order_id, &scope, &transition, Utc::now()).await?;
        debug!("🔄️ Order #{order_id}: {}", transition.describe());
        let content = format!("Order #{order_id}: {}", transition.describe());
        self.producers.publish_order_notification(OrderNotificationEvent::new(&order, content)).await;
        Ok(order)
    }

    /// Applies a restaurant action to one of the restaurant's orders.
    pub async fn restaurant_action(
        &self,
        order_id: i64,
        restaurant_id: i64,
        transition: Transition,
    ) -> Result<Order, OrderFlowError> {
        let scope = OrderScope::restaurant(restaurant_id);
        let order = self.db.apply_transition(order_id, &scope, &transition, Utc::now()).await?;
        debug!("🔄️ Order #{order_id}: {}", transition.describe());
        Ok(order)
    }

    pub async fn customer_confirm(
        &self,
        order_id: i64,
        restaurant_id: i64,
        customer: CustomerIdentity,
    ) -> Result<Order, OrderFlowError> {
        let transition = Transition::new(OrderAction::CustomerConfirm)?;
        self.customer_action(order_id, restaurant_id, customer, transition).await
    }

    pub async fn customer_cancel(
        &self,
        order_id: i64,
        restaurant_id: i64,
        customer: CustomerIdentity,
        reason: &str,
    ) -> Result<Order, OrderFlowError> {
        let transition = Transition::with_note(OrderAction::CustomerCancel, reason)?;
        self.customer_action(order_id, restaurant_id, customer, transition).await
    }

    pub async fn customer_receive(
        &self,
        order_id: i64,
        restaurant_id: i64,
        customer: CustomerIdentity,
    ) -> Result<Order, OrderFlowError> {
        let transition = Transition::new(OrderAction::CustomerReceive)?;
        self.customer_action(order_id, restaurant_id, customer, transition).await
    }

    pub async fn customer_complaint(
        &self,
        order_id: i64,
        restaurant_id: i64,
        customer: CustomerIdentity,
        content: &str,
    ) -> Result<Order, OrderFlowError> {
        let transition = Transition::with_note(OrderAction::CustomerComplaint, content)?;
        self.customer_action(order_id, restaurant_id, customer, transition).await
    }

    pub async fn customer_complaint_done(
        &self,
        order_id: i64,
        restaurant_id: i64,
        customer: CustomerIdentity,
    ) -> Result<Order, OrderFlowError> {
        let transition = Transition::new(OrderAction::CustomerComplaintDone)?;
        self.customer_action(order_id, restaurant_id, customer, transition).await
    }

    /// Leaves feedback on a received order. Feedback can only be given once.
    pub async fn customer_feedback(
        &self,
        order_id: i64,
        restaurant_id: i64,
        customer: CustomerIdentity,
        feedback: NewFeedback,
    ) -> Result<Order, OrderFlowError> {
        let scope = OrderScope::customer(restaurant_id, customer);
        let order = self.db.submit_feedback(order_id, &scope, &feedback, Utc::now()).await?;
        let content = format!("Order #{order_id} received {} star feedback", feedback.star);
        self.producers.publish_order_notification(OrderNotificationEvent::new(&order, content)).await;
        Ok(order)
    }

    pub async fn restaurant_confirm(&self, order_id: i64, restaurant_id: i64) -> Result<Order, OrderFlowError> {
        let transition = Transition::new(OrderAction::RestaurantConfirm)?;
        self.restaurant_action(order_id, restaurant_id, transition).await
    }

    pub async fn restaurant_cancel(
        &self,
        order_id: i64,
        restaurant_id: i64,
        reason: &str,
    ) -> Result<Order, OrderFlowError> {
        let transition = Transition::with_note(OrderAction::RestaurantCancel, reason)?;
        self.restaurant_action(order_id, restaurant_id, transition).await
    }

    pub async fn restaurant_confirm_shipping(&self, order_id: i64, restaurant_id: i64) -> Result<Order, OrderFlowError> {
        let transition = Transition::new(OrderAction::RestaurantConfirmShipping)?;
        self.restaurant_action(order_id, restaurant_id, transition).await
    }

    pub async fn restaurant_delivered(&self, order_id: i64, restaurant_id: i64) -> Result<Order, OrderFlowError> {
        let transition = Transition::new(OrderAction::RestaurantDelivered)?;
        self.restaurant_action(order_id, restaurant_id, transition).await
    }

    pub async fn restaurant_customer_unreachable(
        &self,
        order_id: i64,
        restaurant_id: i64,
    ) -> Result<Order, OrderFlowError> {
        let transition = Transition::new(OrderAction::RestaurantCustomerUnreachable)?;
        self.restaurant_action(order_id, restaurant_id, transition).await
    }

    /// Replies to the customer's feedback. Only one reply is accepted.
    pub async fn restaurant_reply_feedback(
        &self,
        order_id: i64,
        restaurant_id: i64,
        reply: &str,
    ) -> Result<Order, OrderFlowError> {
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(OrderFlowError::InvalidInput("A feedback reply cannot be empty".to_string()));
        }
        self.db.reply_to_feedback(order_id, restaurant_id, reply, Utc::now()).await
    }

    /// Shows or hides replied-to feedback. Each call flips the current setting.
    pub async fn restaurant_toggle_feedback_visibility(
        &self,
        order_id: i64,
        restaurant_id: i64,
    ) -> Result<Order, OrderFlowError> {
        self.db.toggle_feedback_visibility(order_id, restaurant_id, Utc::now()).await
    }

    /// Tries to become (or stay) the instance that runs the timeout sweeper. Only the lease holder should sweep.
    pub async fn acquire_sweeper_lease(&self, holder: &str, ttl: Duration) -> Result<bool, OrderFlowError> {
        self.db.try_acquire_lease(SWEEPER_LEASE_NAME, holder, ttl, Utc::now()).await
    }

    /// Moves every order that has waited longer than the confirmation timeout to `over_time_customer`.
    pub async fn expire_unconfirmed_orders(&self) -> Result<TimeoutSweepResult, OrderFlowError> {
        self.expire_unconfirmed_orders_at(Utc::now()).await
    }

    /// Same as [`Self::expire_unconfirmed_orders`], with an explicit notion of "now".
    ///
    /// Each order is moved in its own transaction. An order that has already left `waiting_confirm_customer` is
    /// skipped, and any other failure is logged and recorded without stopping the sweep.
    pub async fn expire_unconfirmed_orders_at(&self, now: DateTime<Utc>) -> Result<TimeoutSweepResult, OrderFlowError> {
        let timeout = self.settings.confirm_timeout;
        let candidates = self.db.fetch_unconfirmed_orders(now - timeout).await?;
        let mut result = TimeoutSweepResult::default();
        if candidates.is_empty() {
            return Ok(result);
        }
        trace!("🕰️ {} orders have not been confirmed in time", candidates.len());
        let note = format!("not confirmed within {} minutes", timeout.num_minutes());
        let transition = Transition::with_note(OrderAction::Timeout, note)?;
        for order in candidates {
            let scope = OrderScope::restaurant(order.restaurant_id);
            match self.db.apply_transition(order.id, &scope, &transition, now).await {
                Ok(order) => result.escalated.push(order),
                Err(OrderFlowError::OrderNotFound(id)) => {
                    debug!("🕰️ Order #{id} changed status before it could be timed out. Skipping it.");
                    result.skipped.push(id);
                },
                Err(e) => {
                    warn!("🕰️ Could not time out order #{}: {e}", order.id);
                    result.failed.push(SweepFailure { order_id: order.id, reason: e.to_string() });
                },
            }
        }
        Ok(result)
    }
}

fn validate_new_order(order: &NewOrder) -> Result<(), OrderFlowError> {
    if order.lines.is_empty() {
        return Err(OrderFlowError::InvalidInput("An order needs at least one item".to_string()));
    }
    if order.requester.id().trim().is_empty() {
        return Err(OrderFlowError::InvalidInput("The requester id cannot be empty".to_string()));
    }
    let r = &order.recipient;
    let missing = [("name", &r.name), ("phone", &r.phone), ("email", &r.email), ("address", &r.address)]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(OrderFlowError::InvalidInput(format!("Recipient {} cannot be empty", missing.join(", "))));
    }
    if order.shipping_price.is_negative() {
        return Err(OrderFlowError::InvalidInput("The shipping price cannot be negative".to_string()));
    }
    Ok(())
}

/// The link the customer follows to confirm the order. The order and restaurant ids are added as query parameters.
pub fn confirmation_link(base: &Url, order: &Order) -> String {
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair("order_id", &order.id.to_string())
        .append_pair("restaurant_id", &order.restaurant_id.to_string());
    url.to_string()
}
