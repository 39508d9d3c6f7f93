//! `SqliteDatabase` is a concrete implementation of an order engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`traits`] module.
//!
//! [`traits`]: crate::traits
use std::{collections::HashSet, fmt::Debug};

use chrono::{DateTime, Duration, FixedOffset, Utc};
use log::*;
use sqlx::{SqliteConnection, SqlitePool};

use super::db::{
    catalog::{self, CatalogLine, ComboLine, FoodLine},
    db_url,
    leases,
    new_pool,
    order_attributes,
    orders,
    snapshots,
};
use crate::{
    db_types::{AttributeType, LineKind, NewItemSnapshot, NewOrder, Order, OrderDetails, OrderLine},
    helpers::{check_item_available, resolve_options},
    state_machine::{Actor, Transition},
    traits::{NewFeedback, OrderFlowError, OrderLifecycleDatabase, OrderScope},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl OrderLifecycleDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_order_with_snapshots(
        &self,
        order: NewOrder,
        now: DateTime<FixedOffset>,
        confirm_within: Duration,
    ) -> Result<OrderDetails, OrderFlowError> {
        let created_at = now.with_timezone(&Utc);
        let local_time = now.time();
        let mut tx = self.pool.begin().await?;
        // One snapshot per distinct catalog item. The first line that mentions an item decides its frozen options,
        // but the options of every line must resolve.
        let mut seen = HashSet::new();
        let mut new_snapshots = Vec::new();
        for line in &order.lines {
            let snapshot = match order.line_kind {
                LineKind::Food => {
                    validated_snapshot::<FoodLine>(order.restaurant_id, line.item_id, &line.option_ids, local_time, &mut tx)
                        .await?
                },
                LineKind::Combo => {
                    validated_snapshot::<ComboLine>(
                        order.restaurant_id,
                        line.item_id,
                        &line.option_ids,
                        local_time,
                        &mut tx,
                    )
                    .await?
                },
            };
            if !seen.insert(line.item_id) {
                continue;
            }
            let snapshot = snapshots::insert_snapshot(snapshot, created_at, &mut tx).await?;
            new_snapshots.push(snapshot);
        }
        let header = orders::insert_order(&order, created_at, &mut tx).await?;
        let description = placed_description(&order, confirm_within);
        let seed =
            order_attributes::append_attribute(header.id, AttributeType::CustomerPlaced, &description, created_at, &mut tx)
                .await?;
        let mut lines = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let snapshot = new_snapshots
                .iter()
                .find(|s| s.source_item_id == line.item_id)
                .cloned()
                .ok_or_else(|| OrderFlowError::DatabaseError(format!("Snapshot for item #{} went missing", line.item_id)))?;
            let item = orders::insert_order_item(header.id, snapshot.id, line.quantity, &mut tx).await?;
            lines.push(OrderLine { item, snapshot });
        }
        tx.commit().await?;
        debug!(
            "🗃️ Order #{} created for restaurant #{} with {} lines and {} snapshots",
            header.id,
            header.restaurant_id,
            lines.len(),
            new_snapshots.len()
        );
        Ok(OrderDetails { order: header, lines, history: vec![seed] })
    }

    async fn fetch_order(&self, order_id: i64, scope: &OrderScope) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, scope, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_details(
        &self,
        order_id: i64,
        scope: &OrderScope,
    ) -> Result<Option<OrderDetails>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let Some(order) = orders::fetch_order(order_id, scope, &mut conn).await? else {
            return Ok(None);
        };
        let lines = orders::fetch_order_lines(order_id, &mut conn).await?;
        let history = order_attributes::fetch_history(order_id, &mut conn).await?;
        Ok(Some(OrderDetails { order, lines, history }))
    }

    async fn apply_transition(
        &self,
        order_id: i64,
        scope: &OrderScope,
        transition: &Transition,
        at: DateTime<Utc>,
    ) -> Result<Order, OrderFlowError> {
        let action = transition.action();
        scope.authorize(action.actor())?;
        let mut tx = self.pool.begin().await?;
        // The conditional update must be the first statement of the transaction, so that it takes the write lock
        // before anything is read.
        let order = orders::transition_order(order_id, scope, transition, at, &mut tx)
            .await?
            .ok_or(OrderFlowError::OrderNotFound(order_id))?;
        order_attributes::append_attribute(order_id, action.attribute_type(), &transition.describe(), at, &mut tx)
            .await?;
        tx.commit().await?;
        debug!("🗃️ Order #{order_id}: {action}. Status is now {}", order.status);
        Ok(order)
    }

    async fn submit_feedback(
        &self,
        order_id: i64,
        scope: &OrderScope,
        feedback: &NewFeedback,
        at: DateTime<Utc>,
    ) -> Result<Order, OrderFlowError> {
        scope.authorize(Actor::Customer)?;
        let mut tx = self.pool.begin().await?;
        let Some(order) = orders::set_feedback(order_id, scope, feedback, at, &mut tx).await? else {
            let existing = orders::fetch_order(order_id, scope, &mut tx).await?;
            return match existing {
                Some(o) if o.feedback_star.is_some() => Err(OrderFlowError::FeedbackAlreadySubmitted(order_id)),
                _ => Err(OrderFlowError::OrderNotFound(order_id)),
            };
        };
        let description = format!("[customer] left {} star feedback: {}", feedback.star, feedback.content);
        order_attributes::append_attribute(order_id, AttributeType::Feedback, &description, at, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order #{order_id} received {} star feedback", feedback.star);
        Ok(order)
    }

    async fn reply_to_feedback(
        &self,
        order_id: i64,
        restaurant_id: i64,
        reply: &str,
        at: DateTime<Utc>,
    ) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let Some(order) = orders::set_feedback_reply(order_id, restaurant_id, reply, at, &mut tx).await? else {
            let existing = orders::fetch_order(order_id, &OrderScope::restaurant(restaurant_id), &mut tx).await?;
            return Err(match existing {
                None => OrderFlowError::OrderNotFound(order_id),
                Some(o) if o.feedback_star.is_none() => OrderFlowError::FeedbackNotFound(order_id),
                Some(_) => OrderFlowError::FeedbackAlreadyReplied(order_id),
            });
        };
        let description = format!("[restaurant] replied to feedback: {reply}");
        order_attributes::append_attribute(order_id, AttributeType::FeedbackReply, &description, at, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Restaurant #{restaurant_id} replied to feedback on order #{order_id}");
        Ok(order)
    }

    async fn toggle_feedback_visibility(
        &self,
        order_id: i64,
        restaurant_id: i64,
        at: DateTime<Utc>,
    ) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let Some(order) = orders::toggle_feedback_visibility(order_id, restaurant_id, at, &mut tx).await? else {
            let existing = orders::fetch_order(order_id, &OrderScope::restaurant(restaurant_id), &mut tx).await?;
            return Err(match existing {
                None => OrderFlowError::OrderNotFound(order_id),
                Some(_) => OrderFlowError::FeedbackReplyNotFound(order_id),
            });
        };
        let state = if order.feedback_visible { "visible" } else { "hidden" };
        let description = format!("[restaurant] made feedback {state}");
        order_attributes::append_attribute(order_id, AttributeType::FeedbackVisibility, &description, at, &mut tx)
            .await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn fetch_unconfirmed_orders(&self, created_before: DateTime<Utc>) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_unconfirmed_orders(created_before, &mut conn).await?;
        Ok(orders)
    }

    async fn reassign_guest_orders(
        &self,
        kind: LineKind,
        old_guest_id: &str,
        new_guest_id: &str,
    ) -> Result<u64, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let moved = orders::reassign_guest(kind, old_guest_id, new_guest_id, &mut tx).await?;
        tx.commit().await?;
        Ok(moved)
    }

    async fn try_acquire_lease(
        &self,
        name: &str,
        holder: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let acquired = leases::try_acquire(name, holder, ttl, now, &mut conn).await?;
        Ok(acquired)
    }

    async fn close(&mut self) -> Result<(), OrderFlowError> {
        self.pool.close().await;
        Ok(())
    }
}

/// Loads and validates one catalog item of kind `L` with its requested options, and prepares the snapshot for it.
async fn validated_snapshot<L: CatalogLine>(
    restaurant_id: i64,
    item_id: i64,
    option_ids: &[i64],
    local_time: chrono::NaiveTime,
    conn: &mut SqliteConnection,
) -> Result<NewItemSnapshot, OrderFlowError> {
    let item = catalog::fetch_item::<L>(restaurant_id, item_id, &mut *conn).await?;
    let item = check_item_available(L::KIND, item_id, item, local_time)?;
    let found = catalog::fetch_options::<L>(option_ids, &mut *conn).await?;
    let options = resolve_options(&item, option_ids, &found)?;
    Ok(NewItemSnapshot::copy_of(L::KIND, &item, options))
}

fn placed_description(order: &NewOrder, confirm_within: Duration) -> String {
    let items: u64 = order.lines.iter().map(|l| u64::from(l.quantity)).sum();
    format!(
        "[customer] customer placed an order for {items} items, confirmation required within {} minutes",
        confirm_within.num_minutes()
    )
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies any outstanding schema migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }
}
