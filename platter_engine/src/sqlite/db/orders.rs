use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{
        CustomerIdentity,
        ItemSnapshot,
        LineKind,
        NewOrder,
        Order,
        OrderItem,
        OrderLine,
        OrderStatusType,
    },
    state_machine::Transition,
    traits::{NewFeedback, OrderScope},
};

/// The statuses in which a customer may leave feedback.
pub const FEEDBACK_STATUSES: [OrderStatusType; 2] = [OrderStatusType::ReceivedCustomer, OrderStatusType::ComplaintDone];

/// Inserts a new order header in `waiting_confirm_customer`. This is not atomic. You can embed this call inside a
/// transaction if you need to ensure atomicity.
pub async fn insert_order(
    order: &NewOrder,
    created_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                restaurant_id,
                line_kind,
                user_id,
                guest_id,
                recipient_name,
                recipient_phone,
                recipient_email,
                recipient_address,
                recipient_note,
                shipping_method,
                shipping_price,
                status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
            RETURNING *;
        "#,
    )
    .bind(order.restaurant_id)
    .bind(order.line_kind)
    .bind(order.requester.user_id())
    .bind(order.requester.guest_id())
    .bind(order.recipient.name.as_str())
    .bind(order.recipient.phone.as_str())
    .bind(order.recipient.email.as_str())
    .bind(order.recipient.address.as_str())
    .bind(order.recipient.note.as_deref())
    .bind(order.shipping_method)
    .bind(order.shipping_price)
    .bind(OrderStatusType::WaitingConfirmCustomer)
    .bind(created_at)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order #{} inserted for restaurant #{}", order.id, order.restaurant_id);
    Ok(order)
}

pub async fn insert_order_item(
    order_id: i64,
    snapshot_id: i64,
    quantity: u32,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, sqlx::Error> {
    let item = sqlx::query_as(
        "INSERT INTO order_items (order_id, snapshot_id, quantity) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(order_id)
    .bind(snapshot_id)
    .bind(i64::from(quantity))
    .fetch_one(conn)
    .await?;
    Ok(item)
}

fn push_scope(builder: &mut QueryBuilder<'_, Sqlite>, order_id: i64, scope: &OrderScope) {
    builder.push(" WHERE id = ").push_bind(order_id);
    builder.push(" AND restaurant_id = ").push_bind(scope.restaurant_id);
    match &scope.customer {
        Some(CustomerIdentity::User(id)) => {
            builder.push(" AND user_id = ").push_bind(id.clone());
        },
        Some(CustomerIdentity::Guest(id)) => {
            builder.push(" AND guest_id = ").push_bind(id.clone());
        },
        None => {},
    }
}

fn push_status_in(builder: &mut QueryBuilder<'_, Sqlite>, statuses: &[OrderStatusType]) {
    builder.push("status IN (");
    let mut list = builder.separated(", ");
    for status in statuses {
        list.push_bind(*status);
    }
    list.push_unseparated(")");
}

pub async fn fetch_order(
    order_id: i64,
    scope: &OrderScope,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders");
    push_scope(&mut builder, order_id, scope);
    let order = builder.build_query_as().fetch_optional(conn).await?;
    Ok(order)
}

/// Fetches the lines of an order, each paired with its snapshot, in the order they were created.
pub async fn fetch_order_lines(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderLine>, sqlx::Error> {
    let items: Vec<OrderItem> = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;
    let snapshots: Vec<ItemSnapshot> = sqlx::query_as(
        "SELECT * FROM item_snapshots WHERE id IN (SELECT snapshot_id FROM order_items WHERE order_id = $1)",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;
    let lines = items
        .into_iter()
        .filter_map(|item| {
            let snapshot = snapshots.iter().find(|s| s.id == item.snapshot_id)?.clone();
            Some(OrderLine { item, snapshot })
        })
        .collect();
    Ok(lines)
}

/// Applies the transition with one conditional write. The update only happens if the order exists in the given scope
/// and is currently in one of the statuses the action may be applied from (for its line kind).
///
/// Returns `None` if nothing matched.
pub async fn transition_order(
    order_id: i64,
    scope: &OrderScope,
    transition: &Transition,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let action = transition.action();
    let mut builder = QueryBuilder::new("UPDATE orders SET status = ");
    builder.push_bind(action.target());
    builder.push(", updated_at = ").push_bind(at);
    if let Some(reason) = transition.cancel_reason() {
        builder.push(", cancel_reason = ").push_bind(reason.to_string());
    }
    if let Some(complaint) = transition.complaint() {
        builder.push(", complaint = ").push_bind(complaint.to_string());
    }
    push_scope(&mut builder, order_id, scope);
    builder.push(" AND (");
    for (i, kind) in LineKind::ALL.iter().enumerate() {
        if i > 0 {
            builder.push(" OR ");
        }
        builder.push("(line_kind = ").push_bind(*kind).push(" AND ");
        push_status_in(&mut builder, action.allowed_from(*kind));
        builder.push(")");
    }
    builder.push(") RETURNING *");
    let order: Option<Order> = builder.build_query_as().fetch_optional(conn).await?;
    match &order {
        Some(o) => trace!("🗃️ Order #{order_id} is now {}", o.status),
        None => trace!("🗃️ No order #{order_id} in {scope} can be moved to {}", action.target()),
    }
    Ok(order)
}

/// Stores feedback on an order that has been received and has no feedback yet. Returns `None` if nothing matched.
pub async fn set_feedback(
    order_id: i64,
    scope: &OrderScope,
    feedback: &NewFeedback,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("UPDATE orders SET feedback_star = ");
    builder.push_bind(feedback.star);
    builder.push(", feedback_content = ").push_bind(feedback.content.clone());
    builder.push(", updated_at = ").push_bind(at);
    push_scope(&mut builder, order_id, scope);
    builder.push(" AND feedback_star IS NULL AND ");
    push_status_in(&mut builder, &FEEDBACK_STATUSES);
    builder.push(" RETURNING *");
    let order = builder.build_query_as().fetch_optional(conn).await?;
    Ok(order)
}

/// Stores the restaurant's reply on an order that has feedback but no reply yet. Returns `None` if nothing matched.
pub async fn set_feedback_reply(
    order_id: i64,
    restaurant_id: i64,
    reply: &str,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET feedback_reply = $1, updated_at = $2
            WHERE id = $3 AND restaurant_id = $4 AND feedback_star IS NOT NULL AND feedback_reply IS NULL
            RETURNING *;
        "#,
    )
    .bind(reply)
    .bind(at)
    .bind(order_id)
    .bind(restaurant_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Flips the visibility of feedback that has a reply. Returns `None` if nothing matched.
pub async fn toggle_feedback_visibility(
    order_id: i64,
    restaurant_id: i64,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET feedback_visible = NOT feedback_visible, updated_at = $1
            WHERE id = $2 AND restaurant_id = $3 AND feedback_reply IS NOT NULL
            RETURNING *;
        "#,
    )
    .bind(at)
    .bind(order_id)
    .bind(restaurant_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Orders still waiting for the customer's confirmation that were created before `created_before`, oldest first.
pub async fn fetch_unconfirmed_orders(
    created_before: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE status = $1 AND created_at < $2 ORDER BY created_at, id")
        .bind(OrderStatusType::WaitingConfirmCustomer)
        .bind(created_before)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

/// Moves all orders of one line kind from one guest identity to another. Returns the number of orders moved.
pub async fn reassign_guest(
    kind: LineKind,
    old_guest_id: &str,
    new_guest_id: &str,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE orders SET guest_id = $1 WHERE guest_id = $2 AND line_kind = $3")
        .bind(new_guest_id)
        .bind(old_guest_id)
        .bind(kind)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
