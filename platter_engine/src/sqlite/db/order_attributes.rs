use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db_types::{AttributeType, OrderAttribute};

/// Appends an entry to the order's attribute log. The entry is numbered one past the current last entry.
pub async fn append_attribute(
    order_id: i64,
    attr_type: AttributeType,
    description: &str,
    created_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<OrderAttribute, sqlx::Error> {
    let attribute = sqlx::query_as(
        r#"
            INSERT INTO order_attributes (order_id, seq, attr_type, description, created_at)
            VALUES (
                $1,
                (SELECT COALESCE(MAX(seq), 0) + 1 FROM order_attributes WHERE order_id = $1),
                $2,
                $3,
                $4
            )
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(attr_type)
    .bind(description)
    .bind(created_at)
    .fetch_one(conn)
    .await?;
    Ok(attribute)
}

/// The full attribute log of an order, oldest entry first.
pub async fn fetch_history(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderAttribute>, sqlx::Error> {
    let history = sqlx::query_as("SELECT * FROM order_attributes WHERE order_id = $1 ORDER BY seq")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(history)
}
