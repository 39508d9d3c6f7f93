use chrono::{DateTime, Utc};
use log::trace;
use sqlx::{types::Json, SqliteConnection};

use crate::db_types::{ItemSnapshot, NewItemSnapshot};

/// Writes a new item snapshot. Snapshots can never be changed afterwards; the table rejects updates and deletes.
pub async fn insert_snapshot(
    snapshot: NewItemSnapshot,
    created_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<ItemSnapshot, sqlx::Error> {
    let snapshot: ItemSnapshot = sqlx::query_as(
        r#"
            INSERT INTO item_snapshots (
                restaurant_id,
                line_kind,
                source_item_id,
                name,
                price,
                description,
                image,
                note,
                options,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *;
        "#,
    )
    .bind(snapshot.restaurant_id)
    .bind(snapshot.line_kind)
    .bind(snapshot.source_item_id)
    .bind(snapshot.name)
    .bind(snapshot.price)
    .bind(snapshot.description)
    .bind(snapshot.image)
    .bind(snapshot.note)
    .bind(Json(snapshot.options))
    .bind(created_at)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Snapshot #{} taken of {} #{}", snapshot.id, snapshot.line_kind, snapshot.source_item_id);
    Ok(snapshot)
}
