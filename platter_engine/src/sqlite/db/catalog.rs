//! Read-only access to the food and combo catalog tables.
//!
//! Food items and combos have identical shapes but live in different tables. [`CatalogLine`] describes where each
//! kind is stored, and [`FoodLine`] / [`ComboLine`] are the two adapters. Everything else in the order engine is
//! shared between the two kinds.
use sqlx::{QueryBuilder, SqliteConnection};

use crate::db_types::{CatalogItem, CatalogOption, LineKind};

pub trait CatalogLine {
    const KIND: LineKind;
    const ITEM_TABLE: &'static str;
    const OPTION_TABLE: &'static str;
    /// The column in the option table that refers to the parent item
    const PARENT_COLUMN: &'static str;
}

pub struct FoodLine;

impl CatalogLine for FoodLine {
    const KIND: LineKind = LineKind::Food;
    const ITEM_TABLE: &'static str = "food_items";
    const OPTION_TABLE: &'static str = "food_options";
    const PARENT_COLUMN: &'static str = "food_item_id";
}

pub struct ComboLine;

impl CatalogLine for ComboLine {
    const KIND: LineKind = LineKind::Combo;
    const ITEM_TABLE: &'static str = "combos";
    const OPTION_TABLE: &'static str = "combo_options";
    const PARENT_COLUMN: &'static str = "combo_id";
}

/// Fetches a catalog item of kind `L`, scoped to the restaurant. Disabled and sold-out items are returned as-is; it is
/// up to the caller to decide whether they can be ordered.
pub async fn fetch_item<L: CatalogLine>(
    restaurant_id: i64,
    item_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<CatalogItem>, sqlx::Error> {
    let sql = format!(
        "SELECT id, restaurant_id, name, price, description, image, note, open_time, close_time, stock_status, \
         enabled FROM {} WHERE id = $1 AND restaurant_id = $2",
        L::ITEM_TABLE
    );
    let item = sqlx::query_as(&sql).bind(item_id).bind(restaurant_id).fetch_optional(conn).await?;
    Ok(item)
}

/// Fetches the options of kind `L` with the given ids. Options that don't exist are simply absent from the result.
pub async fn fetch_options<L: CatalogLine>(
    option_ids: &[i64],
    conn: &mut SqliteConnection,
) -> Result<Vec<CatalogOption>, sqlx::Error> {
    if option_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new(format!(
        "SELECT id, restaurant_id, {} AS item_id, name, price, enabled FROM {} WHERE id IN (",
        L::PARENT_COLUMN,
        L::OPTION_TABLE
    ));
    let mut ids = builder.separated(", ");
    for id in option_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(")");
    let options = builder.build_query_as().fetch_all(conn).await?;
    Ok(options)
}
