//! Catalog rows and order builders shared by the engine's tests.
use url::Url;

use crate::{
    db_types::{CustomerIdentity, LineKind, NewOrder, NewOrderLine, Recipient, StockStatus},
    SqliteDatabase,
};

pub const RESTAURANT: i64 = 1;
pub const OTHER_RESTAURANT: i64 = 2;

#[derive(Debug, Clone)]
pub struct CatalogFixture {
    pub restaurant_id: i64,
    pub name: String,
    pub price: i64,
    pub open_time: String,
    pub close_time: String,
    pub stock_status: StockStatus,
    pub enabled: bool,
}

impl CatalogFixture {
    pub fn new(restaurant_id: i64, name: &str, price: i64) -> Self {
        Self {
            restaurant_id,
            name: name.to_string(),
            price,
            open_time: "00:00".to_string(),
            close_time: "23:59".to_string(),
            stock_status: StockStatus::InStock,
            enabled: true,
        }
    }

    pub fn serving(mut self, open: &str, close: &str) -> Self {
        self.open_time = open.to_string();
        self.close_time = close.to_string();
        self
    }

    pub fn stock(mut self, status: StockStatus) -> Self {
        self.stock_status = status;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

fn tables(kind: LineKind) -> (&'static str, &'static str, &'static str) {
    match kind {
        LineKind::Food => ("food_items", "food_options", "food_item_id"),
        LineKind::Combo => ("combos", "combo_options", "combo_id"),
    }
}

/// Inserts a catalog item and returns its id.
pub async fn insert_catalog_item(db: &SqliteDatabase, kind: LineKind, item: &CatalogFixture) -> i64 {
    let (items, _, _) = tables(kind);
    let sql = format!(
        "INSERT INTO {items} (restaurant_id, name, price, open_time, close_time, stock_status, enabled) VALUES ($1, \
         $2, $3, $4, $5, $6, $7) RETURNING id"
    );
    // Drain the rows so the statement (and its implicit write transaction) finishes before we return.
    let rows: Vec<(i64,)> = sqlx::query_as(&sql)
        .bind(item.restaurant_id)
        .bind(&item.name)
        .bind(item.price)
        .bind(&item.open_time)
        .bind(&item.close_time)
        .bind(item.stock_status)
        .bind(item.enabled)
        .fetch_all(db.pool())
        .await
        .expect("Error inserting catalog item");
    rows[0].0
}

/// Inserts an enabled option for a catalog item and returns its id.
pub async fn insert_catalog_option(
    db: &SqliteDatabase,
    kind: LineKind,
    restaurant_id: i64,
    item_id: i64,
    name: &str,
    price: i64,
) -> i64 {
    let (_, options, parent) = tables(kind);
    let sql =
        format!("INSERT INTO {options} (restaurant_id, {parent}, name, price) VALUES ($1, $2, $3, $4) RETURNING id");
    // Drain the rows so the statement (and its implicit write transaction) finishes before we return.
    let rows: Vec<(i64,)> = sqlx::query_as(&sql)
        .bind(restaurant_id)
        .bind(item_id)
        .bind(name)
        .bind(price)
        .fetch_all(db.pool())
        .await
        .expect("Error inserting catalog option");
    rows[0].0
}

/// Simulates a catalog edit after an order has been placed.
pub async fn reprice_catalog_item(db: &SqliteDatabase, kind: LineKind, item_id: i64, name: &str, price: i64) {
    let (items, _, _) = tables(kind);
    let sql = format!("UPDATE {items} SET name = $1, price = $2 WHERE id = $3");
    sqlx::query(&sql)
        .bind(name)
        .bind(price)
        .bind(item_id)
        .execute(db.pool())
        .await
        .expect("Error updating catalog item");
}

pub fn recipient() -> Recipient {
    Recipient {
        name: "Minh Anh".to_string(),
        phone: "0901234567".to_string(),
        email: "minh.anh@example.com".to_string(),
        address: "12 Ly Tu Trong, District 1".to_string(),
        note: None,
    }
}

pub fn confirmation_url() -> Url {
    Url::parse("https://platter.example.com/orders/confirm").expect("static url")
}

pub fn guest(id: &str) -> CustomerIdentity {
    CustomerIdentity::Guest(id.to_string())
}

pub fn user(id: &str) -> CustomerIdentity {
    CustomerIdentity::User(id.to_string())
}

/// A new order for `quantity` of one catalog item.
pub fn order_for(kind: LineKind, requester: CustomerIdentity, item_id: i64, quantity: u32) -> NewOrder {
    NewOrder::new(RESTAURANT, kind, requester, recipient(), confirmation_url())
        .with_line(NewOrderLine::new(item_id, quantity))
}
