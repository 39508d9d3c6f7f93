use std::collections::HashMap;

use cucumber::World;
use log::*;
use platter_engine::{
    events::EventProducers,
    test_utils::prepare_env::{create_database, random_db_path, run_migrations},
    traits::OrderFlowError,
    OrderFlowApi,
    SqliteDatabase,
};

#[derive(Default, Debug, World)]
pub struct OrderWorld {
    pub system: Option<OrderFlowSystem>,
    /// Catalog item ids, by name
    pub items: HashMap<String, i64>,
    /// Order ids, by the label the scenario gave them
    pub orders: HashMap<String, i64>,
    pub last_error: Option<OrderFlowError>,
}

#[derive(Debug)]
pub struct OrderFlowSystem {
    pub db_path: String,
    pub api: OrderFlowApi<SqliteDatabase>,
}

impl OrderWorld {
    pub fn api(&self) -> &OrderFlowApi<SqliteDatabase> {
        &self.system.as_ref().expect("OrderFlowApi not initialised").api
    }

    pub fn item(&self, name: &str) -> i64 {
        *self.items.get(name).unwrap_or_else(|| panic!("No catalog item called {name}"))
    }

    pub fn order(&self, label: &str) -> i64 {
        *self.orders.get(label).unwrap_or_else(|| panic!("No order labelled {label}"))
    }
}

impl OrderFlowSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let api = OrderFlowApi::new(db, EventProducers::default());
        Self { db_path: url, api }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
