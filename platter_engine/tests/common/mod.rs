use log::*;
use platter_engine::{
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    OrderFlowApi,
    OrderLifecycleDatabase,
    SqliteDatabase,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub async fn setup() -> OrderFlowApi<SqliteDatabase> {
    setup_with(EventProducers::default()).await
}

pub async fn setup_with(producers: EventProducers) -> OrderFlowApi<SqliteDatabase> {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 10).await.expect("Error creating database");
    OrderFlowApi::new(db, producers)
}

#[allow(dead_code)]
pub async fn tear_down(mut api: OrderFlowApi<SqliteDatabase>) {
    let url = api.db().url().to_string();
    if let Err(e) = api.db_mut().close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("🚀️ Failed to drop database {url}: {e}");
    }
}
