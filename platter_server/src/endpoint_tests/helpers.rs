use std::sync::Arc;

use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use log::debug;
use platter_engine::{
    cache::MemoryCache,
    db_types::LineKind,
    events::{EventHandlers, EventProducers},
    helpers::MergeTokenIssuer,
    test_utils::{
        fixtures::{insert_catalog_item, CatalogFixture, RESTAURANT},
        prepare_env::{destroy_database, prepare_test_env, random_db_path},
    },
    GuestCache,
    GuestCartApi,
    IdentityMergeApi,
    OrderFlowApi,
    OrderLifecycleDatabase,
    SqliteDatabase,
};
use serde_json::{json, Value};

use crate::{
    auth::{TokenIssuer, GUEST_ID_HEADER},
    config::{AuthConfig, ServerOptions},
    server::{configure_routes, create_event_hooks},
};

// DO NOT re-use this secret anywhere.
const TEST_JWT_SECRET: &str = "endpoint-tests-secret-0123456789-abcdefghij";

/// Everything a test server instance shares between requests: the database, the guest cache and the event pipeline.
pub struct TestContext {
    pub db: SqliteDatabase,
    pub cache: Arc<MemoryCache>,
    pub auth: AuthConfig,
    producers: EventProducers,
}

impl TestContext {
    pub async fn new() -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 10).await.expect("Error creating connection to database");
        let cache = Arc::new(MemoryCache::new());
        let shared: Arc<dyn GuestCache> = cache.clone();
        let handlers = EventHandlers::new(16, create_event_hooks(db.clone(), GuestCartApi::new(shared)));
        let producers = handlers.producers();
        handlers.start_handlers().await;
        let auth = AuthConfig::new(TEST_JWT_SECRET).expect("Test secret is long enough");
        Self { db, cache, auth, producers }
    }

    pub async fn tear_down(mut self) {
        let url = self.db.url().to_string();
        if let Err(e) = self.db.close().await {
            debug!("🚀️ Could not close {url}: {e}");
        }
        destroy_database(&url).await;
    }

    /// Adds a food item (or combo) served all day at [`RESTAURANT`] and returns its id.
    pub async fn menu_item(&self, kind: LineKind, name: &str, price: i64) -> i64 {
        insert_catalog_item(&self.db, kind, &CatalogFixture::new(RESTAURANT, name, price)).await
    }

    pub fn restaurant_token(&self, restaurant_id: i64) -> String {
        TokenIssuer::new(&self.auth).issue_token(restaurant_id, "front-desk", None).expect("Failed to sign token")
    }

    /// Sends a request through a freshly built app and returns the status with the parsed JSON body (or `Null` when
    /// the body is not JSON).
    pub async fn send(&self, req: TestRequest) -> (StatusCode, Value) {
        let shared: Arc<dyn GuestCache> = self.cache.clone();
        let secret = self.auth.jwt_secret.reveal().as_bytes();
        let app = App::new()
            .app_data(web::Data::new(OrderFlowApi::new(self.db.clone(), self.producers.clone())))
            .app_data(web::Data::new(IdentityMergeApi::new(
                Arc::clone(&shared),
                MergeTokenIssuer::new(secret),
                self.producers.clone(),
            )))
            .app_data(web::Data::new(GuestCartApi::new(shared)))
            .app_data(web::Data::new(TokenIssuer::new(&self.auth)))
            .app_data(web::Data::new(ServerOptions {
                confirmation_base_url: "https://platter.example.com/orders/confirm".parse().expect("valid url"),
            }))
            .configure(configure_routes);
        let service = test::init_service(app).await;
        let res = test::call_service(&service, req.to_request()).await;
        let status = res.status();
        let body = test::read_body(res).await;
        let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        debug!("🚀️ {status}: {value}");
        (status, value)
    }

    pub async fn as_guest(&self, guest: &str, req: TestRequest) -> (StatusCode, Value) {
        self.send(req.insert_header((GUEST_ID_HEADER, guest))).await
    }

    pub async fn as_restaurant(&self, restaurant_id: i64, req: TestRequest) -> (StatusCode, Value) {
        let token = self.restaurant_token(restaurant_id);
        self.send(req.insert_header(("Authorization", format!("Bearer {token}")))).await
    }

    /// Places an order for `quantity` of `item_id` as `guest` and returns the new order id.
    pub async fn place_order(&self, guest: &str, kind: LineKind, item_id: i64, quantity: u32) -> i64 {
        let req = TestRequest::post()
            .uri(&format!("/restaurants/{RESTAURANT}/orders/{kind}"))
            .set_json(order_body(item_id, json!(quantity)));
        let (status, body) = self.as_guest(guest, req).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["order"]["id"].as_i64().expect("order id")
    }
}

pub fn order_body(item_id: i64, quantity: Value) -> Value {
    json!({
        "recipient": {
            "name": "Nguyen Minh Anh",
            "phone": "0901234567",
            "email": "minh.anh@example.com",
            "address": "12 Ly Tu Trong, District 1",
        },
        "shipping_method": "grab",
        "shipping_price": 15000,
        "items": [{"item_id": item_id, "quantity": quantity}],
    })
}
