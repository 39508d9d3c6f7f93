use std::{sync::Arc, time::Duration};

use log::*;
use platter_engine::{
    cache::MemoryCache,
    db_types::LineKind,
    events::{EventHandlers, EventHooks},
    helpers::MergeTokenIssuer,
    order_merge_hook,
    test_utils::fixtures::*,
    cart_merge_hook,
    CartEntry,
    GuestCache,
    GuestCartApi,
    IdentityMergeApi,
};

mod common;

use common::{setup, tear_down};

const SECRET: &[u8] = b"identity-merge-integration-secret";

#[tokio::test]
async fn merging_moves_orders_and_cart() {
    let api = setup().await;
    let db = api.db().clone();
    let pho = insert_catalog_item(&db, LineKind::Food, &CatalogFixture::new(RESTAURANT, "Pho bo", 55_000)).await;
    let combo = insert_catalog_item(&db, LineKind::Combo, &CatalogFixture::new(RESTAURANT, "Lunch set", 89_000)).await;
    let food_order = api.place_order(order_for(LineKind::Food, guest("old"), pho, 1)).await.unwrap().order.id;
    let combo_order = api.place_order(order_for(LineKind::Combo, guest("old"), combo, 2)).await.unwrap().order.id;
    let bystander = api.place_order(order_for(LineKind::Food, guest("someone"), pho, 1)).await.unwrap().order.id;

    let cache: Arc<dyn GuestCache> = Arc::new(MemoryCache::new());
    let cart = GuestCartApi::new(cache.clone());
    let entry = CartEntry { restaurant_id: RESTAURANT, line_kind: LineKind::Food, item_id: pho, quantity: 2, option_ids: vec![] };
    cart.add_entry("old", entry.clone()).await.unwrap();

    let mut hooks = EventHooks::default();
    hooks
        .add_identity_merge_hook("food orders", order_merge_hook(db.clone(), LineKind::Food))
        .add_identity_merge_hook("combo orders", order_merge_hook(db.clone(), LineKind::Combo))
        .add_identity_merge_hook("cart", cart_merge_hook(cart.clone()));
    let handlers = EventHandlers::new(16, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let merge = IdentityMergeApi::new(cache, MergeTokenIssuer::new(SECRET), producers);
    let token = merge.issue_merge_token("old").await.unwrap();
    let current = merge.verify_merge_token(&token, "new").await.unwrap();
    assert_eq!(current, "new");

    let mut moved = false;
    for _ in 0..50 {
        let food = api.order_for_customer(food_order, RESTAURANT, guest("new")).await;
        let combo = api.order_for_customer(combo_order, RESTAURANT, guest("new")).await;
        let carts = cart.entries("new").await.unwrap();
        if food.is_ok() && combo.is_ok() && !carts.is_empty() {
            moved = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(moved, "merge consumers did not finish in time");
    info!("🪪️ Merge consumers done");
    assert!(api.order_for_customer(food_order, RESTAURANT, guest("old")).await.is_err());
    assert!(api.order_for_customer(bystander, RESTAURANT, guest("someone")).await.is_ok());
    assert_eq!(cart.entries("new").await.unwrap(), vec![entry]);
    assert!(cart.entries("old").await.unwrap().is_empty());

    // A replayed token does nothing
    assert!(merge.verify_merge_token(&token, "another").await.is_err());
    tear_down(api).await;
}

#[tokio::test]
async fn reassigning_twice_is_harmless() {
    let api = setup().await;
    let db = api.db().clone();
    let pho = insert_catalog_item(&db, LineKind::Food, &CatalogFixture::new(RESTAURANT, "Pho bo", 55_000)).await;
    api.place_order(order_for(LineKind::Food, guest("old"), pho, 1)).await.unwrap();
    api.place_order(order_for(LineKind::Food, guest("old"), pho, 3)).await.unwrap();
    api.place_order(order_for(LineKind::Food, user("old"), pho, 1)).await.unwrap();

    use platter_engine::OrderLifecycleDatabase;
    assert_eq!(db.reassign_guest_orders(LineKind::Food, "old", "new").await.unwrap(), 2);
    assert_eq!(db.reassign_guest_orders(LineKind::Food, "old", "new").await.unwrap(), 0);
    assert_eq!(db.reassign_guest_orders(LineKind::Combo, "new", "newer").await.unwrap(), 0);
    tear_down(api).await;
}
