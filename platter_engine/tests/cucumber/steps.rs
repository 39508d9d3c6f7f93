use chrono::{Duration, Utc};
use cucumber::{then, when};
use platter_engine::{
    db_types::{CustomerIdentity, LineKind, OrderStatusType},
    test_utils::fixtures::*,
};

use crate::cucumber::OrderWorld;

fn customer(who: &str) -> CustomerIdentity {
    match who.strip_prefix("user:") {
        Some(id) => user(id),
        None => guest(who),
    }
}

#[when(expr = "{word} orders {int} x {word} {string} as order {word}")]
async fn place_order(world: &mut OrderWorld, who: String, qty: u32, kind: String, item: String, label: String) {
    let kind = kind.parse::<LineKind>().expect("food or combo");
    let order = order_for(kind, customer(&who), world.item(&item), qty);
    let details = world.api().place_order(order).await.expect("Error placing order");
    world.orders.insert(label, details.order.id);
}

#[when(expr = "{word} confirms order {word}")]
async fn customer_confirms(world: &mut OrderWorld, who: String, label: String) {
    let id = world.order(&label);
    let res = world.api().customer_confirm(id, RESTAURANT, customer(&who)).await;
    world.last_error = res.err();
}

#[when(expr = "{word} cancels order {word} because {string}")]
async fn customer_cancels(world: &mut OrderWorld, who: String, label: String, reason: String) {
    let id = world.order(&label);
    let res = world.api().customer_cancel(id, RESTAURANT, customer(&who), &reason).await;
    world.last_error = res.err();
}

#[when(expr = "{word} receives order {word}")]
async fn customer_receives(world: &mut OrderWorld, who: String, label: String) {
    let id = world.order(&label);
    let res = world.api().customer_receive(id, RESTAURANT, customer(&who)).await;
    world.last_error = res.err();
}

#[when(expr = "the restaurant {word} order {word}")]
async fn restaurant_acts(world: &mut OrderWorld, action: String, label: String) {
    let id = world.order(&label);
    let api = world.api();
    let res = match action.as_str() {
        "confirms" => api.restaurant_confirm(id, RESTAURANT).await,
        "ships" => api.restaurant_confirm_shipping(id, RESTAURANT).await,
        "delivers" => api.restaurant_delivered(id, RESTAURANT).await,
        "cannot_reach_the_customer_of" => api.restaurant_customer_unreachable(id, RESTAURANT).await,
        "cancels" => api.restaurant_cancel(id, RESTAURANT, "kitchen closed").await,
        other => panic!("Unknown restaurant action {other}"),
    };
    world.last_error = res.err();
}

#[when(expr = "{int} minutes pass without confirmation")]
async fn timeout_sweep(world: &mut OrderWorld, minutes: i64) {
    let now = Utc::now() + Duration::minutes(minutes);
    let result = world.api().expire_unconfirmed_orders_at(now).await.expect("Error running sweep");
    assert!(result.failed.is_empty());
}

#[then(expr = "order {word} has status {word}")]
async fn order_status(world: &mut OrderWorld, label: String, status: String) {
    let id = world.order(&label);
    let expected = status.parse::<OrderStatusType>().expect("Not a valid status");
    let details = world.api().order_for_restaurant(id, RESTAURANT).await.expect("Error fetching order");
    assert_eq!(details.order.status, expected);
}

#[then(expr = "the last action was rejected as {word}")]
async fn last_action_rejected(world: &mut OrderWorld, kind: String) {
    let err = world.last_error.take().expect("The last action succeeded");
    assert_eq!(err.kind().as_str(), kind);
}

#[then("the last action succeeded")]
async fn last_action_succeeded(world: &mut OrderWorld) {
    if let Some(e) = world.last_error.take() {
        panic!("The last action failed: {e}");
    }
}

#[then(expr = "order {word} has {int} history entries")]
async fn history_length(world: &mut OrderWorld, label: String, count: usize) {
    let id = world.order(&label);
    let details = world.api().order_for_restaurant(id, RESTAURANT).await.expect("Error fetching order");
    assert_eq!(details.history.len(), count);
}
