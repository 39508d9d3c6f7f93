use actix_web::{http::StatusCode, test::TestRequest};
use platter_engine::{
    db_types::LineKind,
    test_utils::fixtures::{insert_catalog_item, CatalogFixture, OTHER_RESTAURANT, RESTAURANT},
};
use serde_json::json;

use super::helpers::{order_body, TestContext};

#[actix_web::test]
async fn health_check() {
    let ctx = TestContext::new().await;
    let (status, _) = ctx.send(TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn place_and_fetch_order() {
    let ctx = TestContext::new().await;
    let pho = ctx.menu_item(LineKind::Food, "Pho bo", 55_000).await;
    let req = TestRequest::post().uri("/restaurants/1/orders/food").set_json(order_body(pho, json!(2)));
    let (status, body) = ctx.as_guest("guest-a", req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["order"]["status"], "waiting_confirm_customer");
    assert_eq!(body["order"]["guest_id"], "guest-a");
    assert_eq!(body["lines"].as_array().map(Vec::len), Some(1));
    let id = body["order"]["id"].as_i64().unwrap();

    let uri = format!("/restaurants/{RESTAURANT}/orders/{id}");
    let (status, body) = ctx.as_guest("guest-a", TestRequest::get().uri(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["id"], id);

    // Someone else's order looks exactly like a missing one
    let (status, body) = ctx.as_guest("guest-b", TestRequest::get().uri(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = ctx.send(TestRequest::get().uri(&uri)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
    ctx.tear_down().await;
}

#[actix_web::test]
async fn fractional_quantities_are_invalid() {
    let ctx = TestContext::new().await;
    let pho = ctx.menu_item(LineKind::Food, "Pho ga", 50_000).await;
    let req = TestRequest::post().uri("/restaurants/1/orders/food").set_json(order_body(pho, json!(1.5)));
    let (status, body) = ctx.as_guest("guest-a", req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
    ctx.tear_down().await;
}

#[actix_web::test]
async fn malformed_requests_are_invalid() {
    let ctx = TestContext::new().await;
    let req = TestRequest::post().uri("/restaurants/1/orders/pizza").set_json(order_body(1, json!(1)));
    let (status, body) = ctx.as_guest("guest-a", req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");

    let req = TestRequest::post().uri("/restaurants/1/orders/food").set_json(json!({"items": []}));
    let (status, body) = ctx.as_guest("guest-a", req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
    ctx.tear_down().await;
}

#[actix_web::test]
async fn items_outside_their_window_cannot_be_ordered() {
    let ctx = TestContext::new().await;
    // A window that closes before it opens is never open
    let fixture = CatalogFixture::new(RESTAURANT, "Midnight banh mi", 30_000).serving("23:59", "00:00");
    let item = insert_catalog_item(&ctx.db, LineKind::Food, &fixture).await;
    let req = TestRequest::post().uri("/restaurants/1/orders/food").set_json(order_body(item, json!(1)));
    let (status, body) = ctx.as_guest("guest-a", req).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "out_of_service_window");

    let combo = ctx.menu_item(LineKind::Combo, "Family combo", 250_000).await;
    // The combo belongs to another tenant
    let req = TestRequest::post().uri("/restaurants/2/orders/combo").set_json(order_body(combo, json!(1)));
    let (status, _) = ctx.as_guest("guest-a", req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn order_lifecycle_over_http() {
    let ctx = TestContext::new().await;
    let pho = ctx.menu_item(LineKind::Food, "Bun cha", 45_000).await;
    let id = ctx.place_order("guest-a", LineKind::Food, pho, 1).await;
    let guest_uri = |step: &str| format!("/restaurants/{RESTAURANT}/orders/{id}/{step}");
    let restaurant_uri = |step: &str| format!("/restaurant/orders/{id}/{step}");

    // The restaurant cannot act before the customer confirms
    let (status, _) = ctx.as_restaurant(RESTAURANT, TestRequest::post().uri(&restaurant_uri("confirm"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = ctx.as_guest("guest-a", TestRequest::post().uri(&guest_uri("confirm"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "waiting_confirm_restaurant");

    let (status, _) = ctx.send(TestRequest::post().uri(&restaurant_uri("confirm"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = ctx.as_restaurant(OTHER_RESTAURANT, TestRequest::post().uri(&restaurant_uri("confirm"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    for (step, expected) in
        [("confirm", "waiting_shipping"), ("confirm-shipping", "shipping"), ("delivered", "delivered_customer")]
    {
        let (status, body) = ctx.as_restaurant(RESTAURANT, TestRequest::post().uri(&restaurant_uri(step))).await;
        assert_eq!(status, StatusCode::OK, "{step}: {body}");
        assert_eq!(body["status"], expected);
    }

    let (status, body) = ctx.as_guest("guest-a", TestRequest::post().uri(&guest_uri("receive"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "received_customer");

    let feedback = json!({"star": 5, "content": "Still warm when it arrived"});
    let req = TestRequest::post().uri(&guest_uri("feedback")).set_json(&feedback);
    let (status, body) = ctx.as_guest("guest-a", req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["feedback_star"], 5);
    let req = TestRequest::post().uri(&guest_uri("feedback")).set_json(&feedback);
    let (status, body) = ctx.as_guest("guest-a", req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let req = TestRequest::post().uri(&restaurant_uri("feedback-reply")).set_json(json!({"reply": "Cam on ban!"}));
    let (status, body) = ctx.as_restaurant(RESTAURANT, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["feedback_reply"], "Cam on ban!");
    assert_eq!(body["feedback_visible"], false);
    let req = TestRequest::post().uri(&restaurant_uri("feedback-visibility"));
    let (status, body) = ctx.as_restaurant(RESTAURANT, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["feedback_visible"], true);

    let (status, body) = ctx.as_restaurant(RESTAURANT, TestRequest::get().uri(&format!("/restaurant/orders/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    let history = body["history"].as_array().expect("history");
    assert!(history.len() >= 7, "{history:?}");
    ctx.tear_down().await;
}

#[actix_web::test]
async fn cancellations_and_complaints() {
    let ctx = TestContext::new().await;
    let combo = ctx.menu_item(LineKind::Combo, "Lunch combo", 120_000).await;
    let cancelled = ctx.place_order("guest-a", LineKind::Combo, combo, 1).await;
    let req = TestRequest::post()
        .uri(&format!("/restaurants/{RESTAURANT}/orders/{cancelled}/cancel"))
        .set_json(json!({"reason": "Ordered by mistake"}));
    let (status, body) = ctx.as_guest("guest-a", req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancel_customer");
    assert_eq!(body["cancel_reason"], "Ordered by mistake");

    let id = ctx.place_order("guest-a", LineKind::Combo, combo, 2).await;
    let guest_uri = |step: &str| format!("/restaurants/{RESTAURANT}/orders/{id}/{step}");
    ctx.as_guest("guest-a", TestRequest::post().uri(&guest_uri("confirm"))).await;
    for step in ["confirm", "confirm-shipping", "delivered"] {
        let uri = format!("/restaurant/orders/{id}/{step}");
        let (status, _) = ctx.as_restaurant(RESTAURANT, TestRequest::post().uri(&uri)).await;
        assert_eq!(status, StatusCode::OK);
    }
    // A complaint needs a received order
    let req = TestRequest::post().uri(&guest_uri("complaint")).set_json(json!({"content": "Missing a drink"}));
    let (status, _) = ctx.as_guest("guest-a", req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.as_guest("guest-a", TestRequest::post().uri(&guest_uri("receive"))).await;
    let req = TestRequest::post().uri(&guest_uri("complaint")).set_json(json!({"content": "Missing a drink"}));
    let (status, body) = ctx.as_guest("guest-a", req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "complaint");
    let (status, body) = ctx.as_guest("guest-a", TestRequest::post().uri(&guest_uri("complaint-done"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "complaint_done");

    let (status, body) = ctx.as_guest("guest-a", TestRequest::post().uri(&guest_uri("teleport"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
    ctx.tear_down().await;
}

#[actix_web::test]
async fn restaurant_cancel_needs_a_reason() {
    let ctx = TestContext::new().await;
    let pho = ctx.menu_item(LineKind::Food, "Com tam", 40_000).await;
    let id = ctx.place_order("guest-a", LineKind::Food, pho, 1).await;
    ctx.as_guest("guest-a", TestRequest::post().uri(&format!("/restaurants/{RESTAURANT}/orders/{id}/confirm"))).await;
    let uri = format!("/restaurant/orders/{id}/cancel");
    let req = TestRequest::post().uri(&uri).set_json(json!({"reason": "   "}));
    let (status, _) = ctx.as_restaurant(RESTAURANT, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let req = TestRequest::post().uri(&uri).set_json(json!({"reason": "Out of rice"}));
    let (status, body) = ctx.as_restaurant(RESTAURANT, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancel_restaurant");
    ctx.tear_down().await;
}
