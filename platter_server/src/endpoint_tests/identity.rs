use std::time::Duration;

use actix_web::{http::StatusCode, test::TestRequest};
use platter_engine::{db_types::LineKind, test_utils::fixtures::RESTAURANT};
use serde_json::json;

use super::helpers::TestContext;

#[actix_web::test]
async fn merge_moves_orders_and_cart() {
    let ctx = TestContext::new().await;
    let pho = ctx.menu_item(LineKind::Food, "Pho tai", 60_000).await;
    let id = ctx.place_order("old-device", LineKind::Food, pho, 1).await;
    let cart_entry = json!({"restaurant_id": 1, "line_kind": "combo", "item_id": 9, "quantity": 1, "option_ids": []});
    ctx.as_guest("old-device", TestRequest::post().uri("/cart").set_json(&cart_entry)).await;

    let (status, body) = ctx.as_guest("old-device", TestRequest::post().uri("/identity/merge-token")).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().expect("token").to_string();

    let req = TestRequest::post().uri("/identity/merge").set_json(json!({ "token": token }));
    let (status, body) = ctx.as_guest("new-device", req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["guest_id"], "new-device");

    // The consumers run in the background
    let uri = format!("/restaurants/{RESTAURANT}/orders/{id}");
    let mut moved = false;
    for _ in 0..50 {
        let (status, _) = ctx.as_guest("new-device", TestRequest::get().uri(&uri)).await;
        if status == StatusCode::OK {
            moved = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(moved, "order was not moved to the new guest id");
    let (status, _) = ctx.as_guest("old-device", TestRequest::get().uri(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut cart = json!([]);
    for _ in 0..50 {
        let (_, body) = ctx.as_guest("new-device", TestRequest::get().uri("/cart")).await;
        if body != json!([]) {
            cart = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(cart, json!([cart_entry]));

    // Tokens are single-use
    let req = TestRequest::post().uri("/identity/merge").set_json(json!({ "token": token }));
    let (status, body) = ctx.as_guest("third-device", req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
    ctx.tear_down().await;
}

#[actix_web::test]
async fn forged_merge_tokens_are_rejected() {
    let ctx = TestContext::new().await;
    let req = TestRequest::post().uri("/identity/merge").set_json(json!({ "token": "not.a.token" }));
    let (status, _) = ctx.as_guest("new-device", req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A restaurant token is signed with the same secret but is not a merge token
    let token = ctx.restaurant_token(RESTAURANT);
    let req = TestRequest::post().uri("/identity/merge").set_json(json!({ "token": token }));
    let (status, _) = ctx.as_guest("new-device", req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx.send(TestRequest::post().uri("/identity/merge-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    ctx.tear_down().await;
}
