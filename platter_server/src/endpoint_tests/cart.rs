use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;

use super::helpers::TestContext;

fn entry(item_id: i64, quantity: serde_json::Value) -> serde_json::Value {
    json!({"restaurant_id": 1, "line_kind": "food", "item_id": item_id, "quantity": quantity, "option_ids": [3]})
}

#[actix_web::test]
async fn guest_cart() {
    let ctx = TestContext::new().await;
    let (status, body) = ctx.as_guest("guest-a", TestRequest::get().uri("/cart")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    ctx.as_guest("guest-a", TestRequest::post().uri("/cart").set_json(entry(1, json!(2)))).await;
    let (status, body) = ctx.as_guest("guest-a", TestRequest::post().uri("/cart").set_json(entry(1, json!(4)))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([entry(1, json!(4))]));
    let (_, body) = ctx.as_guest("guest-a", TestRequest::post().uri("/cart").set_json(entry(2, json!(1)))).await;
    assert_eq!(body.as_array().map(Vec::len), Some(2));

    // Carts are private to each guest
    let (_, body) = ctx.as_guest("guest-b", TestRequest::get().uri("/cart")).await;
    assert_eq!(body, json!([]));

    let (status, _) = ctx.as_guest("guest-a", TestRequest::post().uri("/cart").set_json(entry(2, json!(0.5)))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, body) = ctx.as_guest("guest-a", TestRequest::post().uri("/cart").set_json(entry(2, json!(0)))).await;
    assert_eq!(body, json!([entry(1, json!(4))]));

    let (status, body) = ctx.as_guest("guest-a", TestRequest::delete().uri("/cart")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let (_, body) = ctx.as_guest("guest-a", TestRequest::get().uri("/cart")).await;
    assert_eq!(body, json!([]));

    let (status, _) = ctx.send(TestRequest::get().uri("/cart")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    ctx.tear_down().await;
}
