//! Checkout session creation tests.
//!
//! The mock Stripe server stands in for the provider; the full router runs
//! otherwise unchanged, so these exercise validation, line-item conversion,
//! and the metadata snapshot end to end.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use fluffy_bites_integration_tests::{
    sign_payload_now, spawn_mock_stripe, spawn_mock_stripe_declining, test_app,
    test_app_with_api_base,
};

fn checkout_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/checkout")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn empty_cart_is_rejected_without_calling_the_provider() {
    // No mock server at all: a provider call would fail loudly.
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(checkout_request(json!({ "cart": [] })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Cart is empty");
}

#[tokio::test]
async fn missing_cart_field_is_rejected() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(checkout_request(json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Cart is empty");
}

#[tokio::test]
async fn zero_quantity_item_is_rejected() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(checkout_request(json!({
            "cart": [{ "id": "latte", "name": "Latte", "price": 4.50, "quantity": 0 }]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(
        body["error"].as_str().unwrap().contains("zero quantity"),
        "unexpected error: {body}"
    );
}

#[tokio::test]
async fn checkout_creates_a_session_with_converted_line_items() {
    let mock = spawn_mock_stripe().await;
    let app = test_app_with_api_base(&mock.base_url);

    let response = app
        .router
        .clone()
        .oneshot(checkout_request(json!({
            "cart": [
                { "id": "latte", "name": "Latte", "price": 4.50, "quantity": 2,
                  "image": "images/latte.jpg" },
                { "id": "croissant", "name": "Butter Croissant", "price": 3.20, "quantity": 1 }
            ]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["sessionId"], "cs_test_mock");
    assert_eq!(body["url"], "https://checkout.stripe.com/c/pay/cs_test_mock");

    // Line-item total in minor units must equal the cart total converted
    // via round-half-up cents.
    let form = mock.state.last_form.lock().unwrap().clone().unwrap();
    let field = |key: &str| {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .unwrap()
    };

    let total_minor: i64 = (0..2)
        .map(|i| {
            let unit: i64 = field(&format!("line_items[{i}][price_data][unit_amount]"))
                .parse()
                .unwrap();
            let quantity: i64 = field(&format!("line_items[{i}][quantity]")).parse().unwrap();
            unit * quantity
        })
        .sum();
    assert_eq!(total_minor, 450 * 2 + 320);

    assert_eq!(field("mode"), "payment");
    assert_eq!(field("line_items[0][price_data][currency]"), "eur");
    assert_eq!(
        field("line_items[0][price_data][product_data][images][0]"),
        "https://fluffybites.net/images/latte.jpg"
    );
    assert_eq!(
        field("success_url"),
        "https://fluffybites.net/order/success?session_id={CHECKOUT_SESSION_ID}"
    );
    assert_eq!(field("cancel_url"), "https://fluffybites.net/menu");
}

#[tokio::test]
async fn provider_rejection_surfaces_as_upstream_error() {
    let mock = spawn_mock_stripe_declining().await;
    let app = test_app_with_api_base(&mock.base_url);

    let response = app
        .router
        .clone()
        .oneshot(checkout_request(json!({
            "cart": [{ "id": "latte", "name": "Latte", "price": 4.50, "quantity": 1 }]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Your card was declined.");
}

#[tokio::test]
async fn cart_round_trips_from_checkout_to_stored_order() {
    let mock = spawn_mock_stripe().await;
    let app = test_app_with_api_base(&mock.base_url);

    let response = app
        .router
        .clone()
        .oneshot(checkout_request(json!({
            "cart": [{ "id": "latte", "name": "Latte", "price": 4.50, "quantity": 2 }]
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Replay the metadata the provider stored into a completion event, the
    // way Stripe echoes it back on checkout.session.completed.
    let metadata = mock.state.last_cart_metadata().unwrap();
    let event = json!({
        "id": "evt_round_trip",
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": "cs_test_mock",
            "amount_total": 900,
            "currency": "eur",
            "customer_details": { "email": "anna@example.com", "name": "Anna" },
            "payment_intent": "pi_round_trip",
            "metadata": { "cartItems": metadata }
        }}
    });
    let payload = serde_json::to_vec(&event).unwrap();
    let signature = sign_payload_now(&payload);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/webhooks/stripe")
                .header("content-type", "application/json")
                .header("stripe-signature", signature)
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let order = app.order_store().load("cs_test_mock").unwrap();
    assert_eq!(order.amount, "9.00".parse().unwrap());
    assert_eq!(order.items.len(), 1);
    let item = order.items.first().unwrap();
    assert_eq!(item.id, "latte");
    assert_eq!(item.quantity, 2);
    assert_eq!(item.price, "4.50".parse().unwrap());
}
