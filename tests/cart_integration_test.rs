//! Integration tests for the cart endpoints.
//!
//! Tests cover:
//! - Adding products and duplicate adds
//! - Quantity increment/decrement including the lower bound
//! - Removing and clearing
//! - Ownership isolation between shoppers

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .expect("decimal serialized as string")
        .parse()
        .expect("valid decimal")
}

#[tokio::test]
async fn test_add_product_to_cart() {
    let app = TestApp::new().await;
    let (_, token) = app.seed_user("cart-add@example.com").await;
    let product = app.seed_product("Wireless Earbuds", dec!(29.99)).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/cart/add",
            Some(json!({ "productId": product.id })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Product added to cart");

    let items = body["cart"]["items"].as_array().expect("items array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["product_id"], product.id.to_string());
    assert_eq!(items[0]["title"], "Wireless Earbuds");
    assert_eq!(items[0]["quantity"], 1);
    assert_eq!(decimal(&items[0]["unit_price"]), dec!(29.99));
}

#[tokio::test]
async fn test_add_same_product_twice_keeps_one_line() {
    let app = TestApp::new().await;
    let (_, token) = app.seed_user("cart-dup@example.com").await;
    let product = app.seed_product("Knit Cardigan", dec!(15.99)).await;
    let payload = json!({ "product_id": product.id });

    let first = app
        .request(Method::POST, "/api/v1/cart/add", Some(payload.clone()), Some(&token))
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .request(Method::POST, "/api/v1/cart/add", Some(payload), Some(&token))
        .await;
    assert_eq!(second.status(), StatusCode::OK);

    let body = response_json(second).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Product already in cart");
    assert_eq!(body["cart"]["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["cart"]["items"][0]["quantity"], 1);
}

#[tokio::test]
async fn test_add_unknown_product_returns_404() {
    let app = TestApp::new().await;
    let (_, token) = app.seed_user("cart-unknown@example.com").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/cart/add",
            Some(json!({ "productId": Uuid::new_v4() })),
            Some(&token),
        )
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_increment_and_decrement_quantity() {
    let app = TestApp::new().await;
    let (_, token) = app.seed_user("cart-qty@example.com").await;
    let product = app.seed_product("USB-C Charger", dec!(18.99)).await;

    app.request(
        Method::POST,
        "/api/v1/cart/add",
        Some(json!({ "productId": product.id })),
        Some(&token),
    )
    .await;

    let uri = format!("/api/v1/cart/increment/{}", product.id);
    for _ in 0..2 {
        let response = app.request(Method::POST, &uri, None, Some(&token)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/cart/decrement/{}", product.id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["message"], "Quantity decreased");
    assert_eq!(body["cart"]["items"][0]["quantity"], 2);
    assert_eq!(body["cart"]["item_count"], 2);
    assert_eq!(decimal(&body["cart"]["subtotal"]), dec!(37.98));
}

#[tokio::test]
async fn test_decrement_at_one_is_rejected() {
    let app = TestApp::new().await;
    let (_, token) = app.seed_user("cart-floor@example.com").await;
    let product = app.seed_product("Gold Plated Chain", dec!(14.99)).await;

    app.request(
        Method::POST,
        "/api/v1/cart/add",
        Some(json!({ "productId": product.id })),
        Some(&token),
    )
    .await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/cart/decrement/{}", product.id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let cart = response_json(app.request(Method::GET, "/api/v1/cart", None, Some(&token)).await).await;
    assert_eq!(cart["cart"]["items"][0]["quantity"], 1);
}

#[tokio::test]
async fn test_quantity_change_on_missing_line_returns_404() {
    let app = TestApp::new().await;
    let (_, token) = app.seed_user("cart-missing@example.com").await;
    let product = app.seed_product("Rain Shell Jacket", dec!(21.99)).await;

    for action in ["increment", "decrement"] {
        let response = app
            .request(
                Method::POST,
                &format!("/api/v1/cart/{}/{}", action, product.id),
                None,
                Some(&token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{} on empty cart", action);
    }
}

#[tokio::test]
async fn test_remove_and_clear_cart() {
    let app = TestApp::new().await;
    let (_, token) = app.seed_user("cart-clear@example.com").await;
    let first = app.seed_product("Trail Running Shoes", dec!(39.99)).await;
    let second = app.seed_product("Mechanical Keyboard", dec!(45.99)).await;

    for product in [&first, &second] {
        app.request(
            Method::POST,
            "/api/v1/cart/add",
            Some(json!({ "productId": product.id })),
            Some(&token),
        )
        .await;
    }

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/cart/remove/{}", first.id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["cart"]["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["cart"]["items"][0]["product_id"], second.id.to_string());

    let response = app
        .request(Method::GET, "/api/v1/cart/clear", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Cart cleared");
    assert!(body["cart"]["items"].as_array().expect("items").is_empty());
    assert_eq!(body["cart"]["item_count"], 0);
}

#[tokio::test]
async fn test_carts_are_isolated_per_user() {
    let app = TestApp::new().await;
    let (_, alice) = app.seed_user("alice@example.com").await;
    let (_, bob) = app.seed_user("bob@example.com").await;
    let product = app.seed_product("Sterling Silver Hoops", dec!(8.99)).await;

    app.request(
        Method::POST,
        "/api/v1/cart/add",
        Some(json!({ "productId": product.id })),
        Some(&alice),
    )
    .await;

    // Bob cannot touch a line that only exists in Alice's cart
    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/cart/remove/{}", product.id),
            None,
            Some(&bob),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let bob_cart = response_json(app.request(Method::GET, "/api/v1/cart", None, Some(&bob)).await).await;
    assert!(bob_cart["cart"]["items"].as_array().expect("items").is_empty());

    let alice_cart =
        response_json(app.request(Method::GET, "/api/v1/cart", None, Some(&alice)).await).await;
    assert_eq!(alice_cart["cart"]["items"].as_array().map(Vec::len), Some(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_increments_are_not_lost() {
    let app = TestApp::with_connection_pool().await;
    let (_, token) = app.seed_user("cart-race@example.com").await;
    let product = app.seed_product("Insulated Water Bottle", dec!(12.50)).await;

    app.request(
        Method::POST,
        "/api/v1/cart/add",
        Some(json!({ "productId": product.id })),
        Some(&token),
    )
    .await;

    let uri = format!("/api/v1/cart/increment/{}", product.id);
    let (app_ref, uri, token) = (&app, uri.as_str(), token.as_str());
    let increment = move || app_ref.request(Method::POST, uri, None, Some(token));

    let responses = tokio::join!(
        increment(),
        increment(),
        increment(),
        increment(),
        increment(),
        increment()
    );
    for response in [responses.0, responses.1, responses.2, responses.3, responses.4, responses.5] {
        assert_eq!(response.status(), StatusCode::OK);
    }

    let cart = response_json(app.request(Method::GET, "/api/v1/cart", None, Some(token)).await).await;
    assert_eq!(cart["cart"]["items"][0]["quantity"], 7);
    assert_eq!(decimal(&cart["cart"]["subtotal"]), dec!(87.50));
}

#[tokio::test]
async fn test_malformed_body_uses_error_shape() {
    let app = TestApp::new().await;
    let (_, token) = app.seed_user("cart-garbled@example.com").await;

    let response = app
        .request_raw(Method::POST, "/api/v1/cart/add", "{\"productId\": ", &token)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Bad Request");
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
    assert!(body["timestamp"].is_string());

    // Well-formed JSON that does not match the request type
    let response = app
        .request_raw(Method::POST, "/api/v1/cart/add", "{\"productId\": 42}", &token)
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_non_uuid_product_id_uses_error_shape() {
    let app = TestApp::new().await;
    let (_, token) = app.seed_user("cart-bad-id@example.com").await;

    for (method, action) in [
        (Method::DELETE, "remove"),
        (Method::POST, "increment"),
        (Method::POST, "decrement"),
    ] {
        let response = app
            .request(
                method,
                &format!("/api/v1/cart/{}/not-a-uuid", action),
                None,
                Some(&token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{} with bad id", action);

        let body = response_json(response).await;
        assert_eq!(body["success"], false, "{} with bad id", action);
        assert_eq!(body["error"], "Bad Request");
    }

    let response = app
        .request(Method::GET, "/api/v1/products/not-a-uuid", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["success"], false);
}
