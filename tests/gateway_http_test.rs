//! Provider order creation against a mocked HTTP endpoint.

use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::json;
use storefront_api::{
    errors::ServiceError,
    services::{
        commerce::PaymentOrderIntent,
        payments::{PaymentGateway, RazorpayGateway},
    },
};
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

// base64("rzp_test_key:test_secret")
const BASIC_AUTH: &str = "Basic cnpwX3Rlc3Rfa2V5OnRlc3Rfc2VjcmV0";

fn intent() -> PaymentOrderIntent {
    PaymentOrderIntent {
        amount_minor: 2000,
        currency: "INR".to_string(),
        receipt: "rcpt_1700000000000_0000abcd".to_string(),
        payment_method: "upi".to_string(),
        item_count: 1,
    }
}

fn gateway(server: &MockServer) -> RazorpayGateway {
    RazorpayGateway::new(
        "rzp_test_key",
        "test_secret",
        &format!("{}/v1/", server.uri()),
        Duration::from_secs(2),
    )
    .expect("gateway client")
}

#[tokio::test]
async fn creates_order_with_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/orders"))
        .and(header("authorization", BASIC_AUTH))
        .and(body_partial_json(json!({
            "amount": 2000,
            "currency": "INR",
            "receipt": "rcpt_1700000000000_0000abcd",
            "notes": { "payment_method": "upi", "item_count": 1 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "order_MockedId123",
            "entity": "order",
            "amount": 2000,
            "currency": "INR",
            "status": "created"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let order = gateway(&server)
        .create_order(&intent())
        .await
        .expect("order created");

    assert_eq!(order.provider_order_id, "order_MockedId123");
    assert_eq!(order.amount_minor, 2000);
    assert_eq!(order.currency, "INR");
}

#[tokio::test]
async fn provider_error_status_is_gateway_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/orders"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "code": "BAD_REQUEST_ERROR", "description": "Authentication failed" }
        })))
        .mount(&server)
        .await;

    let result = gateway(&server).create_order(&intent()).await;

    assert_matches!(result, Err(ServiceError::GatewayError(detail)) if detail.contains("401"));
}

#[tokio::test]
async fn response_without_id_is_gateway_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "amount": 2000 })))
        .mount(&server)
        .await;

    let result = gateway(&server).create_order(&intent()).await;

    assert_matches!(result, Err(ServiceError::GatewayError(_)));
}

#[tokio::test]
async fn slow_provider_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/orders"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "order_late" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let result = gateway(&server).create_order(&intent()).await;

    assert_matches!(result, Err(ServiceError::GatewayError(_)));
}
