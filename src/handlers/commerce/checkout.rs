use crate::handlers::common::{map_service_error, success_response, validate_input, AppJson};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::{
        commerce::{CheckoutRequest, CheckoutResponse},
        payments::{PaymentConfirmation, VerifyPaymentResponse},
    },
    AppState,
};
use axum::{
    extract::State,
    response::IntoResponse,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Checkout and payment confirmation routes, mounted at the API root
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(create_checkout))
        .route("/verify-payment", post(verify_payment))
}

/// Confirmation body as posted by the provider's client SDK callback
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct VerifyPaymentRequest {
    #[validate(length(min = 1, max = 128))]
    pub razorpay_order_id: String,
    #[validate(length(min = 1, max = 128))]
    pub razorpay_payment_id: String,
    #[serde(default)]
    #[validate(length(max = 256))]
    pub razorpay_signature: String,
    #[serde(default)]
    pub is_mock: bool,
}

impl From<VerifyPaymentRequest> for PaymentConfirmation {
    fn from(req: VerifyPaymentRequest) -> Self {
        Self {
            provider_order_id: req.razorpay_order_id,
            provider_payment_id: req.razorpay_payment_id,
            provider_signature: req.razorpay_signature,
            is_simulated: req.is_mock,
        }
    }
}

/// Open a provider order for the current cart
#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Provider order created", body = CheckoutResponse),
        (status = 400, description = "Cart empty or amount invalid", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Payment gateway unavailable or failed", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn create_checkout(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state
        .services
        .checkout
        .create_checkout(user.user_id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(response))
}

/// Confirm a payment; the cart is cleared only when the payment verifies
#[utoipa::path(
    post,
    path = "/api/v1/verify-payment",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment verified or already processed", body = VerifyPaymentResponse),
        (status = 400, description = "Signature mismatch", body = crate::errors::ErrorResponse),
        (status = 403, description = "Simulated payments disabled", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown order", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<VerifyPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let response = state
        .services
        .payments
        .confirm(user.user_id, payload.into())
        .await
        .map_err(map_service_error)?;

    Ok(success_response(response))
}
