use crate::handlers::common::{map_service_error, success_response, AppJson, AppPath};
use crate::{
    auth::AuthUser,
    errors::ApiError,
    services::commerce::{AddItemOutcome, CartView},
    AppState,
};
use axum::{
    extract::State,
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Creates the router for cart endpoints
pub fn carts_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart))
        .route("/add", post(add_to_cart))
        .route("/remove/:id", delete(remove_from_cart))
        .route("/increment/:id", post(increment_quantity))
        .route("/decrement/:id", post(decrement_quantity))
        .route("/clear", get(clear_cart))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddItemRequest {
    #[serde(alias = "productId")]
    pub product_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartResponse {
    pub success: bool,
    pub message: String,
    pub cart: CartView,
}

impl CartResponse {
    fn ok(message: &str, cart: CartView) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            cart,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/cart",
    responses(
        (status = 200, description = "Current cart", body = CartResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .get_cart(user.user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(CartResponse::ok("Cart retrieved", cart)))
}

/// Add a product. A product already in the cart answers 200 with `success: false`.
#[utoipa::path(
    post,
    path = "/api/v1/cart/add",
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Product added, or already present", body = CartResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<AddItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .services
        .cart
        .add_item(user.user_id, payload.product_id)
        .await
        .map_err(map_service_error)?;

    let body = match outcome {
        AddItemOutcome::Added(cart) => CartResponse::ok("Product added to cart", cart),
        AddItemOutcome::AlreadyPresent(cart) => CartResponse {
            success: false,
            message: "Product already in cart".to_string(),
            cart,
        },
    };

    Ok(success_response(body))
}

#[utoipa::path(
    delete,
    path = "/api/v1/cart/remove/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product removed", body = CartResponse),
        (status = 404, description = "Product not in cart", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(product_id): AppPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .remove_item(user.user_id, product_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(CartResponse::ok("Product removed from cart", cart)))
}

#[utoipa::path(
    post,
    path = "/api/v1/cart/increment/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Quantity increased", body = CartResponse),
        (status = 404, description = "Product not in cart", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn increment_quantity(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(product_id): AppPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .increment_quantity(user.user_id, product_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(CartResponse::ok("Quantity increased", cart)))
}

#[utoipa::path(
    post,
    path = "/api/v1/cart/decrement/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Quantity decreased", body = CartResponse),
        (status = 400, description = "Quantity is already 1", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not in cart", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn decrement_quantity(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(product_id): AppPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .decrement_quantity(user.user_id, product_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(CartResponse::ok("Quantity decreased", cart)))
}

#[utoipa::path(
    get,
    path = "/api/v1/cart/clear",
    responses(
        (status = 200, description = "Cart emptied", body = CartResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .clear_cart(user.user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(CartResponse::ok("Cart cleared", cart)))
}
