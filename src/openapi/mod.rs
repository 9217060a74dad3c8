use axum::{routing::get, Json, Router};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "0.1.0",
        description = r#"
# Storefront API

Cart, checkout and payment confirmation for the storefront.

## Authentication

Protected endpoints accept a JWT either in the Authorization header or in the
`token` cookie set by `/auth/login`:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

Every error uses the same body:

```json
{
  "success": false,
  "error": "Bad Request",
  "message": "Payment verification failed",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Auth", description = "Registration, login and profile"),
        (name = "Products", description = "Catalog lookups"),
        (name = "Cart", description = "Shopping cart"),
        (name = "Checkout", description = "Provider orders and payment confirmation")
    ),
    paths(
        // Auth
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::auth::me,
        crate::handlers::auth::update_me,

        // Products
        crate::handlers::commerce::products::list_products,
        crate::handlers::commerce::products::get_product,

        // Cart
        crate::handlers::commerce::carts::get_cart,
        crate::handlers::commerce::carts::add_to_cart,
        crate::handlers::commerce::carts::remove_from_cart,
        crate::handlers::commerce::carts::increment_quantity,
        crate::handlers::commerce::carts::decrement_quantity,
        crate::handlers::commerce::carts::clear_cart,

        // Checkout
        crate::handlers::commerce::checkout::create_checkout,
        crate::handlers::commerce::checkout::verify_payment,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::handlers::common::MessageResponse,

            crate::services::accounts::RegisterInput,
            crate::services::accounts::LoginInput,
            crate::services::accounts::UpdateProfileInput,
            crate::services::accounts::UserProfile,
            crate::handlers::auth::UserResponse,
            crate::handlers::auth::LoginResponse,

            crate::handlers::commerce::products::ProductResponse,
            crate::handlers::commerce::products::ProductListResponse,
            crate::handlers::commerce::products::ProductDetailResponse,

            crate::services::commerce::CartLine,
            crate::services::commerce::CartView,
            crate::handlers::commerce::carts::AddItemRequest,
            crate::handlers::commerce::carts::CartResponse,

            crate::services::commerce::ClientCartItem,
            crate::services::commerce::CheckoutRequest,
            crate::services::commerce::CheckoutResponse,
            crate::handlers::commerce::checkout::VerifyPaymentRequest,
            crate::services::payments::VerifyPaymentResponse,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Serves the generated document at `/api-docs/openapi.json`
pub fn openapi_routes() -> Router {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDocV1::openapi()) }),
    )
}
