use crate::handlers::common::{map_service_error, success_response, AppPath};
use crate::{entities::commerce::ProductModel, errors::ApiError, AppState};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Creates the router for catalog endpoints
pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/:id", get(get_product))
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub title: String,
    pub price: Decimal,
    pub description: String,
    pub category: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
}

impl From<ProductModel> for ProductResponse {
    fn from(model: ProductModel) -> Self {
        Self {
            id: model.id,
            title: model.title,
            price: model.price,
            description: model.description,
            category: model.category,
            image: model.image,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductListResponse {
    pub success: bool,
    pub products: Vec<ProductResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductDetailResponse {
    pub success: bool,
    pub product: ProductResponse,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ProductFilter {
    pub category: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductFilter),
    responses((status = 200, description = "Catalog listing", body = ProductListResponse)),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let products = state
        .services
        .catalog
        .list_products(filter.category.as_deref())
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ProductListResponse {
        success: true,
        products: products.into_iter().map(ProductResponse::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product retrieved", body = ProductDetailResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .get_product(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ProductDetailResponse {
        success: true,
        product: product.into(),
    }))
}
