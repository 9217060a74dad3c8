use crate::{
    entities::commerce::{product, Product, ProductModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Read access to the product catalog. Prices here are the ones checkout charges.
#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Insert a catalog entry. Used by the seeding binary and tests; there is
    /// no HTTP route for it.
    #[instrument(skip(self))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;
        if input.price.is_sign_negative() {
            return Err(ServiceError::ValidationError(
                "price must not be negative".to_string(),
            ));
        }

        let product_id = Uuid::new_v4();
        let now = Utc::now();

        let product = product::ActiveModel {
            id: Set(product_id),
            title: Set(input.title),
            price: Set(input.price),
            description: Set(input.description),
            category: Set(input.category),
            image: Set(input.image),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let product = product.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductCreated(product_id))
            .await;

        info!("Created product: {}", product_id);
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductModel, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Lists the catalog, optionally restricted to one category.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        category: Option<&str>,
    ) -> Result<Vec<ProductModel>, ServiceError> {
        let mut query = Product::find();
        if let Some(category) = category {
            query = query.filter(product::Column::Category.eq(category));
        }

        Ok(query
            .order_by_asc(product::Column::Title)
            .all(&*self.db)
            .await?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub price: Decimal,
    pub description: String,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    pub image: String,
}
