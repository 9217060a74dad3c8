use super::order_intent::{build_order_intent, PricedLine};
use crate::{
    config::AppConfig,
    entities::{
        commerce::{cart_item, payment_order, CartItem, PaymentOrderStatus, Product},
        User,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::payments::PaymentGateway,
};
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Item as echoed back by the storefront client. Display only; never priced.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClientCartItem {
    #[serde(default, alias = "productId", alias = "_id")]
    pub product_id: Option<String>,
    #[serde(default)]
    pub quantity: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub items: Option<Vec<ClientCartItem>>,
    #[serde(default, rename = "paymentMethod", alias = "payment_method")]
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CheckoutResponse {
    pub success: bool,
    pub order_id: String,
    /// Minor currency units
    pub amount: i64,
    pub currency: String,
    pub key_id: String,
    pub payment_method: String,
}

/// Creates provider orders from the shopper's server-side cart.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
    gateway: Option<Arc<dyn PaymentGateway>>,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
        gateway: Option<Arc<dyn PaymentGateway>>,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
            gateway,
        }
    }

    /// Prices the cart from the catalog, opens a provider order and records
    /// it as `pending`. Nothing reaches the provider for an empty or
    /// unpriceable cart.
    #[instrument(skip(self, request))]
    pub async fn create_checkout(
        &self,
        user_id: Uuid,
        request: CheckoutRequest,
    ) -> Result<CheckoutResponse, ServiceError> {
        if User::find_by_id(user_id).count(&*self.db).await? == 0 {
            return Err(ServiceError::NotFound(format!("User {} not found", user_id)));
        }

        let lines = self.priced_lines(user_id).await?;

        if let Some(client_items) = request.items.as_ref() {
            if client_items.len() != lines.len() {
                warn!(
                    client_items = client_items.len(),
                    server_items = lines.len(),
                    "Client cart differs from server cart; using server cart"
                );
            }
        }

        let intent = build_order_intent(
            &lines,
            request.payment_method.as_deref(),
            &self.config.default_currency,
        )?;

        let gateway = self
            .gateway
            .as_ref()
            .ok_or(ServiceError::GatewayUnavailable)?;

        let provider_order = gateway.create_order(&intent).await?;

        let now = Utc::now();
        let ledger_entry = payment_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            provider_order_id: Set(provider_order.provider_order_id.clone()),
            user_id: Set(user_id),
            amount_minor: Set(intent.amount_minor),
            currency: Set(intent.currency.clone()),
            receipt: Set(intent.receipt.clone()),
            payment_method: Set(intent.payment_method.clone()),
            status: Set(PaymentOrderStatus::Pending),
            provider_payment_id: Set(None),
            simulated: Set(gateway.is_simulated()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        ledger_entry.insert(&*self.db).await?;

        counter!("storefront_checkout.orders_created", 1);
        self.event_sender
            .send_or_log(Event::CheckoutOrderCreated {
                user_id,
                provider_order_id: provider_order.provider_order_id.clone(),
                amount_minor: intent.amount_minor,
                currency: intent.currency.clone(),
            })
            .await;

        info!(
            %user_id,
            provider_order_id = %provider_order.provider_order_id,
            amount_minor = intent.amount_minor,
            "Checkout order created"
        );

        Ok(CheckoutResponse {
            success: true,
            order_id: provider_order.provider_order_id,
            amount: intent.amount_minor,
            currency: intent.currency,
            key_id: gateway.key_id().to_string(),
            payment_method: intent.payment_method,
        })
    }

    /// Cart lines joined with current catalog prices
    async fn priced_lines(&self, user_id: Uuid) -> Result<Vec<PricedLine>, ServiceError> {
        let rows = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .find_also_related(Product)
            .all(&*self.db)
            .await?;

        rows.into_iter()
            .map(|(item, product)| match product {
                Some(product) => Ok(PricedLine {
                    product_id: item.product_id,
                    unit_price: product.price,
                    quantity: item.quantity,
                }),
                None => Err(ServiceError::InvalidAmount(format!(
                    "product {} is no longer available",
                    item.product_id
                ))),
            })
            .collect()
    }
}
