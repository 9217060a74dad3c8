use super::PaymentGateway;
use crate::{
    entities::commerce::{cart_item, payment_order, CartItem, PaymentOrder, PaymentOrderModel, PaymentOrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

pub const MSG_VERIFIED: &str = "Payment verified successfully";
pub const MSG_SIMULATED: &str = "Mock payment successful";
pub const MSG_ALREADY_PROCESSED: &str = "Payment already processed";

/// What the client reports after completing payment with the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    pub provider_order_id: String,
    pub provider_payment_id: String,
    pub provider_signature: String,
    pub is_simulated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub message: String,
    pub already_processed: bool,
}

impl VerifyPaymentResponse {
    fn settled(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            already_processed: false,
        }
    }

    fn already_processed() -> Self {
        Self {
            success: true,
            message: MSG_ALREADY_PROCESSED.to_string(),
            already_processed: true,
        }
    }
}

/// Settles payment orders created at checkout.
///
/// A ledger entry leaves `pending` exactly once. Verification and the cart
/// wipe commit together; a rejected signature never touches the cart.
#[derive(Clone)]
pub struct PaymentConfirmationService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    gateway: Option<Arc<dyn PaymentGateway>>,
    simulation_enabled: bool,
}

impl PaymentConfirmationService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        gateway: Option<Arc<dyn PaymentGateway>>,
        simulation_enabled: bool,
    ) -> Self {
        Self {
            db,
            event_sender,
            gateway,
            simulation_enabled,
        }
    }

    #[instrument(skip(self, confirmation), fields(provider_order_id = %confirmation.provider_order_id, simulated = confirmation.is_simulated))]
    pub async fn confirm(
        &self,
        user_id: Uuid,
        confirmation: PaymentConfirmation,
    ) -> Result<VerifyPaymentResponse, ServiceError> {
        let order = self
            .find_order(user_id, &confirmation.provider_order_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Payment order {} not found",
                    confirmation.provider_order_id
                ))
            })?;

        if let Some(prior) = settled_result(&order) {
            return prior;
        }

        let message = if confirmation.is_simulated {
            if !self.simulation_enabled {
                warn!(%user_id, "Simulated confirmation refused");
                return Err(ServiceError::Forbidden(
                    "Simulated payments are disabled".to_string(),
                ));
            }
            MSG_SIMULATED
        } else {
            let gateway = self
                .gateway
                .as_ref()
                .ok_or(ServiceError::GatewayUnavailable)?;

            if !gateway.verify_signature(
                &confirmation.provider_order_id,
                &confirmation.provider_payment_id,
                &confirmation.provider_signature,
            ) {
                self.reject(user_id, &confirmation).await?;
                return Err(ServiceError::SignatureMismatch);
            }
            MSG_VERIFIED
        };

        self.settle(user_id, &confirmation, message).await
    }

    /// Marks the order verified and clears the cart in one transaction. If
    /// another request settled the order first, its result is returned.
    async fn settle(
        &self,
        user_id: Uuid,
        confirmation: &PaymentConfirmation,
        message: &str,
    ) -> Result<VerifyPaymentResponse, ServiceError> {
        let txn = self.db.begin().await?;

        let update = PaymentOrder::update_many()
            .set(payment_order::ActiveModel {
                status: Set(PaymentOrderStatus::Verified),
                provider_payment_id: Set(Some(confirmation.provider_payment_id.clone())),
                updated_at: Set(Utc::now()),
                ..Default::default()
            })
            .filter(payment_order::Column::ProviderOrderId.eq(confirmation.provider_order_id.as_str()))
            .filter(payment_order::Column::UserId.eq(user_id))
            .filter(payment_order::Column::Status.eq(PaymentOrderStatus::Pending))
            .exec(&txn)
            .await?;

        if update.rows_affected == 0 {
            txn.rollback().await?;
            info!("Payment order settled concurrently; returning prior result");

            let order = self
                .find_order(user_id, &confirmation.provider_order_id)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Payment order {} not found",
                        confirmation.provider_order_id
                    ))
                })?;

            return settled_result(&order).unwrap_or_else(|| {
                Err(ServiceError::InternalError(
                    "payment order still pending after guarded update".to_string(),
                ))
            });
        }

        let cleared = CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        counter!("storefront_payments.verified", 1);
        self.event_sender
            .send_or_log(Event::PaymentVerified {
                user_id,
                provider_order_id: confirmation.provider_order_id.clone(),
                simulated: confirmation.is_simulated,
            })
            .await;
        if cleared.rows_affected > 0 {
            self.event_sender
                .send_or_log(Event::CartCleared(user_id))
                .await;
        }

        info!(%user_id, lines_cleared = cleared.rows_affected, "Payment verified");
        Ok(VerifyPaymentResponse::settled(message))
    }

    async fn reject(
        &self,
        user_id: Uuid,
        confirmation: &PaymentConfirmation,
    ) -> Result<(), ServiceError> {
        let update = PaymentOrder::update_many()
            .set(payment_order::ActiveModel {
                status: Set(PaymentOrderStatus::Rejected),
                provider_payment_id: Set(Some(confirmation.provider_payment_id.clone())),
                updated_at: Set(Utc::now()),
                ..Default::default()
            })
            .filter(payment_order::Column::ProviderOrderId.eq(confirmation.provider_order_id.as_str()))
            .filter(payment_order::Column::UserId.eq(user_id))
            .filter(payment_order::Column::Status.eq(PaymentOrderStatus::Pending))
            .exec(&*self.db)
            .await?;

        if update.rows_affected > 0 {
            counter!("storefront_payments.rejected", 1);
            self.event_sender
                .send_or_log(Event::PaymentRejected {
                    user_id,
                    provider_order_id: confirmation.provider_order_id.clone(),
                })
                .await;
        }

        warn!(%user_id, "Payment signature mismatch");
        Ok(())
    }

    async fn find_order(
        &self,
        user_id: Uuid,
        provider_order_id: &str,
    ) -> Result<Option<PaymentOrderModel>, ServiceError> {
        Ok(PaymentOrder::find()
            .filter(payment_order::Column::ProviderOrderId.eq(provider_order_id))
            .filter(payment_order::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?)
    }
}

/// Result replayed for an order that already left `pending`
fn settled_result(order: &PaymentOrderModel) -> Option<Result<VerifyPaymentResponse, ServiceError>> {
    match order.status {
        PaymentOrderStatus::Pending => None,
        PaymentOrderStatus::Verified => Some(Ok(VerifyPaymentResponse::already_processed())),
        PaymentOrderStatus::Rejected => Some(Err(ServiceError::SignatureMismatch)),
    }
}
