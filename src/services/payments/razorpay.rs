use super::{verify_signature, PaymentGateway, ProviderOrder};
use crate::{errors::ServiceError, services::commerce::PaymentOrderIntent};
use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, instrument};

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    notes: OrderNotes<'a>,
}

#[derive(Debug, Serialize)]
struct OrderNotes<'a> {
    payment_method: &'a str,
    item_count: usize,
}

#[derive(Debug, Deserialize)]
struct CreateOrderResponse {
    id: Option<String>,
    amount: Option<i64>,
    currency: Option<String>,
}

/// Razorpay orders API client
#[derive(Clone)]
pub struct RazorpayGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl std::fmt::Debug for RazorpayGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayGateway")
            .field("base_url", &self.base_url)
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl RazorpayGateway {
    pub fn new(
        key_id: &str,
        key_secret: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id: key_id.to_string(),
            key_secret: key_secret.to_string(),
        })
    }

    fn fail(&self, detail: String) -> ServiceError {
        counter!("storefront_gateway.failures", 1);
        error!(detail = %detail, "Payment provider order creation failed");
        ServiceError::GatewayError(detail)
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    #[instrument(skip(self, intent), fields(receipt = %intent.receipt, amount = intent.amount_minor))]
    async fn create_order(&self, intent: &PaymentOrderIntent) -> Result<ProviderOrder, ServiceError> {
        let body = CreateOrderRequest {
            amount: intent.amount_minor,
            currency: &intent.currency,
            receipt: &intent.receipt,
            notes: OrderNotes {
                payment_method: &intent.payment_method,
                item_count: intent.item_count,
            },
        };

        let response = self
            .client
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.fail(format!("transport error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.fail(format!("provider returned {}: {}", status, text)));
        }

        let parsed: CreateOrderResponse = response
            .json()
            .await
            .map_err(|e| self.fail(format!("unreadable response: {}", e)))?;

        let provider_order_id = parsed
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| self.fail("response carried no order id".to_string()))?;

        info!(%provider_order_id, "Provider order created");

        Ok(ProviderOrder {
            provider_order_id,
            amount_minor: parsed.amount.unwrap_or(intent.amount_minor),
            currency: parsed.currency.unwrap_or_else(|| intent.currency.clone()),
        })
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_signature(order_id, payment_id, signature, &self.key_secret)
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }
}
