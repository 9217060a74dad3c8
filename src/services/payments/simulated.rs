use super::{verify_signature, PaymentGateway, ProviderOrder};
use crate::{errors::ServiceError, services::commerce::PaymentOrderIntent};
use async_trait::async_trait;
use rand::RngCore;
use tracing::info;

pub const SIMULATED_KEY_ID: &str = "rzp_simulated";

/// Local stand-in for the provider, only constructed when the process starts
/// with simulated payments enabled. Order ids look like `order_sim_<hex>`.
#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    secret: String,
}

impl SimulatedGateway {
    pub fn new() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::with_secret(hex::encode(bytes))
    }

    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn create_order(&self, intent: &PaymentOrderIntent) -> Result<ProviderOrder, ServiceError> {
        let mut bytes = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut bytes);
        let provider_order_id = format!("order_sim_{}", hex::encode(bytes));

        info!(%provider_order_id, amount = intent.amount_minor, "Simulated order created");

        Ok(ProviderOrder {
            provider_order_id,
            amount_minor: intent.amount_minor,
            currency: intent.currency.clone(),
        })
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_signature(order_id, payment_id, signature, &self.secret)
    }

    fn key_id(&self) -> &str {
        SIMULATED_KEY_ID
    }

    fn is_simulated(&self) -> bool {
        true
    }
}
