//! Payment provider integration.
//!
//! A [`PaymentGateway`] creates provider-side orders and checks the
//! signature the provider hands the client after a successful payment. The
//! signature is `hex(HMAC-SHA256(key_secret, "<order_id>|<payment_id>"))`.

use crate::{config::AppConfig, errors::ServiceError, services::commerce::PaymentOrderIntent};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub mod confirmation;
pub mod razorpay;
pub mod simulated;

pub use confirmation::{PaymentConfirmation, PaymentConfirmationService, VerifyPaymentResponse};
pub use razorpay::RazorpayGateway;
pub use simulated::SimulatedGateway;

type HmacSha256 = Hmac<Sha256>;

/// Order as acknowledged by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderOrder {
    pub provider_order_id: String,
    pub amount_minor: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Registers the order with the provider.
    async fn create_order(&self, intent: &PaymentOrderIntent) -> Result<ProviderOrder, ServiceError>;

    /// True only when `signature` authenticates `order_id|payment_id`.
    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;

    /// Publishable key the client needs to open the provider's payment UI
    fn key_id(&self) -> &str;

    fn is_simulated(&self) -> bool {
        false
    }
}

const SIGNATURE_HEX_LEN: usize = 64;

/// Hex HMAC-SHA256 of `order_id|payment_id`.
pub fn compute_signature(order_id: &str, payment_id: &str, secret: &str) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        // HMAC accepts keys of any length
        Err(_) => return String::new(),
    };
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a provider signature. Only the exact form
/// `compute_signature` produces (64 lowercase hex characters) can match.
pub fn verify_signature(order_id: &str, payment_id: &str, signature: &str, secret: &str) -> bool {
    if !is_canonical_hex(signature) {
        return false;
    }
    let provided = match hex::decode(signature) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    mac.verify_slice(&provided).is_ok()
}

fn is_canonical_hex(signature: &str) -> bool {
    signature.len() == SIGNATURE_HEX_LEN
        && signature
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Picks the gateway for this process. Simulation wins when enabled (config
/// validation already refuses it alongside real credentials); otherwise the
/// provider is used if credentials are present. `None` means checkout will
/// answer `GatewayUnavailable`.
pub fn gateway_from_config(
    config: &AppConfig,
) -> Result<Option<Arc<dyn PaymentGateway>>, ServiceError> {
    if config.payments_simulated {
        warn!("Payment gateway running in simulated mode");
        return Ok(Some(Arc::new(SimulatedGateway::new())));
    }

    match config.payment_credentials() {
        Some((key_id, key_secret)) => {
            let gateway = RazorpayGateway::new(
                key_id,
                key_secret,
                &config.payment_api_base_url,
                Duration::from_secs(config.payment_request_timeout_secs),
            )?;
            info!(base_url = %config.payment_api_base_url, "Payment gateway initialized");
            Ok(Some(Arc::new(gateway)))
        }
        None => {
            warn!("Payment credentials missing; checkout is disabled");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_key_secret";

    #[test]
    fn valid_signature_verifies() {
        let sig = compute_signature("order_123", "pay_456", SECRET);
        assert_eq!(sig.len(), 64);
        assert!(verify_signature("order_123", "pay_456", &sig, SECRET));
    }

    #[test]
    fn signature_is_bound_to_ids_and_secret() {
        let sig = compute_signature("order_123", "pay_456", SECRET);

        assert!(!verify_signature("order_124", "pay_456", &sig, SECRET));
        assert!(!verify_signature("order_123", "pay_457", &sig, SECRET));
        assert!(!verify_signature("order_123", "pay_456", &sig, "other_secret"));
    }

    #[test]
    fn separator_is_part_of_the_message() {
        let plain = compute_signature("ab", "c", SECRET);
        assert!(!verify_signature("a", "bc", &plain, SECRET));
    }

    #[test]
    fn malformed_signature_is_rejected() {
        assert!(!verify_signature("order_123", "pay_456", "zz-not-hex", SECRET));
        assert!(!verify_signature("order_123", "pay_456", "", SECRET));
        assert!(!verify_signature("order_123", "pay_456", "abcd", SECRET));
    }

    #[test]
    fn only_the_exact_lowercase_form_verifies() {
        let sig = compute_signature("order_123", "pay_456", SECRET);
        assert_eq!(sig.len(), 64);

        assert!(!verify_signature("order_123", "pay_456", &sig.to_uppercase(), SECRET));
        assert!(!verify_signature("order_123", "pay_456", &format!(" {}", sig), SECRET));
        assert!(!verify_signature("order_123", "pay_456", &format!("{}\n", sig), SECRET));
        assert!(!verify_signature("order_123", "pay_456", &format!("{}00", sig), SECRET));
        assert!(!verify_signature("order_123", "pay_456", &sig[..62], SECRET));
    }

    #[test]
    fn one_uppercased_letter_is_a_mismatch() {
        let sig = compute_signature("order_123", "pay_456", SECRET);
        let position = sig
            .find(|c: char| c.is_ascii_alphabetic())
            .expect("hmac hex contains a letter");
        let mut altered = sig.clone();
        altered.replace_range(position..=position, &sig[position..=position].to_uppercase());

        assert!(!verify_signature("order_123", "pay_456", &altered, SECRET));
    }

    #[test]
    fn gateway_selection_follows_config() {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".into(),
            "secret".into(),
            3600,
            "127.0.0.1".into(),
            8080,
            "development".into(),
        );
        assert!(gateway_from_config(&cfg).unwrap().is_none());

        cfg.payments_simulated = true;
        let gateway = gateway_from_config(&cfg).unwrap().unwrap();
        assert!(gateway.is_simulated());

        cfg.payments_simulated = false;
        cfg.payment_key_id = Some("rzp_test_key".into());
        cfg.payment_key_secret = Some("rzp_secret".into());
        let gateway = gateway_from_config(&cfg).unwrap().unwrap();
        assert!(!gateway.is_simulated());
        assert_eq!(gateway.key_id(), "rzp_test_key");
    }
}
