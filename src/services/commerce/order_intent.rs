//! Turns priced cart lines into a provider order request.
//!
//! Everything here is pure; the checkout service supplies lines priced from
//! the catalog and hands the resulting intent to a payment gateway.

use crate::errors::ServiceError;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_PAYMENT_METHOD: &str = "card";

/// One cart line with its authoritative unit price
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub unit_price: Decimal,
    pub quantity: i32,
}

/// Order request handed to the payment gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOrderIntent {
    /// Smallest currency unit
    pub amount_minor: i64,
    pub currency: String,
    pub receipt: String,
    pub payment_method: String,
    pub item_count: usize,
}

/// Converts a major-unit total to minor units, rounding half away from zero.
/// The result must be a positive `i64`.
pub fn to_minor_units(total: Decimal) -> Result<i64, ServiceError> {
    let scaled = total
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or_else(|| ServiceError::InvalidAmount("order total is too large".to_string()))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    let minor = scaled
        .to_i64()
        .ok_or_else(|| ServiceError::InvalidAmount("order total is too large".to_string()))?;

    if minor <= 0 {
        return Err(ServiceError::InvalidAmount(
            "order total must be greater than zero".to_string(),
        ));
    }

    Ok(minor)
}

/// Receipt label: `rcpt_<unix-millis>_<8 hex chars>`
pub fn generate_receipt() -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!(
        "rcpt_{}_{:08x}",
        chrono::Utc::now().timestamp_millis(),
        suffix
    )
}

/// Builds the provider order request for a set of priced lines.
///
/// Fails with `EmptyCart` for no lines and `InvalidAmount` for a negative
/// price, a non-positive quantity, or a total that is not a positive minor
/// amount.
pub fn build_order_intent(
    lines: &[PricedLine],
    payment_method: Option<&str>,
    currency: &str,
) -> Result<PaymentOrderIntent, ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::EmptyCart);
    }

    let mut total = Decimal::ZERO;
    for line in lines {
        if line.unit_price.is_sign_negative() {
            return Err(ServiceError::InvalidAmount(format!(
                "product {} has a negative price",
                line.product_id
            )));
        }
        if line.quantity < 1 {
            return Err(ServiceError::InvalidAmount(format!(
                "product {} has quantity {}",
                line.product_id, line.quantity
            )));
        }

        total = line
            .unit_price
            .checked_mul(Decimal::from(line.quantity))
            .and_then(|line_total| total.checked_add(line_total))
            .ok_or_else(|| ServiceError::InvalidAmount("order total is too large".to_string()))?;
    }

    let amount_minor = to_minor_units(total)?;

    let payment_method = payment_method
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_PAYMENT_METHOD)
        .to_string();

    Ok(PaymentOrderIntent {
        amount_minor,
        currency: currency.to_string(),
        receipt: generate_receipt(),
        payment_method,
        item_count: lines.len(),
    })
}
