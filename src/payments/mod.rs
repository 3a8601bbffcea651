//! Payment provider integration.
//!
//! The booking core only needs two things from a provider: a hosted
//! checkout session carrying the booking id back in its metadata, and
//! authenticated delivery of the "payment completed" event.

pub mod stripe;

pub use stripe::{verify_webhook_signature, StripeGateway, WebhookError};

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use uuid::Uuid;

/// Checkout session parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub booking_id: Uuid,
    /// Amount in the currency's minor unit (cents)
    pub amount_minor: i64,
    pub currency: String,
    /// Line item name shown on the checkout page
    pub label: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Hosted checkout session created by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSession {
    pub id: Option<String>,
    pub url: String,
}

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Payment provider request failed: {0}")]
    Request(String),

    #[error("Payment provider rejected the session: {0}")]
    Rejected(String),

    #[error("Amount {0} cannot be charged")]
    InvalidAmount(Decimal),
}

/// Creates checkout sessions with a payment provider
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_session(&self, request: &SessionRequest) -> Result<PaymentSession, PaymentError>;
}

/// Convert a decimal amount to minor units, rounding half away from zero
pub fn to_minor_units(amount: Decimal) -> Result<i64, PaymentError> {
    let cents = (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    match cents.to_i64() {
        Some(value) if value > 0 => Ok(value),
        _ => Err(PaymentError::InvalidAmount(amount)),
    }
}
