//! Stripe via its REST API

use super::{PaymentError, PaymentGateway, PaymentSession, SessionRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

/// Stripe Checkout client
#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeGateway {
    pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key: secret_key.into(),
            api_base: api_base.into(),
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_session(&self, request: &SessionRequest) -> Result<PaymentSession, PaymentError> {
        let booking_id = request.booking_id.to_string();
        let amount = request.amount_minor.to_string();

        let resp: serde_json::Value = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[
                ("mode", "payment"),
                ("line_items[0][price_data][currency]", request.currency.as_str()),
                ("line_items[0][price_data][product_data][name]", request.label.as_str()),
                ("line_items[0][price_data][unit_amount]", amount.as_str()),
                ("line_items[0][quantity]", "1"),
                ("success_url", request.success_url.as_str()),
                ("cancel_url", request.cancel_url.as_str()),
                ("metadata[bookingId]", booking_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PaymentError::Request(e.to_string()))?
            .json()
            .await
            .map_err(|e| PaymentError::Request(e.to_string()))?;

        let url = resp["url"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| PaymentError::Rejected(resp["error"]["message"].to_string()))?;

        debug!(booking_id = %request.booking_id, "Stripe checkout session created");

        Ok(PaymentSession {
            id: resp["id"].as_str().map(String::from),
            url,
        })
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WebhookError {
    #[error("Invalid Stripe-Signature header")]
    MalformedHeader,

    #[error("Webhook signature mismatch")]
    SignatureMismatch,

    #[error("Webhook timestamp outside tolerance")]
    Expired,
}

/// Verify a `Stripe-Signature` header (`t=<unix>,v1=<hex hmac>`) over the raw
/// payload. Any `v1` entry may match; the timestamp must be within
/// `tolerance_secs` of `now`.
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: DateTime<Utc>,
) -> Result<(), WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
    let ts: i64 = timestamp.parse().map_err(|_| WebhookError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedHeader);
    }

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::MalformedHeader)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures.iter().any(|sig| {
        hex::decode(sig)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err(WebhookError::SignatureMismatch);
    }

    if (now.timestamp() - ts).abs() > tolerance_secs {
        return Err(WebhookError::Expired);
    }

    Ok(())
}

/// Build a header the way Stripe signs, for tests and local tooling
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return format!("t={timestamp}"),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";

    #[test]
    fn test_valid_signature_accepted() {
        let now = Utc::now();
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let header = sign_payload(payload, SECRET, now.timestamp());
        assert_eq!(verify_webhook_signature(payload, &header, SECRET, 300, now), Ok(()));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let now = Utc::now();
        let header = sign_payload(b"{}", SECRET, now.timestamp());
        assert_eq!(
            verify_webhook_signature(b"{\"x\":1}", &header, SECRET, 300, now),
            Err(WebhookError::SignatureMismatch)
        );
    }

    #[test]
    fn test_old_timestamp_rejected() {
        let now = Utc::now();
        let header = sign_payload(b"{}", SECRET, now.timestamp() - 301);
        assert_eq!(
            verify_webhook_signature(b"{}", &header, SECRET, 300, now),
            Err(WebhookError::Expired)
        );
    }

    #[test]
    fn test_missing_parts_rejected() {
        let now = Utc::now();
        assert_eq!(
            verify_webhook_signature(b"{}", "v1=abcd", SECRET, 300, now),
            Err(WebhookError::MalformedHeader)
        );
        assert_eq!(
            verify_webhook_signature(b"{}", "t=123", SECRET, 300, now),
            Err(WebhookError::MalformedHeader)
        );
    }
}
