//! Stripe webhook handler
//!
//! POST /api/stripe: raw body, signature verified before parsing

use super::state::AppState;
use crate::error::{BookingError, ErrorCategory};
use crate::payments::verify_webhook_signature;
use crate::services::STRIPE_PAYMENT_METHOD;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use tracing::{debug, error, info, warn};

pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let sig_header = match headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    {
        Some(s) => s,
        None => {
            warn!("Missing Stripe-Signature header");
            return StatusCode::BAD_REQUEST;
        }
    };

    if let Err(e) = verify_webhook_signature(
        &body,
        sig_header,
        &state.webhook.secret,
        state.webhook.tolerance_secs,
        state.clock.now(),
    ) {
        warn!(error = %e, "Webhook signature verification failed");
        return StatusCode::BAD_REQUEST;
    }

    let event: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!(%e, "Failed to parse webhook JSON");
            return StatusCode::BAD_REQUEST;
        }
    };

    let event_type = event["type"].as_str().unwrap_or("");
    info!(event_type = event_type, "Received Stripe webhook");

    match event_type {
        "checkout.session.completed" => handle_checkout_completed(&state, &event).await,
        _ => {
            debug!(event_type = event_type, "Unhandled webhook event type");
            StatusCode::OK
        }
    }
}

/// checkout.session.completed → confirm the booking named in the metadata
async fn handle_checkout_completed(state: &AppState, event: &serde_json::Value) -> StatusCode {
    let session = &event["data"]["object"];

    let payment_status = session["payment_status"].as_str().unwrap_or("");
    if payment_status != "paid" {
        info!(payment_status, "Checkout completed without payment, ignoring");
        return StatusCode::OK;
    }

    let Some(booking_ref) = session["metadata"]["bookingId"].as_str() else {
        warn!(session_id = ?session["id"].as_str(), "Checkout session has no bookingId metadata");
        return StatusCode::OK;
    };

    match state
        .payments
        .confirm_from_reference(booking_ref, STRIPE_PAYMENT_METHOD)
        .await
    {
        Ok(outcome) => {
            info!(booking_id = booking_ref, ?outcome, "Payment confirmation processed");
            StatusCode::OK
        }
        Err(BookingError::UnknownBooking(id)) => {
            // Acknowledge so the provider stops redelivering
            warn!(booking_id = %id, "Payment confirmation for unknown booking acknowledged");
            StatusCode::OK
        }
        Err(e) if e.category() == ErrorCategory::Internal || e.is_retryable() => {
            error!(booking_id = booking_ref, "Payment confirmation failed, provider will retry: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
        Err(e) => {
            warn!(booking_id = booking_ref, "Payment confirmation rejected: {}", e);
            StatusCode::OK
        }
    }
}
