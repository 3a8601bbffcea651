use super::retry::write_with_retry;
use super::AuditTrailService;
use crate::clock::Clock;
use crate::error::{BookingError, BookingResult};
use crate::lifecycle::{self, ConfirmationOutcome};
use crate::models::Booking;
use crate::notifications::{BookingNotice, NotificationDispatcher};
use crate::payments::{self, PaymentGateway, PaymentSession, SessionRequest};
use crate::repositories::{BookingStore, HotelDirectory};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Payment method recorded for provider-confirmed payments
pub const STRIPE_PAYMENT_METHOD: &str = "Stripe";

/// Redirect targets handed to the hosted checkout page
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutUrls {
    pub fn for_frontend(frontend_url: &str) -> Self {
        let base = frontend_url.trim_end_matches('/');
        Self {
            success_url: format!("{}/loader/my-bookings", base),
            cancel_url: format!("{}/my-bookings", base),
        }
    }
}

/// Starts checkouts and reconciles provider confirmations with the ledger
pub struct PaymentService {
    bookings: Arc<dyn BookingStore>,
    hotels: Arc<dyn HotelDirectory>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: NotificationDispatcher,
    clock: Arc<dyn Clock>,
    audit: Option<Arc<AuditTrailService>>,
    currency: String,
    urls: CheckoutUrls,
}

impl PaymentService {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        hotels: Arc<dyn HotelDirectory>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: NotificationDispatcher,
        clock: Arc<dyn Clock>,
        urls: CheckoutUrls,
    ) -> Self {
        Self {
            bookings,
            hotels,
            gateway,
            notifier,
            clock,
            audit: None,
            currency: "usd".to_string(),
            urls,
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_audit(mut self, audit: Arc<AuditTrailService>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Create a hosted checkout for the booking's total
    pub async fn create_payment_session(&self, booking_id: Uuid) -> BookingResult<PaymentSession> {
        let booking = self
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))?;

        if booking.is_cancelled() {
            return Err(BookingError::BookingCancelled(booking_id));
        }

        let label = match self.hotels.find_hotel(booking.hotel_id).await? {
            Some(hotel) => hotel.name,
            None => "Hotel Booking".to_string(),
        };

        let amount_minor = payments::to_minor_units(booking.total_price)
            .map_err(|e| BookingError::PaymentSession(e.to_string()))?;

        let request = SessionRequest {
            booking_id,
            amount_minor,
            currency: self.currency.clone(),
            label,
            success_url: self.urls.success_url.clone(),
            cancel_url: self.urls.cancel_url.clone(),
        };

        let session = self
            .gateway
            .create_session(&request)
            .await
            .map_err(|e| BookingError::PaymentSession(e.to_string()))?;

        info!(
            booking_id = %booking_id,
            amount_minor,
            currency = %self.currency,
            "Payment session created"
        );

        Ok(session)
    }

    /// Apply a provider confirmation carrying the booking id as metadata
    pub async fn confirm_from_reference(
        &self,
        booking_ref: &str,
        payment_method: &str,
    ) -> BookingResult<ConfirmationOutcome> {
        let booking_id = Uuid::parse_str(booking_ref.trim())
            .map_err(|_| BookingError::UnknownBooking(booking_ref.to_string()))?;
        self.handle_payment_confirmed(booking_id, payment_method).await
    }

    /// Idempotent: redelivery of the same confirmation changes nothing and
    /// sends nothing. A cancelled booking is never moved back to confirmed.
    pub async fn handle_payment_confirmed(
        &self,
        booking_id: Uuid,
        payment_method: &str,
    ) -> BookingResult<ConfirmationOutcome> {
        let applied = write_with_retry(
            self.bookings.as_ref(),
            self.clock.as_ref(),
            booking_id,
            || BookingError::UnknownBooking(booking_id.to_string()),
            |current, now| {
                let decision = lifecycle::plan_payment(current, payment_method, now);
                Ok((decision.outcome, decision.write))
            },
        )
        .await
        .map_err(|e| {
            if let BookingError::UnknownBooking(_) = e {
                warn!(booking_id = %booking_id, "Payment confirmation for unknown booking");
            }
            e
        })?;

        let booking = &applied.after;
        match applied.outcome {
            ConfirmationOutcome::Confirmed => {
                info!(booking_id = %booking_id, "Payment confirmed, booking confirmed");
                self.notifier.dispatch(booking, BookingNotice::PaymentReceived);
            }
            ConfirmationOutcome::AlreadyConfirmed => {
                debug!(booking_id = %booking_id, "Duplicate payment confirmation ignored");
            }
            ConfirmationOutcome::Repaired => {
                info!(booking_id = %booking_id, "Paid pending booking moved to confirmed");
            }
            ConfirmationOutcome::PaidAfterCancellation => {
                warn!(
                    booking_id = %booking_id,
                    cancelled_at = ?booking.cancelled_at,
                    "Payment received for cancelled booking; left cancelled for manual review"
                );
            }
        }

        if applied.changed() {
            self.audit_payment(booking, applied.outcome).await;
        }

        Ok(applied.outcome)
    }

    async fn audit_payment(&self, booking: &Booking, outcome: ConfirmationOutcome) {
        if let Some(audit) = &self.audit {
            if let Err(e) = audit.log_payment(booking, outcome).await {
                warn!(booking_id = %booking.id, "Failed to write audit entry: {}", e);
            }
        }
    }
}
