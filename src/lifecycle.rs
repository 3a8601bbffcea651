//! Booking lifecycle rules.
//!
//! Everything here is pure: pricing, request validation and the state
//! machine that decides, from the current ledger row and an incoming
//! command, what the row should look like next. Services feed the
//! resulting [`Transition`] to the store as a compare-and-set so that a
//! decision is only applied to the exact state it was computed from.

use crate::error::{BookingError, BookingResult};
use crate::models::{Booking, BookingStatus};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Reason recorded by the sweeper when it expires an unpaid reservation
pub const STALE_CANCELLATION_REASON: &str = "payment not completed in time";

/// Nights in `[check_in, check_out)`, never less than one
pub fn nights(check_in: NaiveDate, check_out: NaiveDate) -> i64 {
    (check_out - check_in).num_days().max(1)
}

/// `nightly_rate * nights`
pub fn total_price(nightly_rate: Decimal, check_in: NaiveDate, check_out: NaiveDate) -> Decimal {
    nightly_rate * Decimal::from(nights(check_in, check_out))
}

/// Validation performed before any storage access
pub fn validate_stay(check_in: NaiveDate, check_out: NaiveDate, guests: i32) -> BookingResult<()> {
    if check_out <= check_in {
        return Err(BookingError::InvalidInput(
            "Check-out date must be after check-in date".to_string(),
        ));
    }
    if guests < 1 {
        return Err(BookingError::InvalidInput(
            "At least one guest is required".to_string(),
        ));
    }
    Ok(())
}

/// Tagged view over the `(status, is_paid)` pair stored on a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Created, waiting for the payment provider
    AwaitingPayment,
    /// Paid but the status never caught up; repaired by the sweeper
    PaidPending,
    /// Confirmed by payment, or by administrative override while unpaid
    Confirmed { paid: bool },
    /// Terminal
    Cancelled { paid: bool },
}

impl Lifecycle {
    pub fn of(booking: &Booking) -> Self {
        match (booking.status, booking.is_paid) {
            (BookingStatus::Pending, false) => Lifecycle::AwaitingPayment,
            (BookingStatus::Pending, true) => Lifecycle::PaidPending,
            (BookingStatus::Confirmed, paid) => Lifecycle::Confirmed { paid },
            (BookingStatus::Cancelled, paid) => Lifecycle::Cancelled { paid },
        }
    }

    /// `paid && cancelled`: needs manual review, never auto-resolved
    pub fn is_anomalous(&self) -> bool {
        matches!(self, Lifecycle::Cancelled { paid: true })
    }
}

/// The `(status, is_paid)` a conditional write expects to find
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub status: BookingStatus,
    pub is_paid: bool,
}

impl Snapshot {
    pub fn of(booking: &Booking) -> Self {
        Self {
            status: booking.status,
            is_paid: booking.is_paid,
        }
    }

    pub fn matches(&self, booking: &Booking) -> bool {
        booking.status == self.status && booking.is_paid == self.is_paid
    }
}

/// Complete set of mutable columns a lifecycle write sets
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub booking_id: Uuid,
    pub expected: Snapshot,
    pub status: BookingStatus,
    pub is_paid: bool,
    pub payment_method: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Transition {
    /// Identity transition from the current row; callers then adjust fields
    fn from_row(booking: &Booking, now: DateTime<Utc>) -> Self {
        Self {
            booking_id: booking.id,
            expected: Snapshot::of(booking),
            status: booking.status,
            is_paid: booking.is_paid,
            payment_method: booking.payment_method.clone(),
            cancellation_reason: booking.cancellation_reason.clone(),
            cancelled_at: booking.cancelled_at,
            updated_at: now,
        }
    }

    fn cancel(mut self, reason: Option<String>, now: DateTime<Utc>) -> Self {
        self.status = BookingStatus::Cancelled;
        self.cancellation_reason = reason;
        self.cancelled_at = Some(now);
        self
    }

    /// Apply to an in-memory row (used by the in-memory ledger)
    pub fn apply_to(&self, booking: &mut Booking) {
        booking.status = self.status;
        booking.is_paid = self.is_paid;
        booking.payment_method = self.payment_method.clone();
        booking.cancellation_reason = self.cancellation_reason.clone();
        booking.cancelled_at = self.cancelled_at;
        booking.updated_at = self.updated_at;
    }
}

/// User-initiated cancellation
pub fn plan_cancellation(
    booking: &Booking,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> BookingResult<Transition> {
    if booking.is_cancelled() {
        return Err(BookingError::AlreadyCancelled(booking.id));
    }
    Ok(Transition::from_row(booking, now).cancel(reason, now))
}

/// Outcome of an administrative status change decision
#[derive(Debug, Clone, PartialEq)]
pub enum StatusChange {
    /// Target equals the current status; nothing to write or announce
    Unchanged,
    Apply(Transition),
}

/// Administrative status update, gated by the state machine.
///
/// `pending -> confirmed` without payment is the administrative override.
pub fn plan_status_change(
    booking: &Booking,
    target: BookingStatus,
    now: DateTime<Utc>,
) -> BookingResult<StatusChange> {
    use BookingStatus::*;

    match (booking.status, target) {
        (Cancelled, _) => Err(BookingError::AlreadyCancelled(booking.id)),
        (from, to) if from == to => Ok(StatusChange::Unchanged),
        (Pending, Confirmed) => {
            let mut next = Transition::from_row(booking, now);
            next.status = Confirmed;
            Ok(StatusChange::Apply(next))
        }
        (Pending | Confirmed, Cancelled) => Ok(StatusChange::Apply(
            Transition::from_row(booking, now).cancel(Some("cancelled by hotel".to_string()), now),
        )),
        (from, to) => Err(BookingError::InvalidTransition {
            id: booking.id,
            from,
            to,
        }),
    }
}

/// Observable result of applying a payment confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// First delivery: booking is now paid and confirmed
    Confirmed,
    /// Repeat delivery; nothing changed
    AlreadyConfirmed,
    /// Row had drifted to paid-but-pending and is now confirmed
    Repaired,
    /// Booking was cancelled before payment landed; it stays cancelled
    PaidAfterCancellation,
}

/// Decision for one confirmation event against the current row
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentDecision {
    pub outcome: ConfirmationOutcome,
    /// `None` when the row already reflects the payment
    pub write: Option<Transition>,
}

/// `(current row, payment confirmed) -> next row`.
///
/// Re-applying the decision to its own result yields no write, which is
/// what makes redelivered events harmless.
pub fn plan_payment(booking: &Booking, payment_method: &str, now: DateTime<Utc>) -> PaymentDecision {
    let paid = |booking: &Booking| {
        let mut next = Transition::from_row(booking, now);
        next.is_paid = true;
        next.payment_method = Some(payment_method.to_string());
        next
    };

    match Lifecycle::of(booking) {
        Lifecycle::AwaitingPayment | Lifecycle::Confirmed { paid: false } => {
            let mut next = paid(booking);
            next.status = BookingStatus::Confirmed;
            PaymentDecision {
                outcome: ConfirmationOutcome::Confirmed,
                write: Some(next),
            }
        }
        Lifecycle::PaidPending => {
            let mut next = Transition::from_row(booking, now);
            next.status = BookingStatus::Confirmed;
            if next.payment_method.is_none() {
                next.payment_method = Some(payment_method.to_string());
            }
            PaymentDecision {
                outcome: ConfirmationOutcome::Repaired,
                write: Some(next),
            }
        }
        Lifecycle::Confirmed { paid: true } => PaymentDecision {
            outcome: ConfirmationOutcome::AlreadyConfirmed,
            write: None,
        },
        Lifecycle::Cancelled { paid: false } => PaymentDecision {
            outcome: ConfirmationOutcome::PaidAfterCancellation,
            write: Some(paid(booking)),
        },
        Lifecycle::Cancelled { paid: true } => PaymentDecision {
            outcome: ConfirmationOutcome::PaidAfterCancellation,
            write: None,
        },
    }
}

/// Single-row form of the paid-pending repair: `Some` only for a paid booking
/// still marked pending. Every other state, cancelled included, is left as is.
pub fn plan_paid_pending_repair(booking: &Booking, now: DateTime<Utc>) -> Option<Transition> {
    match Lifecycle::of(booking) {
        Lifecycle::PaidPending => {
            let mut next = Transition::from_row(booking, now);
            next.status = BookingStatus::Confirmed;
            Some(next)
        }
        _ => None,
    }
}

/// Whether a row is an unpaid pending booking created before `cutoff`
pub fn is_stale_unpaid(booking: &Booking, cutoff: DateTime<Utc>) -> bool {
    Lifecycle::of(booking) == Lifecycle::AwaitingPayment && booking.created_at < cutoff
}
