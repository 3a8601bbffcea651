use super::retry::{write_with_retry, Applied};
use super::{AuditTrailService, AvailabilityOracle};
use crate::clock::Clock;
use crate::error::{BookingError, BookingResult};
use crate::lifecycle::{self, StatusChange};
use crate::models::{Booking, BookingStatus, HotelDashboard, NewBooking};
use crate::notifications::{BookingNotice, NotificationDispatcher};
use crate::repositories::{BookingStore, CreateOutcome, HotelDirectory, RoomCatalog};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Service for creating and transitioning bookings
pub struct BookingService {
    bookings: Arc<dyn BookingStore>,
    rooms: Arc<dyn RoomCatalog>,
    hotels: Arc<dyn HotelDirectory>,
    oracle: AvailabilityOracle,
    notifier: NotificationDispatcher,
    clock: Arc<dyn Clock>,
    audit: Option<Arc<AuditTrailService>>,
    tx_timeout: Duration,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        rooms: Arc<dyn RoomCatalog>,
        hotels: Arc<dyn HotelDirectory>,
        notifier: NotificationDispatcher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            oracle: AvailabilityOracle::new(bookings.clone()),
            bookings,
            rooms,
            hotels,
            notifier,
            clock,
            audit: None,
            tx_timeout: Duration::from_secs(10),
        }
    }

    /// Upper bound for the create transaction
    pub fn with_tx_timeout(mut self, timeout: Duration) -> Self {
        self.tx_timeout = timeout;
        self
    }

    pub fn with_audit(mut self, audit: Arc<AuditTrailService>) -> Self {
        self.audit = Some(audit);
        self
    }

    async fn ensure_room_exists(&self, room_id: Uuid) -> BookingResult<()> {
        match self.rooms.find_room(room_id).await? {
            Some(_) => Ok(()),
            None => Err(BookingError::RoomNotFound(room_id)),
        }
    }

    /// Pre-flight availability check for the booking form
    pub async fn check_availability(
        &self,
        room_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> BookingResult<bool> {
        if check_out <= check_in {
            return Err(BookingError::InvalidInput(
                "Check-out date must be after check-in date".to_string(),
            ));
        }
        self.ensure_room_exists(room_id).await?;
        self.oracle.is_available(room_id, check_in, check_out).await
    }

    /// Reserve a room. The booking starts pending and unpaid.
    pub async fn create_booking(
        &self,
        user_id: &str,
        room_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: i32,
    ) -> BookingResult<Booking> {
        lifecycle::validate_stay(check_in, check_out, guests)?;

        info!(
            "Creating booking: user={}, room={}, {} -> {}, guests={}",
            user_id, room_id, check_in, check_out, guests
        );

        // Fail fast before opening a transaction; both are re-checked inside it
        self.ensure_room_exists(room_id).await?;
        if !self.oracle.is_available(room_id, check_in, check_out).await? {
            return Err(BookingError::RoomUnavailable(room_id));
        }

        let draft = NewBooking::new(user_id, room_id, check_in, check_out, guests, self.clock.now());
        let draft_id = draft.id;

        // Dropping the future on timeout rolls back an uncommitted transaction
        let outcome = match tokio::time::timeout(self.tx_timeout, self.bookings.insert_if_available(draft)).await {
            Ok(result) => result?,
            // The commit may have landed before its acknowledgement
            Err(_) => match self.bookings.find_by_id(draft_id).await? {
                Some(booking) => {
                    warn!(booking_id = %booking.id, "Create timed out after commit, using stored booking");
                    CreateOutcome::Created(booking)
                }
                None => return Err(BookingError::Timeout(self.tx_timeout)),
            },
        };

        let booking = match outcome {
            CreateOutcome::Created(booking) => booking,
            CreateOutcome::Unavailable => return Err(BookingError::RoomUnavailable(room_id)),
            CreateOutcome::RoomMissing => return Err(BookingError::RoomNotFound(room_id)),
        };

        info!(
            booking_id = %booking.id,
            total_price = %booking.total_price,
            nights = booking.nights(),
            "Booking created"
        );

        self.notifier.dispatch(&booking, BookingNotice::Created);
        if let Some(audit) = &self.audit {
            if let Err(e) = audit.log_booking_created(&booking).await {
                warn!(booking_id = %booking.id, "Failed to write audit entry: {}", e);
            }
        }

        Ok(booking)
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> BookingResult<Booking> {
        self.bookings
            .find_by_id(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))
    }

    /// A guest's bookings, newest first
    pub async fn get_user_bookings(&self, user_id: &str) -> BookingResult<Vec<Booking>> {
        Ok(self.bookings.find_by_user(user_id).await?)
    }

    /// Bookings of the owner's hotel with aggregate counts and revenue
    pub async fn get_hotel_bookings(&self, owner_id: &str) -> BookingResult<HotelDashboard> {
        let hotel = self
            .hotels
            .find_hotel_by_owner(owner_id)
            .await?
            .ok_or_else(|| BookingError::HotelNotFound(owner_id.to_string()))?;

        let bookings = self.bookings.find_by_hotel(hotel.id).await?;
        Ok(HotelDashboard::from_bookings(bookings))
    }

    /// Cancel a booking. Cancelling twice is `AlreadyCancelled`.
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        reason: Option<String>,
    ) -> BookingResult<Booking> {
        let applied = write_with_retry(
            self.bookings.as_ref(),
            self.clock.as_ref(),
            booking_id,
            || BookingError::BookingNotFound(booking_id),
            |current, now| {
                let transition = lifecycle::plan_cancellation(current, reason.clone(), now)?;
                Ok(((), Some(transition)))
            },
        )
        .await?;

        info!(booking_id = %booking_id, from = %applied.before.status, "Booking cancelled");
        self.announce(&applied, BookingNotice::Cancelled, "guest").await;

        Ok(applied.after)
    }

    /// Administrative status change, gated by the lifecycle rules
    pub async fn update_status(&self, booking_id: Uuid, status: &str) -> BookingResult<Booking> {
        let target = BookingStatus::from_str(status)
            .map_err(|_| BookingError::InvalidStatus(status.to_string()))?;

        let applied = write_with_retry(
            self.bookings.as_ref(),
            self.clock.as_ref(),
            booking_id,
            || BookingError::BookingNotFound(booking_id),
            |current, now| match lifecycle::plan_status_change(current, target, now)? {
                StatusChange::Unchanged => Ok(((), None)),
                StatusChange::Apply(transition) => Ok(((), Some(transition))),
            },
        )
        .await?;

        if applied.changed() {
            info!(
                booking_id = %booking_id,
                from = %applied.before.status,
                to = %applied.after.status,
                "Booking status updated"
            );
            self.announce(&applied, BookingNotice::StatusChanged, "hotel").await;
        }

        Ok(applied.after)
    }

    /// Confirm a single paid booking still marked pending. Any other state,
    /// cancelled included, is returned unchanged.
    pub async fn fix_paid_status(&self, booking_id: Uuid) -> BookingResult<Applied<()>> {
        let applied = write_with_retry(
            self.bookings.as_ref(),
            self.clock.as_ref(),
            booking_id,
            || BookingError::BookingNotFound(booking_id),
            |current, now| Ok(((), lifecycle::plan_paid_pending_repair(current, now))),
        )
        .await?;

        if applied.changed() {
            info!(booking_id = %booking_id, "Repaired paid pending booking");
            if let Some(audit) = &self.audit {
                if let Err(e) = audit.log_sweep_change(&applied.after, "fix_paid_status").await {
                    warn!(booking_id = %booking_id, "Failed to write audit entry: {}", e);
                }
            }
        }

        Ok(applied)
    }

    async fn announce(&self, applied: &Applied<()>, notice: BookingNotice, actor: &str) {
        self.notifier.dispatch(&applied.after, notice);
        if let Some(audit) = &self.audit {
            if let Err(e) = audit
                .log_status_changed(&applied.after, applied.before.status, actor)
                .await
            {
                warn!(booking_id = %applied.after.id, "Failed to write audit entry: {}", e);
            }
        }
    }
}
