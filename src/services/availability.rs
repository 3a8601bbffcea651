use crate::error::BookingResult;
use crate::repositories::BookingStore;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Answers whether a room is free for a stay window
#[derive(Clone)]
pub struct AvailabilityOracle {
    bookings: Arc<dyn BookingStore>,
}

impl AvailabilityOracle {
    pub fn new(bookings: Arc<dyn BookingStore>) -> Self {
        Self { bookings }
    }

    /// `true` iff no non-cancelled booking on the room overlaps
    /// `[check_in, check_out)`. The caller validates ordering; storage
    /// failures are returned, never reported as available.
    pub async fn is_available(
        &self,
        room_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> BookingResult<bool> {
        let taken = self.bookings.has_overlap(room_id, check_in, check_out).await?;
        debug!(room_id = %room_id, %check_in, %check_out, available = !taken, "Availability checked");
        Ok(!taken)
    }
}
