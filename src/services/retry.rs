use crate::clock::Clock;
use crate::error::{BookingError, BookingResult};
use crate::lifecycle::Transition;
use crate::models::Booking;
use crate::repositories::BookingStore;
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

/// Attempts before a contended write gives up with `Conflict`
pub const MAX_WRITE_ATTEMPTS: usize = 3;

/// Row before and after a planned write, plus the planner's verdict
#[derive(Debug, Clone)]
pub struct Applied<T> {
    pub before: Booking,
    pub after: Booking,
    pub outcome: T,
}

impl<T> Applied<T> {
    pub fn changed(&self) -> bool {
        self.before != self.after
    }
}

/// Read the row, plan a write from it, and apply that write as a
/// compare-and-set. When another writer changed the row first, the plan is
/// re-evaluated against the fresh row.
pub async fn write_with_retry<T, F, M>(
    store: &dyn BookingStore,
    clock: &dyn Clock,
    booking_id: Uuid,
    missing: M,
    mut plan: F,
) -> BookingResult<Applied<T>>
where
    F: FnMut(&Booking, DateTime<Utc>) -> BookingResult<(T, Option<Transition>)>,
    M: Fn() -> BookingError,
{
    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        let current = store.find_by_id(booking_id).await?.ok_or_else(|| missing())?;
        let (outcome, write) = plan(&current, clock.now())?;

        let Some(transition) = write else {
            return Ok(Applied {
                after: current.clone(),
                before: current,
                outcome,
            });
        };

        if let Some(after) = store.apply_transition(&transition).await? {
            return Ok(Applied {
                before: current,
                after,
                outcome,
            });
        }

        debug!(booking_id = %booking_id, attempt, "Booking changed concurrently, re-evaluating");
    }

    Err(BookingError::Conflict(booking_id))
}
