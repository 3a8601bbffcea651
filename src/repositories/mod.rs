//! Storage seams for the booking core and their implementations.
//!
//! The services only see the traits below. Postgres repositories back the
//! deployed service; [`InMemoryStore`] backs tests and local runs without a
//! database.

pub mod booking_repository;
pub mod hotel_repository;
pub mod memory;
pub mod room_repository;
pub mod user_repository;

// Re-export all repositories for convenient access
pub use booking_repository::BookingRepository;
pub use hotel_repository::HotelRepository;
pub use memory::InMemoryStore;
pub use room_repository::RoomRepository;
pub use user_repository::UserRepository;

use crate::error::StoreResult;
use crate::lifecycle::Transition;
use crate::models::{Booking, Hotel, NewBooking, Room, User};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Result of the transactional create path
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    Created(Booking),
    /// An overlapping non-cancelled booking exists for the room
    Unavailable,
    RoomMissing,
}

/// The booking ledger
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Whether any non-cancelled booking on `room_id` overlaps `[check_in, check_out)`
    async fn has_overlap(
        &self,
        room_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> StoreResult<bool>;

    /// Atomically re-check availability, price from the room's rate and insert
    /// the booking as `pending`/unpaid. Nothing is written unless `Created`.
    async fn insert_if_available(&self, draft: NewBooking) -> StoreResult<CreateOutcome>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Booking>>;

    /// Newest first
    async fn find_by_user(&self, user_id: &str) -> StoreResult<Vec<Booking>>;

    /// Newest first
    async fn find_by_hotel(&self, hotel_id: Uuid) -> StoreResult<Vec<Booking>>;

    /// Compare-and-set on `(status, is_paid)`. `None` when the row no longer
    /// matches `transition.expected` (or does not exist).
    async fn apply_transition(&self, transition: &Transition) -> StoreResult<Option<Booking>>;

    /// Cancel every unpaid pending booking created before `cutoff`
    async fn cancel_stale_unpaid(
        &self,
        cutoff: DateTime<Utc>,
        reason: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Booking>>;

    /// Move every paid pending booking to confirmed
    async fn confirm_paid_pending(&self, now: DateTime<Utc>) -> StoreResult<Vec<Booking>>;

    /// Paid bookings that are cancelled; reported, never modified
    async fn find_paid_cancelled(&self) -> StoreResult<Vec<Booking>>;
}

/// Read-only room lookup
#[async_trait]
pub trait RoomCatalog: Send + Sync {
    async fn find_room(&self, id: Uuid) -> StoreResult<Option<Room>>;
}

/// Read-only hotel lookup
#[async_trait]
pub trait HotelDirectory: Send + Sync {
    async fn find_hotel(&self, id: Uuid) -> StoreResult<Option<Hotel>>;
    async fn find_hotel_by_owner(&self, owner_id: &str) -> StoreResult<Option<Hotel>>;
}

/// Read-only user lookup used to address notifications
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: &str) -> StoreResult<Option<User>>;
}
