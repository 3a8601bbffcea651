use super::{BookingStore, CreateOutcome, HotelDirectory, RoomCatalog, UserDirectory};
use crate::error::{RepositoryError, StoreResult};
use crate::lifecycle::{self, Transition};
use crate::models::{Booking, BookingStatus, Hotel, NewBooking, Room, User};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct State {
    bookings: HashMap<Uuid, Booking>,
    rooms: HashMap<Uuid, Room>,
    hotels: HashMap<Uuid, Hotel>,
    users: HashMap<String, User>,
}

impl State {
    fn overlap(&self, room_id: Uuid, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        self.bookings
            .values()
            .any(|b| b.blocks(room_id, check_in, check_out))
    }

    fn newest_first(mut bookings: Vec<Booking>) -> Vec<Booking> {
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        bookings
    }
}

/// Ledger and catalog held in process memory.
///
/// A single lock covers every operation, so the availability re-check and
/// the insert of `insert_if_available` are one atomic step.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    offline: AtomicBool,
    create_delay: std::sync::Mutex<Option<Duration>>,
    ack_delay: std::sync::Mutex<Option<Duration>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: User) {
        self.state.lock().await.users.insert(user.id.clone(), user);
    }

    pub async fn add_hotel(&self, hotel: Hotel) {
        self.state.lock().await.hotels.insert(hotel.id, hotel);
    }

    pub async fn add_room(&self, room: Room) {
        self.state.lock().await.rooms.insert(room.id, room);
    }

    /// Store a row as-is, bypassing every lifecycle rule
    pub async fn insert_raw(&self, booking: Booking) {
        self.state.lock().await.bookings.insert(booking.id, booking);
    }

    pub async fn bookings(&self) -> Vec<Booking> {
        let state = self.state.lock().await;
        State::newest_first(state.bookings.values().cloned().collect())
    }

    /// Make every call fail as if the database were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Stall the create path while holding the ledger lock
    pub fn set_create_delay(&self, delay: Option<Duration>) {
        *self.create_delay.lock().unwrap_or_else(|e| e.into_inner()) = delay;
    }

    /// Delay returning from a create whose row is already stored, like a
    /// commit that lands before its acknowledgement
    pub fn set_ack_delay(&self, delay: Option<Duration>) {
        *self.ack_delay.lock().unwrap_or_else(|e| e.into_inner()) = delay;
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn has_overlap(
        &self,
        room_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> StoreResult<bool> {
        self.check_online()?;
        Ok(self.state.lock().await.overlap(room_id, check_in, check_out))
    }

    async fn insert_if_available(&self, draft: NewBooking) -> StoreResult<CreateOutcome> {
        self.check_online()?;
        let mut state = self.state.lock().await;

        let delay = *self.create_delay.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if state.overlap(draft.room_id, draft.check_in, draft.check_out) {
            return Ok(CreateOutcome::Unavailable);
        }

        let Some(room) = state.rooms.get(&draft.room_id) else {
            return Ok(CreateOutcome::RoomMissing);
        };

        let total_price =
            lifecycle::total_price(room.price_per_night, draft.check_in, draft.check_out);
        let booking = draft.into_booking(room.hotel_id, total_price);
        state.bookings.insert(booking.id, booking.clone());
        drop(state);

        let ack_delay = *self.ack_delay.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(delay) = ack_delay {
            tokio::time::sleep(delay).await;
        }

        Ok(CreateOutcome::Created(booking))
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        self.check_online()?;
        Ok(self.state.lock().await.bookings.get(&id).cloned())
    }

    async fn find_by_user(&self, user_id: &str) -> StoreResult<Vec<Booking>> {
        self.check_online()?;
        let state = self.state.lock().await;
        Ok(State::newest_first(
            state
                .bookings
                .values()
                .filter(|b| b.user_id == user_id)
                .cloned()
                .collect(),
        ))
    }

    async fn find_by_hotel(&self, hotel_id: Uuid) -> StoreResult<Vec<Booking>> {
        self.check_online()?;
        let state = self.state.lock().await;
        Ok(State::newest_first(
            state
                .bookings
                .values()
                .filter(|b| b.hotel_id == hotel_id)
                .cloned()
                .collect(),
        ))
    }

    async fn apply_transition(&self, transition: &Transition) -> StoreResult<Option<Booking>> {
        self.check_online()?;
        let mut state = self.state.lock().await;
        match state.bookings.get_mut(&transition.booking_id) {
            Some(booking) if transition.expected.matches(booking) => {
                transition.apply_to(booking);
                Ok(Some(booking.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn cancel_stale_unpaid(
        &self,
        cutoff: DateTime<Utc>,
        reason: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Booking>> {
        self.check_online()?;
        let mut state = self.state.lock().await;
        let mut cancelled = Vec::new();
        for booking in state.bookings.values_mut() {
            if lifecycle::is_stale_unpaid(booking, cutoff) {
                booking.status = BookingStatus::Cancelled;
                booking.cancellation_reason = Some(reason.to_string());
                booking.cancelled_at = Some(now);
                booking.updated_at = now;
                cancelled.push(booking.clone());
            }
        }
        Ok(cancelled)
    }

    async fn confirm_paid_pending(&self, now: DateTime<Utc>) -> StoreResult<Vec<Booking>> {
        self.check_online()?;
        let mut state = self.state.lock().await;
        let mut repaired = Vec::new();
        for booking in state.bookings.values_mut() {
            if booking.status == BookingStatus::Pending && booking.is_paid {
                booking.status = BookingStatus::Confirmed;
                booking.updated_at = now;
                repaired.push(booking.clone());
            }
        }
        Ok(repaired)
    }

    async fn find_paid_cancelled(&self) -> StoreResult<Vec<Booking>> {
        self.check_online()?;
        let state = self.state.lock().await;
        Ok(state
            .bookings
            .values()
            .filter(|b| b.is_cancelled() && b.is_paid)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RoomCatalog for InMemoryStore {
    async fn find_room(&self, id: Uuid) -> StoreResult<Option<Room>> {
        self.check_online()?;
        Ok(self.state.lock().await.rooms.get(&id).cloned())
    }
}

#[async_trait]
impl HotelDirectory for InMemoryStore {
    async fn find_hotel(&self, id: Uuid) -> StoreResult<Option<Hotel>> {
        self.check_online()?;
        Ok(self.state.lock().await.hotels.get(&id).cloned())
    }

    async fn find_hotel_by_owner(&self, owner_id: &str) -> StoreResult<Option<Hotel>> {
        self.check_online()?;
        let state = self.state.lock().await;
        Ok(state
            .hotels
            .values()
            .filter(|h| h.owner_id == owner_id)
            .min_by_key(|h| h.created_at)
            .cloned())
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        self.check_online()?;
        Ok(self.state.lock().await.users.get(id).cloned())
    }
}
