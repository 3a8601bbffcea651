use super::room_repository::ROOM_COLUMNS;
use super::{BookingStore, CreateOutcome};
use crate::error::{RepositoryError, StoreResult};
use crate::lifecycle::Transition;
use crate::models::{Booking, BookingStatus, NewBooking, Room};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

const BOOKING_COLUMNS: &str = r#"
    id,
    user_id,
    room_id,
    hotel_id,
    check_in,
    check_out,
    guests,
    total_price,
    status,
    is_paid,
    payment_method,
    cancellation_reason,
    cancelled_at,
    created_at,
    updated_at
"#;

/// Postgres-backed booking ledger
pub struct BookingRepository {
    pool: PgPool,
    statement_timeout: Duration,
}

impl BookingRepository {
    /// Create a new BookingRepository
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            statement_timeout: Duration::from_secs(10),
        }
    }

    /// Bound each statement of the create transaction
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    async fn overlap_exists<'e, E>(
        executor: E,
        room_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> StoreResult<bool>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM bookings
                WHERE room_id = $1
                  AND status <> 'cancelled'
                  AND check_in < $3
                  AND check_out > $2
            )
            "#,
        )
        .bind(room_id)
        .bind(check_in)
        .bind(check_out)
        .fetch_one(executor)
        .await?;

        Ok(exists)
    }

    async fn create_in_tx(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        draft: &NewBooking,
    ) -> StoreResult<CreateOutcome> {
        // SET cannot take bind parameters; the value is an integer we format ourselves
        sqlx::query(&format!(
            "SET LOCAL statement_timeout = {}",
            self.statement_timeout.as_millis()
        ))
        .execute(&mut **tx)
        .await?;

        // Serializes concurrent creates for the same room until commit
        let room = sqlx::query_as::<_, Room>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1 FOR UPDATE"
        ))
        .bind(draft.room_id)
        .fetch_optional(&mut **tx)
        .await?;

        if Self::overlap_exists(&mut **tx, draft.room_id, draft.check_in, draft.check_out).await? {
            return Ok(CreateOutcome::Unavailable);
        }

        let Some(room) = room else {
            return Ok(CreateOutcome::RoomMissing);
        };

        let total_price =
            crate::lifecycle::total_price(room.price_per_night, draft.check_in, draft.check_out);
        let booking = draft.clone().into_booking(room.hotel_id, total_price);

        let inserted = sqlx::query_as::<_, Booking>(&format!(
            r#"
            INSERT INTO bookings (
                id, user_id, room_id, hotel_id, check_in, check_out, guests,
                total_price, status, is_paid, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking.id)
        .bind(&booking.user_id)
        .bind(booking.room_id)
        .bind(booking.hotel_id)
        .bind(booking.check_in)
        .bind(booking.check_out)
        .bind(booking.guests)
        .bind(booking.total_price)
        .bind(booking.status.as_str())
        .bind(booking.is_paid)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .fetch_one(&mut **tx)
        .await?;

        Ok(CreateOutcome::Created(inserted))
    }
}

#[async_trait]
impl BookingStore for BookingRepository {
    async fn has_overlap(
        &self,
        room_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> StoreResult<bool> {
        Self::overlap_exists(&self.pool, room_id, check_in, check_out).await
    }

    async fn insert_if_available(&self, draft: NewBooking) -> StoreResult<CreateOutcome> {
        let mut tx = self.pool.begin().await?;

        let outcome = match self.create_in_tx(&mut tx, &draft).await {
            Ok(outcome) => outcome,
            // The exclusion constraint is the last line of defence
            Err(RepositoryError::Conflict(msg)) => {
                warn!(room_id = %draft.room_id, "Overlap rejected by constraint: {}", msg);
                return Ok(CreateOutcome::Unavailable);
            }
            Err(e) => return Err(e),
        };

        match &outcome {
            CreateOutcome::Created(_) => {
                match tx.commit().await.map_err(RepositoryError::from) {
                    Ok(()) => {}
                    Err(RepositoryError::Conflict(_)) => return Ok(CreateOutcome::Unavailable),
                    Err(e) => return Err(e),
                }
            }
            // Nothing was written; dropping would also roll back
            _ => tx.rollback().await?,
        }

        debug!(room_id = %draft.room_id, "Create transaction finished: {}", outcome_label(&outcome));
        Ok(outcome)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(booking)
    }

    async fn find_by_user(&self, user_id: &str) -> StoreResult<Vec<Booking>> {
        let bookings = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    async fn find_by_hotel(&self, hotel_id: Uuid) -> StoreResult<Vec<Booking>> {
        let bookings = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE hotel_id = $1 ORDER BY created_at DESC"
        ))
        .bind(hotel_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    async fn apply_transition(&self, transition: &Transition) -> StoreResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            r#"
            UPDATE bookings
            SET status = $2,
                is_paid = $3,
                payment_method = $4,
                cancellation_reason = $5,
                cancelled_at = $6,
                updated_at = $7
            WHERE id = $1 AND status = $8 AND is_paid = $9
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(transition.booking_id)
        .bind(transition.status.as_str())
        .bind(transition.is_paid)
        .bind(&transition.payment_method)
        .bind(&transition.cancellation_reason)
        .bind(transition.cancelled_at)
        .bind(transition.updated_at)
        .bind(transition.expected.status.as_str())
        .bind(transition.expected.is_paid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(booking)
    }

    async fn cancel_stale_unpaid(
        &self,
        cutoff: DateTime<Utc>,
        reason: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Booking>> {
        // Rows changed by a concurrent writer are re-checked against the predicate
        let bookings = sqlx::query_as::<_, Booking>(&format!(
            r#"
            UPDATE bookings
            SET status = 'cancelled',
                cancellation_reason = $2,
                cancelled_at = $3,
                updated_at = $3
            WHERE status = 'pending' AND is_paid = FALSE AND created_at < $1
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(cutoff)
        .bind(reason)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    async fn confirm_paid_pending(&self, now: DateTime<Utc>) -> StoreResult<Vec<Booking>> {
        let bookings = sqlx::query_as::<_, Booking>(&format!(
            r#"
            UPDATE bookings
            SET status = $2, updated_at = $1
            WHERE status = 'pending' AND is_paid = TRUE
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(now)
        .bind(BookingStatus::Confirmed.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    async fn find_paid_cancelled(&self) -> StoreResult<Vec<Booking>> {
        let bookings = sqlx::query_as::<_, Booking>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE status = 'cancelled' AND is_paid = TRUE
            ORDER BY updated_at DESC
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }
}

fn outcome_label(outcome: &CreateOutcome) -> &'static str {
    match outcome {
        CreateOutcome::Created(_) => "created",
        CreateOutcome::Unavailable => "unavailable",
        CreateOutcome::RoomMissing => "room missing",
    }
}
