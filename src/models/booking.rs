use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Booking status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 3] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
    ];

    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for BookingStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_str(&s)
    }
}

impl From<BookingStatus> for String {
    fn from(status: BookingStatus) -> Self {
        status.as_str().to_string()
    }
}

/// A reservation in the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub user_id: String,
    pub room_id: Uuid,
    /// Denormalized from the room for owner queries
    pub hotel_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i32,
    pub total_price: Decimal, // NUMERIC(12, 2) in database
    #[sqlx(try_from = "String")]
    pub status: BookingStatus,
    pub is_paid: bool,
    pub payment_method: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Number of nights covered by the stay window
    pub fn nights(&self) -> i64 {
        crate::lifecycle::nights(self.check_in, self.check_out)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == BookingStatus::Cancelled
    }

    /// Half-open overlap against another window on the same room
    pub fn overlaps(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        self.check_in < check_out && self.check_out > check_in
    }

    /// Whether this row blocks the given window for its room
    pub fn blocks(&self, room_id: Uuid, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        self.room_id == room_id && !self.is_cancelled() && self.overlaps(check_in, check_out)
    }
}

/// Fully-priced booking ready for insertion; built inside the create transaction
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub id: Uuid,
    pub user_id: String,
    pub room_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i32,
    pub created_at: DateTime<Utc>,
}

impl NewBooking {
    pub fn new(
        user_id: impl Into<String>,
        room_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: i32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            room_id,
            check_in,
            check_out,
            guests,
            created_at,
        }
    }

    /// Materialize the ledger row once the room's hotel and rate are known
    pub fn into_booking(self, hotel_id: Uuid, total_price: Decimal) -> Booking {
        Booking {
            id: self.id,
            user_id: self.user_id,
            room_id: self.room_id,
            hotel_id,
            check_in: self.check_in,
            check_out: self.check_out,
            guests: self.guests,
            total_price,
            status: BookingStatus::Pending,
            is_paid: false,
            payment_method: None,
            cancellation_reason: None,
            cancelled_at: None,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Owner dashboard: bookings plus aggregate counts
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelDashboard {
    pub bookings: Vec<Booking>,
    pub total_bookings: usize,
    pub confirmed: usize,
    pub pending: usize,
    pub cancelled: usize,
    /// Sum of non-cancelled booking totals
    pub total_revenue: Decimal,
}

impl HotelDashboard {
    pub fn from_bookings(bookings: Vec<Booking>) -> Self {
        let count = |status: BookingStatus| bookings.iter().filter(|b| b.status == status).count();
        let confirmed = count(BookingStatus::Confirmed);
        let pending = count(BookingStatus::Pending);
        let cancelled = count(BookingStatus::Cancelled);
        let total_revenue = bookings
            .iter()
            .filter(|b| !b.is_cancelled())
            .map(|b| b.total_price)
            .sum();

        Self {
            total_bookings: bookings.len(),
            confirmed,
            pending,
            cancelled,
            total_revenue,
            bookings,
        }
    }
}
