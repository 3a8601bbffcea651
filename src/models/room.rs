use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Room model; read-only to the booking core
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: Uuid,
    pub hotel_id: Uuid,
    pub room_type: String,
    pub price_per_night: Decimal, // NUMERIC(12, 2) in database
    /// Owner-controlled listing toggle, independent of booking occupancy
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub fn new(hotel_id: Uuid, room_type: impl Into<String>, price_per_night: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            hotel_id,
            room_type: room_type.into(),
            price_per_night,
            is_available: true,
            created_at: Utc::now(),
        }
    }
}
