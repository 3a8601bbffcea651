use super::RoomCatalog;
use crate::error::StoreResult;
use crate::models::Room;
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

pub(crate) const ROOM_COLUMNS: &str = "id, hotel_id, room_type, price_per_night, is_available, created_at";

/// Repository for room data access
pub struct RoomRepository {
    pool: PgPool,
}

impl RoomRepository {
    /// Create a new RoomRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Add a room to a hotel
    pub async fn create(
        &self,
        hotel_id: Uuid,
        room_type: &str,
        price_per_night: Decimal,
    ) -> StoreResult<Room> {
        let room = sqlx::query_as::<_, Room>(&format!(
            r#"
            INSERT INTO rooms (hotel_id, room_type, price_per_night)
            VALUES ($1, $2, $3)
            RETURNING {ROOM_COLUMNS}
            "#
        ))
        .bind(hotel_id)
        .bind(room_type)
        .bind(price_per_night)
        .fetch_one(&self.pool)
        .await?;

        Ok(room)
    }
}

#[async_trait]
impl RoomCatalog for RoomRepository {
    async fn find_room(&self, id: Uuid) -> StoreResult<Option<Room>> {
        let room = sqlx::query_as::<_, Room>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(room)
    }
}
