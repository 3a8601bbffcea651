use super::HotelDirectory;
use crate::error::StoreResult;
use crate::models::Hotel;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

const HOTEL_COLUMNS: &str = "id, name, address, city, contact, owner_id, created_at";

/// Repository for hotel data access
pub struct HotelRepository {
    pool: PgPool,
}

impl HotelRepository {
    /// Create a new HotelRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register a hotel for an owner
    pub async fn create(
        &self,
        name: &str,
        address: &str,
        city: &str,
        contact: Option<&str>,
        owner_id: &str,
    ) -> StoreResult<Hotel> {
        let hotel = sqlx::query_as::<_, Hotel>(&format!(
            r#"
            INSERT INTO hotels (name, address, city, contact, owner_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {HOTEL_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(address)
        .bind(city)
        .bind(contact)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(hotel)
    }
}

#[async_trait]
impl HotelDirectory for HotelRepository {
    async fn find_hotel(&self, id: Uuid) -> StoreResult<Option<Hotel>> {
        let hotel = sqlx::query_as::<_, Hotel>(&format!(
            "SELECT {HOTEL_COLUMNS} FROM hotels WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(hotel)
    }

    async fn find_hotel_by_owner(&self, owner_id: &str) -> StoreResult<Option<Hotel>> {
        // An owner manages a single hotel; take the oldest if several exist
        let hotel = sqlx::query_as::<_, Hotel>(&format!(
            "SELECT {HOTEL_COLUMNS} FROM hotels WHERE owner_id = $1 ORDER BY created_at LIMIT 1"
        ))
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(hotel)
    }
}
