use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User account mirrored from the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Identity provider subject id
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: impl Into<String>, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            email: email.into(),
            role: "user".to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn is_hotel_owner(&self) -> bool {
        self.role == "hotelOwner"
    }
}
