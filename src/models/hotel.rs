use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Hotel listing; `owner_id` is the user who manages its bookings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub city: String,
    pub contact: Option<String>,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

impl Hotel {
    pub fn new(name: impl Into<String>, address: impl Into<String>, city: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            address: address.into(),
            city: city.into(),
            contact: None,
            owner_id: owner_id.into(),
            created_at: Utc::now(),
        }
    }
}
