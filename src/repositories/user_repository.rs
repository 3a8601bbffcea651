use super::UserDirectory;
use crate::error::StoreResult;
use crate::models::User;
use async_trait::async_trait;
use sqlx::PgPool;

/// Repository for user data access
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new UserRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or refresh a user mirrored from the identity provider
    pub async fn upsert(&self, id: &str, username: &str, email: &str) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET username = EXCLUDED.username, email = EXCLUDED.email
            RETURNING id, username, email, role, created_at
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Mark a user as a hotel owner
    pub async fn promote_to_owner(&self, id: &str) -> StoreResult<()> {
        sqlx::query("UPDATE users SET role = 'hotelOwner' WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, role, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
