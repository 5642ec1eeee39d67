/// Contact form messages
///
/// Visitors submit messages through the public contact form; admins read them
/// from the admin panel inbox.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactMessage {
    pub async fn create(pool: &PgPool, data: CreateContactMessage) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ContactMessage>(
            r#"
            INSERT INTO contact_messages (name, email, subject, message)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, subject, message, is_read, created_at
            "#,
        )
        .bind(data.name)
        .bind(data.email)
        .bind(data.subject)
        .bind(data.message)
        .fetch_one(pool)
        .await
    }

    /// Lists messages, newest first, optionally only unread ones
    pub async fn list(
        pool: &PgPool,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ContactMessage>(
            r#"
            SELECT id, name, email, subject, message, is_read, created_at
            FROM contact_messages
            WHERE ($1 = FALSE OR is_read = FALSE)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(unread_only)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Marks a message as read; false if it doesn't exist
    pub async fn mark_read(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE contact_messages SET is_read = TRUE WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_unread(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM contact_messages WHERE is_read = FALSE")
            .fetch_one(pool)
            .await
    }
}
