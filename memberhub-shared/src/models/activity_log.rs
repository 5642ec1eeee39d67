/// Activity log
///
/// Append-only audit trail of security-relevant actions (logins, account
/// approvals, content changes, registrations), browsable from the admin panel.
///
/// # Example
///
/// ```no_run
/// use memberhub_shared::models::activity_log::{ActivityAction, ActivityLog};
/// use serde_json::json;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, admin_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
/// ActivityLog::record(
///     &pool,
///     Some(admin_id),
///     ActivityAction::UserApproved,
///     json!({ "user_id": user_id }),
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Logged action kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityAction {
    Login,
    PasswordChanged,
    UserRegistered,
    UserApproved,
    UserRejected,
    UserRoleChanged,
    UserDeleted,
    ArticleCreated,
    ArticleUpdated,
    ArticleDeleted,
    EventCreated,
    EventUpdated,
    EventDeleted,
    EventRegistered,
    EventRegistrationCancelled,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Login => "login",
            ActivityAction::PasswordChanged => "user.password_changed",
            ActivityAction::UserRegistered => "user.registered",
            ActivityAction::UserApproved => "user.approved",
            ActivityAction::UserRejected => "user.rejected",
            ActivityAction::UserRoleChanged => "user.role_changed",
            ActivityAction::UserDeleted => "user.deleted",
            ActivityAction::ArticleCreated => "article.created",
            ActivityAction::ArticleUpdated => "article.updated",
            ActivityAction::ArticleDeleted => "article.deleted",
            ActivityAction::EventCreated => "event.created",
            ActivityAction::EventUpdated => "event.updated",
            ActivityAction::EventDeleted => "event.deleted",
            ActivityAction::EventRegistered => "event.registered",
            ActivityAction::EventRegistrationCancelled => "event.registration_cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityLog {
    pub id: Uuid,
    /// Acting user; None for anonymous actions or deleted accounts
    pub user_id: Option<Uuid>,
    pub action: String,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl ActivityLog {
    /// Appends an entry
    pub async fn record(
        pool: &PgPool,
        user_id: Option<Uuid>,
        action: ActivityAction,
        details: serde_json::Value,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ActivityLog>(
            r#"
            INSERT INTO activity_logs (user_id, action, details)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, action, details, created_at
            "#,
        )
        .bind(user_id)
        .bind(action.as_str())
        .bind(details)
        .fetch_one(pool)
        .await
    }

    /// Most recent entries first
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ActivityLog>(
            r#"
            SELECT id, user_id, action, details, created_at
            FROM activity_logs
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }
}
