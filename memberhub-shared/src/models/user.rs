/// User model and database operations
///
/// Accounts are created `pending` by self-registration and must be approved by
/// an admin before they can authenticate.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('admin', 'member', 'retraite');
/// CREATE TYPE user_status AS ENUM ('pending', 'approved', 'rejected');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL,            -- unique on LOWER(email)
///     password_hash VARCHAR(255) NOT NULL,
///     first_name VARCHAR(100) NOT NULL,
///     last_name VARCHAR(100) NOT NULL,
///     phone VARCHAR(30),
///     role user_role NOT NULL DEFAULT 'member',
///     status user_status NOT NULL DEFAULT 'pending',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use memberhub_shared::models::user::{User, UserStatus};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let pending = User::list(&pool, Some(UserStatus::Pending), 50, 0).await?;
/// for user in pending {
///     User::update_status(&pool, user.id, UserStatus::Approved).await?;
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use super::ParseEnumError;

/// Portal roles
///
/// This is the only role vocabulary in the system. The legacy label
/// `adherent` is deliberately not accepted as a spelling of `member`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Association staff: unrestricted access
    Admin,

    /// Active member ("adhérent")
    Member,

    /// Retired member
    Retraite,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Member, Role::Retraite];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
            Role::Retraite => "retraite",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            "retraite" => Ok(Role::Retraite),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

/// Account approval status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// Registered, waiting for an admin decision
    Pending,

    /// May log in
    Approved,

    /// Refused by an admin
    Rejected,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Pending => "pending",
            UserStatus::Approved => "approved",
            UserStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(UserStatus::Pending),
            "approved" => Ok(UserStatus::Approved),
            "rejected" => Ok(UserStatus::Rejected),
            other => Err(ParseEnumError::new("user status", other)),
        }
    }
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    pub email: String,

    /// Argon2id password hash, never serialized to clients
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub first_name: String,

    pub last_name: String,

    pub phone: Option<String>,

    pub role: Role,

    pub status: UserStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    pub first_name: String,

    pub last_name: String,

    pub phone: Option<String>,

    pub role: Role,
}

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone, role, status, \
                            created_at, updated_at, last_login_at";

impl User {
    /// Creates a new user in `pending` status
    ///
    /// # Errors
    ///
    /// Returns an error if the email is already taken (unique violation on
    /// `users_email_key`) or the database is unreachable.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        Self::insert(pool, data, UserStatus::Pending).await
    }

    /// Creates a user with an explicit status (used for admin bootstrap)
    pub async fn create_with_status(
        pool: &PgPool,
        data: CreateUser,
        status: UserStatus,
    ) -> Result<Self, sqlx::Error> {
        Self::insert(pool, data, status).await
    }

    async fn insert(pool: &PgPool, data: CreateUser, status: UserStatus) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, phone, role, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.first_name)
            .bind(data.last_name)
            .bind(data.phone)
            .bind(data.role)
            .bind(status)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email address (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");

        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Lists users, newest first, optionally restricted to one status
    pub async fn list(
        pool: &PgPool,
        status: Option<UserStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE ($1::user_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Sets the approval status
    ///
    /// Returns the updated user, or `None` if it doesn't exist.
    pub async fn update_status(
        pool: &PgPool,
        id: Uuid,
        status: UserStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(status)
            .fetch_optional(pool)
            .await
    }

    /// Changes the portal role
    pub async fn update_role(pool: &PgPool, id: Uuid, role: Role) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(role)
            .fetch_optional(pool)
            .await
    }

    /// Replaces the stored password hash
    pub async fn update_password(pool: &PgPool, id: Uuid, password_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Updates the last login timestamp after successful authentication
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Permanently deletes a user
    ///
    /// Registrations cascade; authored articles and events keep their rows
    /// with a NULL author.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_by_status(pool: &PgPool, status: UserStatus) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE status = $1")
            .bind(status)
            .fetch_one(pool)
            .await
    }

    /// Display name used in listings
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_approved(&self) -> bool {
        self.status == UserStatus::Approved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_role_rejects_legacy_adherent() {
        let err = "adherent".parse::<Role>().unwrap_err();
        assert_eq!(err.kind, "role");
        assert_eq!(err.value, "adherent");
        assert!("Admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_user_status_parse() {
        assert_eq!("pending".parse::<UserStatus>().unwrap(), UserStatus::Pending);
        assert_eq!("approved".parse::<UserStatus>().unwrap(), UserStatus::Approved);
        assert_eq!("rejected".parse::<UserStatus>().unwrap(), UserStatus::Rejected);
        assert!("banned".parse::<UserStatus>().is_err());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            email: "jean@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            first_name: "Jean".to_string(),
            last_name: "Martin".to_string(),
            phone: None,
            role: Role::Retraite,
            status: UserStatus::Approved,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "retraite");
        assert_eq!(user.full_name(), "Jean Martin");
        assert!(user.is_approved());
    }

    // Database operations are covered in tests/db_models_tests.rs
}
