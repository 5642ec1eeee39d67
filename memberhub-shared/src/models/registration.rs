/// Event registration model with capacity enforcement
///
/// A user holds at most one *active* registration (`registered` or
/// `attended`) per event. Cancelling keeps the row for history; registering
/// again afterwards inserts a fresh row.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE registration_status AS ENUM ('registered', 'cancelled', 'attended');
///
/// CREATE TABLE event_registrations (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     event_id UUID NOT NULL REFERENCES events(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     status registration_status NOT NULL DEFAULT 'registered',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE UNIQUE INDEX event_registrations_active_key
///     ON event_registrations (event_id, user_id)
///     WHERE status IN ('registered', 'attended');
/// ```
///
/// # Capacity
///
/// [`EventRegistration::register`] runs in a single transaction that locks the
/// event row, so two concurrent registrations for the last place serialize and
/// the second one sees the updated count.
///
/// # Example
///
/// ```no_run
/// use memberhub_shared::models::registration::{EventRegistration, RegistrationError};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, event_id: Uuid, user_id: Uuid) -> Result<(), RegistrationError> {
/// match EventRegistration::register(&pool, event_id, user_id).await {
///     Ok(registration) => println!("Registered: {}", registration.id),
///     Err(RegistrationError::CapacityExceeded { .. }) => println!("Event is full"),
///     Err(e) => return Err(e),
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::event::EventStatus;

/// Name of the partial unique index backing the duplicate rule
const ACTIVE_REGISTRATION_CONSTRAINT: &str = "event_registrations_active_key";

/// Registration status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "registration_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Registered,
    Cancelled,
    Attended,
}

impl RegistrationStatus {
    /// Whether this registration occupies a place
    pub fn is_active(&self) -> bool {
        matches!(self, RegistrationStatus::Registered | RegistrationStatus::Attended)
    }
}

/// Error type for registration operations
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// Event id doesn't exist
    #[error("Event not found")]
    EventNotFound,

    /// Event is a draft or was cancelled
    #[error("Event is not open for registration")]
    EventClosed,

    /// All places are taken
    #[error("Event is full ({max_participants} participants)")]
    CapacityExceeded { max_participants: i32 },

    /// User already holds an active registration
    #[error("Already registered for this event")]
    DuplicateRegistration,

    /// Cancel requested without an active registration
    #[error("Not registered for this event")]
    NotRegistered,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Checks whether one more active registration fits
///
/// # Example
///
/// ```
/// use memberhub_shared::models::registration::check_capacity;
///
/// assert!(check_capacity(1, Some(2)).is_ok());
/// assert!(check_capacity(2, Some(2)).is_err());
/// assert!(check_capacity(500, None).is_ok());
/// ```
pub fn check_capacity(active_count: i64, max_participants: Option<i32>) -> Result<(), RegistrationError> {
    match max_participants {
        Some(max) if active_count >= i64::from(max) => {
            Err(RegistrationError::CapacityExceeded { max_participants: max })
        }
        _ => Ok(()),
    }
}

/// Registration row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventRegistration {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub status: RegistrationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration joined with the participant, for admin listings
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Participant {
    pub registration_id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub status: RegistrationStatus,
    pub registered_at: DateTime<Utc>,
}

/// Registration joined with its event, for "my registrations"
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRegistration {
    pub registration_id: Uuid,
    pub event_id: Uuid,
    pub event_title: String,
    pub starts_at: DateTime<Utc>,
    pub location: Option<String>,
    pub status: RegistrationStatus,
    pub registered_at: DateTime<Utc>,
}

impl EventRegistration {
    /// Registers a user for an event
    ///
    /// Checks, in order and under a row lock on the event: the event exists
    /// and is published, the user has no active registration, and a place is
    /// available.
    ///
    /// # Errors
    ///
    /// - `EventNotFound` if the event doesn't exist
    /// - `EventClosed` if the event is a draft or cancelled
    /// - `DuplicateRegistration` if the user is already registered
    /// - `CapacityExceeded` if `max_participants` is reached
    pub async fn register(pool: &PgPool, event_id: Uuid, user_id: Uuid) -> Result<Self, RegistrationError> {
        let mut tx = pool.begin().await?;

        let (max_participants, status): (Option<i32>, EventStatus) =
            sqlx::query_as("SELECT max_participants, status FROM events WHERE id = $1 FOR UPDATE")
                .bind(event_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RegistrationError::EventNotFound)?;

        if status != EventStatus::Published {
            return Err(RegistrationError::EventClosed);
        }

        let already_registered: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM event_registrations
                WHERE event_id = $1 AND user_id = $2 AND status IN ('registered', 'attended')
            )
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        if already_registered {
            return Err(RegistrationError::DuplicateRegistration);
        }

        let active_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM event_registrations WHERE event_id = $1 AND status IN ('registered', 'attended')",
        )
        .bind(event_id)
        .fetch_one(&mut *tx)
        .await?;

        check_capacity(active_count, max_participants)?;

        let registration = sqlx::query_as::<_, EventRegistration>(
            r#"
            INSERT INTO event_registrations (event_id, user_id, status)
            VALUES ($1, $2, 'registered')
            RETURNING id, event_id, user_id, status, created_at, updated_at
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some(ACTIVE_REGISTRATION_CONSTRAINT) =>
            {
                RegistrationError::DuplicateRegistration
            }
            other => RegistrationError::DatabaseError(other),
        })?;

        tx.commit().await?;

        tracing::debug!(
            %event_id,
            %user_id,
            active_count = active_count + 1,
            "Event registration created"
        );

        Ok(registration)
    }

    /// Cancels the user's active registration
    ///
    /// Only `registered` rows can be cancelled; attendance is kept.
    pub async fn cancel(pool: &PgPool, event_id: Uuid, user_id: Uuid) -> Result<Self, RegistrationError> {
        sqlx::query_as::<_, EventRegistration>(
            r#"
            UPDATE event_registrations
            SET status = 'cancelled', updated_at = NOW()
            WHERE event_id = $1 AND user_id = $2 AND status = 'registered'
            RETURNING id, event_id, user_id, status, created_at, updated_at
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(RegistrationError::NotRegistered)
    }

    /// Counts registrations occupying a place
    pub async fn count_active(pool: &PgPool, event_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM event_registrations WHERE event_id = $1 AND status IN ('registered', 'attended')",
        )
        .bind(event_id)
        .fetch_one(pool)
        .await
    }

    /// Whether the user currently holds an active registration
    pub async fn is_registered(pool: &PgPool, event_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM event_registrations
                WHERE event_id = $1 AND user_id = $2 AND status IN ('registered', 'attended')
            )
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Lists participants of an event, in registration order
    pub async fn list_participants(pool: &PgPool, event_id: Uuid) -> Result<Vec<Participant>, sqlx::Error> {
        sqlx::query_as::<_, Participant>(
            r#"
            SELECT r.id AS registration_id, u.id AS user_id, u.first_name, u.last_name, u.email,
                   r.status, r.created_at AS registered_at
            FROM event_registrations r
            JOIN users u ON u.id = r.user_id
            WHERE r.event_id = $1
            ORDER BY r.created_at ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(pool)
        .await
    }

    /// Lists a user's registrations, upcoming events first
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<UserRegistration>, sqlx::Error> {
        sqlx::query_as::<_, UserRegistration>(
            r#"
            SELECT r.id AS registration_id, e.id AS event_id, e.title AS event_title, e.starts_at,
                   e.location, r.status, r.created_at AS registered_at
            FROM event_registrations r
            JOIN events e ON e.id = r.event_id
            WHERE r.user_id = $1
            ORDER BY e.starts_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_unlimited() {
        assert!(check_capacity(0, None).is_ok());
        assert!(check_capacity(10_000, None).is_ok());
    }

    #[test]
    fn test_capacity_last_place_available() {
        assert!(check_capacity(1, Some(2)).is_ok());
    }

    #[test]
    fn test_capacity_full() {
        let err = check_capacity(2, Some(2)).unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::CapacityExceeded { max_participants: 2 }
        ));
        assert_eq!(err.to_string(), "Event is full (2 participants)");
    }

    #[test]
    fn test_capacity_overbooked_rows_still_rejected() {
        // Capacity lowered by an admin below the current count
        assert!(check_capacity(5, Some(3)).is_err());
    }

    #[test]
    fn test_registration_status_active() {
        assert!(RegistrationStatus::Registered.is_active());
        assert!(RegistrationStatus::Attended.is_active());
        assert!(!RegistrationStatus::Cancelled.is_active());
    }

    // Transactional behavior is covered in tests/db_models_tests.rs
}
