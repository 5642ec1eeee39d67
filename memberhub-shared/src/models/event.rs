/// Event model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TYPE event_category AS ENUM ('general', 'voyage', 'retraite', 'activite');
/// CREATE TYPE event_status AS ENUM ('draft', 'published', 'cancelled');
///
/// CREATE TABLE events (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL,
///     location VARCHAR(255),
///     category event_category NOT NULL DEFAULT 'general',
///     starts_at TIMESTAMPTZ NOT NULL,
///     ends_at TIMESTAMPTZ,
///     is_member_only BOOLEAN NOT NULL DEFAULT FALSE,
///     max_participants INTEGER CHECK (max_participants IS NULL OR max_participants > 0),
///     status event_status NOT NULL DEFAULT 'published',
///     created_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Every query also returns `participants_count`, the number of active
/// (`registered` or `attended`) registrations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::str::FromStr;
use uuid::Uuid;

use super::ParseEnumError;
use crate::auth::authorization::{EventAccess, EventFilter};

/// Event topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    General,
    Voyage,
    Retraite,
    Activite,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::General => "general",
            EventCategory::Voyage => "voyage",
            EventCategory::Retraite => "retraite",
            EventCategory::Activite => "activite",
        }
    }
}

impl FromStr for EventCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(EventCategory::General),
            "voyage" => Ok(EventCategory::Voyage),
            "retraite" => Ok(EventCategory::Retraite),
            "activite" => Ok(EventCategory::Activite),
            _ => Err(ParseEnumError::new("event category", s)),
        }
    }
}

/// Event lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    Published,
    Cancelled,
}

impl EventStatus {
    pub const ALL: [EventStatus; 3] = [
        EventStatus::Draft,
        EventStatus::Published,
        EventStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Published => "published",
            EventStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for EventStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(EventStatus::Draft),
            "published" => Ok(EventStatus::Published),
            "cancelled" => Ok(EventStatus::Cancelled),
            other => Err(ParseEnumError::new("event status", other)),
        }
    }
}

/// Event row with its current participant count
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub category: EventCategory,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_member_only: bool,
    /// None means unlimited
    pub max_participants: Option<i32>,
    pub status: EventStatus,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Active registrations (computed)
    pub participants_count: i64,
}

#[derive(Debug, Clone)]
pub struct CreateEvent {
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub category: EventCategory,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_member_only: bool,
    pub max_participants: Option<i32>,
    pub status: EventStatus,
    pub created_by: Uuid,
}

/// Only `Some` fields are written
#[derive(Debug, Clone, Default)]
pub struct UpdateEvent {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<Option<String>>,
    pub category: Option<EventCategory>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<Option<DateTime<Utc>>>,
    pub is_member_only: Option<bool>,
    pub max_participants: Option<Option<i32>>,
    pub status: Option<EventStatus>,
}

#[derive(Debug, Clone)]
pub struct EventQuery {
    pub category: Option<EventCategory>,
    /// Only events starting now or later
    pub upcoming: bool,
    pub limit: i64,
    pub offset: i64,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            category: None,
            upcoming: false,
            limit: 20,
            offset: 0,
        }
    }
}

const EVENT_COLUMNS: &str = "e.id, e.title, e.description, e.location, e.category, e.starts_at, e.ends_at, \
     e.is_member_only, e.max_participants, e.status, e.created_by, e.created_at, e.updated_at, \
     (SELECT COUNT(*) FROM event_registrations r \
       WHERE r.event_id = e.id AND r.status IN ('registered', 'attended')) AS participants_count";

impl Event {
    pub fn access(&self) -> EventAccess {
        EventAccess {
            is_member_only: self.is_member_only,
            status: self.status,
        }
    }

    /// Remaining places, `None` when unlimited
    pub fn remaining_places(&self) -> Option<i64> {
        self.max_participants
            .map(|max| (i64::from(max) - self.participants_count).max(0))
    }

    pub async fn create(pool: &PgPool, data: CreateEvent) -> Result<Self, sqlx::Error> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO events (title, description, location, category, starts_at, ends_at,
                                is_member_only, max_participants, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(data.title)
        .bind(data.description)
        .bind(data.location)
        .bind(data.category)
        .bind(data.starts_at)
        .bind(data.ends_at)
        .bind(data.is_member_only)
        .bind(data.max_participants)
        .bind(data.status)
        .bind(data.created_by)
        .fetch_one(pool)
        .await?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {EVENT_COLUMNS} FROM events e WHERE e.id = $1");

        sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists events visible under `filter`, soonest first
    pub async fn list(pool: &PgPool, filter: &EventFilter, query: &EventQuery) -> Result<Vec<Self>, sqlx::Error> {
        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {EVENT_COLUMNS} FROM events e WHERE "));

        match filter {
            EventFilter::Unrestricted => {
                builder.push("TRUE");
            }
            EventFilter::Published { include_member_only } => {
                builder.push("e.status = 'published'");
                if !include_member_only {
                    builder.push(" AND e.is_member_only = FALSE");
                }
            }
        }

        if let Some(category) = query.category {
            builder.push(" AND e.category = ").push_bind(category);
        }
        if query.upcoming {
            builder.push(" AND e.starts_at >= NOW()");
        }

        builder
            .push(" ORDER BY e.starts_at ASC LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset);

        builder.build_query_as::<Event>().fetch_all(pool).await
    }

    pub async fn update(pool: &PgPool, id: Uuid, data: UpdateEvent) -> Result<Option<Self>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE events SET updated_at = NOW()");

        if let Some(title) = data.title {
            builder.push(", title = ").push_bind(title);
        }
        if let Some(description) = data.description {
            builder.push(", description = ").push_bind(description);
        }
        if let Some(location) = data.location {
            builder.push(", location = ").push_bind(location);
        }
        if let Some(category) = data.category {
            builder.push(", category = ").push_bind(category);
        }
        if let Some(starts_at) = data.starts_at {
            builder.push(", starts_at = ").push_bind(starts_at);
        }
        if let Some(ends_at) = data.ends_at {
            builder.push(", ends_at = ").push_bind(ends_at);
        }
        if let Some(is_member_only) = data.is_member_only {
            builder.push(", is_member_only = ").push_bind(is_member_only);
        }
        if let Some(max_participants) = data.max_participants {
            builder.push(", max_participants = ").push_bind(max_participants);
        }
        if let Some(status) = data.status {
            builder.push(", status = ").push_bind(status);
        }

        builder.push(" WHERE id = ").push_bind(id).push(" RETURNING id");

        let updated: Option<Uuid> = builder.build_query_scalar().fetch_optional(pool).await?;

        match updated {
            Some(id) => Self::find_by_id(pool, id).await,
            None => Ok(None),
        }
    }

    /// Deletes an event and, by cascade, its registrations
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_upcoming(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE status = 'published' AND starts_at >= NOW()")
            .fetch_one(pool)
            .await
    }
}
