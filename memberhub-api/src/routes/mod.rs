/// API route handlers
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, token refresh, current user
/// - `articles`: News articles
/// - `events`: Events and event registration
/// - `contact`: Public contact form
/// - `admin`: Account approval, roles, inbox, activity log, statistics

pub mod admin;
pub mod articles;
pub mod auth;
pub mod contact;
pub mod events;
pub mod health;

use crate::app::AppState;
use memberhub_shared::models::activity_log::{ActivityAction, ActivityLog};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// `limit` / `offset` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    /// Page size clamped to `1..=MAX_PAGE_SIZE`
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Paginated list envelope
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
    pub limit: i64,
    pub offset: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: &Pagination) -> Self {
        Self {
            items,
            total: None,
            limit: pagination.limit(),
            offset: pagination.offset(),
        }
    }

    pub fn with_total(mut self, total: i64) -> Self {
        self.total = Some(total);
        self
    }
}

/// Deserializes a nullable field of a partial update
///
/// Absent → `None` (leave unchanged), `null` → `Some(None)` (clear),
/// value → `Some(Some(v))`. Use with `#[serde(default, deserialize_with = ...)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Appends to the activity log without failing the request
pub async fn log_activity(
    state: &AppState,
    user_id: Option<Uuid>,
    action: ActivityAction,
    details: serde_json::Value,
) {
    if let Err(e) = ActivityLog::record(&state.db, user_id, action, details).await {
        tracing::warn!(error = %e, action = action.as_str(), "Failed to record activity");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults_and_clamping() {
        let default = Pagination::default();
        assert_eq!(default.limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(default.offset(), 0);

        let oversized = Pagination {
            limit: Some(10_000),
            offset: Some(-5),
        };
        assert_eq!(oversized.limit(), MAX_PAGE_SIZE);
        assert_eq!(oversized.offset(), 0);

        let zero = Pagination {
            limit: Some(0),
            offset: None,
        };
        assert_eq!(zero.limit(), 1);
    }

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        location: Option<Option<String>>,
    }

    #[test]
    fn test_double_option() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.location, None);

        let null: Patch = serde_json::from_str(r#"{"location": null}"#).unwrap();
        assert_eq!(null.location, Some(None));

        let value: Patch = serde_json::from_str(r#"{"location": "Salle des fêtes"}"#).unwrap();
        assert_eq!(value.location, Some(Some("Salle des fêtes".to_string())));
    }
}
