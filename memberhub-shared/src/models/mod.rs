/// Database models for MemberHub
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: Member accounts, portal roles and approval status
/// - `article`: News articles with category and audience visibility
/// - `event`: Association events
/// - `registration`: Event registrations with capacity enforcement
/// - `contact`: Messages submitted through the public contact form
/// - `activity_log`: Admin-facing audit trail
///
/// # Example
///
/// ```no_run
/// use memberhub_shared::models::user::{User, CreateUser, Role};
/// use memberhub_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let new_user = CreateUser {
///     email: "marie@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     first_name: "Marie".to_string(),
///     last_name: "Dupont".to_string(),
///     phone: None,
///     role: Role::Member,
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod activity_log;
pub mod article;
pub mod contact;
pub mod event;
pub mod registration;
pub mod user;

/// Error returned when a string does not name a known enum value
///
/// Surfaces to clients as invalid input (400).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {kind}: '{value}'")]
pub struct ParseEnumError {
    /// Which vocabulary was being parsed (e.g. "visibility")
    pub kind: &'static str,

    /// The rejected input
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
