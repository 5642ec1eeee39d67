/// First administrator account
///
/// Self-registration can never produce an admin, so the first one comes from
/// `ADMIN_EMAIL` / `ADMIN_PASSWORD`. The account is created approved at
/// startup when no user holds that email; an existing account is left as is.

use crate::config::BootstrapAdmin;
use anyhow::Context;
use memberhub_shared::{
    auth::password,
    models::user::{CreateUser, Role, User, UserStatus},
};
use sqlx::PgPool;

/// Creates the bootstrap admin if missing
///
/// Returns the created user, or `None` if the email was already registered.
pub async fn ensure_admin(pool: &PgPool, admin: &BootstrapAdmin) -> anyhow::Result<Option<User>> {
    let email = admin.email.trim().to_lowercase();

    if let Some(existing) = User::find_by_email(pool, &email).await? {
        if existing.role != Role::Admin || !existing.is_approved() {
            tracing::warn!(
                user_id = %existing.id,
                role = %existing.role,
                status = %existing.status,
                "Bootstrap admin email belongs to a non-admin or unapproved account; leaving it unchanged"
            );
        }
        return Ok(None);
    }

    password::validate_password_strength(&admin.password)
        .context("ADMIN_PASSWORD does not meet the password rules")?;
    let password_hash = password::hash_password(&admin.password)?;

    let user = User::create_with_status(
        pool,
        CreateUser {
            email,
            password_hash,
            first_name: "Admin".to_string(),
            last_name: "MemberHub".to_string(),
            phone: None,
            role: Role::Admin,
        },
        UserStatus::Approved,
    )
    .await
    .context("Failed to create bootstrap admin")?;

    tracing::info!(user_id = %user.id, email = %user.email, "Bootstrap admin created");

    Ok(Some(user))
}
