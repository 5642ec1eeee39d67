/// Administration endpoints (role `admin` only)
///
/// - `GET    /v1/admin/users?status=pending` - List accounts
/// - `POST   /v1/admin/users/:id/approve` - Approve an account
/// - `POST   /v1/admin/users/:id/reject` - Reject an account
/// - `PUT    /v1/admin/users/:id/role` - Change an account's role
/// - `DELETE /v1/admin/users/:id` - Delete an account
/// - `GET    /v1/admin/events/:id/registrations` - Participants of an event
/// - `GET    /v1/admin/contact?unread=true` - Contact inbox
/// - `POST   /v1/admin/contact/:id/read` - Mark a message read
/// - `GET    /v1/admin/logs` - Activity log
/// - `GET    /v1/admin/stats` - Dashboard counters

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{log_activity, Page, Pagination},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use memberhub_shared::{
    auth::authorization::{authorize, Action, Principal, Resource},
    models::{
        activity_log::{ActivityAction, ActivityLog},
        article::{Article, ArticleStatus},
        contact::ContactMessage,
        event::Event,
        registration::{EventRegistration, Participant},
        user::{Role, User, UserStatus},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersParams {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListContactParams {
    #[serde(default)]
    pub unread: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub pending_users: i64,
    pub approved_users: i64,
    pub published_articles: i64,
    pub upcoming_events: i64,
    pub unread_messages: i64,
}

/// Rejects the request unless the requester is an admin; returns the admin's id
fn require_admin(principal: &Principal, action: Action) -> ApiResult<Uuid> {
    authorize(principal, action, Resource::AdminPanel)?;
    principal
        .user_id()
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
}

/// Admins may not demote, reject or delete their own account
fn ensure_not_self(admin_id: Uuid, target_id: Uuid, what: &str) -> ApiResult<()> {
    if admin_id == target_id {
        return Err(ApiError::BadRequest(format!("You cannot {what} your own account")));
    }
    Ok(())
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<ListUsersParams>,
    Query(pagination): Query<Pagination>,
) -> ApiResult<Json<Page<User>>> {
    require_admin(&principal, Action::View)?;

    let status = params.status.as_deref().map(str::parse::<UserStatus>).transpose()?;
    let users = User::list(&state.db, status, pagination.limit(), pagination.offset()).await?;

    Ok(Json(Page::new(users, &pagination)))
}

async fn set_status(
    state: &AppState,
    principal: &Principal,
    id: Uuid,
    status: UserStatus,
) -> ApiResult<User> {
    let admin_id = require_admin(principal, Action::Update)?;
    ensure_not_self(admin_id, id, "change the status of")?;

    let user = User::update_status(&state.db, id, status)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    let action = match status {
        UserStatus::Approved => ActivityAction::UserApproved,
        _ => ActivityAction::UserRejected,
    };

    tracing::info!(user_id = %user.id, %admin_id, status = %status, "Account status changed");
    log_activity(
        state,
        Some(admin_id),
        action,
        json!({ "user_id": user.id, "email": user.email }),
    )
    .await;

    Ok(user)
}

pub async fn approve_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    set_status(&state, &principal, id, UserStatus::Approved).await.map(Json)
}

/// Reject an account
///
/// A rejected account can no longer log in, and tokens it already holds stop
/// working on its next request.
pub async fn reject_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    set_status(&state, &principal, id, UserStatus::Rejected).await.map(Json)
}

/// Change an account's role
///
/// # Errors
///
/// - `400 Bad Request`: Unknown role, or the admin's own account
/// - `404 Not Found`: No such account
pub async fn change_role(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChangeRoleRequest>,
) -> ApiResult<Json<User>> {
    let admin_id = require_admin(&principal, Action::Update)?;
    let role: Role = req.role.trim().parse()?;
    ensure_not_self(admin_id, id, "change the role of")?;

    let user = User::update_role(&state.db, id, role)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    tracing::info!(user_id = %user.id, %admin_id, role = %role, "Role changed");
    log_activity(
        &state,
        Some(admin_id),
        ActivityAction::UserRoleChanged,
        json!({ "user_id": user.id, "role": role }),
    )
    .await;

    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let admin_id = require_admin(&principal, Action::Delete)?;
    ensure_not_self(admin_id, id, "delete")?;

    if !User::delete(&state.db, id).await? {
        return Err(ApiError::not_found("User"));
    }

    tracing::info!(user_id = %id, %admin_id, "Account deleted");
    log_activity(
        &state,
        Some(admin_id),
        ActivityAction::UserDeleted,
        json!({ "user_id": id }),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_event_registrations(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Participant>>> {
    require_admin(&principal, Action::View)?;

    if Event::find_by_id(&state.db, id).await?.is_none() {
        return Err(ApiError::not_found("Event"));
    }

    let participants = EventRegistration::list_participants(&state.db, id).await?;
    Ok(Json(participants))
}

pub async fn list_contact_messages(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<ListContactParams>,
    Query(pagination): Query<Pagination>,
) -> ApiResult<Json<Page<ContactMessage>>> {
    require_admin(&principal, Action::View)?;

    let messages = ContactMessage::list(
        &state.db,
        params.unread,
        pagination.limit(),
        pagination.offset(),
    )
    .await?;

    Ok(Json(Page::new(messages, &pagination)))
}

pub async fn mark_contact_message_read(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_admin(&principal, Action::Update)?;

    if !ContactMessage::mark_read(&state.db, id).await? {
        return Err(ApiError::not_found("Message"));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_activity_logs(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(pagination): Query<Pagination>,
) -> ApiResult<Json<Page<ActivityLog>>> {
    require_admin(&principal, Action::View)?;

    let entries = ActivityLog::list(&state.db, pagination.limit(), pagination.offset()).await?;
    Ok(Json(Page::new(entries, &pagination)))
}

pub async fn stats(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<StatsResponse>> {
    require_admin(&principal, Action::View)?;

    let pool = &state.db;
    let (pending_users, approved_users, published_articles, upcoming_events, unread_messages) = tokio::try_join!(
        User::count_by_status(pool, UserStatus::Pending),
        User::count_by_status(pool, UserStatus::Approved),
        Article::count_by_status(pool, ArticleStatus::Published),
        Event::count_upcoming(pool),
        ContactMessage::count_unread(pool),
    )?;

    Ok(Json(StatsResponse {
        pending_users,
        approved_users,
        published_articles,
        upcoming_events,
        unread_messages,
    }))
}
