/// Authentication endpoints
///
/// - `POST /v1/auth/register` - Create an account (pending approval)
/// - `POST /v1/auth/login` - Exchange credentials for tokens
/// - `POST /v1/auth/refresh` - Exchange a refresh token for a new access token
/// - `GET  /v1/auth/me` - Current user
/// - `PUT  /v1/auth/password` - Change the current user's password
///
/// Self-registered accounts start `pending` and cannot log in until an admin
/// approves them.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::log_activity,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use memberhub_shared::{
    auth::{
        authorization::{require_user, Principal},
        jwt::{self, Claims, TokenType},
        middleware::AuthError,
        password,
    },
    models::{
        activity_log::ActivityAction,
        user::{CreateUser, Role, User, UserStatus},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Checked against the password strength rule
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "First name must be 1 to 100 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "Last name must be 1 to 100 characters"))]
    pub last_name: String,

    #[validate(length(max = 30, message = "Phone must be at most 30 characters"))]
    pub phone: Option<String>,

    /// `member` (default) or `retraite`
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: User,
    pub message: &'static str,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,

    /// Access token lifetime in seconds
    pub expires_in: i64,

    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    /// Checked against the password strength rule
    pub new_password: String,
}

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Register a new account
///
/// ```text
/// POST /v1/auth/register
///
/// {
///   "email": "marie@example.com",
///   "password": "jardin2024",
///   "first_name": "Marie",
///   "last_name": "Dupont",
///   "role": "retraite"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Unknown role
/// - `403 Forbidden`: Role `admin` requested
/// - `409 Conflict`: Email already registered
/// - `422 Unprocessable Entity`: Validation failed
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    req.validate()?;
    password::validate_password_strength(&req.password)?;

    let role = match req.role.as_deref() {
        None => Role::Member,
        Some(raw) => raw.trim().parse::<Role>()?,
    };

    if role == Role::Admin {
        return Err(ApiError::Forbidden(
            "Admin accounts cannot be self-registered".to_string(),
        ));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email.trim().to_lowercase(),
            password_hash,
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            phone: req.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            role,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "Account registered, pending approval");
    log_activity(
        &state,
        Some(user.id),
        ActivityAction::UserRegistered,
        json!({ "email": user.email, "role": user.role }),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user,
            message: "Registration received. Your account must be approved by an administrator.",
        }),
    ))
}

/// Log in
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password
/// - `403 Forbidden`: Account pending approval or rejected
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login failed: wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    match user.status {
        UserStatus::Approved => {}
        UserStatus::Pending => {
            return Err(ApiError::Forbidden(
                "Account is pending approval by an administrator".to_string(),
            ))
        }
        UserStatus::Rejected => {
            return Err(ApiError::Forbidden("Account has been rejected".to_string()))
        }
    }

    User::update_last_login(&state.db, user.id).await?;

    let jwt_config = &state.config.jwt;
    let access_claims =
        Claims::with_expiration(user.id, user.role, TokenType::Access, jwt_config.access_ttl());
    let refresh_claims =
        Claims::with_expiration(user.id, user.role, TokenType::Refresh, jwt_config.refresh_ttl());

    let access_token = jwt::create_token(&access_claims, state.jwt_secret())?;
    let refresh_token = jwt::create_token(&refresh_claims, state.jwt_secret())?;

    tracing::info!(user_id = %user.id, role = %user.role, "User logged in");
    log_activity(&state, Some(user.id), ActivityAction::Login, json!({})).await;

    Ok(Json(LoginResponse {
        access_token,
        refresh_token,
        token_type: "Bearer",
        expires_in: jwt_config.access_ttl().num_seconds(),
        user,
    }))
}

/// Exchange a refresh token for a new access token
///
/// The new token carries the user's current role. Accounts rejected or
/// deleted since login cannot refresh.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token, or user deleted
/// - `403 Forbidden`: Account no longer approved
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    if !user.is_approved() {
        return Err(AuthError::AccountNotApproved(user.status).into());
    }

    let access_ttl = state.config.jwt.access_ttl();
    let access_claims = Claims::with_expiration(user.id, user.role, TokenType::Access, access_ttl);
    let access_token = jwt::create_token(&access_claims, state.jwt_secret())?;

    Ok(Json(RefreshResponse {
        access_token,
        token_type: "Bearer",
        expires_in: access_ttl.num_seconds(),
    }))
}

/// Current user
pub async fn me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<User>> {
    let (user_id, _) = require_user(&principal)?;

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(Json(user))
}

/// Change the current user's password
///
/// Tokens issued before the change stay valid until they expire.
///
/// # Errors
///
/// - `401 Unauthorized`: Not logged in
/// - `403 Forbidden`: Current password is wrong
/// - `422 Unprocessable Entity`: New password too weak
pub async fn change_password(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<StatusCode> {
    let (user_id, _) = require_user(&principal)?;
    req.validate()?;

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    if !password::verify_password(&req.current_password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Password change failed: wrong current password");
        return Err(ApiError::Forbidden("Current password is incorrect".to_string()));
    }

    password::validate_password_strength(&req.new_password)?;
    let password_hash = password::hash_password(&req.new_password)?;

    if !User::update_password(&state.db, user.id, &password_hash).await? {
        return Err(ApiError::not_found("User"));
    }

    tracing::info!(user_id = %user.id, "Password changed");
    log_activity(&state, Some(user.id), ActivityAction::PasswordChanged, json!({})).await;

    Ok(StatusCode::NO_CONTENT)
}
