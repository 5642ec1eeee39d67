/// Request authentication
///
/// Turns the `Authorization` header of a request into a [`Principal`]. A
/// request without the header is anonymous; a request with a header must carry
/// a valid access token belonging to an approved account, otherwise it is
/// rejected outright rather than downgraded to anonymous.
///
/// The user row is re-read on every request, so the role used for policy
/// decisions is always the current one, and an account rejected or deleted
/// after login loses access immediately.
///
/// # Example
///
/// ```no_run
/// use axum::http::HeaderMap;
/// use memberhub_shared::auth::middleware::{bearer_token, resolve_principal};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, headers: HeaderMap) -> Result<(), Box<dyn std::error::Error>> {
/// let token = bearer_token(&headers)?;
/// let principal = resolve_principal(&pool, "jwt-secret", token).await?;
/// println!("authenticated: {}", principal.is_authenticated());
/// # Ok(())
/// # }
/// ```

use axum::http::{header, HeaderMap};
use sqlx::PgPool;

use super::authorization::Principal;
use super::jwt::{validate_access_token, JwtError};
use crate::models::user::{User, UserStatus};

/// Error type for request authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Authorization header present but not `Bearer <token>`
    #[error("Invalid authorization header: {0}")]
    InvalidFormat(String),

    /// Token validation failed, or the user no longer exists
    #[error("{0}")]
    InvalidToken(String),

    /// Token is valid but the account is pending or rejected
    #[error("Account is {0}")]
    AccountNotApproved(UserStatus),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Extracts the bearer token from the `Authorization` header
///
/// Returns `Ok(None)` when the header is absent.
///
/// # Example
///
/// ```
/// use axum::http::{header, HeaderMap, HeaderValue};
/// use memberhub_shared::auth::middleware::bearer_token;
///
/// let mut headers = HeaderMap::new();
/// assert_eq!(bearer_token(&headers).unwrap(), None);
///
/// headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
/// assert_eq!(bearer_token(&headers).unwrap(), Some("abc.def.ghi"));
/// ```
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Header is not valid ASCII".to_string()))?;

    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    Ok(Some(token))
}

/// Resolves the requester of a call
///
/// # Errors
///
/// - `InvalidToken` if the token is expired, forged, of the wrong type, or
///   names a user that no longer exists
/// - `AccountNotApproved` if the account is pending or rejected
pub async fn resolve_principal(
    pool: &PgPool,
    secret: &str,
    token: Option<&str>,
) -> Result<Principal, AuthError> {
    let Some(token) = token else {
        return Ok(Principal::Anonymous);
    };

    let claims = validate_access_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
        _ => AuthError::InvalidToken(format!("Invalid token: {}", e)),
    })?;

    let user = User::find_by_id(pool, claims.sub)
        .await?
        .ok_or_else(|| AuthError::InvalidToken("User no longer exists".to_string()))?;

    if !user.is_approved() {
        tracing::debug!(user_id = %user.id, status = %user.status, "Token presented for unapproved account");
        return Err(AuthError::AccountNotApproved(user.status));
    }

    Ok(Principal::user(user.id, user.role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_token_absent() {
        assert_eq!(bearer_token(&HeaderMap::new()).unwrap(), None);
    }

    #[test]
    fn test_bearer_token_present() {
        let headers = headers_with("Bearer token-value");
        assert_eq!(bearer_token(&headers).unwrap(), Some("token-value"));
    }

    #[test]
    fn test_bearer_token_wrong_scheme() {
        let headers = headers_with("Basic dXNlcjpwYXNz");
        assert!(matches!(bearer_token(&headers), Err(AuthError::InvalidFormat(_))));
    }

    #[test]
    fn test_bearer_token_empty() {
        let headers = headers_with("Bearer ");
        assert!(matches!(bearer_token(&headers), Err(AuthError::InvalidFormat(_))));
    }

    #[test]
    fn test_auth_error_display() {
        assert_eq!(
            AuthError::AccountNotApproved(UserStatus::Pending).to_string(),
            "Account is pending"
        );
        assert_eq!(
            AuthError::InvalidToken("Token expired".to_string()).to_string(),
            "Token expired"
        );
    }
}
