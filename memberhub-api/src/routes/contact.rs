/// Public contact form
///
/// ```text
/// POST /v1/contact
/// ```
///
/// Open to anonymous visitors. Messages land in the admin inbox
/// (`GET /v1/admin/contact`).

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, http::StatusCode, Json};
use memberhub_shared::models::contact::{ContactMessage, CreateContactMessage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1 to 200 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 255, message = "Subject must be 1 to 255 characters"))]
    pub subject: String,

    #[validate(length(min = 1, max = 5000, message = "Message must be 1 to 5000 characters"))]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub id: Uuid,
    pub message: &'static str,
}

pub async fn submit_contact_message(
    State(state): State<AppState>,
    Json(req): Json<ContactRequest>,
) -> ApiResult<(StatusCode, Json<ContactResponse>)> {
    req.validate()?;

    let stored = ContactMessage::create(
        &state.db,
        CreateContactMessage {
            name: req.name.trim().to_string(),
            email: req.email.trim().to_lowercase(),
            subject: req.subject.trim().to_string(),
            message: req.message,
        },
    )
    .await?;

    tracing::info!(message_id = %stored.id, "Contact message received");

    Ok((
        StatusCode::CREATED,
        Json(ContactResponse {
            id: stored.id,
            message: "Thank you, your message has been sent.",
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_request_validation() {
        let req = ContactRequest {
            name: "Jean".to_string(),
            email: "jean@example.com".to_string(),
            subject: "Cotisation".to_string(),
            message: "Bonjour, comment renouveler ma cotisation ?".to_string(),
        };
        assert!(req.validate().is_ok());

        let empty = ContactRequest {
            message: String::new(),
            email: "jean".to_string(),
            ..req
        };
        let errors = empty.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("message"));
        assert!(errors.field_errors().contains_key("email"));
    }
}
