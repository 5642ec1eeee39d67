/// Event endpoints
///
/// - `GET    /v1/events` - List events visible to the requester
/// - `GET    /v1/events/:id` - Get one event
/// - `POST   /v1/events` - Create (admin)
/// - `PUT    /v1/events/:id` - Update (admin)
/// - `DELETE /v1/events/:id` - Delete (admin)
/// - `POST   /v1/events/:id/registration` - Register the requester
/// - `DELETE /v1/events/:id/registration` - Cancel the requester's registration
/// - `GET    /v1/me/registrations` - The requester's registrations
///
/// Member-only events are invisible (404) to anonymous visitors; drafts and
/// cancelled events are invisible to everyone but admins.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    routes::{double_option, log_activity, Page, Pagination},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use memberhub_shared::{
    auth::authorization::{
        authorize, can_view_event, event_list_filter, require_user, Action, Principal, Resource,
    },
    models::{
        activity_log::ActivityAction,
        event::{CreateEvent, Event, EventCategory, EventQuery, EventStatus, UpdateEvent},
        registration::{EventRegistration, UserRegistration},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Deserialize)]
pub struct ListEventsParams {
    pub category: Option<String>,

    /// Only events starting now or later
    #[serde(default)]
    pub upcoming: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: String,

    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,

    #[validate(length(max = 255, message = "Location must be at most 255 characters"))]
    pub location: Option<String>,

    /// Default: general
    pub category: Option<String>,

    pub starts_at: DateTime<Utc>,

    pub ends_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub is_member_only: bool,

    /// None = unlimited
    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub max_participants: Option<i32>,

    /// Default: published
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateEventRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, message = "Description is required"))]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,

    pub category: Option<String>,

    pub starts_at: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "double_option")]
    pub ends_at: Option<Option<DateTime<Utc>>>,

    pub is_member_only: Option<bool>,

    #[serde(default, deserialize_with = "double_option")]
    pub max_participants: Option<Option<i32>>,

    pub status: Option<String>,
}

/// Event as returned to clients
#[derive(Debug, Serialize)]
pub struct EventResponse {
    #[serde(flatten)]
    pub event: Event,

    /// None when capacity is unlimited
    pub remaining_places: Option<i64>,

    /// Whether the requester holds an active registration (authenticated only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_registered: Option<bool>,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            remaining_places: event.remaining_places(),
            event,
            is_registered: None,
        }
    }
}

fn check_schedule(starts_at: DateTime<Utc>, ends_at: Option<DateTime<Utc>>) -> ApiResult<()> {
    match ends_at {
        Some(ends_at) if ends_at < starts_at => Err(ApiError::BadRequest(
            "Event cannot end before it starts".to_string(),
        )),
        _ => Ok(()),
    }
}

fn check_location(location: Option<&str>) -> ApiResult<()> {
    match location {
        Some(location) if location.chars().count() > 255 => {
            Err(ApiError::ValidationError(vec![ValidationErrorDetail {
                field: "location".to_string(),
                message: "Location must be at most 255 characters".to_string(),
            }]))
        }
        _ => Ok(()),
    }
}

fn check_capacity_value(max_participants: Option<i32>) -> ApiResult<()> {
    match max_participants {
        Some(max) if max < 1 => Err(ApiError::BadRequest(
            "Capacity must be at least 1".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Loads an event the requester may see; hidden events are 404
async fn find_visible(state: &AppState, principal: &Principal, id: Uuid) -> ApiResult<Event> {
    match Event::find_by_id(&state.db, id).await? {
        Some(event) if can_view_event(principal, &event.access()) => Ok(event),
        _ => Err(ApiError::not_found("Event")),
    }
}

pub async fn list_events(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<ListEventsParams>,
    Query(pagination): Query<Pagination>,
) -> ApiResult<Json<Page<EventResponse>>> {
    let query = EventQuery {
        category: params.category.as_deref().map(str::parse::<EventCategory>).transpose()?,
        upcoming: params.upcoming,
        limit: pagination.limit(),
        offset: pagination.offset(),
    };

    let events = Event::list(&state.db, &event_list_filter(&principal), &query).await?;

    let items = events.into_iter().map(EventResponse::from).collect();
    Ok(Json(Page::new(items, &pagination)))
}

pub async fn get_event(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EventResponse>> {
    let event = find_visible(&state, &principal, id).await?;

    let is_registered = match principal.user_id() {
        Some(user_id) => Some(EventRegistration::is_registered(&state.db, id, user_id).await?),
        None => None,
    };

    Ok(Json(EventResponse {
        is_registered,
        ..EventResponse::from(event)
    }))
}

/// Create an event (admin)
pub async fn create_event(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateEventRequest>,
) -> ApiResult<(StatusCode, Json<EventResponse>)> {
    authorize(&principal, Action::Create, Resource::Events)?;
    let (admin_id, _) = require_user(&principal)?;
    req.validate()?;
    check_schedule(req.starts_at, req.ends_at)?;

    let data = CreateEvent {
        title: req.title,
        description: req.description,
        location: req.location,
        category: req.category.as_deref().map(str::parse).transpose()?.unwrap_or(EventCategory::General),
        starts_at: req.starts_at,
        ends_at: req.ends_at,
        is_member_only: req.is_member_only,
        max_participants: req.max_participants,
        status: req.status.as_deref().map(str::parse).transpose()?.unwrap_or(EventStatus::Published),
        created_by: admin_id,
    };

    let event = Event::create(&state.db, data).await?;

    tracing::info!(event_id = %event.id, max_participants = ?event.max_participants, "Event created");
    log_activity(
        &state,
        Some(admin_id),
        ActivityAction::EventCreated,
        json!({ "event_id": event.id, "title": event.title }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(event.into())))
}

/// Update an event (admin)
///
/// Lowering `max_participants` below the current number of participants is
/// allowed; existing registrations are kept and new ones are refused.
pub async fn update_event(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEventRequest>,
) -> ApiResult<Json<EventResponse>> {
    let existing = find_visible(&state, &principal, id).await?;
    authorize(&principal, Action::Update, Resource::Event(&existing.access()))?;
    req.validate()?;

    if let Some(max_participants) = req.max_participants {
        check_capacity_value(max_participants)?;
    }
    if let Some(location) = &req.location {
        check_location(location.as_deref())?;
    }

    let starts_at = req.starts_at.unwrap_or(existing.starts_at);
    let ends_at = req.ends_at.unwrap_or(existing.ends_at);
    check_schedule(starts_at, ends_at)?;

    let data = UpdateEvent {
        title: req.title,
        description: req.description,
        location: req.location,
        category: req.category.as_deref().map(str::parse).transpose()?,
        starts_at: req.starts_at,
        ends_at: req.ends_at,
        is_member_only: req.is_member_only,
        max_participants: req.max_participants,
        status: req.status.as_deref().map(str::parse).transpose()?,
    };

    let event = Event::update(&state.db, id, data)
        .await?
        .ok_or_else(|| ApiError::not_found("Event"))?;

    log_activity(
        &state,
        principal.user_id(),
        ActivityAction::EventUpdated,
        json!({ "event_id": event.id }),
    )
    .await;

    Ok(Json(event.into()))
}

/// Delete an event and its registrations (admin)
pub async fn delete_event(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let existing = find_visible(&state, &principal, id).await?;
    authorize(&principal, Action::Delete, Resource::Event(&existing.access()))?;

    if !Event::delete(&state.db, id).await? {
        return Err(ApiError::not_found("Event"));
    }

    tracing::info!(event_id = %id, "Event deleted");
    log_activity(
        &state,
        principal.user_id(),
        ActivityAction::EventDeleted,
        json!({ "event_id": id, "title": existing.title }),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Register the requester for an event
///
/// # Errors
///
/// - `401 Unauthorized`: Anonymous requester
/// - `403 Forbidden`: Event not open for registration
/// - `404 Not Found`: Absent or hidden event
/// - `409 Conflict`: Event full, or already registered
pub async fn register_for_event(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<EventRegistration>)> {
    let (user_id, _) = require_user(&principal)?;
    let event = find_visible(&state, &principal, id).await?;
    authorize(&principal, Action::Register, Resource::Event(&event.access()))?;

    let registration = EventRegistration::register(&state.db, id, user_id).await?;

    tracing::info!(event_id = %id, %user_id, "Registered for event");
    log_activity(
        &state,
        Some(user_id),
        ActivityAction::EventRegistered,
        json!({ "event_id": id, "registration_id": registration.id }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(registration)))
}

/// Cancel the requester's registration
pub async fn cancel_registration(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let (user_id, _) = require_user(&principal)?;
    find_visible(&state, &principal, id).await?;

    let registration = EventRegistration::cancel(&state.db, id, user_id).await?;

    tracing::info!(event_id = %id, %user_id, "Event registration cancelled");
    log_activity(
        &state,
        Some(user_id),
        ActivityAction::EventRegistrationCancelled,
        json!({ "event_id": id, "registration_id": registration.id }),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn my_registrations(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<Vec<UserRegistration>>> {
    let (user_id, _) = require_user(&principal)?;
    let registrations = EventRegistration::list_for_user(&state.db, user_id).await?;
    Ok(Json(registrations))
}
