/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use memberhub_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = build_router(AppState::new(pool, config));
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post, put},
    Router,
};
use memberhub_shared::auth::middleware::{bearer_token, resolve_principal};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /health                                   public
/// /v1/auth/register, /login, /refresh       public, no principal resolution
/// /v1/...                                   principal resolved on every request
///     auth/me, auth/password
///     articles, articles/:id
///     events, events/:id, events/:id/registration
///     me/registrations
///     contact
///     admin/...                             admin only (checked by policy)
/// ```
///
/// Every route below `/v1` except the three public auth routes runs behind
/// `principal_layer`, which attaches a
/// [`Principal`](memberhub_shared::auth::authorization::Principal) to the
/// request. Handlers decide access with the policy evaluator; the router
/// itself does no role checks.
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_auth_routes = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh));

    let admin_routes = Router::new()
        .route("/users", get(routes::admin::list_users))
        .route("/users/:id", axum::routing::delete(routes::admin::delete_user))
        .route("/users/:id/approve", post(routes::admin::approve_user))
        .route("/users/:id/reject", post(routes::admin::reject_user))
        .route("/users/:id/role", put(routes::admin::change_role))
        .route("/events/:id/registrations", get(routes::admin::list_event_registrations))
        .route("/contact", get(routes::admin::list_contact_messages))
        .route("/contact/:id/read", post(routes::admin::mark_contact_message_read))
        .route("/logs", get(routes::admin::list_activity_logs))
        .route("/stats", get(routes::admin::stats));

    let resolved_routes = Router::new()
        .route("/auth/me", get(routes::auth::me))
        .route("/auth/password", put(routes::auth::change_password))
        .route(
            "/articles",
            get(routes::articles::list_articles).post(routes::articles::create_article),
        )
        .route(
            "/articles/:id",
            get(routes::articles::get_article)
                .put(routes::articles::update_article)
                .delete(routes::articles::delete_article),
        )
        .route(
            "/events",
            get(routes::events::list_events).post(routes::events::create_event),
        )
        .route(
            "/events/:id",
            get(routes::events::get_event)
                .put(routes::events::update_event)
                .delete(routes::events::delete_event),
        )
        .route(
            "/events/:id/registration",
            post(routes::events::register_for_event).delete(routes::events::cancel_registration),
        )
        .route("/me/registrations", get(routes::events::my_registrations))
        .route("/contact", post(routes::contact::submit_contact_message))
        .nest("/admin", admin_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            principal_layer,
        ));

    let v1_routes = public_auth_routes.merge(resolved_routes);

    let cors = if state.config.api.cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Resolves the requester and stores it in request extensions
///
/// No `Authorization` header means anonymous. A header that does not carry a
/// valid token of an approved account fails the request (401 / 403).
async fn principal_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())?.map(str::to_owned);
    let principal = resolve_principal(&state.db, state.jwt_secret(), token.as_deref()).await?;

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}
