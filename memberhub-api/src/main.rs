//! # MemberHub API Server
//!
//! Association portal backend: members, retirees and admins; news articles
//! and events with role-gated visibility; event registration.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/memberhub \
//! JWT_SECRET=change-me-to-at-least-32-characters-long \
//! cargo run -p memberhub-api
//! ```
//!
//! Set `LOG_FORMAT=json` for JSON log lines.

use anyhow::Context;
use memberhub_api::{
    app::{build_router, AppState},
    bootstrap,
    config::Config,
};
use memberhub_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, create_pool, DatabaseConfig},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!(
        "MemberHub API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env().context("Invalid configuration")?;

    let pool = create_pool(
        DatabaseConfig::new(config.database.url.clone())
            .with_max_connections(config.database.max_connections),
    )
    .await
    .context("Failed to connect to database")?;

    run_migrations(&pool).await.context("Failed to run migrations")?;

    if let Some(admin) = &config.bootstrap_admin {
        bootstrap::ensure_admin(&pool, admin).await?;
    }

    let address = config.bind_address();
    let app = build_router(AppState::new(pool.clone(), config));

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;

    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "memberhub_api=debug,memberhub_shared=info,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
