/// Health check endpoint
///
/// ```text
/// GET /health
/// ```
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "migrations_up_to_date": true,
///   "pool": { "active_connections": 1, "idle_connections": 1, "total_connections": 2 }
/// }
/// ```
///
/// Always answers 200 so load balancers can tell "process up, database down"
/// (`degraded`) from "process down".

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use memberhub_shared::db::{
    migrations::get_migration_status,
    pool::{get_pool_stats, health_check as database_health_check, PoolStats},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrations_up_to_date: Option<bool>,
    pub pool: PoolStats,
}

pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let connected = match database_health_check(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check: database unreachable");
            false
        }
    };

    let migrations_up_to_date = if connected {
        get_migration_status(&state.db).await.ok().map(|s| s.is_up_to_date)
    } else {
        None
    };

    Ok(Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        database: if connected { "connected" } else { "disconnected" },
        migrations_up_to_date,
        pool: get_pool_stats(&state.db),
    }))
}
