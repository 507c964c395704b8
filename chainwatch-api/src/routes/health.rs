/// Health check endpoint
///
/// Verifies that the server is running and reports the state of its
/// backing services. Stays cheap: one trivial query per service, no
/// auth, never rate limited.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "redis": "connected"
/// }
/// ```
///
/// `status` is `healthy` only when the database responds; Redis being
/// down degrades the report but the API keeps serving (the limiter
/// fails open and caches are skipped).

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status: healthy, degraded
    pub status: String,

    /// Application version
    pub version: String,

    /// Database status: connected, disconnected
    pub database: String,

    /// Redis status: connected, disconnected, not_configured
    pub redis: String,
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let database = match sqlx::query("SELECT 1").fetch_one(&state.db).await {
        Ok(_) => "connected",
        Err(e) => {
            tracing::error!(error = %e, "Health check database probe failed");
            "disconnected"
        }
    };

    let redis = match &state.redis {
        None => "not_configured",
        Some(client) => match client.ping().await {
            Ok(true) => "connected",
            Ok(false) | Err(_) => "disconnected",
        },
    };

    let status = if database == "connected" {
        "healthy"
    } else {
        "degraded"
    };

    Ok(Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
        redis: redis.to_string(),
    }))
}
