//! Common routes: root info, health, readiness, version.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

pub const SERVICE_NAME: &str = "NUPS API";

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    service: &'static str,
    timestamp: String,
    message: &'static str,
}

#[derive(Serialize)]
struct ReadyBody {
    status: &'static str,
    database: &'static str,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody {
        status: "healthy",
        service: SERVICE_NAME,
        timestamp: chrono::Utc::now().to_rfc3339(),
        message: "Service is running",
    })
}

async fn ready(State(state): State<AppState>) -> Result<Json<ReadyBody>, (StatusCode, Json<ReadyBody>)> {
    if let Err(e) = sqlx::query("SELECT 1").fetch_optional(&state.pool).await {
        tracing::warn!(error = %e, "readiness check failed");
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyBody {
                status: "degraded",
                database: "unavailable",
            }),
        ));
    }
    Ok(Json(ReadyBody {
        status: "ok",
        database: "ok",
    }))
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": SERVICE_NAME,
        "endpoints": {
            "api": "/api/",
            "health": "/health",
            "backup": "/api/backup",
            "students": "/api/students",
            "programs": "/api/programs",
            "halls": "/api/halls",
            "wings": "/api/wings"
        }
    }))
}

/// GET /, /health, /ready, /version.
pub fn common_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version))
        .with_state(state)
}
