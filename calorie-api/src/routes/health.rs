//! Health Check Endpoints
//!
//! - /health/ping - Simple liveness check
//! - /health/live - Process alive check
//! - /health/ready - Store connectivity check
//!
//! A failed readiness check reports `degraded` rather than `unhealthy`: the
//! food routes keep answering from the fallback catalog.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use calorie_storage::StoreHandle;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDetails {
    pub database: ComponentHealth,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    /// Store connection state after the check.
    pub connection: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/ping
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// GET /health/live
pub async fn liveness() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Process is alive".to_string()),
        details: None,
    };
    (StatusCode::OK, Json(response))
}

/// GET /health/ready - Connects to the store if needed and pings it.
pub async fn readiness(
    State(store): State<Arc<StoreHandle>>,
    State(start_time): State<Instant>,
) -> impl IntoResponse {
    let start = Instant::now();
    let result = store.run(|s| async move { s.ping().await }).await;

    let database = match &result {
        Ok(()) => ComponentHealth {
            status: HealthStatus::Healthy,
            connection: store.state().as_str().to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
        },
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            ComponentHealth {
                status: HealthStatus::Degraded,
                connection: store.state().as_str().to_string(),
                latency_ms: None,
            }
        }
    };

    let (status_code, status, message) = match database.status {
        HealthStatus::Healthy => (StatusCode::OK, HealthStatus::Healthy, None),
        HealthStatus::Degraded => (
            StatusCode::SERVICE_UNAVAILABLE,
            HealthStatus::Degraded,
            Some("Database unreachable; serving fallback data".to_string()),
        ),
    };

    let response = HealthResponse {
        status,
        message,
        details: Some(HealthDetails {
            database,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: start_time.elapsed().as_secs(),
        }),
    };
    (status_code, Json(response))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}
