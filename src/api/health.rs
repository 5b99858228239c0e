//! Health check endpoints

use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;

use super::ApiState;
use crate::device::ConnectionState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Detailed readiness response
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: ReadinessChecks,
}

/// Individual readiness checks
#[derive(Serialize)]
pub struct ReadinessChecks {
    pub model: CheckResult,
    pub device: CheckResult,
}

/// Result of a single health check
#[derive(Serialize)]
pub struct CheckResult {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok",
            message: Some(message.into()),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            status: "fail",
            message: Some(message.into()),
        }
    }

    fn unavailable(message: &str) -> Self {
        Self {
            status: "unavailable",
            message: Some(message.to_string()),
        }
    }
}

/// Liveness probe - is the service running?
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness probe - can the gateway serve commands?
///
/// A device that was never probed or has no address does not fail
/// readiness; one whose last probe failed does.
async fn ready(State(state): State<Arc<ApiState>>) -> (StatusCode, Json<ReadinessResponse>) {
    let model_check = CheckResult::ok(state.assistant.model_name());
    let device_check = check_device(&state.session.snapshot().await);

    let all_ok = device_check.status != "fail";

    let status = if all_ok { "ok" } else { "degraded" };
    let http_status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(ReadinessResponse {
            status,
            checks: ReadinessChecks {
                model: model_check,
                device: device_check,
            },
        }),
    )
}

/// Check device reachability from the last probe (no network call)
fn check_device(connection: &ConnectionState) -> CheckResult {
    match (&connection.address, connection.reachable, connection.last_probe_at) {
        (None, _, _) => CheckResult::unavailable("not configured"),
        (Some(address), true, _) => CheckResult::ok(address.clone()),
        (Some(_), false, None) => CheckResult::unavailable("not probed yet"),
        (Some(address), false, Some(at)) => {
            CheckResult::fail(format!("{address} unreachable (last probe {})", at.to_rfc3339()))
        }
    }
}

/// Build health router (liveness only, no state needed)
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

/// Build readiness router
pub fn ready_router(state: Arc<ApiState>) -> Router {
    Router::new().route("/ready", get(ready)).with_state(state)
}
