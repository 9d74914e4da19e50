//! Health check endpoints

use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;

use super::ApiState;

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
    pub transcription: CheckResult,
    pub feedback: CheckResult,
    pub synthesis: CheckResult,
}

/// Result of a single check
#[derive(Serialize)]
pub struct CheckResult {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckResult {
    const fn ok() -> Self {
        Self {
            status: "ok",
            message: None,
        }
    }

    fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: "unavailable",
            message: Some(message.into()),
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Liveness probe - is the service running?
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness probe - are the upstream credentials in place?
async fn ready(State(state): State<Arc<ApiState>>) -> (StatusCode, Json<ReadinessResponse>) {
    let openai = |configured: bool| {
        if configured {
            CheckResult::ok()
        } else {
            CheckResult::unavailable("OPENAI_API_KEY not configured")
        }
    };

    let checks = ReadinessChecks {
        transcription: openai(state.credentials.openai),
        feedback: openai(state.credentials.openai),
        synthesis: if state.credentials.elevenlabs {
            CheckResult::ok()
        } else {
            CheckResult::unavailable("ElevenLabs API key or voice ID not configured")
        },
    };

    let all_ok = checks.transcription.is_ok() && checks.feedback.is_ok() && checks.synthesis.is_ok();
    let (http_status, status) = if all_ok {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (http_status, Json(ReadinessResponse { status, checks }))
}

/// Build health router (liveness only, no state needed)
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

/// Build readiness router
pub fn ready_router(state: Arc<ApiState>) -> Router {
    Router::new().route("/ready", get(ready)).with_state(state)
}
