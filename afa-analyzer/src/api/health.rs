//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status ("ok")
    pub status: String,
    /// Module name ("afa-analyzer")
    pub module: String,
    /// Crate version plus short git hash
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Names of the installed capability backends
    pub capabilities: CapabilityNames,
}

#[derive(Debug, Serialize)]
pub struct CapabilityNames {
    pub speech_to_text: String,
    pub speaker_verifier: String,
    pub synthetic_classifier: String,
    pub speaker_traits: String,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "afa-analyzer".to_string(),
        version: crate::analyzer_version(),
        uptime_seconds,
        capabilities: CapabilityNames {
            speech_to_text: state.capabilities.speech_to_text.name().to_string(),
            speaker_verifier: state.capabilities.speaker_verifier.name().to_string(),
            synthetic_classifier: state.capabilities.synthetic_classifier.name().to_string(),
            speaker_traits: state.capabilities.speaker_traits.name().to_string(),
        },
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
