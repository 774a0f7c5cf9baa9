//! afa-analyzer library interface
//!
//! Exposes the analysis pipeline and router for integration testing

pub mod api;
pub mod capabilities;
pub mod error;
pub mod extractors; // Tier 1: independent per-asset metrics
pub mod fusion; // Tier 2: verdict and report
pub mod models;
pub mod types;
pub mod utils;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use afa_common::config::AnalysisConfig;
use axum::{extract::DefaultBodyLimit, Router};
use chrono::{DateTime, Utc};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::capabilities::Capabilities;
use crate::workflow::Orchestrator;

/// Version string stamped into every report: crate version plus short git hash
pub fn analyzer_version() -> String {
    format!("{}+{}", env!("CARGO_PKG_VERSION"), env!("GIT_HASH"))
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AnalysisConfig>,
    pub capabilities: Arc<Capabilities>,
    pub orchestrator: Arc<Orchestrator>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: AnalysisConfig, capabilities: Arc<Capabilities>) -> Self {
        let orchestrator = Orchestrator::new(&config, &capabilities, &analyzer_version());
        Self {
            config: Arc::new(config),
            capabilities,
            orchestrator: Arc::new(orchestrator),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let max_upload = state.config.server.max_upload_bytes;

    Router::new()
        .merge(api::analysis_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
