//! Analysis API handlers
//!
//! POST /analyze/single, POST /analyze/dual, POST /verify
//!
//! All three take `multipart/form-data` uploads. Field names are fixed per
//! route; unknown fields are ignored.

use std::collections::HashMap;

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    error::{ApiError, ApiResult},
    models::{ForensicReport, SpeakerComparisonResult},
    workflow::UploadedAudio,
    AppState,
};

/// POST /verify response
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub similarity_score: f64,
    pub same_speaker: bool,
}

impl From<SpeakerComparisonResult> for VerifyResponse {
    fn from(result: SpeakerComparisonResult) -> Self {
        Self {
            similarity_score: result.similarity_score,
            same_speaker: result.same_speaker,
        }
    }
}

/// Collect the named file fields of a multipart body
async fn read_uploads(
    mut multipart: Multipart,
    wanted: &[&str],
) -> ApiResult<HashMap<String, UploadedAudio>> {
    let mut uploads = HashMap::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if !wanted.contains(&name.as_str()) {
            debug!(field = %name, "Ignoring unexpected multipart field");
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Err(ApiError::BadRequest(format!("Field '{}' is empty", name)));
        }
        uploads.insert(name, UploadedAudio::new(bytes.to_vec(), file_name.as_deref()));
    }

    if let Some(missing) = wanted.iter().find(|w| !uploads.contains_key(**w)) {
        return Err(ApiError::BadRequest(format!(
            "Missing multipart field '{}'",
            missing
        )));
    }
    Ok(uploads)
}

fn take(uploads: &mut HashMap<String, UploadedAudio>, name: &str) -> ApiResult<UploadedAudio> {
    uploads
        .remove(name)
        .ok_or_else(|| ApiError::BadRequest(format!("Missing multipart field '{}'", name)))
}

/// POST /analyze/single
///
/// Field `audio`. Returns the full forensic report.
pub async fn analyze_single(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ForensicReport>> {
    let mut uploads = read_uploads(multipart, &["audio"]).await?;
    let audio = take(&mut uploads, "audio")?;

    let report = state.orchestrator.run_single_asset_analysis(audio).await?;
    info!(report_id = %report.report_id, "Single-asset report returned");
    Ok(Json(report))
}

/// POST /analyze/dual
///
/// Fields `reference` and `questioned`.
pub async fn analyze_dual(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ForensicReport>> {
    let mut uploads = read_uploads(multipart, &["reference", "questioned"]).await?;
    let reference = take(&mut uploads, "reference")?;
    let questioned = take(&mut uploads, "questioned")?;

    let report = state
        .orchestrator
        .run_dual_asset_analysis(reference, questioned)
        .await?;
    info!(report_id = %report.report_id, "Dual-asset report returned");
    Ok(Json(report))
}

/// POST /verify
///
/// Fields `audio1` and `audio2`. A verifier failure is a 503, not a report.
pub async fn verify(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<VerifyResponse>> {
    let mut uploads = read_uploads(multipart, &["audio1", "audio2"]).await?;
    let first = take(&mut uploads, "audio1")?;
    let second = take(&mut uploads, "audio2")?;

    let result = state
        .orchestrator
        .run_speaker_verification(first, second)
        .await?;
    Ok(Json(result.into()))
}

/// Build analysis routes
pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/analyze/single", post(analyze_single))
        .route("/analyze/dual", post(analyze_dual))
        .route("/verify", post(verify))
}
