//! Synthetic speech detection via the injected classifier
//!
//! Classifier labels vary by model ("fake"/"bonafide", "spoof"/"genuine",
//! ...). Only known labels are accepted; anything else is reported as
//! unavailable rather than guessed.

use std::sync::Arc;

use tracing::debug;

use crate::capabilities::SyntheticSpeechClassifier;
use crate::models::{SpeechLabel, SyntheticDetectionResult};
use crate::types::{AnalysisError, AudioAsset};

/// Map a model label onto `SpeechLabel`, case-insensitively
pub fn parse_label(label: &str) -> Option<SpeechLabel> {
    match label.trim().to_ascii_lowercase().as_str() {
        "synthetic" | "fake" | "spoof" => Some(SpeechLabel::Synthetic),
        "real" | "bonafide" | "genuine" => Some(SpeechLabel::Real),
        _ => None,
    }
}

#[derive(Clone)]
pub struct SyntheticSpeechDetector {
    classifier: Arc<dyn SyntheticSpeechClassifier>,
}

impl SyntheticSpeechDetector {
    pub fn new(classifier: Arc<dyn SyntheticSpeechClassifier>) -> Self {
        Self { classifier }
    }

    /// # Errors
    /// `DetectionUnavailable` on classifier failure or an unknown label.
    pub async fn detect(&self, asset: &AudioAsset) -> Result<SyntheticDetectionResult, AnalysisError> {
        let classification = self
            .classifier
            .classify(asset)
            .await
            .map_err(|e| AnalysisError::DetectionUnavailable(e.to_string()))?;

        let label = parse_label(&classification.label).ok_or_else(|| {
            AnalysisError::DetectionUnavailable(format!(
                "unrecognized classifier label '{}'",
                classification.label
            ))
        })?;

        let result = SyntheticDetectionResult {
            label,
            confidence: classification.confidence.clamp(0.0, 1.0),
        };

        debug!(
            capability = self.classifier.name(),
            label = ?result.label,
            confidence = result.confidence,
            "Synthetic speech detection complete"
        );

        Ok(result)
    }
}
