//! Speaker gender and age group via the injected trait estimator

use std::sync::Arc;

use tracing::debug;

use crate::capabilities::SpeakerTraitClassifier;
use crate::models::SpeakerTraits;
use crate::types::{AnalysisError, AudioAsset};

#[derive(Clone)]
pub struct SpeakerTraitEstimator {
    classifier: Arc<dyn SpeakerTraitClassifier>,
}

impl SpeakerTraitEstimator {
    pub fn new(classifier: Arc<dyn SpeakerTraitClassifier>) -> Self {
        Self { classifier }
    }

    /// # Errors
    /// `TraitEstimationUnavailable` on estimator failure or a blank label.
    pub async fn estimate(&self, asset: &AudioAsset) -> Result<SpeakerTraits, AnalysisError> {
        let estimate = self
            .classifier
            .estimate(asset)
            .await
            .map_err(|e| AnalysisError::TraitEstimationUnavailable(e.to_string()))?;

        let gender = estimate.gender.trim().to_lowercase();
        let age_group = estimate.age_group.trim().to_lowercase();
        if gender.is_empty() || age_group.is_empty() {
            return Err(AnalysisError::TraitEstimationUnavailable(
                "estimator returned an empty label".to_string(),
            ));
        }

        let summary = format!("Voice characteristics suggest {}, likely {}.", gender, age_group);
        debug!(
            capability = self.classifier.name(),
            gender = %gender,
            age_group = %age_group,
            "Speaker traits estimated"
        );

        Ok(SpeakerTraits {
            gender,
            age_group,
            summary,
        })
    }
}
