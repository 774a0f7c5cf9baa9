//! Speaker comparison via the injected verifier

use std::sync::Arc;

use tracing::debug;

use crate::capabilities::SpeakerVerifier;
use crate::models::SpeakerComparisonResult;
use crate::types::{AnalysisError, AudioAsset};

#[derive(Clone)]
pub struct SpeakerComparator {
    verifier: Arc<dyn SpeakerVerifier>,
    /// Overrides the verifier's own decision when set
    decision_threshold: Option<f64>,
}

impl SpeakerComparator {
    pub fn new(verifier: Arc<dyn SpeakerVerifier>, decision_threshold: Option<f64>) -> Self {
        Self {
            verifier,
            decision_threshold,
        }
    }

    /// Compare the voices of two assets
    ///
    /// # Errors
    /// `VerificationUnavailable` when the verifier fails or rejects either input.
    pub async fn compare(
        &self,
        first: &AudioAsset,
        second: &AudioAsset,
    ) -> Result<SpeakerComparisonResult, AnalysisError> {
        let verification = self
            .verifier
            .verify(first, second)
            .await
            .map_err(|e| AnalysisError::VerificationUnavailable(e.to_string()))?;

        let similarity_score = verification.score.clamp(0.0, 1.0);
        let same_speaker = match self.decision_threshold {
            Some(threshold) => similarity_score >= threshold,
            None => verification.same_speaker,
        };

        debug!(
            capability = self.verifier.name(),
            score = similarity_score,
            same_speaker,
            "Speaker comparison complete"
        );

        Ok(SpeakerComparisonResult {
            similarity_score,
            same_speaker,
            decision_threshold: self.decision_threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{CapabilityError, SpeakerVerification};
    use async_trait::async_trait;

    struct FixedVerifier(Result<SpeakerVerification, ()>);

    #[async_trait]
    impl SpeakerVerifier for FixedVerifier {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn verify(
            &self,
            _first: &AudioAsset,
            _second: &AudioAsset,
        ) -> Result<SpeakerVerification, CapabilityError> {
            self.0
                .map_err(|_| CapabilityError::Rejected("audio too short".into()))
        }
    }

    fn asset() -> AudioAsset {
        AudioAsset::from_samples(vec![0.1; 1_600], 16_000).unwrap()
    }

    #[tokio::test]
    async fn test_relays_verifier_decision() {
        let comparator = SpeakerComparator::new(
            Arc::new(FixedVerifier(Ok(SpeakerVerification {
                score: 0.42,
                same_speaker: false,
            }))),
            None,
        );
        let result = comparator.compare(&asset(), &asset()).await.unwrap();
        assert_eq!(result.similarity_score, 0.42);
        assert!(!result.same_speaker);
        assert_eq!(result.decision_threshold, None);
    }

    #[tokio::test]
    async fn test_local_threshold_overrides_decision() {
        let comparator = SpeakerComparator::new(
            Arc::new(FixedVerifier(Ok(SpeakerVerification {
                score: 0.42,
                same_speaker: false,
            }))),
            Some(0.25),
        );
        let result = comparator.compare(&asset(), &asset()).await.unwrap();
        assert!(result.same_speaker);
    }

    #[tokio::test]
    async fn test_score_is_clamped() {
        let comparator = SpeakerComparator::new(
            Arc::new(FixedVerifier(Ok(SpeakerVerification {
                score: 1.7,
                same_speaker: true,
            }))),
            None,
        );
        let result = comparator.compare(&asset(), &asset()).await.unwrap();
        assert_eq!(result.similarity_score, 1.0);
    }

    #[tokio::test]
    async fn test_rejection_is_verification_unavailable() {
        let comparator = SpeakerComparator::new(Arc::new(FixedVerifier(Err(()))), None);
        let err = comparator.compare(&asset(), &asset()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::VerificationUnavailable(ref m) if m.contains("too short")));
    }
}
