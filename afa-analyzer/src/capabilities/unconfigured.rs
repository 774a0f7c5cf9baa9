//! Placeholder capability for services that are not configured

use async_trait::async_trait;

use super::{
    CapabilityError, Classification, SpeakerTraitClassifier, SpeakerVerification,
    SpeakerVerifier, SpeechToText, SyntheticSpeechClassifier, TraitEstimate,
};
use crate::types::AudioAsset;

/// Fails every call with `CapabilityError::Unavailable`
#[derive(Debug, Clone)]
pub struct Unconfigured {
    capability: &'static str,
}

impl Unconfigured {
    pub fn new(capability: &'static str) -> Self {
        Self { capability }
    }

    fn error(&self) -> CapabilityError {
        CapabilityError::Unavailable(format!("{} service not configured", self.capability))
    }
}

#[async_trait]
impl SpeechToText for Unconfigured {
    fn name(&self) -> &'static str {
        "unconfigured"
    }

    async fn transcribe(&self, _audio: &AudioAsset) -> Result<String, CapabilityError> {
        Err(self.error())
    }
}

#[async_trait]
impl SpeakerVerifier for Unconfigured {
    fn name(&self) -> &'static str {
        "unconfigured"
    }

    async fn verify(
        &self,
        _first: &AudioAsset,
        _second: &AudioAsset,
    ) -> Result<SpeakerVerification, CapabilityError> {
        Err(self.error())
    }
}

#[async_trait]
impl SyntheticSpeechClassifier for Unconfigured {
    fn name(&self) -> &'static str {
        "unconfigured"
    }

    async fn classify(&self, _audio: &AudioAsset) -> Result<Classification, CapabilityError> {
        Err(self.error())
    }
}

#[async_trait]
impl SpeakerTraitClassifier for Unconfigured {
    fn name(&self) -> &'static str {
        "unconfigured"
    }

    async fn estimate(&self, _audio: &AudioAsset) -> Result<TraitEstimate, CapabilityError> {
        Err(self.error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_reports_unavailable() {
        let asset = AudioAsset::from_samples(vec![0.1; 160], 16_000).unwrap();
        let stt = Unconfigured::new("speech-to-text");
        let err = stt.transcribe(&asset).await.unwrap_err();
        assert!(matches!(err, CapabilityError::Unavailable(ref m) if m.contains("speech-to-text")));
    }

    #[tokio::test]
    async fn test_unconfigured_traits_report_unavailable() {
        let asset = AudioAsset::from_samples(vec![0.1; 160], 16_000).unwrap();
        let err = Unconfigured::new("speaker-traits").estimate(&asset).await.unwrap_err();
        assert!(matches!(err, CapabilityError::Unavailable(ref m) if m.contains("speaker-traits")));
    }
}
