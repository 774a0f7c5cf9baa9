//! Scripted capability implementations
//!
//! Each mock answers from a closure over the asset duration, so tests can
//! tell reference and questioned uploads apart without call ordering.

use std::sync::Arc;

use afa_analyzer::capabilities::{
    Capabilities, CapabilityError, Classification, SpeakerTraitClassifier, SpeakerVerification,
    SpeakerVerifier, SpeechToText, SyntheticSpeechClassifier, TraitEstimate,
};
use afa_analyzer::types::AudioAsset;
use async_trait::async_trait;

type Script<T> = Arc<dyn Fn(f64) -> Result<T, CapabilityError> + Send + Sync>;

pub struct ScriptedSpeechToText(Script<String>);

#[async_trait]
impl SpeechToText for ScriptedSpeechToText {
    fn name(&self) -> &'static str {
        "scripted-speech-to-text"
    }

    async fn transcribe(&self, audio: &AudioAsset) -> Result<String, CapabilityError> {
        (self.0)(audio.duration_seconds())
    }
}

pub struct ScriptedVerifier(Result<SpeakerVerification, String>);

#[async_trait]
impl SpeakerVerifier for ScriptedVerifier {
    fn name(&self) -> &'static str {
        "scripted-verifier"
    }

    async fn verify(
        &self,
        _first: &AudioAsset,
        _second: &AudioAsset,
    ) -> Result<SpeakerVerification, CapabilityError> {
        self.0.clone().map_err(CapabilityError::Unavailable)
    }
}

pub struct ScriptedClassifier(Result<Classification, String>);

#[async_trait]
impl SyntheticSpeechClassifier for ScriptedClassifier {
    fn name(&self) -> &'static str {
        "scripted-classifier"
    }

    async fn classify(&self, _audio: &AudioAsset) -> Result<Classification, CapabilityError> {
        self.0.clone().map_err(CapabilityError::Unavailable)
    }
}

pub struct ScriptedTraits(Result<TraitEstimate, String>);

#[async_trait]
impl SpeakerTraitClassifier for ScriptedTraits {
    fn name(&self) -> &'static str {
        "scripted-traits"
    }

    async fn estimate(&self, _audio: &AudioAsset) -> Result<TraitEstimate, CapabilityError> {
        self.0.clone().map_err(CapabilityError::Unavailable)
    }
}

/// Builder for a capability set
pub struct MockCapabilities {
    speech_to_text: Script<String>,
    verifier: Result<SpeakerVerification, String>,
    classifier: Result<Classification, String>,
    traits: Result<TraitEstimate, String>,
}

impl MockCapabilities {
    /// Every capability fails as unavailable
    pub fn failing() -> Self {
        Self {
            speech_to_text: Arc::new(|_| Err(CapabilityError::Unavailable("stt down".into()))),
            verifier: Err("verifier down".into()),
            classifier: Err("classifier down".into()),
            traits: Err("traits down".into()),
        }
    }

    /// Same speaker, real speech, identical transcripts
    pub fn benign() -> Self {
        Self {
            speech_to_text: Arc::new(|_| Ok("please confirm the transfer".to_string())),
            verifier: Ok(SpeakerVerification {
                score: 0.91,
                same_speaker: true,
            }),
            classifier: Ok(Classification {
                label: "bonafide".into(),
                confidence: 0.88,
            }),
            traits: Ok(TraitEstimate {
                gender: "female".into(),
                age_group: "adult".into(),
            }),
        }
    }

    pub fn transcripts<F>(mut self, script: F) -> Self
    where
        F: Fn(f64) -> Result<String, CapabilityError> + Send + Sync + 'static,
    {
        self.speech_to_text = Arc::new(script);
        self
    }

    pub fn verifier(mut self, score: f64, same_speaker: bool) -> Self {
        self.verifier = Ok(SpeakerVerification {
            score,
            same_speaker,
        });
        self
    }

    pub fn failing_verifier(mut self) -> Self {
        self.verifier = Err("verifier down".into());
        self
    }

    pub fn classifier(mut self, label: &str, confidence: f64) -> Self {
        self.classifier = Ok(Classification {
            label: label.to_string(),
            confidence,
        });
        self
    }

    pub fn traits(mut self, gender: &str, age_group: &str) -> Self {
        self.traits = Ok(TraitEstimate {
            gender: gender.to_string(),
            age_group: age_group.to_string(),
        });
        self
    }

    pub fn build(self) -> Capabilities {
        Capabilities {
            speech_to_text: Arc::new(ScriptedSpeechToText(self.speech_to_text)),
            speaker_verifier: Arc::new(ScriptedVerifier(self.verifier)),
            synthetic_classifier: Arc::new(ScriptedClassifier(self.classifier)),
            speaker_traits: Arc::new(ScriptedTraits(self.traits)),
        }
    }
}
