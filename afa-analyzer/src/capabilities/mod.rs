//! External model capabilities
//!
//! Speech-to-text, speaker verification, synthetic speech classification
//! and speaker trait estimation are consumed through the narrow traits below. The analysis core never
//! depends on a concrete model; implementations are injected at startup.
//!
//! # Lifecycle
//! The process-wide `Capabilities` set is installed once (`install`) before
//! the server accepts requests and is read-only afterwards. Every
//! implementation must tolerate concurrent calls from many requests.

pub mod remote;
pub mod unconfigured;

use std::sync::Arc;

use afa_common::config::CapabilityConfig;
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::info;

use crate::types::AudioAsset;

pub use remote::{
    RemoteSpeakerTraits, RemoteSpeakerVerifier, RemoteSpeechToText, RemoteSyntheticClassifier,
};
pub use unconfigured::Unconfigured;

/// Failure of an external capability
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// Capability not configured or service down
    #[error("capability unavailable: {0}")]
    Unavailable(String),

    /// Service refused the input (too short, wrong format, ...)
    #[error("input rejected: {0}")]
    Rejected(String),

    /// Network failure or timeout
    #[error("transport error: {0}")]
    Transport(String),

    /// Reply could not be understood
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Raw verifier reply
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeakerVerification {
    pub score: f64,
    pub same_speaker: bool,
}

/// Raw classifier reply
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Model label, e.g. "fake", "bonafide"
    pub label: String,
    pub confidence: f64,
}

/// Raw trait estimator reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitEstimate {
    /// e.g. "female", "male"
    pub gender: String,
    /// e.g. "adult", "senior"
    pub age_group: String,
}

#[async_trait]
pub trait SpeechToText: Send + Sync {
    fn name(&self) -> &'static str;

    async fn transcribe(&self, audio: &AudioAsset) -> Result<String, CapabilityError>;
}

#[async_trait]
pub trait SpeakerVerifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn verify(
        &self,
        first: &AudioAsset,
        second: &AudioAsset,
    ) -> Result<SpeakerVerification, CapabilityError>;
}

#[async_trait]
pub trait SyntheticSpeechClassifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn classify(&self, audio: &AudioAsset) -> Result<Classification, CapabilityError>;
}

#[async_trait]
pub trait SpeakerTraitClassifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn estimate(&self, audio: &AudioAsset) -> Result<TraitEstimate, CapabilityError>;
}

/// Injected capability set shared by all requests
#[derive(Clone)]
pub struct Capabilities {
    pub speech_to_text: Arc<dyn SpeechToText>,
    pub speaker_verifier: Arc<dyn SpeakerVerifier>,
    pub synthetic_classifier: Arc<dyn SyntheticSpeechClassifier>,
    pub speaker_traits: Arc<dyn SpeakerTraitClassifier>,
}

impl Capabilities {
    /// Build remote clients for every configured URL
    ///
    /// Capabilities without a URL fall back to `Unconfigured`.
    pub fn from_config(config: &CapabilityConfig) -> Result<Self, CapabilityError> {
        let timeout = std::time::Duration::from_secs(config.request_timeout_secs);

        let speech_to_text: Arc<dyn SpeechToText> = match &config.speech_to_text_url {
            Some(url) => Arc::new(RemoteSpeechToText::new(url, timeout)?),
            None => Arc::new(Unconfigured::new("speech-to-text")),
        };
        let speaker_verifier: Arc<dyn SpeakerVerifier> = match &config.speaker_verifier_url {
            Some(url) => Arc::new(RemoteSpeakerVerifier::new(url, timeout)?),
            None => Arc::new(Unconfigured::new("speaker-verifier")),
        };
        let synthetic_classifier: Arc<dyn SyntheticSpeechClassifier> =
            match &config.synthetic_classifier_url {
                Some(url) => Arc::new(RemoteSyntheticClassifier::new(url, timeout)?),
                None => Arc::new(Unconfigured::new("synthetic-classifier")),
            };
        let speaker_traits: Arc<dyn SpeakerTraitClassifier> = match &config.speaker_traits_url {
            Some(url) => Arc::new(RemoteSpeakerTraits::new(url, timeout)?),
            None => Arc::new(Unconfigured::new("speaker-traits")),
        };

        Ok(Self {
            speech_to_text,
            speaker_verifier,
            synthetic_classifier,
            speaker_traits,
        })
    }

    /// Every capability unavailable
    pub fn unconfigured() -> Self {
        Self {
            speech_to_text: Arc::new(Unconfigured::new("speech-to-text")),
            speaker_verifier: Arc::new(Unconfigured::new("speaker-verifier")),
            synthetic_classifier: Arc::new(Unconfigured::new("synthetic-classifier")),
            speaker_traits: Arc::new(Unconfigured::new("speaker-traits")),
        }
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("speech_to_text", &self.speech_to_text.name())
            .field("speaker_verifier", &self.speaker_verifier.name())
            .field("synthetic_classifier", &self.synthetic_classifier.name())
            .field("speaker_traits", &self.speaker_traits.name())
            .finish()
    }
}

static INSTALLED: OnceCell<Arc<Capabilities>> = OnceCell::new();

/// Install the process-wide capability set
///
/// Fails if a set was already installed.
pub fn install(capabilities: Capabilities) -> Result<Arc<Capabilities>, CapabilityError> {
    let shared = Arc::new(capabilities);
    INSTALLED
        .set(Arc::clone(&shared))
        .map_err(|_| CapabilityError::Unavailable("capabilities already installed".to_string()))?;

    info!(capabilities = ?shared, "Capabilities installed");
    Ok(shared)
}

/// The installed capability set, if any
pub fn installed() -> Option<Arc<Capabilities>> {
    INSTALLED.get().cloned()
}
