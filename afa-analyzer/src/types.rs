//! Core types shared by every stage of the forensic pipeline
//!
//! - `AudioAsset`: normalized mono waveform handed to extractors
//! - `ExtractorKind`, `AssetRole`, `AssetArity`: provenance tags
//! - `AnalysisError`: error taxonomy of the analysis core

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by the analysis core
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Container or codec cannot be decoded
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Decoded waveform has zero samples
    #[error("Decoded audio contains no samples")]
    EmptyAudio,

    /// Speaker verification capability failed or rejected the input
    #[error("Speaker verification unavailable: {0}")]
    VerificationUnavailable(String),

    /// Synthetic speech classifier failed or rejected the input
    #[error("Synthetic speech detection unavailable: {0}")]
    DetectionUnavailable(String),

    /// Speech-to-text capability failed or rejected the input
    #[error("Transcription unavailable: {0}")]
    TranscriptionUnavailable(String),

    /// Speaker trait estimator failed or returned no labels
    #[error("Speaker trait estimation unavailable: {0}")]
    TraitEstimationUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalysisError {
    /// True when an external capability, not the input audio, caused the failure
    pub fn is_capability_failure(&self) -> bool {
        matches!(
            self,
            AnalysisError::VerificationUnavailable(_)
                | AnalysisError::DetectionUnavailable(_)
                | AnalysisError::TranscriptionUnavailable(_)
                | AnalysisError::TraitEstimationUnavailable(_)
        )
    }
}

// ============================================================================
// Provenance tags
// ============================================================================

/// Extractor that produced a metrics record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    HashDigestor,
    MetadataInspector,
    SpeakerComparator,
    SyntheticSpeechDetector,
    SpeakerTraitEstimator,
    NoiseProfiler,
    Transcriber,
    TranscriptComparator,
    SpectrogramAnalyzer,
}

impl ExtractorKind {
    /// Canonical report order
    pub const ALL: [ExtractorKind; 9] = [
        ExtractorKind::HashDigestor,
        ExtractorKind::MetadataInspector,
        ExtractorKind::SpeakerComparator,
        ExtractorKind::SyntheticSpeechDetector,
        ExtractorKind::SpeakerTraitEstimator,
        ExtractorKind::NoiseProfiler,
        ExtractorKind::Transcriber,
        ExtractorKind::TranscriptComparator,
        ExtractorKind::SpectrogramAnalyzer,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExtractorKind::HashDigestor => "HashDigestor",
            ExtractorKind::MetadataInspector => "MetadataInspector",
            ExtractorKind::SpeakerComparator => "SpeakerComparator",
            ExtractorKind::SyntheticSpeechDetector => "SyntheticSpeechDetector",
            ExtractorKind::SpeakerTraitEstimator => "SpeakerTraitEstimator",
            ExtractorKind::NoiseProfiler => "NoiseProfiler",
            ExtractorKind::Transcriber => "Transcriber",
            ExtractorKind::TranscriptComparator => "TranscriptComparator",
            ExtractorKind::SpectrogramAnalyzer => "SpectrogramAnalyzer",
        }
    }
}

impl std::fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Role of an asset within a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetRole {
    /// The only asset of a single-asset request
    Subject,
    /// Known-genuine sample of a dual-asset request
    Reference,
    /// Sample under examination in a dual-asset request
    Questioned,
}

impl std::fmt::Display for AssetRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetRole::Subject => write!(f, "subject"),
            AssetRole::Reference => write!(f, "reference"),
            AssetRole::Questioned => write!(f, "questioned"),
        }
    }
}

/// Whether an extractor ran on one asset or compared two
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetArity {
    Single,
    Dual,
}

// ============================================================================
// Audio asset
// ============================================================================

/// Encoded bitrate of the source stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitrateProfile {
    /// Total encoded bits over the stream duration
    pub overall_bps: f64,
    /// Bitrate of each fixed-length window, in stream order
    pub window_bps: Vec<f64>,
}

/// Properties of the upload before normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceProperties {
    pub original_sample_rate: u32,
    pub original_channels: usize,
    pub byte_len: u64,
    /// Absent when the container reports no packet timing
    pub bitrate: Option<BitrateProfile>,
}

/// Normalized audio handle
///
/// Always mono and at the sample rate requested from the normalizer.
/// The waveform is never empty.
#[derive(Debug, Clone)]
pub struct AudioAsset {
    samples: Vec<f32>,
    sample_rate: u32,
    source: SourceProperties,
    normalized_path: Option<PathBuf>,
}

impl AudioAsset {
    /// Build an asset from mono samples already at `sample_rate`
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Result<Self, AnalysisError> {
        let byte_len = (samples.len() * std::mem::size_of::<f32>()) as u64;
        Self::with_source(
            samples,
            sample_rate,
            SourceProperties {
                original_sample_rate: sample_rate,
                original_channels: 1,
                byte_len,
                bitrate: None,
            },
        )
    }

    pub(crate) fn with_source(
        samples: Vec<f32>,
        sample_rate: u32,
        source: SourceProperties,
    ) -> Result<Self, AnalysisError> {
        if samples.is_empty() {
            return Err(AnalysisError::EmptyAudio);
        }
        if sample_rate == 0 {
            return Err(AnalysisError::Internal("Sample rate must be positive".into()));
        }
        Ok(Self {
            samples,
            sample_rate,
            source,
            normalized_path: None,
        })
    }

    pub(crate) fn set_normalized_path(&mut self, path: PathBuf) {
        self.normalized_path = Some(path);
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Always 1
    pub fn channels(&self) -> usize {
        1
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn source(&self) -> &SourceProperties {
        &self.source
    }

    /// Scratch copy written by the normalizer, if any
    pub fn normalized_path(&self) -> Option<&Path> {
        self.normalized_path.as_deref()
    }

    /// Percentage of samples whose magnitude is below `threshold`
    pub fn percent_silent_samples(&self, threshold: f32) -> f64 {
        let silent = self.samples.iter().filter(|s| s.abs() < threshold).count();
        silent as f64 / self.samples.len() as f64 * 100.0
    }

    /// 16-bit PCM WAV encoding of the waveform
    ///
    /// Reads the normalized scratch copy when present, otherwise encodes
    /// in memory.
    pub fn wav_bytes(&self) -> Result<Vec<u8>, AnalysisError> {
        if let Some(path) = &self.normalized_path {
            if let Ok(bytes) = std::fs::read(path) {
                return Ok(bytes);
            }
        }
        crate::utils::audio_decoder::encode_wav(&self.samples, self.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_asset_rejected() {
        let result = AudioAsset::from_samples(Vec::new(), 16_000);
        assert!(matches!(result, Err(AnalysisError::EmptyAudio)));
    }

    #[test]
    fn test_asset_duration_and_channels() {
        let asset = AudioAsset::from_samples(vec![0.0; 8_000], 16_000).unwrap();
        assert_eq!(asset.channels(), 1);
        assert!((asset.duration_seconds() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_percent_silent_samples() {
        let mut samples = vec![0.5; 100];
        samples[..25].iter_mut().for_each(|s| *s = 0.0);
        let asset = AudioAsset::from_samples(samples, 16_000).unwrap();
        assert!((asset.percent_silent_samples(1e-4) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_capability_failure_classification() {
        assert!(AnalysisError::DetectionUnavailable("x".into()).is_capability_failure());
        assert!(AnalysisError::TraitEstimationUnavailable("x".into()).is_capability_failure());
        assert!(!AnalysisError::EmptyAudio.is_capability_failure());
    }

    #[test]
    fn test_extractor_order_is_canonical() {
        let mut sorted = ExtractorKind::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, ExtractorKind::ALL.to_vec());
    }
}
