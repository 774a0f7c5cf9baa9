//! Metrics records produced by the extractors
//!
//! Every record is immutable once produced and carries the extractor that
//! produced it plus the assets it ran on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AssetArity, AssetRole, ExtractorKind};

/// Tagged output of one extractor run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    /// Producing extractor
    pub extractor: ExtractorKind,
    /// One asset or a pair
    pub arity: AssetArity,
    /// Assets the extractor consumed, in argument order
    pub subjects: Vec<AssetRole>,
    /// When the record was produced
    pub produced_at: DateTime<Utc>,
    /// Extractor-specific payload
    pub metrics: Metrics,
}

impl MetricsRecord {
    pub fn single(extractor: ExtractorKind, subject: AssetRole, metrics: Metrics) -> Self {
        Self {
            extractor,
            arity: AssetArity::Single,
            subjects: vec![subject],
            produced_at: Utc::now(),
            metrics,
        }
    }

    pub fn dual(
        extractor: ExtractorKind,
        first: AssetRole,
        second: AssetRole,
        metrics: Metrics,
    ) -> Self {
        Self {
            extractor,
            arity: AssetArity::Dual,
            subjects: vec![first, second],
            produced_at: Utc::now(),
            metrics,
        }
    }
}

/// Payload variants, one per extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Metrics {
    Noise(NoiseMetrics),
    Spectrogram(SpectrogramMetrics),
    Hash(HashDigest),
    Speaker(SpeakerComparisonResult),
    Synthetic(SyntheticDetectionResult),
    Transcription(Transcript),
    TranscriptComparison(TranscriptComparisonResult),
    Metadata(AudioMetadata),
    SpeakerTraits(SpeakerTraits),
}

// ============================================================================
// Noise
// ============================================================================

/// Background level statistics of one asset
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BackgroundProfile {
    /// Mean RMS of background frames (0 when there are none)
    pub mean_rms: f64,
    /// Standard deviation of background frame RMS (0 when there are none)
    pub variation: f64,
    /// Number of background frames
    pub segment_count: usize,
}

/// Whether background noise looks continuous
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoiseConsistency {
    Consistent,
    Inconsistent,
}

/// Background noise profile, optionally compared against a second asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseMetrics {
    pub mean_rms: f64,
    pub variation: f64,
    pub segment_count: usize,
    /// |mean_rms(first) - mean_rms(second)|, dual mode only
    pub mean_rms_diff: Option<f64>,
    /// `mean_rms_diff` above the significance threshold, dual mode only
    pub is_significant_diff: Option<bool>,
    /// Background profile of the second asset, dual mode only
    pub compared: Option<BackgroundProfile>,
    pub consistency: NoiseConsistency,
}

// ============================================================================
// Spectrogram
// ============================================================================

/// Mel-spectrogram variance per band group
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MelBandVariances {
    pub low: f64,
    pub mid: f64,
    pub high: f64,
}

/// Axis-aligned pixel rectangle on the rendered spectrogram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Intensity statistics of the rendered spectrogram image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnomalyMetrics {
    pub max_intensity: u8,
    pub mean_intensity: f64,
    pub min_intensity: u8,
    pub std_intensity: f64,
    /// Pixels above the intensity threshold
    pub anomaly_pixel_count: u64,
    /// One box per connected anomalous region
    pub regions: Vec<BoundingBox>,
}

/// Numeric spectrogram metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrogramMetrics {
    pub average_energy: f64,
    pub energy_std: f64,
    pub percent_silence: f64,
    pub frequency_spike_count: usize,
    pub low_freq_variance: f64,
    pub abrupt_change_count: usize,
    pub spectral_flatness_mean: f64,
    pub spectral_flatness_std: f64,
    pub spectral_entropy_mean: f64,
    pub spectral_entropy_std: f64,
    pub mel_band_variances: MelBandVariances,
    /// Present when the rendered-image pass ran
    pub image_anomalies: Option<ImageAnomalyMetrics>,
}

impl SpectrogramMetrics {
    /// Anomaly count used for risk scoring
    pub fn anomaly_count(&self) -> Option<u64> {
        self.image_anomalies.as_ref().map(|a| a.anomaly_pixel_count)
    }
}

// ============================================================================
// Integrity
// ============================================================================

/// Content digests of the uploaded bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashDigest {
    /// Lowercase hex SHA-256
    pub sha256: String,
    /// Lowercase hex MD5
    pub md5: String,
    pub byte_len: u64,
}

/// Container and waveform metadata of one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioMetadata {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub original_sample_rate: u32,
    pub original_channels: usize,
    pub byte_len: u64,
    /// Overall encoded bitrate in bits per second
    pub bitrate: Option<f64>,
    /// Mean of the per-window bitrates
    pub bitrate_avg: Option<f64>,
    /// Population variance of the per-window bitrates
    pub bitrate_variance: Option<f64>,
    /// `bitrate_variance / bitrate_avg²`
    pub bitrate_relative_variance: Option<f64>,
    pub bitrate_stable: Option<bool>,
    /// Share of normalized samples below the silence threshold, two decimals
    pub percent_silence: f64,
}

// ============================================================================
// Model-backed results
// ============================================================================

/// Speaker verification outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerComparisonResult {
    /// Similarity in [0, 1]
    pub similarity_score: f64,
    pub same_speaker: bool,
    /// Threshold applied locally, if the verifier's decision was overridden
    pub decision_threshold: Option<f64>,
}

/// Synthetic speech classifier label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpeechLabel {
    Synthetic,
    Real,
}

/// Synthetic speech detection outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticDetectionResult {
    pub label: SpeechLabel,
    /// Confidence of `label` in [0, 1]
    pub confidence: f64,
}

/// Transcript of a single asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
}

/// Estimated speaker gender and age group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerTraits {
    pub gender: String,
    pub age_group: String,
    /// One-sentence description of the estimate
    pub summary: String,
}

/// Reference-vs-questioned transcript comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptComparisonResult {
    /// Similarity in [0, 100], rounded to two decimals
    pub similarity_score: f64,
    pub has_mismatch: bool,
    pub reference_text: String,
    pub questioned_text: String,
}
