//! Configuration loading and policy constants
//!
//! Config file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. `ANALYSIS_CONFIG` environment variable
//! 3. User config file (`~/.config/afa/analyzer.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing config file is never fatal: the service logs a warning and
//! starts with compiled defaults. Individual settings can then be overridden
//! through `ANALYSIS_*` environment variables.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const ENV_CONFIG_PATH: &str = "ANALYSIS_CONFIG";
/// Environment override for the HTTP bind address
pub const ENV_BIND_ADDRESS: &str = "ANALYSIS_BIND";
/// Environment override for the scratch root
pub const ENV_SCRATCH_ROOT: &str = "ANALYSIS_SCRATCH_ROOT";
/// Environment override for the speech-to-text service URL
pub const ENV_STT_URL: &str = "ANALYSIS_STT_URL";
/// Environment override for the speaker verification service URL
pub const ENV_VERIFIER_URL: &str = "ANALYSIS_VERIFIER_URL";
/// Environment override for the synthetic speech classifier URL
pub const ENV_CLASSIFIER_URL: &str = "ANALYSIS_CLASSIFIER_URL";
/// Environment override for the speaker trait estimation URL
pub const ENV_TRAITS_URL: &str = "ANALYSIS_TRAITS_URL";

/// Complete service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub scratch: ScratchConfig,
    pub audio: AudioConfig,
    pub policy: PolicyConfig,
    pub capabilities: CapabilityConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Maximum accepted upload body in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5731".to_string(),
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive (`RUST_LOG` wins when set)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Request scratch storage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScratchConfig {
    /// Parent directory of all per-request scratch directories
    pub root: PathBuf,
    /// Removal attempts before a file is renamed out of the way
    pub delete_attempts: u32,
    /// Sleep between removal attempts
    pub delete_backoff_ms: u64,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            root: std::env::temp_dir().join("afa-scratch"),
            delete_attempts: 3,
            delete_backoff_ms: 200,
        }
    }
}

/// Audio normalization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate every extractor receives
    pub target_sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16_000,
        }
    }
}

/// Detection thresholds and rule weights
///
/// None of these values are forensic truths; they are tunable policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub noise: NoisePolicy,
    pub spectrogram: SpectrogramPolicy,
    pub findings: FindingsPolicy,
    pub risk: RiskPolicy,
    pub transcript: TranscriptPolicy,
    pub speaker: SpeakerPolicy,
    pub metadata: MetadataPolicy,
    pub conclusion: ConclusionPolicy,
}

/// Background noise profiling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoisePolicy {
    pub frame_length: usize,
    pub hop_length: usize,
    /// Frames with RMS below this percentile count as background
    pub background_percentile: f64,
    /// Background level difference (or variation) regarded as significant
    pub significance_threshold: f64,
}

impl Default for NoisePolicy {
    fn default() -> Self {
        Self {
            frame_length: 2048,
            hop_length: 512,
            background_percentile: 25.0,
            significance_threshold: 0.002,
        }
    }
}

/// Spectrogram analysis parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramPolicy {
    pub n_fft: usize,
    pub hop_length: usize,
    /// Frame-energy delta, in standard deviations, that counts as abrupt
    pub abrupt_change_sigma: f64,
    /// Bin energy, in standard deviations above the mean, that counts as a spike
    pub spike_sigma: f64,
    pub low_freq_cutoff_hz: f64,
    pub n_mels: usize,
    /// Rendered pixel intensity (0-255) above which a pixel is anomalous
    pub image_intensity_threshold: u8,
    /// Lowest dB value kept in the log spectrogram
    pub db_floor: f64,
    /// Rendered image width in pixels, independent of clip duration
    pub image_width: u32,
    /// Rendered image height in pixels, independent of `n_fft`
    pub image_height: u32,
}

impl Default for SpectrogramPolicy {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop_length: 512,
            abrupt_change_sigma: 2.0,
            spike_sigma: 3.0,
            low_freq_cutoff_hz: 500.0,
            n_mels: 40,
            image_intensity_threshold: 200,
            db_floor: -80.0,
            image_width: 1000,
            image_height: 400,
        }
    }
}

/// Cut-offs used to phrase spectral findings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FindingsPolicy {
    pub quiet_energy: f64,
    pub fluctuating_energy_std: f64,
    pub high_silence_percent: f64,
    pub frequency_spikes: usize,
    pub uniform_low_freq_variance: f64,
    pub abrupt_changes: usize,
    pub low_flatness: f64,
    pub low_entropy: f64,
}

impl Default for FindingsPolicy {
    fn default() -> Self {
        Self {
            quiet_energy: 1e5,
            fluctuating_energy_std: 1e6,
            high_silence_percent: 50.0,
            frequency_spikes: 20,
            uniform_low_freq_variance: 1.0,
            abrupt_changes: 50,
            low_flatness: 0.02,
            low_entropy: 3.0,
        }
    }
}

/// Risk rule weights and bands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskPolicy {
    pub speaker_mismatch_points: u32,
    pub synthetic_points: u32,
    pub low_transcript_points: u32,
    pub high_anomaly_points: u32,
    pub moderate_anomaly_points: u32,
    /// Transcript similarity (percent) below which the rule fires
    pub transcript_similarity_floor: f64,
    /// Anomaly counts above this (and up to `high_anomaly_count`) are moderate
    pub moderate_anomaly_count: u64,
    /// Anomaly counts above this are high
    pub high_anomaly_count: u64,
    pub max_score: u32,
    pub high_category_score: u32,
    pub moderate_category_score: u32,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            speaker_mismatch_points: 3,
            synthetic_points: 4,
            low_transcript_points: 2,
            high_anomaly_points: 3,
            moderate_anomaly_points: 1,
            transcript_similarity_floor: 50.0,
            moderate_anomaly_count: 50,
            high_anomaly_count: 150,
            max_score: 10,
            high_category_score: 6,
            moderate_category_score: 3,
        }
    }
}

/// Transcript comparison settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptPolicy {
    /// Similarity percentage below which transcripts are reported as mismatched
    pub mismatch_threshold: f64,
}

impl Default for TranscriptPolicy {
    fn default() -> Self {
        Self {
            mismatch_threshold: 95.0,
        }
    }
}

/// Speaker comparison settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeakerPolicy {
    /// When set, `same_speaker = score >= decision_threshold`; otherwise the
    /// verifier's own decision is relayed
    pub decision_threshold: Option<f64>,
}

/// Container and waveform metadata settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataPolicy {
    /// Relative bitrate variance below which the encoding counts as stable
    pub bitrate_stability_threshold: f64,
    /// Sample magnitude below which a normalized sample is silent
    pub sample_silence_threshold: f32,
}

impl Default for MetadataPolicy {
    fn default() -> Self {
        Self {
            bitrate_stability_threshold: 0.02,
            sample_silence_threshold: 1e-4,
        }
    }
}

/// Cut-offs for the plain-language forensic conclusions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConclusionPolicy {
    pub bitrate_relative_variance: f64,
    pub high_silence_percent: f64,
    pub abrupt_changes: usize,
    pub frequency_spikes: usize,
}

impl Default for ConclusionPolicy {
    fn default() -> Self {
        Self {
            bitrate_relative_variance: 0.02,
            high_silence_percent: 50.0,
            abrupt_changes: 50,
            frequency_spikes: 30,
        }
    }
}

/// External inference service endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityConfig {
    pub speech_to_text_url: Option<String>,
    pub speaker_verifier_url: Option<String>,
    pub synthetic_classifier_url: Option<String>,
    pub speaker_traits_url: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            speech_to_text_url: None,
            speaker_verifier_url: None,
            synthetic_classifier_url: None,
            speaker_traits_url: None,
            request_timeout_secs: 60,
        }
    }
}

impl AnalysisConfig {
    /// Parse configuration from TOML text (missing keys take defaults)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load configuration from an optional file path
    ///
    /// `None` or a missing file yields compiled defaults with a warning.
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            info!("No config file resolved, using compiled defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            warn!(
                path = %path.display(),
                "Config file not found, using compiled defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Apply `ANALYSIS_*` environment overrides in place
    pub fn apply_env_overrides(&mut self) {
        if let Some(bind) = non_empty_env(ENV_BIND_ADDRESS) {
            self.server.bind_address = bind;
        }
        if let Some(root) = non_empty_env(ENV_SCRATCH_ROOT) {
            self.scratch.root = PathBuf::from(root);
        }
        if let Some(url) = non_empty_env(ENV_STT_URL) {
            self.capabilities.speech_to_text_url = Some(url);
        }
        if let Some(url) = non_empty_env(ENV_VERIFIER_URL) {
            self.capabilities.speaker_verifier_url = Some(url);
        }
        if let Some(url) = non_empty_env(ENV_CLASSIFIER_URL) {
            self.capabilities.synthetic_classifier_url = Some(url);
        }
        if let Some(url) = non_empty_env(ENV_TRAITS_URL) {
            self.capabilities.speaker_traits_url = Some(url);
        }
    }

    /// Reject settings the analyzers cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.audio.target_sample_rate == 0 {
            return Err(Error::Config("audio.target_sample_rate must be positive".into()));
        }
        let noise = &self.policy.noise;
        if noise.frame_length == 0 || noise.hop_length == 0 {
            return Err(Error::Config(
                "policy.noise frame_length and hop_length must be positive".into(),
            ));
        }
        if !(noise.background_percentile > 0.0 && noise.background_percentile <= 100.0) {
            return Err(Error::Config(
                "policy.noise.background_percentile must be in (0, 100]".into(),
            ));
        }
        let spectro = &self.policy.spectrogram;
        if spectro.n_fft < 2 || spectro.hop_length == 0 || spectro.n_mels == 0 {
            return Err(Error::Config(
                "policy.spectrogram n_fft, hop_length and n_mels must be positive".into(),
            ));
        }
        if spectro.image_width == 0 || spectro.image_height == 0 {
            return Err(Error::Config(
                "policy.spectrogram image_width and image_height must be positive".into(),
            ));
        }
        if spectro.db_floor >= 0.0 {
            return Err(Error::Config("policy.spectrogram.db_floor must be negative".into()));
        }
        let risk = &self.policy.risk;
        if risk.moderate_anomaly_count > risk.high_anomaly_count {
            return Err(Error::Config(
                "policy.risk.moderate_anomaly_count exceeds high_anomaly_count".into(),
            ));
        }
        if risk.moderate_category_score > risk.high_category_score {
            return Err(Error::Config(
                "policy.risk.moderate_category_score exceeds high_category_score".into(),
            ));
        }
        let metadata = &self.policy.metadata;
        if metadata.bitrate_stability_threshold <= 0.0 || metadata.sample_silence_threshold <= 0.0
        {
            return Err(Error::Config(
                "policy.metadata thresholds must be positive".into(),
            ));
        }
        if self.scratch.delete_attempts == 0 {
            return Err(Error::Config("scratch.delete_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

/// Resolve which config file to load
///
/// Returns `None` when neither the CLI, the environment nor the user config
/// directory names an existing file.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Some(path) = non_empty_env(ENV_CONFIG_PATH) {
        return Some(PathBuf::from(path));
    }

    // Priority 3: User config directory
    default_config_file().filter(|p| p.exists())
}

/// Platform config file location (`<config_dir>/afa/analyzer.toml`)
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("afa").join("analyzer.toml"))
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
