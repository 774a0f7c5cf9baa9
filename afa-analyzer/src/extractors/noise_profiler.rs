//! Background noise profiling
//!
//! Frames the waveform, computes RMS per frame and treats frames below the
//! configured percentile of the RMS distribution as background. The mean and
//! spread of those frames characterize the noise floor. Two recordings cut
//! from the same session should share a noise floor; a splice from elsewhere
//! usually does not.

use afa_common::config::NoisePolicy;
use tracing::debug;

use super::stats;
use crate::models::{BackgroundProfile, NoiseConsistency, NoiseMetrics};
use crate::types::AudioAsset;

/// Noise floor extractor
#[derive(Debug, Clone)]
pub struct NoiseProfiler {
    policy: NoisePolicy,
}

impl NoiseProfiler {
    pub fn new(policy: NoisePolicy) -> Self {
        Self { policy }
    }

    /// Profile one asset, or compare two
    ///
    /// Never fails; degenerate input yields zeros.
    pub fn profile(&self, asset: &AudioAsset, other: Option<&AudioAsset>) -> NoiseMetrics {
        let primary = self.background_profile(asset.samples());
        let threshold = self.policy.significance_threshold;

        let metrics = match other {
            None => NoiseMetrics {
                mean_rms: primary.mean_rms,
                variation: primary.variation,
                segment_count: primary.segment_count,
                mean_rms_diff: None,
                is_significant_diff: None,
                compared: None,
                consistency: consistency(primary.variation >= threshold),
            },
            Some(other) => {
                let secondary = self.background_profile(other.samples());
                let diff = (primary.mean_rms - secondary.mean_rms).abs();
                let significant = diff > threshold;
                NoiseMetrics {
                    mean_rms: primary.mean_rms,
                    variation: primary.variation,
                    segment_count: primary.segment_count,
                    mean_rms_diff: Some(diff),
                    is_significant_diff: Some(significant),
                    compared: Some(secondary),
                    consistency: consistency(significant),
                }
            }
        };

        debug!(
            mean_rms = metrics.mean_rms,
            variation = metrics.variation,
            segments = metrics.segment_count,
            diff = ?metrics.mean_rms_diff,
            "Noise profile computed"
        );

        metrics
    }

    /// Background statistics of one waveform
    pub fn background_profile(&self, samples: &[f32]) -> BackgroundProfile {
        let rms = self.frame_rms(samples);
        if rms.is_empty() {
            return BackgroundProfile::default();
        }

        let cutoff = stats::percentile(&rms, self.policy.background_percentile);
        let background: Vec<f64> = rms.into_iter().filter(|v| *v < cutoff).collect();

        BackgroundProfile {
            mean_rms: stats::mean(&background),
            variation: stats::std_dev(&background),
            segment_count: background.len(),
        }
    }

    /// Centered frame RMS, zero padded by half a frame on each side
    fn frame_rms(&self, samples: &[f32]) -> Vec<f64> {
        let frame_length = self.policy.frame_length.max(1);
        let hop = self.policy.hop_length.max(1);
        if samples.is_empty() {
            return Vec::new();
        }

        let pad = frame_length / 2;
        let padded_len = samples.len() + 2 * pad;
        if padded_len < frame_length {
            return Vec::new();
        }
        let frames = 1 + (padded_len - frame_length) / hop;

        let at = |i: usize| -> f64 {
            if i < pad || i >= pad + samples.len() {
                0.0
            } else {
                samples[i - pad] as f64
            }
        };

        (0..frames)
            .map(|f| {
                let start = f * hop;
                let energy: f64 = (start..start + frame_length).map(|i| at(i).powi(2)).sum();
                (energy / frame_length as f64).sqrt()
            })
            .collect()
    }
}

fn consistency(flagged: bool) -> NoiseConsistency {
    if flagged {
        NoiseConsistency::Inconsistent
    } else {
        NoiseConsistency::Consistent
    }
}
