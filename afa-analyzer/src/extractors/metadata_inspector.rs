//! Source metadata of one asset
//!
//! Reports the container properties captured during normalization together
//! with bitrate stability and the share of silent samples. Bitrate figures
//! come from per-window encoded packet sizes; a stream whose window bitrates
//! vary by more than the stability threshold (relative to the squared mean)
//! is flagged as unstable, which points at re-encoding or splicing.

use afa_common::config::MetadataPolicy;
use tracing::debug;

use super::stats;
use crate::models::AudioMetadata;
use crate::types::AudioAsset;

#[derive(Debug, Clone)]
pub struct MetadataInspector {
    policy: MetadataPolicy,
}

impl MetadataInspector {
    pub fn new(policy: MetadataPolicy) -> Self {
        Self { policy }
    }

    /// Never fails; bitrate fields are `None` when the source had no timing
    pub fn inspect(&self, asset: &AudioAsset) -> AudioMetadata {
        let source = asset.source();

        let windows = source
            .bitrate
            .as_ref()
            .map(|profile| profile.window_bps.as_slice())
            .filter(|windows| !windows.is_empty());
        let bitrate_avg = windows.map(stats::mean);
        let bitrate_variance = windows.map(stats::variance);
        let bitrate_relative_variance = match (bitrate_avg, bitrate_variance) {
            (Some(avg), Some(var)) if avg > 0.0 => Some(var / (avg * avg)),
            (Some(_), Some(_)) => Some(0.0),
            _ => None,
        };

        let metadata = AudioMetadata {
            duration_seconds: asset.duration_seconds(),
            sample_rate: asset.sample_rate(),
            original_sample_rate: source.original_sample_rate,
            original_channels: source.original_channels,
            byte_len: source.byte_len,
            bitrate: source.bitrate.as_ref().map(|profile| profile.overall_bps),
            bitrate_avg,
            bitrate_variance,
            bitrate_relative_variance,
            bitrate_stable: bitrate_relative_variance
                .map(|rel| rel < self.policy.bitrate_stability_threshold),
            percent_silence: round2(
                asset.percent_silent_samples(self.policy.sample_silence_threshold),
            ),
        };

        debug!(
            bitrate = ?metadata.bitrate,
            relative_variance = ?metadata.bitrate_relative_variance,
            silence = metadata.percent_silence,
            "Metadata inspected"
        );

        metadata
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
