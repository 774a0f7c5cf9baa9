//! Plain-language forensic conclusions
//!
//! Reads the metadata and spectrogram records of the asset under
//! examination (the subject, or the questioned asset of a pair) and lists
//! one sentence per tripped indicator. Like findings, conclusions never add
//! risk points.

use afa_common::config::ConclusionPolicy;

use crate::models::{Metrics, MetricsRecord};
use crate::types::{AssetArity, AssetRole};

pub const UNSTABLE_BITRATE: &str =
    "Bitrate variation unusually high; potential edits or synthetic audio.";
pub const HIGH_SILENCE: &str = "High silence content; possible tampering or low activity.";
pub const ABRUPT_CHANGES: &str = "Abrupt temporal changes detected; possible audio editing.";
pub const FREQUENCY_SPIKES: &str = "High-frequency spikes detected; potential synthetic artifacts.";
pub const NO_ANOMALIES: &str = "No significant anomalies detected.";

/// Conclusions in fixed order, or the single "no anomalies" sentence
pub fn conclude<'a, I>(records: I, policy: &ConclusionPolicy) -> Vec<String>
where
    I: IntoIterator<Item = &'a MetricsRecord>,
{
    let mut unstable_bitrate = false;
    let mut high_silence = false;
    let mut abrupt = false;
    let mut spikes = false;

    let examined = records.into_iter().filter(|record| {
        record.arity == AssetArity::Single
            && matches!(
                record.subjects.first(),
                Some(AssetRole::Subject | AssetRole::Questioned)
            )
    });

    for record in examined {
        match &record.metrics {
            Metrics::Metadata(metadata) => {
                unstable_bitrate |= metadata
                    .bitrate_relative_variance
                    .is_some_and(|rel| rel > policy.bitrate_relative_variance);
                high_silence |= metadata.percent_silence > policy.high_silence_percent;
            }
            Metrics::Spectrogram(metrics) => {
                abrupt |= metrics.abrupt_change_count > policy.abrupt_changes;
                spikes |= metrics.frequency_spike_count > policy.frequency_spikes;
            }
            _ => {}
        }
    }

    let conclusions: Vec<String> = [
        (unstable_bitrate, UNSTABLE_BITRATE),
        (high_silence, HIGH_SILENCE),
        (abrupt, ABRUPT_CHANGES),
        (spikes, FREQUENCY_SPIKES),
    ]
    .into_iter()
    .filter(|(tripped, _)| *tripped)
    .map(|(_, sentence)| sentence.to_string())
    .collect();

    if conclusions.is_empty() {
        vec![NO_ANOMALIES.to_string()]
    } else {
        conclusions
    }
}
