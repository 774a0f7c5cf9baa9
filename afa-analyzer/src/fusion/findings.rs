//! Narrative interpretation of spectrogram metrics
//!
//! Informational only: findings never add risk points.

use afa_common::config::FindingsPolicy;

use crate::models::{Finding, SpectrogramMetrics};

fn finding(topic: &str, flagged: bool, observation: String) -> Finding {
    Finding {
        topic: topic.to_string(),
        observation,
        flagged,
    }
}

/// One finding per topic, in fixed order
pub fn interpret(metrics: &SpectrogramMetrics, policy: &FindingsPolicy) -> Vec<Finding> {
    let mut findings = Vec::with_capacity(7);

    findings.push(if metrics.average_energy < policy.quiet_energy {
        finding(
            "energy",
            true,
            "Audio signal is very quiet; may indicate filtering or processing.".into(),
        )
    } else if metrics.energy_std > policy.fluctuating_energy_std {
        finding(
            "energy",
            true,
            "Sudden energy fluctuations detected; potential edits or splices.".into(),
        )
    } else {
        finding(
            "energy",
            false,
            "Audio energy is consistent with normal recording.".into(),
        )
    });

    findings.push(if metrics.percent_silence > policy.high_silence_percent {
        finding(
            "silence",
            true,
            format!(
                "High silence content ({:.2}%); possible cuts or tampering.",
                metrics.percent_silence
            ),
        )
    } else {
        finding("silence", false, "Background audio has natural pauses.".into())
    });

    findings.push(if metrics.frequency_spike_count > policy.frequency_spikes {
        finding(
            "frequency_spikes",
            true,
            format!(
                "Unusual frequency spikes detected ({}); may indicate AI artifacts or manipulation.",
                metrics.frequency_spike_count
            ),
        )
    } else {
        finding(
            "frequency_spikes",
            false,
            "Frequency content appears normal.".into(),
        )
    });

    findings.push(if metrics.low_freq_variance < policy.uniform_low_freq_variance {
        finding(
            "background_noise",
            true,
            "Low-frequency background too uniform; possibly artificial.".into(),
        )
    } else {
        finding(
            "background_noise",
            false,
            "Background noise pattern appears authentic.".into(),
        )
    });

    findings.push(if metrics.abrupt_change_count > policy.abrupt_changes {
        finding(
            "temporal_integrity",
            true,
            format!(
                "Multiple abrupt energy changes detected ({}); potential edits or splicing.",
                metrics.abrupt_change_count
            ),
        )
    } else {
        finding(
            "temporal_integrity",
            false,
            "Temporal energy distribution appears consistent.".into(),
        )
    });

    findings.push(if metrics.spectral_flatness_mean < policy.low_flatness {
        finding(
            "spectral_flatness",
            true,
            "Spectral flatness is very low; may indicate synthetic voice.".into(),
        )
    } else {
        finding(
            "spectral_flatness",
            false,
            "Spectral flatness appears normal.".into(),
        )
    });

    findings.push(if metrics.spectral_entropy_mean < policy.low_entropy {
        finding(
            "spectral_entropy",
            true,
            "Low spectral entropy; audio may be generated or heavily processed.".into(),
        )
    } else {
        finding(
            "spectral_entropy",
            false,
            "Spectral entropy consistent with natural recording.".into(),
        )
    });

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MelBandVariances;

    fn natural() -> SpectrogramMetrics {
        SpectrogramMetrics {
            average_energy: 5e5,
            energy_std: 1e5,
            percent_silence: 12.0,
            frequency_spike_count: 3,
            low_freq_variance: 40.0,
            abrupt_change_count: 4,
            spectral_flatness_mean: 0.1,
            spectral_flatness_std: 0.02,
            spectral_entropy_mean: 6.5,
            spectral_entropy_std: 0.4,
            mel_band_variances: MelBandVariances::default(),
            image_anomalies: None,
        }
    }

    #[test]
    fn test_natural_recording_has_no_flags() {
        let findings = interpret(&natural(), &FindingsPolicy::default());
        assert_eq!(findings.len(), 7);
        assert!(findings.iter().all(|f| !f.flagged));
    }

    #[test]
    fn test_flags_follow_cutoffs() {
        let metrics = SpectrogramMetrics {
            percent_silence: 72.5,
            spectral_flatness_mean: 0.005,
            ..natural()
        };
        let findings = interpret(&metrics, &FindingsPolicy::default());

        let flagged: Vec<&str> = findings
            .iter()
            .filter(|f| f.flagged)
            .map(|f| f.topic.as_str())
            .collect();
        assert_eq!(flagged, vec!["silence", "spectral_flatness"]);
        assert!(findings[1].observation.contains("72.50%"));
    }
}
