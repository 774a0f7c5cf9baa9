//! Risk aggregation
//!
//! Pure function of the available metrics records. Rules (defaults):
//!
//! | record                      | condition             | points |
//! |-----------------------------|-----------------------|--------|
//! | SpeakerComparisonResult     | same_speaker == false | +3     |
//! | SyntheticDetectionResult    | label == SYNTHETIC    | +4     |
//! | TranscriptComparisonResult  | similarity < 50       | +2     |
//! | SpectrogramMetrics          | anomaly_count > 150   | +3     |
//! | SpectrogramMetrics          | anomaly_count in (50, 150] | +1 |
//!
//! A rule whose record is absent is skipped. A rule fires at most once even
//! when several records of its kind satisfy it. The score is capped, then
//! banded into LOW / MODERATE / HIGH.

use afa_common::config::RiskPolicy;
use tracing::{debug, warn};

use crate::models::{
    ForensicVerdict, Metrics, MetricsRecord, RiskCategory, RiskFactor, SpeechLabel,
};
use crate::types::ExtractorKind;

pub const SPEAKER_MISMATCH: &str = "voice patterns do not match";
pub const SYNTHETIC_SPEECH: &str = "likely AI-generated speech";
pub const LOW_TRANSCRIPT_SIMILARITY: &str = "low transcript similarity";
pub const HIGH_SPECTRAL_ANOMALIES: &str = "high spectral anomalies";
pub const MODERATE_SPECTRAL_ANOMALIES: &str = "moderate spectral anomalies";

#[derive(Debug, Clone)]
pub struct RiskAggregator {
    policy: RiskPolicy,
}

impl RiskAggregator {
    pub fn new(policy: RiskPolicy) -> Self {
        Self { policy }
    }

    pub fn aggregate<'a, I>(&self, records: I) -> ForensicVerdict
    where
        I: IntoIterator<Item = &'a MetricsRecord>,
    {
        let mut speaker_mismatch: Option<f64> = None;
        let mut synthetic: Option<f64> = None;
        let mut low_transcript: Option<f64> = None;
        let mut max_anomalies: Option<u64> = None;
        let mut seen = 0usize;

        for record in records {
            seen += 1;
            match &record.metrics {
                Metrics::Speaker(result) if !result.same_speaker => {
                    let lowest = speaker_mismatch.map_or(result.similarity_score, |s| {
                        s.min(result.similarity_score)
                    });
                    speaker_mismatch = Some(lowest);
                }
                Metrics::Synthetic(result) if result.label == SpeechLabel::Synthetic => {
                    let highest =
                        synthetic.map_or(result.confidence, |c| c.max(result.confidence));
                    synthetic = Some(highest);
                }
                Metrics::TranscriptComparison(result) => {
                    if result.similarity_score < self.policy.transcript_similarity_floor {
                        let lowest = low_transcript.map_or(result.similarity_score, |s| {
                            s.min(result.similarity_score)
                        });
                        low_transcript = Some(lowest);
                    }
                }
                Metrics::Spectrogram(metrics) => {
                    if let Some(count) = metrics.anomaly_count() {
                        max_anomalies = Some(max_anomalies.map_or(count, |m| m.max(count)));
                    }
                }
                Metrics::Speaker(_)
                | Metrics::Synthetic(_)
                | Metrics::Noise(_)
                | Metrics::Hash(_)
                | Metrics::Transcription(_)
                | Metrics::Metadata(_)
                | Metrics::SpeakerTraits(_) => {}
            }
        }

        if seen == 0 {
            warn!("No metrics available for aggregation, verdict defaults to LOW");
        }

        let mut factors = Vec::new();

        if let Some(similarity) = speaker_mismatch {
            factors.push(RiskFactor::new(
                self.policy.speaker_mismatch_points,
                SPEAKER_MISMATCH,
                ExtractorKind::SpeakerComparator,
                similarity,
            ));
        }
        if let Some(confidence) = synthetic {
            factors.push(RiskFactor::new(
                self.policy.synthetic_points,
                SYNTHETIC_SPEECH,
                ExtractorKind::SyntheticSpeechDetector,
                confidence,
            ));
        }
        if let Some(similarity) = low_transcript {
            factors.push(RiskFactor::new(
                self.policy.low_transcript_points,
                LOW_TRANSCRIPT_SIMILARITY,
                ExtractorKind::TranscriptComparator,
                similarity,
            ));
        }
        if let Some(count) = max_anomalies {
            if count > self.policy.high_anomaly_count {
                factors.push(RiskFactor::new(
                    self.policy.high_anomaly_points,
                    HIGH_SPECTRAL_ANOMALIES,
                    ExtractorKind::SpectrogramAnalyzer,
                    count as f64,
                ));
            } else if count > self.policy.moderate_anomaly_count {
                factors.push(RiskFactor::new(
                    self.policy.moderate_anomaly_points,
                    MODERATE_SPECTRAL_ANOMALIES,
                    ExtractorKind::SpectrogramAnalyzer,
                    count as f64,
                ));
            }
        }

        let raw: u32 = factors.iter().map(|f| f.weight).sum();
        let risk_score = raw.min(self.policy.max_score);
        let category = self.categorize(risk_score);

        debug!(
            records = seen,
            raw_score = raw,
            risk_score,
            category = ?category,
            "Risk aggregated"
        );

        ForensicVerdict {
            risk_score,
            risk_factors: factors,
            category,
            recommendation: category.recommendation(),
        }
    }

    fn categorize(&self, score: u32) -> RiskCategory {
        if score >= self.policy.high_category_score {
            RiskCategory::High
        } else if score >= self.policy.moderate_category_score {
            RiskCategory::Moderate
        } else {
            RiskCategory::Low
        }
    }
}
