//! Data models for the forensic analyzer
//!
//! - Metrics records (one variant per extractor)
//! - Verdict (risk score, factors, category, recommendation)
//! - Report (metrics + verdict + request metadata)

pub mod metrics;
pub mod report;
pub mod verdict;

pub use metrics::{
    AudioMetadata, BackgroundProfile, BoundingBox, HashDigest, ImageAnomalyMetrics,
    MelBandVariances, Metrics, MetricsRecord, NoiseConsistency, NoiseMetrics, SpeakerComparisonResult,
    SpeakerTraits, SpectrogramMetrics, SpeechLabel, SyntheticDetectionResult, Transcript,
    TranscriptComparisonResult,
};
pub use report::{
    Artifact, AssetSummary, EntryStatus, Finding, ForensicReport, ReportEntry, RequestKind,
};
pub use verdict::{ForensicVerdict, Recommendation, RiskCategory, RiskFactor};
