//! Feature extractors
//!
//! Each extractor consumes normalized asset(s) and produces one typed
//! metrics payload. Extractors share no state and may run concurrently.
//!
//! # Extractors
//! 1. **hash_digestor** - SHA-256 + MD5 of the upload bytes
//! 2. **metadata_inspector** - source properties, bitrate stability, silence
//! 3. **speaker_comparator** - voice match via the speaker verifier capability
//! 4. **synthetic_detector** - AI speech detection via the classifier capability
//! 5. **speaker_traits** - gender and age group via the trait estimator
//! 6. **noise_profiler** - background noise floor, single or paired
//! 7. **transcript_comparator** - speech-to-text plus transcript similarity
//! 8. **spectrogram_analyzer** - spectral tampering indicators and rendered image
//!
//! Signal extractors (metadata, noise, spectrogram, hash) are synchronous and CPU bound;
//! the orchestrator runs them on the blocking pool. Capability wrappers are
//! async.

pub mod hash_digestor;
pub mod metadata_inspector;
pub mod noise_profiler;
pub mod speaker_comparator;
pub mod speaker_traits;
pub mod spectrogram_analyzer;
pub mod spectrogram_image;
pub mod stats;
pub mod synthetic_detector;
pub mod transcript_comparator;

pub use hash_digestor::HashDigestor;
pub use metadata_inspector::MetadataInspector;
pub use noise_profiler::NoiseProfiler;
pub use speaker_comparator::SpeakerComparator;
pub use speaker_traits::SpeakerTraitEstimator;
pub use spectrogram_analyzer::{SpectrogramAnalysis, SpectrogramAnalyzer};
pub use synthetic_detector::SyntheticSpeechDetector;
pub use transcript_comparator::{Transcriber, TranscriptComparator};

use afa_common::config::PolicyConfig;

use crate::capabilities::Capabilities;
use crate::models::MetricsRecord;
use crate::types::{AnalysisError, AssetRole, ExtractorKind};

/// Outcome of one extractor invocation within a request
#[derive(Debug)]
pub struct ExtractorRun {
    pub kind: ExtractorKind,
    pub subjects: Vec<AssetRole>,
    pub outcome: Result<MetricsRecord, AnalysisError>,
}

impl ExtractorRun {
    pub fn new(
        kind: ExtractorKind,
        subjects: Vec<AssetRole>,
        outcome: Result<MetricsRecord, AnalysisError>,
    ) -> Self {
        Self {
            kind,
            subjects,
            outcome,
        }
    }
}

/// Every extractor, configured for one process
#[derive(Clone)]
pub struct ExtractorSet {
    pub hash: HashDigestor,
    pub metadata: MetadataInspector,
    pub noise: NoiseProfiler,
    pub spectrogram: SpectrogramAnalyzer,
    pub speaker: SpeakerComparator,
    pub synthetic: SyntheticSpeechDetector,
    pub traits: SpeakerTraitEstimator,
    pub transcriber: Transcriber,
    pub transcript_comparator: TranscriptComparator,
}

impl ExtractorSet {
    pub fn new(policy: &PolicyConfig, capabilities: &Capabilities) -> Self {
        Self {
            hash: HashDigestor::new(),
            metadata: MetadataInspector::new(policy.metadata.clone()),
            noise: NoiseProfiler::new(policy.noise.clone()),
            spectrogram: SpectrogramAnalyzer::new(policy.spectrogram.clone()),
            speaker: SpeakerComparator::new(
                capabilities.speaker_verifier.clone(),
                policy.speaker.decision_threshold,
            ),
            synthetic: SyntheticSpeechDetector::new(capabilities.synthetic_classifier.clone()),
            traits: SpeakerTraitEstimator::new(capabilities.speaker_traits.clone()),
            transcriber: Transcriber::new(capabilities.speech_to_text.clone()),
            transcript_comparator: TranscriptComparator::new(policy.transcript.mismatch_threshold),
        }
    }
}
