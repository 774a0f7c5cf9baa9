//! Request orchestration
//!
//! **Flow:** scratch arena → normalize asset(s) → extractors (concurrent) →
//! risk aggregation → report assembly → arena release.
//!
//! **Error isolation:** a decode failure on a required asset aborts the
//! request. Any single extractor failure is recorded as an unavailable entry
//! and excluded from aggregation; the remaining extractors still run. The
//! verify-only request is the exception: its only extractor failing is the
//! request failing.
//!
//! CPU-bound work (decode, resample, hashing, metadata, noise, spectrogram)
//! runs on the blocking pool so capability calls of the same request proceed
//! in parallel.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use afa_common::config::{AnalysisConfig, ScratchConfig};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::capabilities::Capabilities;
use crate::extractors::{ExtractorRun, ExtractorSet, SpectrogramAnalysis};
use crate::fusion::{ForensicReportAssembler, RiskAggregator};
use crate::models::{
    Artifact, AudioMetadata, ForensicReport, HashDigest, Metrics, MetricsRecord, NoiseMetrics,
    RequestKind, SpeakerComparisonResult, TranscriptComparisonResult,
};
use crate::types::{AnalysisError, AssetRole, AudioAsset, ExtractorKind};
use crate::utils::{AudioNormalizer, ScratchArena};

/// Raw upload handed to the orchestrator
#[derive(Debug, Clone)]
pub struct UploadedAudio {
    bytes: Arc<[u8]>,
    extension_hint: Option<String>,
}

impl UploadedAudio {
    /// `file_name` only serves as a container hint
    pub fn new(bytes: Vec<u8>, file_name: Option<&str>) -> Self {
        let extension_hint = file_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        Self {
            bytes: Arc::from(bytes),
            extension_hint,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn extension_hint(&self) -> Option<&str> {
        self.extension_hint.as_deref()
    }
}

/// Drives one request from uploads to report
#[derive(Clone)]
pub struct Orchestrator {
    normalizer: AudioNormalizer,
    extractors: ExtractorSet,
    aggregator: RiskAggregator,
    assembler: ForensicReportAssembler,
    scratch: ScratchConfig,
}

impl Orchestrator {
    pub fn new(config: &AnalysisConfig, capabilities: &Capabilities, analyzer_version: &str) -> Self {
        Self {
            normalizer: AudioNormalizer::new(config.audio.target_sample_rate),
            extractors: ExtractorSet::new(&config.policy, capabilities),
            aggregator: RiskAggregator::new(config.policy.risk.clone()),
            assembler: ForensicReportAssembler::new(
                analyzer_version,
                config.policy.findings.clone(),
                config.policy.conclusion.clone(),
            ),
            scratch: config.scratch.clone(),
        }
    }

    /// Single-asset analysis: hash, metadata, synthetic detection, speaker
    /// traits, noise profile, transcript and spectrogram of one upload
    ///
    /// # Errors
    /// Only normalization failures (`UnsupportedFormat`, `EmptyAudio`) and
    /// scratch setup failures abort the request.
    pub async fn run_single_asset_analysis(
        &self,
        upload: UploadedAudio,
    ) -> Result<ForensicReport, AnalysisError> {
        let arena = Arc::new(ScratchArena::create(&self.scratch)?);
        info!(request = %arena.id(), bytes = upload.bytes().len(), "Single-asset analysis started");

        let request = arena.id();
        let result = self.single_asset(upload, Arc::clone(&arena)).await;
        release(arena).await;
        log_failure(request, &result);
        result
    }

    /// Dual-asset analysis: everything of the single-asset request on the
    /// questioned upload, plus hash and metadata of the reference, speaker
    /// comparison, paired noise profile and transcript comparison
    pub async fn run_dual_asset_analysis(
        &self,
        reference: UploadedAudio,
        questioned: UploadedAudio,
    ) -> Result<ForensicReport, AnalysisError> {
        let arena = Arc::new(ScratchArena::create(&self.scratch)?);
        info!(
            request = %arena.id(),
            reference_bytes = reference.bytes().len(),
            questioned_bytes = questioned.bytes().len(),
            "Dual-asset analysis started"
        );

        let request = arena.id();
        let result = self.dual_asset(reference, questioned, Arc::clone(&arena)).await;
        release(arena).await;
        log_failure(request, &result);
        result
    }

    /// Speaker verification only
    ///
    /// # Errors
    /// Verifier failures propagate as `VerificationUnavailable`.
    pub async fn run_speaker_verification(
        &self,
        first: UploadedAudio,
        second: UploadedAudio,
    ) -> Result<SpeakerComparisonResult, AnalysisError> {
        let arena = Arc::new(ScratchArena::create(&self.scratch)?);
        info!(request = %arena.id(), "Speaker verification started");

        let result: Result<SpeakerComparisonResult, AnalysisError> = async {
            let (a, b) = tokio::join!(
                self.normalize(first, Arc::clone(&arena), "first"),
                self.normalize(second, Arc::clone(&arena), "second"),
            );
            let (a, b) = (a?, b?);
            observe(
                ExtractorKind::SpeakerComparator,
                self.extractors.speaker.compare(&a, &b),
            )
            .await
        }
        .await;

        let request = arena.id();
        release(arena).await;
        log_failure(request, &result);
        result
    }

    async fn single_asset(
        &self,
        upload: UploadedAudio,
        arena: Arc<ScratchArena>,
    ) -> Result<ForensicReport, AnalysisError> {
        let role = AssetRole::Subject;
        let asset = self.normalize(upload.clone(), arena, "subject").await?;

        let (hash, metadata, synthetic, traits, noise, transcript, spectrogram) = tokio::join!(
            observe(ExtractorKind::HashDigestor, self.hash(upload)),
            observe(ExtractorKind::MetadataInspector, self.metadata(Arc::clone(&asset))),
            observe(
                ExtractorKind::SyntheticSpeechDetector,
                self.extractors.synthetic.detect(&asset),
            ),
            observe(
                ExtractorKind::SpeakerTraitEstimator,
                self.extractors.traits.estimate(&asset),
            ),
            observe(ExtractorKind::NoiseProfiler, self.noise(Arc::clone(&asset), None)),
            observe(
                ExtractorKind::Transcriber,
                self.extractors.transcriber.transcribe(&asset),
            ),
            observe(
                ExtractorKind::SpectrogramAnalyzer,
                self.spectrogram(Arc::clone(&asset)),
            ),
        );

        let (spectrogram, artifacts) = split_spectrogram(spectrogram, role);
        let runs = vec![
            single_run(ExtractorKind::HashDigestor, role, hash.map(Metrics::Hash)),
            single_run(
                ExtractorKind::MetadataInspector,
                role,
                metadata.map(Metrics::Metadata),
            ),
            single_run(
                ExtractorKind::SyntheticSpeechDetector,
                role,
                synthetic.map(Metrics::Synthetic),
            ),
            single_run(
                ExtractorKind::SpeakerTraitEstimator,
                role,
                traits.map(Metrics::SpeakerTraits),
            ),
            single_run(ExtractorKind::NoiseProfiler, role, noise.map(Metrics::Noise)),
            single_run(
                ExtractorKind::Transcriber,
                role,
                transcript.map(Metrics::Transcription),
            ),
            single_run(ExtractorKind::SpectrogramAnalyzer, role, spectrogram),
        ];

        Ok(self.finish(RequestKind::SingleAsset, &[(role, &*asset)], runs, artifacts))
    }

    async fn dual_asset(
        &self,
        reference_upload: UploadedAudio,
        questioned_upload: UploadedAudio,
        arena: Arc<ScratchArena>,
    ) -> Result<ForensicReport, AnalysisError> {
        let (reference, questioned) = tokio::join!(
            self.normalize(reference_upload.clone(), Arc::clone(&arena), "reference"),
            self.normalize(questioned_upload.clone(), Arc::clone(&arena), "questioned"),
        );
        let (reference, questioned) = (reference?, questioned?);

        let (
            ref_hash,
            q_hash,
            ref_metadata,
            q_metadata,
            speaker,
            synthetic,
            traits,
            noise,
            transcript,
            spectrogram,
        ) = tokio::join!(
            observe(ExtractorKind::HashDigestor, self.hash(reference_upload)),
            observe(ExtractorKind::HashDigestor, self.hash(questioned_upload)),
            observe(ExtractorKind::MetadataInspector, self.metadata(Arc::clone(&reference))),
            observe(ExtractorKind::MetadataInspector, self.metadata(Arc::clone(&questioned))),
            observe(
                ExtractorKind::SpeakerComparator,
                self.extractors.speaker.compare(&reference, &questioned),
            ),
            observe(
                ExtractorKind::SyntheticSpeechDetector,
                self.extractors.synthetic.detect(&questioned),
            ),
            observe(
                ExtractorKind::SpeakerTraitEstimator,
                self.extractors.traits.estimate(&questioned),
            ),
            observe(
                ExtractorKind::NoiseProfiler,
                self.noise(Arc::clone(&reference), Some(Arc::clone(&questioned))),
            ),
            observe(
                ExtractorKind::TranscriptComparator,
                self.compare_transcripts(&reference, &questioned),
            ),
            observe(
                ExtractorKind::SpectrogramAnalyzer,
                self.spectrogram(Arc::clone(&questioned)),
            ),
        );

        let (r, q) = (AssetRole::Reference, AssetRole::Questioned);
        let (spectrogram, artifacts) = split_spectrogram(spectrogram, q);
        let runs = vec![
            single_run(ExtractorKind::HashDigestor, r, ref_hash.map(Metrics::Hash)),
            single_run(ExtractorKind::HashDigestor, q, q_hash.map(Metrics::Hash)),
            single_run(
                ExtractorKind::MetadataInspector,
                r,
                ref_metadata.map(Metrics::Metadata),
            ),
            single_run(
                ExtractorKind::MetadataInspector,
                q,
                q_metadata.map(Metrics::Metadata),
            ),
            dual_run(ExtractorKind::SpeakerComparator, r, q, speaker.map(Metrics::Speaker)),
            single_run(
                ExtractorKind::SyntheticSpeechDetector,
                q,
                synthetic.map(Metrics::Synthetic),
            ),
            single_run(
                ExtractorKind::SpeakerTraitEstimator,
                q,
                traits.map(Metrics::SpeakerTraits),
            ),
            dual_run(ExtractorKind::NoiseProfiler, r, q, noise.map(Metrics::Noise)),
            dual_run(
                ExtractorKind::TranscriptComparator,
                r,
                q,
                transcript.map(Metrics::TranscriptComparison),
            ),
            single_run(ExtractorKind::SpectrogramAnalyzer, q, spectrogram),
        ];

        Ok(self.finish(
            RequestKind::DualAsset,
            &[(r, &*reference), (q, &*questioned)],
            runs,
            artifacts,
        ))
    }

    fn finish(
        &self,
        kind: RequestKind,
        assets: &[(AssetRole, &AudioAsset)],
        runs: Vec<ExtractorRun>,
        artifacts: Vec<Artifact>,
    ) -> ForensicReport {
        let verdict = self
            .aggregator
            .aggregate(runs.iter().filter_map(|run| run.outcome.as_ref().ok()));
        self.assembler.assemble(kind, assets, runs, verdict, artifacts)
    }

    async fn normalize(
        &self,
        upload: UploadedAudio,
        arena: Arc<ScratchArena>,
        label: &'static str,
    ) -> Result<Arc<AudioAsset>, AnalysisError> {
        let normalizer = self.normalizer.clone();
        let asset = blocking("normalize", move || {
            normalizer.normalize_into(upload.bytes(), upload.extension_hint(), &arena, label)
        })
        .await?;

        debug!(
            asset = label,
            duration_seconds = asset.duration_seconds(),
            original_rate = asset.source().original_sample_rate,
            "Asset normalized"
        );
        Ok(Arc::new(asset))
    }

    async fn hash(&self, upload: UploadedAudio) -> Result<HashDigest, AnalysisError> {
        let digestor = self.extractors.hash;
        blocking("hash", move || Ok(digestor.digest_bytes(upload.bytes()))).await
    }

    async fn metadata(&self, asset: Arc<AudioAsset>) -> Result<AudioMetadata, AnalysisError> {
        let inspector = self.extractors.metadata.clone();
        blocking("metadata", move || Ok(inspector.inspect(&asset))).await
    }

    async fn noise(
        &self,
        asset: Arc<AudioAsset>,
        other: Option<Arc<AudioAsset>>,
    ) -> Result<NoiseMetrics, AnalysisError> {
        let profiler = self.extractors.noise.clone();
        blocking("noise", move || Ok(profiler.profile(&asset, other.as_deref()))).await
    }

    async fn spectrogram(&self, asset: Arc<AudioAsset>) -> Result<SpectrogramAnalysis, AnalysisError> {
        let analyzer = self.extractors.spectrogram.clone();
        blocking("spectrogram", move || analyzer.analyze(&asset)).await
    }

    async fn compare_transcripts(
        &self,
        reference: &AudioAsset,
        questioned: &AudioAsset,
    ) -> Result<TranscriptComparisonResult, AnalysisError> {
        let (reference_text, questioned_text) = tokio::join!(
            self.extractors.transcriber.transcribe(reference),
            self.extractors.transcriber.transcribe(questioned),
        );
        Ok(self
            .extractors
            .transcript_comparator
            .compare(&reference_text?.text, &questioned_text?.text))
    }
}

/// Run CPU-bound work on the blocking pool
async fn blocking<T, F>(task: &'static str, work: F) -> Result<T, AnalysisError>
where
    F: FnOnce() -> Result<T, AnalysisError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AnalysisError::Internal(format!("{} task failed: {}", task, e)))?
}

/// Time an extractor and log its outcome
async fn observe<T, F>(kind: ExtractorKind, work: F) -> Result<T, AnalysisError>
where
    F: Future<Output = Result<T, AnalysisError>>,
{
    let start = Instant::now();
    let outcome = work.await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    match &outcome {
        Ok(_) => debug!(extractor = %kind, elapsed_ms, "Extractor completed"),
        Err(e) => warn!(
            extractor = %kind,
            elapsed_ms,
            error = %e,
            "Extractor unavailable (request continues)"
        ),
    }
    outcome
}

fn log_failure<T>(request: Uuid, result: &Result<T, AnalysisError>) {
    if let Err(e) = result {
        error!(request = %request, error = %e, "Request failed");
    }
}

async fn release(arena: Arc<ScratchArena>) {
    match Arc::try_unwrap(arena) {
        Ok(arena) => {
            if let Err(e) = tokio::task::spawn_blocking(move || arena.release()).await {
                warn!(error = %e, "Scratch release task failed");
            }
        }
        // Still referenced by a detached task; the last owner releases on drop
        Err(shared) => drop(shared),
    }
}

fn single_run(
    kind: ExtractorKind,
    role: AssetRole,
    outcome: Result<Metrics, AnalysisError>,
) -> ExtractorRun {
    ExtractorRun::new(
        kind,
        vec![role],
        outcome.map(|metrics| MetricsRecord::single(kind, role, metrics)),
    )
}

fn dual_run(
    kind: ExtractorKind,
    first: AssetRole,
    second: AssetRole,
    outcome: Result<Metrics, AnalysisError>,
) -> ExtractorRun {
    ExtractorRun::new(
        kind,
        vec![first, second],
        outcome.map(|metrics| MetricsRecord::dual(kind, first, second, metrics)),
    )
}

fn split_spectrogram(
    outcome: Result<SpectrogramAnalysis, AnalysisError>,
    role: AssetRole,
) -> (Result<Metrics, AnalysisError>, Vec<Artifact>) {
    match outcome {
        Ok(analysis) => (
            Ok(Metrics::Spectrogram(analysis.metrics)),
            vec![
                Artifact::png("spectrogram", role, analysis.spectrogram_png),
                Artifact::png("spectrogram_highlighted", role, analysis.highlighted_png),
            ],
        ),
        Err(e) => (Err(e), Vec::new()),
    }
}
