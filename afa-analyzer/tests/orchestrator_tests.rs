//! Orchestrator integration tests
//!
//! Full requests from upload bytes to report, with scripted capabilities.

mod helpers;

use afa_analyzer::fusion::conclusion::{HIGH_SILENCE, NO_ANOMALIES};
use afa_analyzer::fusion::risk_aggregator::{
    HIGH_SPECTRAL_ANOMALIES, LOW_TRANSCRIPT_SIMILARITY, SPEAKER_MISMATCH, SYNTHETIC_SPEECH,
};
use afa_analyzer::models::{EntryStatus, Metrics, RequestKind, Recommendation, RiskCategory};
use afa_analyzer::types::{AnalysisError, AssetRole, ExtractorKind};
use afa_analyzer::workflow::{Orchestrator, UploadedAudio};
use helpers::{
    generate_flac_bytes, generate_silent_mp3_bytes, generate_wav_bytes, scratch_entries,
    test_config, AudioConfig, MockCapabilities,
};

fn upload(config: &AudioConfig, name: &str) -> UploadedAudio {
    UploadedAudio::new(generate_wav_bytes(config).unwrap(), Some(name))
}

fn tone(duration_seconds: f64) -> AudioConfig {
    AudioConfig {
        duration_seconds,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_single_asset_degrades_when_capabilities_fail() {
    let (_temp, config) = test_config();
    let orchestrator = Orchestrator::new(&config, &MockCapabilities::failing().build(), "test");

    let report = orchestrator
        .run_single_asset_analysis(upload(&tone(1.5), "sample.wav"))
        .await
        .expect("decode failures are the only fatal errors");

    assert_eq!(report.request_kind, RequestKind::SingleAsset);
    let kinds: Vec<ExtractorKind> = report.entries.iter().map(|e| e.extractor).collect();
    assert_eq!(
        kinds,
        vec![
            ExtractorKind::HashDigestor,
            ExtractorKind::MetadataInspector,
            ExtractorKind::SyntheticSpeechDetector,
            ExtractorKind::SpeakerTraitEstimator,
            ExtractorKind::NoiseProfiler,
            ExtractorKind::Transcriber,
            ExtractorKind::SpectrogramAnalyzer,
        ]
    );

    let unavailable: Vec<ExtractorKind> =
        report.unavailable_entries().map(|e| e.extractor).collect();
    assert_eq!(
        unavailable,
        vec![
            ExtractorKind::SyntheticSpeechDetector,
            ExtractorKind::SpeakerTraitEstimator,
            ExtractorKind::Transcriber,
        ]
    );
    for entry in report.unavailable_entries() {
        assert_eq!(entry.subjects, vec![AssetRole::Subject]);
        match &entry.status {
            EntryStatus::Unavailable { reason } => assert!(reason.contains("down")),
            EntryStatus::Available { .. } => unreachable!(),
        }
    }

    // Only the spectrogram can contribute to the verdict
    let factors: Vec<(&str, ExtractorKind)> = report
        .verdict
        .risk_factors
        .iter()
        .map(|f| (f.description.as_str(), f.source))
        .collect();
    assert_eq!(
        factors,
        vec![(HIGH_SPECTRAL_ANOMALIES, ExtractorKind::SpectrogramAnalyzer)]
    );
    assert_eq!(report.verdict.risk_score, 3);
    assert_eq!(report.verdict.category, RiskCategory::Moderate);
    assert_eq!(report.verdict.recommendation, Recommendation::Caution);

    assert_eq!(report.assets.len(), 1);
    assert_eq!(report.assets[0].original_sample_rate, 22_050);
    assert_eq!(report.assets[0].original_channels, 2);
    assert_eq!(report.assets[0].sample_rate, 16_000);
    assert_eq!(report.assets[0].channels, 1);
    assert!((report.assets[0].duration_seconds - 1.5).abs() < 0.01);

    assert_eq!(report.artifacts.len(), 2);
    assert_eq!(report.findings.len(), 7);
}

#[tokio::test]
async fn test_single_asset_records_hash_of_raw_upload() {
    let (_temp, config) = test_config();
    let orchestrator = Orchestrator::new(&config, &MockCapabilities::benign().build(), "test");
    let bytes = generate_wav_bytes(&tone(1.0)).unwrap();

    let report = orchestrator
        .run_single_asset_analysis(UploadedAudio::new(bytes.clone(), Some("a.wav")))
        .await
        .unwrap();

    let digest = report
        .available_records()
        .find_map(|r| match &r.metrics {
            Metrics::Hash(h) => Some(h.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(digest.byte_len, bytes.len() as u64);
    assert_eq!(digest.sha256.len(), 64);
    assert_eq!(digest.md5.len(), 32);

    let transcript = report
        .available_records()
        .find_map(|r| match &r.metrics {
            Metrics::Transcription(t) => Some(t.text.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(transcript, "please confirm the transfer");
}

#[tokio::test]
async fn test_dual_asset_high_risk_scenario() {
    let (_temp, config) = test_config();
    let capabilities = MockCapabilities::benign()
        .verifier(0.21, false)
        .classifier("fake", 0.93)
        .transcripts(|duration| {
            Ok(if duration > 1.5 {
                "abc abc abc".to_string()
            } else {
                "xyz xyz xyz".to_string()
            })
        })
        .build();
    let orchestrator = Orchestrator::new(&config, &capabilities, "test");

    let report = orchestrator
        .run_dual_asset_analysis(upload(&tone(2.0), "ref.wav"), upload(&tone(1.0), "q.wav"))
        .await
        .unwrap();

    assert_eq!(report.request_kind, RequestKind::DualAsset);
    assert_eq!(report.unavailable_entries().count(), 0);
    assert_eq!(report.entries.len(), 10);
    assert_eq!(report.entries[0].subjects, vec![AssetRole::Reference]);
    assert_eq!(report.entries[1].subjects, vec![AssetRole::Questioned]);

    let factors: Vec<(u32, &str, ExtractorKind)> = report
        .verdict
        .risk_factors
        .iter()
        .map(|f| (f.weight, f.description.as_str(), f.source))
        .collect();
    assert_eq!(
        factors,
        vec![
            (3, SPEAKER_MISMATCH, ExtractorKind::SpeakerComparator),
            (4, SYNTHETIC_SPEECH, ExtractorKind::SyntheticSpeechDetector),
            (2, LOW_TRANSCRIPT_SIMILARITY, ExtractorKind::TranscriptComparator),
            (3, HIGH_SPECTRAL_ANOMALIES, ExtractorKind::SpectrogramAnalyzer),
        ]
    );
    assert!((report.verdict.risk_factors[0].observed - 0.21).abs() < 1e-9);
    assert!((report.verdict.risk_factors[1].observed - 0.93).abs() < 1e-9);
    // 12 raw points, capped
    assert_eq!(report.verdict.risk_score, 10);
    assert_eq!(report.verdict.category, RiskCategory::High);
    assert_eq!(report.verdict.recommendation, Recommendation::Reject);

    let similarity = report
        .available_records()
        .find_map(|r| match &r.metrics {
            Metrics::TranscriptComparison(c) => Some(c.similarity_score),
            _ => None,
        })
        .unwrap();
    assert!(similarity < 50.0);

    // Spectrogram artifacts describe the questioned asset only
    assert!(report
        .artifacts
        .iter()
        .all(|a| a.subject == AssetRole::Questioned));
}

#[tokio::test]
async fn test_dual_asset_benign_scenario_scores_tone_only() {
    let (_temp, config) = test_config();
    let orchestrator = Orchestrator::new(&config, &MockCapabilities::benign().build(), "test");

    let report = orchestrator
        .run_dual_asset_analysis(upload(&tone(1.0), "ref.wav"), upload(&tone(1.0), "q.wav"))
        .await
        .unwrap();

    // A pure tone concentrates its energy in a few bright rows of the image
    let descriptions: Vec<&str> = report
        .verdict
        .risk_factors
        .iter()
        .map(|f| f.description.as_str())
        .collect();
    assert_eq!(descriptions, vec![HIGH_SPECTRAL_ANOMALIES]);
    assert_eq!(report.verdict.risk_score, 3);
    assert_eq!(report.verdict.category, RiskCategory::Moderate);
    assert_eq!(report.verdict.recommendation, Recommendation::Caution);

    let noise = report
        .available_records()
        .find_map(|r| match &r.metrics {
            Metrics::Noise(n) => Some((r.subjects.clone(), n.clone())),
            _ => None,
        })
        .unwrap();
    assert_eq!(noise.0, vec![AssetRole::Reference, AssetRole::Questioned]);
}

#[tokio::test]
async fn test_dual_asset_benign_scenario_accepts_without_image_rule() {
    let (_temp, mut config) = test_config();
    config.policy.risk.moderate_anomaly_count = u64::MAX;
    config.policy.risk.high_anomaly_count = u64::MAX;
    let orchestrator = Orchestrator::new(&config, &MockCapabilities::benign().build(), "test");

    let report = orchestrator
        .run_dual_asset_analysis(upload(&tone(1.0), "ref.wav"), upload(&tone(1.0), "q.wav"))
        .await
        .unwrap();

    assert!(report.verdict.risk_factors.is_empty());
    assert_eq!(report.verdict.risk_score, 0);
    assert_eq!(report.verdict.category, RiskCategory::Low);
    assert_eq!(report.verdict.recommendation, Recommendation::Accept);

    let traits = report
        .available_records()
        .find_map(|r| match &r.metrics {
            Metrics::SpeakerTraits(t) => Some((r.subjects.clone(), t.summary.clone())),
            _ => None,
        })
        .unwrap();
    assert_eq!(traits.0, vec![AssetRole::Questioned]);
    assert_eq!(traits.1, "Voice characteristics suggest female, likely adult.");
}

#[tokio::test]
async fn test_silence_gap_is_concluded_for_questioned_asset() {
    let (_temp, config) = test_config();
    let orchestrator = Orchestrator::new(&config, &MockCapabilities::benign().build(), "test");
    let gapped = AudioConfig {
        duration_seconds: 1.5,
        silence_gap_start: Some(0.2),
        silence_gap_duration: Some(1.0),
        ..Default::default()
    };

    let report = orchestrator
        .run_dual_asset_analysis(upload(&tone(1.5), "ref.wav"), upload(&gapped, "q.wav"))
        .await
        .unwrap();

    assert!(report.conclusions.iter().any(|c| c == HIGH_SILENCE));
    assert!(!report.conclusions.iter().any(|c| c == NO_ANOMALIES));

    let silence = report
        .available_records()
        .find_map(|r| match &r.metrics {
            Metrics::Metadata(m) if r.subjects == vec![AssetRole::Questioned] => {
                Some(m.percent_silence)
            }
            _ => None,
        })
        .unwrap();
    assert!(silence > 50.0, "questioned asset silence {}", silence);
}

#[tokio::test]
async fn test_flac_upload_runs_full_single_analysis() {
    let (_temp, config) = test_config();
    let orchestrator = Orchestrator::new(&config, &MockCapabilities::benign().build(), "test");
    let bytes = generate_flac_bytes(&tone(2.0));

    let report = orchestrator
        .run_single_asset_analysis(UploadedAudio::new(bytes, Some("call.flac")))
        .await
        .unwrap();

    assert_eq!(report.entries.len(), 7);
    assert_eq!(report.unavailable_entries().count(), 0);

    let metadata = report
        .available_records()
        .find_map(|r| match &r.metrics {
            Metrics::Metadata(m) => Some(m.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(metadata.original_sample_rate, 22_050);
    assert_eq!(metadata.original_channels, 2);
    assert!(metadata.bitrate.is_some());
    assert_eq!(metadata.bitrate_stable, Some(true));
}

#[tokio::test]
async fn test_mp3_upload_normalizes_before_analysis() {
    let (_temp, config) = test_config();
    let orchestrator = Orchestrator::new(&config, &MockCapabilities::benign().build(), "test");

    let report = orchestrator
        .run_single_asset_analysis(UploadedAudio::new(
            generate_silent_mp3_bytes(40),
            Some("voicemail.mp3"),
        ))
        .await
        .unwrap();

    assert_eq!(report.assets[0].original_sample_rate, 44_100);
    assert_eq!(report.assets[0].original_channels, 1);
    assert_eq!(report.assets[0].sample_rate, 16_000);
    assert!((report.assets[0].percent_sample_silence - 100.0).abs() < 1e-9);
    assert_eq!(report.conclusions, vec![HIGH_SILENCE.to_string()]);
}

#[tokio::test]
async fn test_garbage_upload_is_unsupported_format() {
    let (_temp, config) = test_config();
    let orchestrator = Orchestrator::new(&config, &MockCapabilities::benign().build(), "test");

    let result = orchestrator
        .run_single_asset_analysis(UploadedAudio::new(
            b"definitely not an audio container".to_vec(),
            Some("notes.txt"),
        ))
        .await;

    assert!(matches!(result, Err(AnalysisError::UnsupportedFormat(_))));
    assert!(scratch_entries(&config.scratch.root).is_empty());
}

#[tokio::test]
async fn test_scratch_released_after_request() {
    let (_temp, config) = test_config();
    let orchestrator = Orchestrator::new(&config, &MockCapabilities::failing().build(), "test");

    orchestrator
        .run_dual_asset_analysis(upload(&tone(1.0), "ref.wav"), upload(&tone(1.0), "q.wav"))
        .await
        .unwrap();

    assert!(
        scratch_entries(&config.scratch.root).is_empty(),
        "scratch root should be empty, found {:?}",
        scratch_entries(&config.scratch.root)
    );
}

#[tokio::test]
async fn test_verification_failure_propagates() {
    let (_temp, config) = test_config();
    let capabilities = MockCapabilities::benign().failing_verifier().build();
    let orchestrator = Orchestrator::new(&config, &capabilities, "test");

    let result = orchestrator
        .run_speaker_verification(upload(&tone(1.0), "a.wav"), upload(&tone(1.0), "b.wav"))
        .await;

    assert!(matches!(result, Err(AnalysisError::VerificationUnavailable(_))));
    assert!(scratch_entries(&config.scratch.root).is_empty());
}

#[tokio::test]
async fn test_verification_reports_verifier_decision() {
    let (_temp, config) = test_config();
    let capabilities = MockCapabilities::benign().verifier(0.77, true).build();
    let orchestrator = Orchestrator::new(&config, &capabilities, "test");

    let result = orchestrator
        .run_speaker_verification(upload(&tone(1.0), "a.wav"), upload(&tone(1.0), "b.wav"))
        .await
        .unwrap();

    assert!((result.similarity_score - 0.77).abs() < 1e-9);
    assert!(result.same_speaker);
    assert_eq!(result.decision_threshold, None);
}

#[tokio::test]
async fn test_concurrent_requests_are_isolated() {
    let (_temp, config) = test_config();
    let orchestrator = Orchestrator::new(&config, &MockCapabilities::benign().build(), "test");

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let orchestrator = orchestrator.clone();
            let audio = upload(&tone(0.5 + i as f64 * 0.25), "c.wav");
            tokio::spawn(async move { orchestrator.run_single_asset_analysis(audio).await })
        })
        .collect();

    let mut report_ids = Vec::new();
    for (i, handle) in handles.into_iter().enumerate() {
        let report = handle.await.unwrap().unwrap();
        let expected = 0.5 + i as f64 * 0.25;
        assert!((report.assets[0].duration_seconds - expected).abs() < 0.01);
        report_ids.push(report.report_id);
    }
    report_ids.sort();
    report_ids.dedup();
    assert_eq!(report_ids.len(), 4);
    assert!(scratch_entries(&config.scratch.root).is_empty());
}
