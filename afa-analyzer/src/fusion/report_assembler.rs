//! Forensic report assembly
//!
//! Orders extractor outcomes canonically, turns failures into explicit
//! "unavailable" entries and attaches asset properties, spectral findings,
//! conclusions and image artifacts. Produces data only; layout belongs to
//! renderers.

use afa_common::config::{ConclusionPolicy, FindingsPolicy};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::{conclusion, findings};
use crate::extractors::ExtractorRun;
use crate::models::{
    Artifact, AssetSummary, EntryStatus, ForensicReport, ForensicVerdict, Metrics, ReportEntry,
    RequestKind,
};
use crate::types::{AssetRole, AudioAsset};

/// Sample magnitude treated as digital silence in asset summaries
const SAMPLE_SILENCE_THRESHOLD: f32 = 1e-4;

#[derive(Debug, Clone)]
pub struct ForensicReportAssembler {
    analyzer_version: String,
    findings_policy: FindingsPolicy,
    conclusion_policy: ConclusionPolicy,
}

impl ForensicReportAssembler {
    pub fn new(
        analyzer_version: impl Into<String>,
        findings_policy: FindingsPolicy,
        conclusion_policy: ConclusionPolicy,
    ) -> Self {
        Self {
            analyzer_version: analyzer_version.into(),
            findings_policy,
            conclusion_policy,
        }
    }

    pub fn assemble(
        &self,
        request_kind: RequestKind,
        assets: &[(AssetRole, &AudioAsset)],
        runs: Vec<ExtractorRun>,
        verdict: ForensicVerdict,
        artifacts: Vec<Artifact>,
    ) -> ForensicReport {
        let mut entries: Vec<ReportEntry> = runs
            .into_iter()
            .map(|run| ReportEntry {
                extractor: run.kind,
                subjects: run.subjects,
                status: match run.outcome {
                    Ok(record) => EntryStatus::Available { record },
                    Err(e) => EntryStatus::Unavailable {
                        reason: e.to_string(),
                    },
                },
            })
            .collect();
        entries.sort_by(|a, b| (a.extractor, &a.subjects).cmp(&(b.extractor, &b.subjects)));

        let findings = entries
            .iter()
            .filter_map(|entry| match &entry.status {
                EntryStatus::Available { record } => match &record.metrics {
                    Metrics::Spectrogram(metrics) => Some(metrics),
                    _ => None,
                },
                EntryStatus::Unavailable { .. } => None,
            })
            .flat_map(|metrics| findings::interpret(metrics, &self.findings_policy))
            .collect();

        let conclusions = conclusion::conclude(
            entries.iter().filter_map(|entry| match &entry.status {
                EntryStatus::Available { record } => Some(record),
                EntryStatus::Unavailable { .. } => None,
            }),
            &self.conclusion_policy,
        );

        let report = ForensicReport {
            report_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            request_kind,
            analyzer_version: self.analyzer_version.clone(),
            assets: assets
                .iter()
                .map(|(role, asset)| summarize(*role, asset))
                .collect(),
            entries,
            findings,
            conclusions,
            verdict,
            artifacts,
        };

        info!(
            report_id = %report.report_id,
            entries = report.entries.len(),
            unavailable = report.unavailable_entries().count(),
            verdict = %report.verdict,
            "Report assembled"
        );

        report
    }
}

fn summarize(role: AssetRole, asset: &AudioAsset) -> AssetSummary {
    AssetSummary {
        role,
        original_sample_rate: asset.source().original_sample_rate,
        original_channels: asset.source().original_channels,
        sample_rate: asset.sample_rate(),
        channels: asset.channels(),
        duration_seconds: asset.duration_seconds(),
        byte_len: asset.source().byte_len,
        percent_sample_silence: asset.percent_silent_samples(SAMPLE_SILENCE_THRESHOLD),
    }
}
