//! Structured forensic report (data only, no layout)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::metrics::MetricsRecord;
use super::verdict::ForensicVerdict;
use crate::types::{AssetRole, ExtractorKind};

/// Request shape the report was produced for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    SingleAsset,
    DualAsset,
}

/// Complete report of one request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForensicReport {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub request_kind: RequestKind,
    pub analyzer_version: String,
    pub assets: Vec<AssetSummary>,
    /// One entry per extractor run, in canonical order
    pub entries: Vec<ReportEntry>,
    pub findings: Vec<Finding>,
    /// Plain-language conclusions about the examined asset
    pub conclusions: Vec<String>,
    pub verdict: ForensicVerdict,
    pub artifacts: Vec<Artifact>,
}

impl ForensicReport {
    /// Records of every extractor that succeeded
    pub fn available_records(&self) -> impl Iterator<Item = &MetricsRecord> {
        self.entries.iter().filter_map(|e| match &e.status {
            EntryStatus::Available { record } => Some(record),
            EntryStatus::Unavailable { .. } => None,
        })
    }

    /// Entries whose extractor failed
    pub fn unavailable_entries(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, EntryStatus::Unavailable { .. }))
    }

    pub fn entry(&self, extractor: ExtractorKind, subject: AssetRole) -> Option<&ReportEntry> {
        self.entries
            .iter()
            .find(|e| e.extractor == extractor && e.subjects.contains(&subject))
    }
}

/// Audio properties of one uploaded asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSummary {
    pub role: AssetRole,
    pub original_sample_rate: u32,
    pub original_channels: usize,
    pub sample_rate: u32,
    pub channels: usize,
    pub duration_seconds: f64,
    pub byte_len: u64,
    /// Share of normalized samples with |x| < 1e-4
    pub percent_sample_silence: f64,
}

/// Outcome of one extractor run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub extractor: ExtractorKind,
    pub subjects: Vec<AssetRole>,
    #[serde(flatten)]
    pub status: EntryStatus,
}

/// Available metrics or an explicit unavailable marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntryStatus {
    Available { record: MetricsRecord },
    Unavailable { reason: String },
}

/// Informational interpretation of a spectral metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub topic: String,
    pub observation: String,
    /// True when the observation points at possible tampering
    pub flagged: bool,
}

/// Binary artifact produced during analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub subject: AssetRole,
    pub media_type: String,
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn png(name: impl Into<String>, subject: AssetRole, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            subject,
            media_type: "image/png".to_string(),
            bytes,
        }
    }
}

/// Serialize byte buffers as standard base64 strings
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_serializes_as_base64() {
        let artifact = Artifact::png("spectrogram", AssetRole::Subject, vec![0x89, b'P', b'N', b'G']);
        let json = serde_json::to_value(&artifact).unwrap();
        assert_eq!(json["bytes"], "iVBORw==");
        assert_eq!(json["media_type"], "image/png");

        let back: Artifact = serde_json::from_value(json).unwrap();
        assert_eq!(back.bytes, vec![0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_unavailable_entry_serializes_marker() {
        let entry = ReportEntry {
            extractor: ExtractorKind::SpeakerComparator,
            subjects: vec![AssetRole::Reference, AssetRole::Questioned],
            status: EntryStatus::Unavailable {
                reason: "verifier offline".to_string(),
            },
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["reason"], "verifier offline");
    }
}
