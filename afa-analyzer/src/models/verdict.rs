//! Aggregated forensic verdict

use serde::{Deserialize, Serialize};

use crate::types::ExtractorKind;

/// One scored reason contributing to the verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub weight: u32,
    /// Fixed rule label, e.g. "high spectral anomalies"
    pub description: String,
    /// Extractor whose record triggered the rule
    pub source: ExtractorKind,
    /// Value that tripped the rule: similarity, confidence or pixel count
    pub observed: f64,
}

impl RiskFactor {
    pub fn new(weight: u32, description: &str, source: ExtractorKind, observed: f64) -> Self {
        Self {
            weight,
            description: description.to_string(),
            source,
            observed,
        }
    }
}

/// Risk band derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskCategory {
    Low,
    Moderate,
    High,
}

impl RiskCategory {
    /// Recommendation mapped 1:1 from the category
    pub fn recommendation(&self) -> Recommendation {
        match self {
            RiskCategory::Low => Recommendation::Accept,
            RiskCategory::Moderate => Recommendation::Caution,
            RiskCategory::High => Recommendation::Reject,
        }
    }

    /// One-line assessment used by renderers
    pub fn assessment(&self) -> &'static str {
        match self {
            RiskCategory::Low => "Audio appears consistent with an authentic recording",
            RiskCategory::Moderate => "Some concerning indicators present",
            RiskCategory::High => {
                "Multiple indicators suggest potential audio manipulation or synthesis"
            }
        }
    }
}

/// Action advised to the examiner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Accept,
    Caution,
    Reject,
}

/// Verdict of one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForensicVerdict {
    /// Clamped to the configured maximum (10 by default)
    pub risk_score: u32,
    /// In rule-table order
    pub risk_factors: Vec<RiskFactor>,
    pub category: RiskCategory,
    pub recommendation: Recommendation,
}

impl std::fmt::Display for ForensicVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?} risk (score {}, {} factors) -> {:?}",
            self.category,
            self.risk_score,
            self.risk_factors.len(),
            self.recommendation
        )
    }
}
