//! Transcription and transcript comparison
//!
//! Similarity is the Ratcliff/Obershelp ratio `2·M / (|a| + |b|)`, where `M`
//! is the total size of the matching blocks found by recursively taking the
//! longest common substring and recursing on both sides. Computed over
//! Unicode scalar values, case-sensitive, without junk heuristics.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::capabilities::SpeechToText;
use crate::models::{Transcript, TranscriptComparisonResult};
use crate::types::{AnalysisError, AudioAsset};

/// Speech-to-text wrapper
#[derive(Clone)]
pub struct Transcriber {
    speech_to_text: Arc<dyn SpeechToText>,
}

impl Transcriber {
    pub fn new(speech_to_text: Arc<dyn SpeechToText>) -> Self {
        Self { speech_to_text }
    }

    pub async fn transcribe(&self, asset: &AudioAsset) -> Result<Transcript, AnalysisError> {
        let text = self
            .speech_to_text
            .transcribe(asset)
            .await
            .map_err(|e| AnalysisError::TranscriptionUnavailable(e.to_string()))?;

        debug!(
            capability = self.speech_to_text.name(),
            chars = text.len(),
            "Transcription received"
        );

        Ok(Transcript {
            text: text.trim().to_string(),
        })
    }
}

/// Scores how closely two transcripts agree
#[derive(Debug, Clone)]
pub struct TranscriptComparator {
    mismatch_threshold: f64,
}

impl TranscriptComparator {
    pub fn new(mismatch_threshold: f64) -> Self {
        Self { mismatch_threshold }
    }

    pub fn compare(&self, reference: &str, questioned: &str) -> TranscriptComparisonResult {
        let similarity = (similarity_ratio(reference, questioned) * 100.0 * 100.0).round() / 100.0;

        TranscriptComparisonResult {
            similarity_score: similarity,
            has_mismatch: similarity < self.mismatch_threshold,
            reference_text: reference.to_string(),
            questioned_text: questioned.to_string(),
        }
    }
}

/// Ratcliff/Obershelp similarity in [0, 1]
///
/// Two empty strings are identical (1.0).
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut b_index: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        b_index.entry(*c).or_default().push(j);
    }

    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, &b_index, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`
///
/// Ties resolve to the earliest start in `a`, then in `b`.
fn longest_match(
    a: &[char],
    b_index: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    let mut run_lengths: HashMap<usize, usize> = HashMap::new();

    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next_lengths = HashMap::new();
        if let Some(positions) = b_index.get(c) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j
                    .checked_sub(1)
                    .and_then(|prev| run_lengths.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next_lengths.insert(j, k);
                if k > best_size {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_size = k;
                }
            }
        }
        run_lengths = next_lengths;
    }

    (best_i, best_j, best_size)
}
