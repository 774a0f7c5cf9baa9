//! Spectrogram analysis
//!
//! **Pipeline:**
//! 1. STFT (Hann window, centered frames, zero padded) via rustfft into a
//!    `[bin, frame]` power matrix
//! 2. Magnitude → dB referenced to the spectrogram peak, clipped at `db_floor`
//! 3. Frame energy, abrupt changes, frequency spikes, silence, low band variance
//! 4. Per-frame spectral flatness and entropy from the power spectrogram
//! 5. Slaney mel filterbank projection → mel dB → band-group variances
//! 6. Fixed-size grayscale rendering and bright-region detection (see
//!    `spectrogram_image`)

use std::f64::consts::PI;
use std::ops::Range;

use afa_common::config::SpectrogramPolicy;
use ndarray::{s, Array1, Array2, ArrayView1, Axis, Zip};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use tracing::debug;

use super::spectrogram_image::{self, RenderedSpectrogram};
use super::stats;
use crate::models::{MelBandVariances, SpectrogramMetrics};
use crate::types::{AnalysisError, AudioAsset};

/// Smallest magnitude distinguished from digital silence
const AMIN: f64 = 1e-5;

/// Smallest power used by flatness and mel dB
const POWER_AMIN: f64 = 1e-10;

/// Additive guard in entropy normalization
const ENTROPY_EPS: f64 = 1e-8;

/// Metrics plus the rendered images
#[derive(Debug, Clone)]
pub struct SpectrogramAnalysis {
    pub metrics: SpectrogramMetrics,
    /// Grayscale PNG, low frequencies at the bottom
    pub spectrogram_png: Vec<u8>,
    /// RGB PNG with anomalous regions outlined in red
    pub highlighted_png: Vec<u8>,
}

/// Spectral tampering indicators
#[derive(Debug, Clone)]
pub struct SpectrogramAnalyzer {
    policy: SpectrogramPolicy,
}

impl SpectrogramAnalyzer {
    pub fn new(policy: SpectrogramPolicy) -> Self {
        Self { policy }
    }

    pub fn analyze(&self, asset: &AudioAsset) -> Result<SpectrogramAnalysis, AnalysisError> {
        let n_fft = self.policy.n_fft.max(2);
        let hop = self.policy.hop_length.max(1);
        let sample_rate = asset.sample_rate() as f64;

        let power = power_spectrogram(asset.samples(), n_fft, hop);
        let magnitude = power.mapv(f64::sqrt);
        let db = amplitude_to_db(&magnitude, self.policy.db_floor);

        let frame_energy = db.mapv(|v| v * v).sum_axis(Axis(0));
        let flatness: Array1<f64> = power.axis_iter(Axis(1)).map(spectral_flatness).collect();
        let entropy: Array1<f64> = power.axis_iter(Axis(1)).map(spectral_entropy).collect();

        let RenderedSpectrogram {
            image,
            spectrogram_png,
        } = spectrogram_image::render(
            db.view(),
            self.policy.db_floor,
            self.policy.image_width,
            self.policy.image_height,
        )?;
        let detection =
            spectrogram_image::detect_anomalies(&image, self.policy.image_intensity_threshold);
        let highlighted_png = spectrogram_image::encode_png_rgb(&detection.highlighted)?;

        let (average_energy, energy_std) = mean_std(&frame_energy);
        let (spectral_flatness_mean, spectral_flatness_std) = mean_std(&flatness);
        let (spectral_entropy_mean, spectral_entropy_std) = mean_std(&entropy);

        let metrics = SpectrogramMetrics {
            average_energy,
            energy_std,
            percent_silence: self.percent_silence(&magnitude, &db),
            frequency_spike_count: self.frequency_spikes(&db),
            low_freq_variance: self.low_freq_variance(&db, sample_rate, n_fft),
            abrupt_change_count: self.abrupt_changes(&frame_energy),
            spectral_flatness_mean,
            spectral_flatness_std,
            spectral_entropy_mean,
            spectral_entropy_std,
            mel_band_variances: self.mel_band_variances(&power, sample_rate, n_fft),
            image_anomalies: Some(detection.metrics),
        };

        debug!(
            frames = db.ncols(),
            silence = metrics.percent_silence,
            spikes = metrics.frequency_spike_count,
            abrupt = metrics.abrupt_change_count,
            anomalies = ?metrics.anomaly_count(),
            "Spectrogram analyzed"
        );

        Ok(SpectrogramAnalysis {
            metrics,
            spectrogram_png,
            highlighted_png,
        })
    }

    /// Percentage of silent dB cells
    ///
    /// Cells at the dB floor or below `AMIN` are always silent. The remaining
    /// cells are silent when below their own mean minus one standard
    /// deviation.
    fn percent_silence(&self, magnitude: &Array2<f64>, db: &Array2<f64>) -> f64 {
        let mut floor_cells = 0usize;
        let mut active = Vec::new();

        Zip::from(magnitude).and(db).for_each(|&m, &v| {
            if m < AMIN || v <= self.policy.db_floor {
                floor_cells += 1;
            } else {
                active.push(v);
            }
        });

        let total = floor_cells + active.len();
        if total == 0 {
            return 0.0;
        }

        let threshold = stats::mean(&active) - stats::std_dev(&active);
        let quiet = active.iter().filter(|v| **v < threshold).count();

        round2((floor_cells + quiet) as f64 / total as f64 * 100.0)
    }

    /// Bins whose time-averaged dB exceeds mean + k·σ across bins
    fn frequency_spikes(&self, db: &Array2<f64>) -> usize {
        let Some(bin_means) = db.mean_axis(Axis(1)) else {
            return 0;
        };
        let (mean, std) = mean_std(&bin_means);
        let cutoff = mean + self.policy.spike_sigma * std;
        bin_means.iter().filter(|m| **m > cutoff).count()
    }

    /// Variance of dB cells in bins below the low frequency cutoff
    fn low_freq_variance(&self, db: &Array2<f64>, sample_rate: f64, n_fft: usize) -> f64 {
        let bin_hz = sample_rate / n_fft as f64;
        let low_bins = (0..db.nrows())
            .take_while(|k| (*k as f64) * bin_hz < self.policy.low_freq_cutoff_hz)
            .count();
        if low_bins == 0 {
            return 0.0;
        }
        db.slice(s![..low_bins, ..]).var(0.0)
    }

    /// Consecutive frame energy deltas beyond k·σ of the delta distribution
    fn abrupt_changes(&self, frame_energy: &Array1<f64>) -> usize {
        if frame_energy.len() < 2 {
            return 0;
        }
        let deltas = &frame_energy.slice(s![1..]) - &frame_energy.slice(s![..-1]);
        let cutoff = self.policy.abrupt_change_sigma * deltas.std(0.0);
        deltas.iter().filter(|d| d.abs() > cutoff).count()
    }

    fn mel_band_variances(
        &self,
        power: &Array2<f64>,
        sample_rate: f64,
        n_fft: usize,
    ) -> MelBandVariances {
        let n_mels = self.policy.n_mels.max(1);
        let filters = mel_filterbank(sample_rate, n_fft, n_mels);

        // [mel, frame]
        let mel_db = power_to_db(&filters.dot(power), self.policy.db_floor);

        let band = |rows: Range<usize>| -> f64 {
            if rows.is_empty() {
                return 0.0;
            }
            mel_db.slice(s![rows, ..]).var(0.0)
        };

        let low_end = n_mels / 4;
        let mid_end = n_mels * 3 / 4;
        MelBandVariances {
            low: band(0..low_end),
            mid: band(low_end..mid_end),
            high: band(mid_end..n_mels),
        }
    }
}

/// Power spectrogram of centered, Hann-windowed frames
///
/// Returns a `[bin, frame]` matrix of `n_fft / 2 + 1` bins by
/// `1 + len / hop` frames.
pub fn power_spectrogram(samples: &[f32], n_fft: usize, hop: usize) -> Array2<f64> {
    let pad = n_fft / 2;
    let n_frames = 1 + samples.len() / hop;
    let n_bins = n_fft / 2 + 1;

    // Periodic Hann
    let window: Vec<f64> = (0..n_fft)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f64 / n_fft as f64).cos())
        .collect();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n_fft);
    let mut buffer = vec![Complex::new(0.0, 0.0); n_fft];
    let mut spectrogram = Array2::<f64>::zeros((n_bins, n_frames));

    for (t, mut column) in spectrogram.axis_iter_mut(Axis(1)).enumerate() {
        let start = t * hop;
        for (n, slot) in buffer.iter_mut().enumerate() {
            let idx = start + n;
            let sample = if idx >= pad && idx - pad < samples.len() {
                samples[idx - pad] as f64
            } else {
                0.0
            };
            *slot = Complex::new(sample * window[n], 0.0);
        }
        fft.process(&mut buffer);
        column
            .iter_mut()
            .zip(&buffer[..n_bins])
            .for_each(|(cell, c)| *cell = c.norm_sqr());
    }

    spectrogram
}

/// Amplitude → dB relative to the peak, clipped at `floor`
fn amplitude_to_db(magnitude: &Array2<f64>, floor: f64) -> Array2<f64> {
    to_db(magnitude, 20.0, AMIN, floor)
}

/// Power → dB relative to the peak, clipped at `floor`
fn power_to_db(power: &Array2<f64>, floor: f64) -> Array2<f64> {
    to_db(power, 10.0, POWER_AMIN, floor)
}

/// Digital silence (peak below `amin`) maps to `floor` everywhere
fn to_db(values: &Array2<f64>, scale: f64, amin: f64, floor: f64) -> Array2<f64> {
    let peak = values.fold(0.0f64, |acc, &v| acc.max(v));
    if peak < amin {
        return Array2::from_elem(values.raw_dim(), floor);
    }
    let reference = scale * peak.log10();
    values.mapv(|v| (scale * v.max(amin).log10() - reference).max(floor))
}

/// Geometric over arithmetic mean of the power spectrum
fn spectral_flatness(power: ArrayView1<f64>) -> f64 {
    if power.is_empty() {
        return 0.0;
    }
    let clipped = power.mapv(|p| p.max(POWER_AMIN));
    let log_mean = clipped.mapv(f64::ln).mean().unwrap_or(0.0);
    let arith = clipped.mean().unwrap_or(POWER_AMIN);
    log_mean.exp() / arith
}

/// Shannon entropy (bits) of the normalized power spectrum
fn spectral_entropy(power: ArrayView1<f64>) -> f64 {
    let total = power.sum() + ENTROPY_EPS;
    -power
        .iter()
        .map(|p| {
            let q = p / total;
            q * (q + ENTROPY_EPS).log2()
        })
        .sum::<f64>()
}

/// Population mean and standard deviation, zeros when empty
fn mean_std(values: &Array1<f64>) -> (f64, f64) {
    match values.mean() {
        Some(mean) => (mean, values.std(0.0)),
        None => (0.0, 0.0),
    }
}

fn hz_to_mel(hz: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f64.ln() / 27.0;
    if hz >= MIN_LOG_HZ {
        min_log_mel + (hz / MIN_LOG_HZ).ln() / logstep
    } else {
        hz / F_SP
    }
}

fn mel_to_hz(mel: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f64.ln() / 27.0;
    if mel >= min_log_mel {
        MIN_LOG_HZ * (logstep * (mel - min_log_mel)).exp()
    } else {
        F_SP * mel
    }
}

/// Slaney-style mel filterbank with area normalization, 0 Hz to Nyquist
///
/// Returns a `[mel, bin]` matrix of `n_mels` by `n_fft / 2 + 1` weights.
pub fn mel_filterbank(sample_rate: f64, n_fft: usize, n_mels: usize) -> Array2<f64> {
    let n_bins = n_fft / 2 + 1;
    let mut filterbank = Array2::<f64>::zeros((n_mels, n_bins));

    let fft_freqs: Vec<f64> = (0..n_bins)
        .map(|k| k as f64 * sample_rate / n_fft as f64)
        .collect();

    let mel_max = hz_to_mel(sample_rate / 2.0);
    let mel_points: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_max * i as f64 / (n_mels + 1) as f64))
        .collect();

    for (m, mut row) in filterbank.axis_iter_mut(Axis(0)).enumerate() {
        let (left, center, right) = (mel_points[m], mel_points[m + 1], mel_points[m + 2]);
        let lower_width = center - left;
        let upper_width = right - center;
        let enorm = if right > left { 2.0 / (right - left) } else { 0.0 };

        for (weight, &f) in row.iter_mut().zip(&fft_freqs) {
            let lower = if lower_width > 0.0 { (f - left) / lower_width } else { 0.0 };
            let upper = if upper_width > 0.0 { (right - f) / upper_width } else { 0.0 };
            *weight = lower.min(upper).max(0.0) * enorm;
        }
    }

    filterbank
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
