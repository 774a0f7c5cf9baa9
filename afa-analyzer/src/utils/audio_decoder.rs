//! Audio normalization
//!
//! **Purpose:** Decode uploaded audio to the canonical mono waveform every
//! extractor consumes.
//!
//! Uses symphonia for format-agnostic decoding (WAV, MP3, FLAC, OGG/Vorbis,
//! M4A/AAC/ALAC) and rubato for sample rate conversion. Encoded packet sizes
//! are tracked per one-second window to profile the source bitrate.

use std::io::Cursor;
use std::path::Path;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use symphonia::core::units::TimeBase;
use tracing::{debug, warn};

use crate::types::{AnalysisError, AudioAsset, BitrateProfile, SourceProperties};
use crate::utils::scratch::ScratchArena;

/// Decoded audio before resampling
#[derive(Debug)]
pub struct DecodedAudio {
    /// Mono audio samples (f32, range [-1.0, 1.0])
    pub samples: Vec<f32>,
    /// Native sample rate in Hz
    pub sample_rate: u32,
    /// Original channel count
    pub channels: usize,
    /// Encoded bitrate, when packets carry timing
    pub bitrate: Option<BitrateProfile>,
}

/// Bitrate window length
const BITRATE_WINDOW_SECONDS: f64 = 1.0;

/// Trailing windows shorter than this share of a window are dropped
const MIN_WINDOW_FRACTION: f64 = 0.01;

/// Encoded packet sizes spread over fixed windows of the stream timeline
///
/// Timestamps are in time base ticks. A packet spanning a window boundary
/// contributes to each window in proportion to its overlap.
#[derive(Debug, Default)]
struct BitrateWindows {
    /// (timestamp, duration, encoded bytes)
    packets: Vec<(u64, u64, usize)>,
}

impl BitrateWindows {
    fn record(&mut self, ts: u64, dur: u64, bytes: usize) {
        self.packets.push((ts, dur, bytes));
    }

    fn finish(&self, time_base: TimeBase) -> Option<BitrateProfile> {
        if time_base.numer == 0 || time_base.denom == 0 {
            return None;
        }
        let seconds_per_tick = time_base.numer as f64 / time_base.denom as f64;
        let window = ((BITRATE_WINDOW_SECONDS / seconds_per_tick).round() as u64).max(1);

        let end = self.packets.iter().map(|(ts, dur, _)| ts + dur).max()?;
        if end == 0 {
            return None;
        }

        let mut bits = vec![0.0f64; end.div_ceil(window) as usize];
        for &(ts, dur, bytes) in &self.packets {
            let packet_bits = bytes as f64 * 8.0;
            if dur == 0 {
                if let Some(slot) = bits.get_mut((ts / window) as usize) {
                    *slot += packet_bits;
                }
                continue;
            }
            let mut t = ts;
            while t < ts + dur {
                let idx = t / window;
                let boundary = ((idx + 1) * window).min(ts + dur);
                bits[idx as usize] += packet_bits * (boundary - t) as f64 / dur as f64;
                t = boundary;
            }
        }

        let window_bps = bits
            .iter()
            .enumerate()
            .filter_map(|(idx, window_bits)| {
                let start = idx as u64 * window;
                let ticks = (start + window).min(end) - start;
                if (ticks as f64) < window as f64 * MIN_WINDOW_FRACTION {
                    return None;
                }
                Some(window_bits / (ticks as f64 * seconds_per_tick))
            })
            .collect();

        let total_bits: f64 = self.packets.iter().map(|(_, _, b)| *b as f64 * 8.0).sum();
        Some(BitrateProfile {
            overall_bps: total_bits / (end as f64 * seconds_per_tick),
            window_bps,
        })
    }
}

/// Converts arbitrary uploads into normalized `AudioAsset`s
#[derive(Debug, Clone)]
pub struct AudioNormalizer {
    target_sample_rate: u32,
}

impl AudioNormalizer {
    pub fn new(target_sample_rate: u32) -> Self {
        Self { target_sample_rate }
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    /// Normalize raw upload bytes
    ///
    /// **Algorithm:**
    /// 1. Probe the container (extension hint optional)
    /// 2. Decode every packet of the first audio track
    /// 3. Average channels to mono
    /// 4. Resample to the target rate
    ///
    /// # Errors
    /// * `UnsupportedFormat` - container or codec cannot be decoded
    /// * `EmptyAudio` - decoding produced zero samples
    pub fn normalize(
        &self,
        raw: &[u8],
        extension_hint: Option<&str>,
    ) -> Result<AudioAsset, AnalysisError> {
        let decoded = decode_bytes(raw, extension_hint)?;
        if decoded.samples.is_empty() {
            return Err(AnalysisError::EmptyAudio);
        }

        let samples = resample_mono(&decoded.samples, decoded.sample_rate, self.target_sample_rate)?;

        debug!(
            source_rate = decoded.sample_rate,
            source_channels = decoded.channels,
            target_rate = self.target_sample_rate,
            frames = samples.len(),
            "Audio normalized"
        );

        AudioAsset::with_source(
            samples,
            self.target_sample_rate,
            SourceProperties {
                original_sample_rate: decoded.sample_rate,
                original_channels: decoded.channels,
                byte_len: raw.len() as u64,
                bitrate: decoded.bitrate,
            },
        )
    }

    /// Normalize an audio file on disk
    pub fn normalize_file(&self, path: &Path) -> Result<AudioAsset, AnalysisError> {
        let raw = std::fs::read(path)?;
        let hint = path.extension().and_then(|e| e.to_str());
        self.normalize(&raw, hint)
    }

    /// Normalize and keep a WAV copy in the request's scratch arena
    ///
    /// The copy lives exactly as long as the arena.
    pub fn normalize_into(
        &self,
        raw: &[u8],
        extension_hint: Option<&str>,
        arena: &ScratchArena,
        label: &str,
    ) -> Result<AudioAsset, AnalysisError> {
        let mut asset = self.normalize(raw, extension_hint)?;
        let wav = encode_wav(asset.samples(), asset.sample_rate())?;
        let path = arena.write(&format!("{}_normalized.wav", label), &wav)?;
        asset.set_normalized_path(path);
        Ok(asset)
    }
}

/// Decode an in-memory container to mono f32 PCM
pub fn decode_bytes(raw: &[u8], extension_hint: Option<&str>) -> Result<DecodedAudio, AnalysisError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(raw.to_vec())), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = extension_hint {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AnalysisError::UnsupportedFormat(format!("Failed to probe container: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AnalysisError::UnsupportedFormat("No audio track found".to_string()))?;

    let track_id = track.id;
    let time_base = track.codec_params.time_base;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count());

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AnalysisError::UnsupportedFormat(format!("No decoder for codec: {}", e)))?;

    let mut mono: Vec<f32> = Vec::new();
    let mut windows = BitrateWindows::default();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(AnalysisError::UnsupportedFormat(format!(
                    "Error reading packet: {}",
                    e
                )));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }
        windows.record(packet.ts(), packet.dur(), packet.buf().len());

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                // Corrupt packets are skipped, not fatal
                warn!(error = msg, "Skipping undecodable packet");
                continue;
            }
            Err(e) => {
                return Err(AnalysisError::UnsupportedFormat(format!(
                    "Failed to decode packet: {}",
                    e
                )));
            }
        };

        let spec = *decoded.spec();
        sample_rate.get_or_insert(spec.rate);
        channels.get_or_insert(spec.channels.count());

        append_mono(&decoded, &mut mono);
    }

    let sample_rate = sample_rate
        .filter(|rate| *rate > 0)
        .ok_or_else(|| AnalysisError::UnsupportedFormat("Sample rate unknown".to_string()))?;

    let bitrate = windows.finish(time_base.unwrap_or_else(|| TimeBase::new(1, sample_rate)));

    Ok(DecodedAudio {
        samples: mono,
        sample_rate,
        channels: channels.unwrap_or(1),
        bitrate,
    })
}

/// Average all channels of a decoded buffer and append to `out`
fn append_mono(decoded: &AudioBufferRef, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::U8(buf) => mix_down(buf, out),
        AudioBufferRef::U16(buf) => mix_down(buf, out),
        AudioBufferRef::U24(buf) => mix_down(buf, out),
        AudioBufferRef::U32(buf) => mix_down(buf, out),
        AudioBufferRef::S8(buf) => mix_down(buf, out),
        AudioBufferRef::S16(buf) => mix_down(buf, out),
        AudioBufferRef::S24(buf) => mix_down(buf, out),
        AudioBufferRef::S32(buf) => mix_down(buf, out),
        AudioBufferRef::F32(buf) => mix_down(buf, out),
        AudioBufferRef::F64(buf) => mix_down(buf, out),
    }
}

fn mix_down<S>(buf: &AudioBuffer<S>, out: &mut Vec<f32>)
where
    S: Sample,
    f32: FromSample<S>,
{
    let num_channels = buf.spec().channels.count();
    if num_channels == 0 {
        return;
    }

    out.reserve(buf.frames());
    for frame_idx in 0..buf.frames() {
        let sum: f32 = (0..num_channels)
            .map(|ch| f32::from_sample(buf.chan(ch)[frame_idx]))
            .sum();
        out.push(sum / num_channels as f32);
    }
}

/// Resample a mono signal, preserving duration
///
/// Uses sinc interpolation with a BlackmanHarris2 window. The filter delay is
/// trimmed and the output is exactly `round(len * target / source)` frames.
pub fn resample_mono(
    samples: &[f32],
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<f32>, AnalysisError> {
    if source_rate == target_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = target_rate as f64 / source_rate as f64;
    let expected = (samples.len() as f64 * ratio).round() as usize;

    // Single pass: chunk size equals input length
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, samples.len(), 1)
        .map_err(|e| AnalysisError::Internal(format!("Failed to create resampler: {}", e)))?;

    let delay = resampler.output_delay();

    let mut output = resampler
        .process(&[samples], None)
        .map_err(|e| AnalysisError::Internal(format!("Resampling failed: {}", e)))?
        .remove(0);

    // Flush the filter tail so the delay trim does not shorten the signal
    let tail = resampler
        .process_partial::<&[f32]>(None, None)
        .map_err(|e| AnalysisError::Internal(format!("Resampler flush failed: {}", e)))?
        .remove(0);
    output.extend(tail);

    let mut resampled: Vec<f32> = output.into_iter().skip(delay).take(expected).collect();
    resampled.resize(expected, 0.0);

    debug!(
        source_rate,
        target_rate,
        input_frames = samples.len(),
        output_frames = resampled.len(),
        "Resampled mono signal"
    );

    Ok(resampled)
}

/// Encode mono f32 samples as a 16-bit PCM WAV file in memory
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, AnalysisError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| AnalysisError::Internal(format!("WAV writer failed: {}", e)))?;
        for &sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(value)
                .map_err(|e| AnalysisError::Internal(format!("WAV write failed: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| AnalysisError::Internal(format!("WAV finalize failed: {}", e)))?;
    }

    Ok(cursor.into_inner())
}
