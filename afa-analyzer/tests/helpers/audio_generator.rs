//! Audio Test Fixture Generator
//!
//! Generates WAV uploads in memory or on disk

use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub frequency_hz: f32,
    pub silence_gap_start: Option<f64>,
    pub silence_gap_duration: Option<f64>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 1.5,
            sample_rate: 22_050,
            channels: 2,
            frequency_hz: 440.0,
            silence_gap_start: None,
            silence_gap_duration: None,
        }
    }
}

fn write_samples<W>(writer: &mut hound::WavWriter<W>, config: &AudioConfig) -> anyhow::Result<()>
where
    W: std::io::Write + std::io::Seek,
{
    let total_samples = (config.duration_seconds * config.sample_rate as f64) as usize;

    let (silence_start, silence_end) = match (config.silence_gap_start, config.silence_gap_duration)
    {
        (Some(start), Some(duration)) => {
            let start_sample = (start * config.sample_rate as f64) as usize;
            (
                start_sample,
                start_sample + (duration * config.sample_rate as f64) as usize,
            )
        }
        _ => (total_samples + 1, total_samples + 2),
    };

    for i in 0..total_samples {
        let sample = if i >= silence_start && i < silence_end {
            0
        } else {
            // Tone at 30% amplitude
            let t = i as f32 / config.sample_rate as f32;
            (0.3 * (2.0 * std::f32::consts::PI * config.frequency_hz * t).sin()
                * i16::MAX as f32) as i16
        };
        for _ in 0..config.channels {
            writer.write_sample(sample)?;
        }
    }
    Ok(())
}

fn spec(config: &AudioConfig) -> hound::WavSpec {
    hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

/// Encode a test tone as WAV bytes
pub fn generate_wav_bytes(config: &AudioConfig) -> anyhow::Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec(config))?;
        write_samples(&mut writer, config)?;
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Write a test tone to `path`
pub fn generate_test_wav(path: &Path, config: &AudioConfig) -> anyhow::Result<PathBuf> {
    let mut writer = hound::WavWriter::create(path, spec(config))?;
    write_samples(&mut writer, config)?;
    writer.finalize()?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generate_simple_wav() {
        let temp_dir = TempDir::new().unwrap();
        let wav_path = temp_dir.path().join("test.wav");

        generate_test_wav(&wav_path, &AudioConfig::default()).unwrap();

        let metadata = std::fs::metadata(&wav_path).unwrap();
        assert!(metadata.len() > 1000, "WAV file should be non-trivial size");
    }

    #[test]
    fn test_bytes_match_requested_length() {
        let config = AudioConfig {
            duration_seconds: 1.0,
            sample_rate: 8_000,
            channels: 1,
            ..Default::default()
        };
        let bytes = generate_wav_bytes(&config).unwrap();
        // 44-byte header + 8000 samples of 2 bytes
        assert_eq!(bytes.len(), 44 + 16_000);
    }
}
