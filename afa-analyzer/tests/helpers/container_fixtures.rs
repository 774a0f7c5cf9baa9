//! Compressed-container fixtures
//!
//! Builds FLAC, Ogg FLAC and MP3 uploads in memory without an encoder:
//! FLAC frames carry verbatim subframes and MP3 frames are digital silence.

use symphonia::core::checksum::{Crc16Ansi, Crc32, Crc8Ccitt};
use symphonia::core::io::Monitor;

use super::AudioConfig;

/// Samples per FLAC frame
pub const FLAC_BLOCK_SIZE: usize = 4096;

/// Bytes per 128 kbps, 44.1 kHz MPEG-1 Layer III frame without padding
pub const MP3_FRAME_LEN: usize = 417;
/// Samples per MPEG-1 Layer III frame
pub const MP3_FRAME_SAMPLES: usize = 1152;
pub const MP3_SAMPLE_RATE: u32 = 44_100;

/// Tone samples lifted above zero so no byte pair of the payload reads as
/// a FLAC frame sync code
fn lifted_tone(config: &AudioConfig) -> Vec<i16> {
    let total = (config.duration_seconds * config.sample_rate as f64) as usize;
    (0..total)
        .map(|i| {
            let t = i as f32 / config.sample_rate as f32;
            let wave = (2.0 * std::f32::consts::PI * config.frequency_hz * t).sin();
            (16_384.0 + 0.3 * wave * 16_384.0) as i16
        })
        .collect()
}

fn stream_info(config: &AudioConfig, total_samples: u64) -> Vec<u8> {
    let mut block = Vec::with_capacity(34);
    block.extend_from_slice(&(FLAC_BLOCK_SIZE as u16).to_be_bytes());
    block.extend_from_slice(&(FLAC_BLOCK_SIZE as u16).to_be_bytes());
    // Frame byte lengths unknown
    block.extend_from_slice(&[0; 6]);
    let packed = (u64::from(config.sample_rate) << 44)
        | (u64::from(config.channels - 1) << 41)
        | (15u64 << 36)
        | total_samples;
    block.extend_from_slice(&packed.to_be_bytes());
    // No MD5 signature
    block.extend_from_slice(&[0; 16]);
    block
}

fn flac_frame(number: usize, block: &[i16], channels: u16) -> Vec<u8> {
    assert!(number < 0x80, "frame numbers above 127 need multi-byte coding");

    // Fixed blocking, 16-bit block size follows, rate from STREAMINFO, 16 bps
    let mut frame = vec![
        0xFF,
        0xF8,
        0x70,
        ((channels as u8 - 1) << 4) | 0x08,
        number as u8,
    ];
    frame.extend_from_slice(&((block.len() - 1) as u16).to_be_bytes());
    let mut crc8 = Crc8Ccitt::new(0);
    crc8.process_buf_bytes(&frame);
    frame.push(crc8.crc());

    for _ in 0..channels {
        // Verbatim subframe, no wasted bits
        frame.push(0x02);
        for sample in block {
            frame.extend_from_slice(&sample.to_be_bytes());
        }
    }

    let mut crc16 = Crc16Ansi::new(0);
    crc16.process_buf_bytes(&frame);
    frame.extend_from_slice(&crc16.crc().to_be_bytes());
    frame
}

fn flac_frames(config: &AudioConfig) -> (Vec<u8>, Vec<Vec<u8>>) {
    let samples = lifted_tone(config);
    let info = stream_info(config, samples.len() as u64);
    let frames = samples
        .chunks(FLAC_BLOCK_SIZE)
        .enumerate()
        .map(|(number, block)| flac_frame(number, block, config.channels))
        .collect();
    (info, frames)
}

/// Native FLAC stream of the configured tone
pub fn generate_flac_bytes(config: &AudioConfig) -> Vec<u8> {
    let (info, frames) = flac_frames(config);
    let mut bytes = b"fLaC".to_vec();
    // Last metadata block, STREAMINFO, 34 bytes
    bytes.extend_from_slice(&[0x80, 0x00, 0x00, 0x22]);
    bytes.extend_from_slice(&info);
    for frame in frames {
        bytes.extend_from_slice(&frame);
    }
    bytes
}

const OGG_SERIAL: u32 = 0x0AFA_0001;
const OGG_FIRST_PAGE: u8 = 0x02;
const OGG_LAST_PAGE: u8 = 0x04;

/// One Ogg page holding exactly one packet
fn ogg_page(sequence: u32, granule: u64, flags: u8, packet: &[u8]) -> Vec<u8> {
    let full_segments = packet.len() / 255;
    assert!(full_segments < 255, "packet does not fit a single page");

    let mut page = b"OggS".to_vec();
    page.push(0);
    page.push(flags);
    page.extend_from_slice(&granule.to_le_bytes());
    page.extend_from_slice(&OGG_SERIAL.to_le_bytes());
    page.extend_from_slice(&sequence.to_le_bytes());
    page.extend_from_slice(&[0; 4]);
    page.push(full_segments as u8 + 1);
    page.extend(std::iter::repeat(255u8).take(full_segments));
    page.push((packet.len() % 255) as u8);
    page.extend_from_slice(packet);

    let mut crc = Crc32::new(0);
    crc.process_buf_bytes(&page);
    page[22..26].copy_from_slice(&crc.crc().to_le_bytes());
    page
}

/// Ogg FLAC stream of the configured tone, one frame per page
pub fn generate_ogg_flac_bytes(config: &AudioConfig) -> Vec<u8> {
    let (info, frames) = flac_frames(config);

    let mut ident = vec![0x7F];
    ident.extend_from_slice(b"FLAC");
    // Mapping 1.0, header packet count unknown
    ident.extend_from_slice(&[1, 0, 0, 0]);
    ident.extend_from_slice(b"fLaC");
    ident.extend_from_slice(&[0x80, 0x00, 0x00, 0x22]);
    ident.extend_from_slice(&info);

    let mut bytes = ogg_page(0, 0, OGG_FIRST_PAGE, &ident);
    let total = (config.duration_seconds * config.sample_rate as f64) as u64;
    let last = frames.len().saturating_sub(1);
    for (index, frame) in frames.iter().enumerate() {
        let granule = (((index + 1) * FLAC_BLOCK_SIZE) as u64).min(total);
        let flags = if index == last { OGG_LAST_PAGE } else { 0 };
        bytes.extend_from_slice(&ogg_page(index as u32 + 1, granule, flags, frame));
    }
    bytes
}

/// Silent 128 kbps mono MP3 of `frames` frames
pub fn generate_silent_mp3_bytes(frames: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(frames * MP3_FRAME_LEN);
    for _ in 0..frames {
        // MPEG-1 Layer III, no CRC, 128 kbps, 44.1 kHz, mono
        bytes.extend_from_slice(&[0xFF, 0xFB, 0x90, 0xC0]);
        // Zeroed side info and main data decode to silence
        bytes.extend(std::iter::repeat(0u8).take(MP3_FRAME_LEN - 4));
    }
    bytes
}
