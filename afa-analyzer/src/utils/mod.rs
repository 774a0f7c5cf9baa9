//! Utility modules for afa-analyzer

pub mod audio_decoder;
pub mod scratch;

pub use audio_decoder::{decode_bytes, encode_wav, resample_mono, AudioNormalizer, DecodedAudio};
pub use scratch::{ReleaseSummary, ScratchArena};
