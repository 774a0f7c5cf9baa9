//! Test Helper Utilities
//!
//! Shared utilities for testing afa-analyzer

#![allow(dead_code)]

pub mod audio_generator;
pub mod container_fixtures;
pub mod mock_capabilities;

use afa_common::config::AnalysisConfig;
use std::path::Path;
use tempfile::TempDir;

// Re-export commonly used items
pub use audio_generator::{generate_test_wav, generate_wav_bytes, AudioConfig};
pub use container_fixtures::{
    generate_flac_bytes, generate_ogg_flac_bytes, generate_silent_mp3_bytes,
};
pub use mock_capabilities::MockCapabilities;

/// Default config with the scratch root inside a fresh temp dir
///
/// Returns (TempDir, AnalysisConfig) - TempDir must be kept alive for duration of test
pub fn test_config() -> (TempDir, AnalysisConfig) {
    let temp_dir = TempDir::new().expect("create temp dir");
    let mut config = AnalysisConfig::default();
    config.scratch.root = temp_dir.path().join("scratch");
    config.scratch.delete_backoff_ms = 1;
    (temp_dir, config)
}

/// Entries left under a scratch root
pub fn scratch_entries(root: &Path) -> Vec<String> {
    match std::fs::read_dir(root) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}
