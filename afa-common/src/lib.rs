//! # Audio forensic analysis common library
//!
//! Shared code for the analysis service crates:
//! - Error type
//! - TOML configuration model and policy constants
//! - Config-file and scratch-root resolution

pub mod config;
pub mod error;

pub use config::AnalysisConfig;
pub use error::{Error, Result};
