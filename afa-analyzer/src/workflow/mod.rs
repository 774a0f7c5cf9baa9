//! Request workflow
//!
//! One orchestrator per process, shared by every request. Each request gets
//! its own scratch arena and normalized assets; nothing mutable is shared
//! across requests.

pub mod orchestrator;

pub use orchestrator::{Orchestrator, UploadedAudio};
