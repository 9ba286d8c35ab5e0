//! DemoReel Common Utilities
//!
//! Shared infrastructure for all DemoReel crates:
//! - Error types and result aliases
//! - Session clock used to measure the authoritative timeline
//! - Tracing/logging initialization
//! - Configuration loading
//! - Thin wrappers around the external `ffmpeg`/`ffprobe` tools

pub mod clock;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
