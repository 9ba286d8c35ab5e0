//! DemoReel Render Engine
//!
//! Screen capture during a run, and the final merge of that capture
//! with the aligned narration track.
//!
//! # Pipeline Architecture
//!
//! ```text
//! ScreenRecorder ──► capture.mkv ──┐  (-ss capture lead-in)
//!                                  ├── ffmpeg -map 0:v -map 1:a -shortest
//! AudioAligner ──► narration.m4a ──┘         │
//!                                            ▼
//!                                  demo.mp4 / .webm / .mkv
//! ```

pub mod merge;
pub mod recorder;

pub use merge::*;
pub use recorder::*;
