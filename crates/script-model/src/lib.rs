//! DemoReel Script Model
//!
//! Defines the data contracts shared by every pipeline stage:
//! - **Script:** ordered sections of narration and scripted actions
//! - **Timing:** the authoritative per-section windows produced by a run
//! - **Media:** narration clips and caption cues derived from the timing
//! - **Diagnostics:** typed per-step outcomes collected during a run
//!
//! All times are integer milliseconds on the session timeline.

pub mod diagnostics;
pub mod error;
pub mod media;
pub mod script;
pub mod timing;

pub use diagnostics::*;
pub use error::*;
pub use media::*;
pub use script::*;
pub use timing::*;
