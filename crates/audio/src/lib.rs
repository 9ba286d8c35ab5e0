//! DemoReel Audio
//!
//! Everything that happens to narration after a run has been timed:
//! - **Narration:** per-section speech synthesis and duration probing
//! - **Alignment:** clips placed at their section's actual start and mixed
//! - **Captions:** narration text tiled over section windows, SRT/VTT output

pub mod alignment;
pub mod captions;
pub mod narration;

pub use alignment::*;
pub use captions::*;
pub use narration::*;
