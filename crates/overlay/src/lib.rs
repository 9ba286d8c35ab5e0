//! DemoReel Overlay Renderer
//!
//! Draws timed highlight effects over the live document while a scripted
//! step runs:
//! - **Effects:** pure functions from elapsed time to a [`Frame`]
//! - **Renderer:** the animation loop and drawing-surface lifecycle
//!
//! [`Frame`]: demoreel_document::Frame

pub mod effects;
pub mod renderer;

pub use effects::{render_frame, EffectParams};
pub use renderer::{OverlayOptions, OverlayRenderer};
