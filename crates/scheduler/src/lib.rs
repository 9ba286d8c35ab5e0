//! DemoReel Scheduler
//!
//! Runs a script against a live document and records when each section
//! actually happened.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │               TimelineScheduler                │
//! │                                                │
//! │   for each section, for each action:           │
//! │     pace ──▶ OverlayRenderer ──▶ ActionExecutor │
//! │                     │                │         │
//! │                     ▼                ▼         │
//! │               ┌──────────────────────────┐     │
//! │               │     dyn Document         │     │
//! │               └──────────────────────────┘     │
//! │                                                │
//! │   ──▶ TimingMetadata + RunDiagnostics          │
//! └───────────────────────────────────────────────┘
//! ```

pub mod executor;
pub mod scheduler;

pub use executor::ActionExecutor;
pub use scheduler::{SchedulerRun, TimelineCursor, TimelineScheduler};
