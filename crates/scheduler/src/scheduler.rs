//! Timeline scheduler.
//!
//! Walks a [`Script`] section by section, paces each action against its
//! declared offset, plays highlight effects before actions, and produces
//! the authoritative [`TimingMetadata`] for the run.
//!
//! Timeline rules per section (all times in ms on the session timeline):
//!
//! - an action starts no earlier than `section_start + offset`, waiting
//!   when the previous step finished early
//! - after an action, `last_action_end = section_start + offset +
//!   (highlight_duration ?? default_step)` and the cursor moves to at least
//!   that point
//! - a section lasts at least its nominal duration
//! - with `follow_measured_clock` the cursor also moves to the measured
//!   session clock, so real overruns land in the recorded timeline;
//!   otherwise they are only reported as drift
//!
//! The cursor is a plain value threaded through each section step.

use std::sync::Arc;

use demoreel_common::clock::{DriftMeasurement, SessionClock};
use demoreel_common::config::{AppConfig, SchedulerConfig};
use demoreel_common::error::{DemoreelError, DemoreelResult};
use demoreel_document::Document;
use demoreel_overlay::{OverlayOptions, OverlayRenderer};
use demoreel_script_model::{
    Action, ActionKind, RunDiagnostics, Script, Section, StepOutcome, StepPhase, TimingBuilder,
    TimingMetadata,
};
use tokio::time::Instant;

use crate::executor::ActionExecutor;

/// Position on the session timeline. Only ever moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimelineCursor {
    position_ms: u64,
}

impl TimelineCursor {
    pub fn start() -> Self {
        Self::default()
    }

    pub fn position_ms(self) -> u64 {
        self.position_ms
    }

    /// Cursor at `max(self, ms)`.
    pub fn advance_to(self, ms: u64) -> Self {
        Self {
            position_ms: self.position_ms.max(ms),
        }
    }
}

/// Everything a scheduler run produced.
#[derive(Debug)]
pub struct SchedulerRun {
    pub timing: TimingMetadata,
    pub diagnostics: RunDiagnostics,
    /// Instant the timeline's zero point was taken.
    pub epoch: Instant,
    /// Wall-clock time at the timeline's zero point (RFC 3339).
    pub epoch_wall: String,
}

/// Drives a script against a live document.
pub struct TimelineScheduler {
    renderer: OverlayRenderer,
    executor: ActionExecutor,
    config: SchedulerConfig,
}

impl TimelineScheduler {
    pub fn new(document: Arc<dyn Document>, config: &AppConfig) -> Self {
        Self {
            renderer: OverlayRenderer::new(document.clone(), &config.overlay),
            executor: ActionExecutor::new(document, config.executor.clone()),
            config: config.scheduler.clone(),
        }
    }

    /// Execute `script` and return its timing.
    ///
    /// Only a failure to load the script's start page is an error. The
    /// overlay surface is removed before returning on every path.
    pub async fn run(&mut self, script: &Script) -> DemoreelResult<SchedulerRun> {
        let mut diagnostics = RunDiagnostics::new();
        let result = self.run_timeline(script, &mut diagnostics).await;

        if let Err(e) = self.renderer.destroy().await {
            tracing::debug!(error = %e, "Ignoring overlay teardown failure");
            diagnostics.record("", None, StepPhase::Surface, StepOutcome::failed(e.to_string()));
        }

        let (timing, clock) = result?;
        tracing::info!(
            sections = timing.sections().len(),
            total_ms = timing.total_duration_ms(),
            skipped = diagnostics.skipped_count(),
            failed = diagnostics.failed_count(),
            "Timeline complete"
        );
        Ok(SchedulerRun {
            timing,
            diagnostics,
            epoch: clock.epoch(),
            epoch_wall: clock.epoch_wall().to_string(),
        })
    }

    async fn run_timeline(
        &mut self,
        script: &Script,
        diagnostics: &mut RunDiagnostics,
    ) -> DemoreelResult<(TimingMetadata, SessionClock)> {
        if let Some(url) = script.start_url.as_deref().map(str::trim) {
            if !url.is_empty() {
                match self.executor.navigate(url).await {
                    StepOutcome::Ok => {
                        diagnostics.record("", None, StepPhase::Navigation, StepOutcome::Ok)
                    }
                    outcome => {
                        return Err(DemoreelError::document(format!(
                            "failed to load start page {url}: {}",
                            outcome.reason().unwrap_or("unknown error")
                        )));
                    }
                }
            }
        }

        let clock = SessionClock::start();
        let mut builder = TimingBuilder::new();
        let mut cursor = TimelineCursor::start();
        tracing::info!(
            sections = script.sections.len(),
            epoch = clock.epoch_wall(),
            "Timeline started"
        );

        for section in &script.sections {
            cursor = self
                .run_section(section, cursor, &clock, diagnostics)
                .await;
            let window = builder
                .push(&section.id, cursor.position_ms(), &section.narration)
                .map_err(|e| DemoreelError::script(e.to_string()))?;
            tracing::info!(
                section = %window.id,
                start_ms = window.start_time_ms,
                end_ms = window.end_time_ms,
                "Section recorded"
            );
        }

        Ok((builder.finish(), clock))
    }

    /// Run one section starting at `cursor` and return the cursor at its end.
    async fn run_section(
        &mut self,
        section: &Section,
        cursor: TimelineCursor,
        clock: &SessionClock,
        diagnostics: &mut RunDiagnostics,
    ) -> TimelineCursor {
        let section_start = cursor.position_ms();
        let mut cursor = cursor;
        let mut planned = section_start;

        tracing::debug!(
            section = %section.id,
            start_ms = section_start,
            actions = section.actions.len(),
            "Section started"
        );

        for (index, action) in section.actions.iter().enumerate() {
            let action_start = section_start.saturating_add(action.timing_offset_ms);
            // Returns at once when the real clock is already past the offset.
            tokio::time::sleep_until(clock.instant_at(action_start)).await;

            if action.wants_highlight() {
                let outcome = self.highlight(action).await;
                diagnostics.record(&section.id, Some(index), StepPhase::Overlay, outcome);
            }

            let outcome = self.executor.run(action).await;
            diagnostics.record(&section.id, Some(index), StepPhase::Action, outcome);
            if action.kind == ActionKind::Navigate {
                self.renderer.reattach();
            }

            let last_action_end = action_start.saturating_add(
                action
                    .highlight_duration_ms
                    .unwrap_or(self.config.default_step_ms),
            );
            planned = planned.max(last_action_end);
            cursor = cursor.advance_to(last_action_end);
            if self.config.follow_measured_clock {
                cursor = cursor.advance_to(clock.elapsed_ms());
            }
        }

        let floor = section_start.saturating_add(section.nominal_duration_ms());
        planned = planned.max(floor);
        let end = cursor.position_ms().max(floor);
        tokio::time::sleep_until(clock.instant_at(end)).await;

        let measured = clock.elapsed_ms();
        let mut cursor = cursor.advance_to(end);
        if self.config.follow_measured_clock {
            cursor = cursor.advance_to(measured);
        }

        let drift = DriftMeasurement {
            planned_ms: planned,
            measured_ms: measured,
        };
        if drift.exceeds_threshold_ms(self.config.drift_warn_ms) {
            tracing::warn!(
                section = %section.id,
                planned_ms = planned,
                measured_ms = measured,
                recorded_end_ms = cursor.position_ms(),
                drift_ms = drift.drift_ms(),
                "Section ran off its planned timeline"
            );
        }
        cursor
    }

    async fn highlight(&mut self, action: &Action) -> StepOutcome {
        let Some(selector) = action.target() else {
            return StepOutcome::skipped("highlight without selector");
        };
        let options = OverlayOptions {
            duration_ms: action
                .highlight_duration_ms
                .unwrap_or(self.config.default_highlight_ms),
            color: action.highlight_color.clone(),
            label: action.highlight_label.clone(),
            pulse: true,
        };
        self.renderer
            .run(action.highlight_style, selector, &options)
            .await
    }
}
