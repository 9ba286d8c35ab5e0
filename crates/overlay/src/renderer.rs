//! Timed overlay animations over a live document.
//!
//! The renderer owns one drawing surface per document attachment. A call to
//! [`OverlayRenderer::run`] resolves once the effect's duration has elapsed;
//! dropping the returned future stops the animation at the next tick.

use std::sync::Arc;
use std::time::Duration;

use demoreel_common::config::OverlayConfig;
use demoreel_document::{Document, DocumentError, Rgba, SurfaceId};
use demoreel_script_model::{HighlightStyle, StepOutcome};
use tokio::time::Instant;

use crate::effects::{render_frame, EffectParams};

/// Per-call effect options.
#[derive(Debug, Clone, Default)]
pub struct OverlayOptions {
    pub duration_ms: u64,
    /// Hex color overriding the configured default.
    pub color: Option<String>,
    pub label: Option<String>,
    pub pulse: bool,
}

impl OverlayOptions {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            pulse: true,
            ..Default::default()
        }
    }
}

/// Draws highlight effects onto a [`Document`].
pub struct OverlayRenderer {
    document: Arc<dyn Document>,
    surface: Option<SurfaceId>,
    tick: Duration,
    default_color: Rgba,
    pulse: bool,
}

impl OverlayRenderer {
    pub fn new(document: Arc<dyn Document>, config: &OverlayConfig) -> Self {
        let default_color = Rgba::parse_hex(&config.color).unwrap_or_else(|| {
            tracing::warn!(color = %config.color, "Invalid overlay color, using default");
            Rgba::rgb(255, 71, 87)
        });
        Self {
            document,
            surface: None,
            tick: Duration::from_millis(config.tick_ms.max(1)),
            default_color,
            pulse: config.pulse,
        }
    }

    /// Surface currently attached, if one has been created.
    pub fn surface(&self) -> Option<SurfaceId> {
        self.surface
    }

    /// Forget the current surface after the document navigated away.
    /// The next run creates a fresh one.
    pub fn reattach(&mut self) {
        if let Some(surface) = self.surface.take() {
            tracing::debug!(%surface, "Overlay surface invalidated");
        }
    }

    /// Play `style` on the element matching `selector` for
    /// `options.duration_ms`.
    pub async fn run(
        &mut self,
        style: HighlightStyle,
        selector: &str,
        options: &OverlayOptions,
    ) -> StepOutcome {
        if style == HighlightStyle::None {
            return StepOutcome::skipped("no highlight requested");
        }
        let start = Instant::now();
        let mut result = self.animate(style, selector, options, start).await;
        if let Err(DocumentError::UnknownSurface(surface)) = result {
            // A page load the scheduler did not see took the surface with it.
            tracing::debug!(%surface, "Overlay surface detached, recreating");
            self.surface = None;
            result = self.animate(style, selector, options, start).await;
        }
        match result {
            Ok(outcome) => outcome,
            Err(DocumentError::SessionClosed) => {
                StepOutcome::skipped("document session is closed")
            }
            Err(DocumentError::UnknownSurface(surface)) => {
                tracing::debug!(%surface, "Overlay surface disappeared");
                self.surface = None;
                StepOutcome::skipped(format!("{surface} was detached"))
            }
            Err(e) => {
                tracing::warn!(selector, style = style.as_str(), error = %e, "Overlay failed");
                StepOutcome::failed(e.to_string())
            }
        }
    }

    async fn animate(
        &mut self,
        style: HighlightStyle,
        selector: &str,
        options: &OverlayOptions,
        start: Instant,
    ) -> Result<StepOutcome, DocumentError> {
        let Some(target) = self.document.element_box(selector).await? else {
            return Ok(StepOutcome::skipped(format!("no element matches '{selector}'")));
        };
        if !target.visible {
            return Ok(StepOutcome::skipped(format!("'{selector}' is not visible")));
        }

        let viewport = self.document.viewport().await?;
        let surface = self.ensure_surface().await?;
        let color = options
            .color
            .as_deref()
            .and_then(Rgba::parse_hex)
            .unwrap_or(self.default_color);
        let mut params = EffectParams {
            target: target.rect,
            viewport,
            color,
            label: options.label.clone(),
            pulse: options.pulse && self.pulse,
        };

        tracing::debug!(
            selector,
            style = style.as_str(),
            duration_ms = options.duration_ms,
            "Overlay started"
        );

        let deadline = start + Duration::from_millis(options.duration_ms);
        let mut next_tick = Instant::now();
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let elapsed_ms = now.duration_since(start).as_millis() as u64;

            // Follow the target if it moved; stop if it went away.
            match self.document.element_box(selector).await? {
                Some(current) if current.visible => params.target = current.rect,
                _ => {
                    self.document.clear_surface(surface).await?;
                    return Ok(StepOutcome::skipped(format!(
                        "'{selector}' disappeared during the highlight"
                    )));
                }
            }

            let frame = render_frame(style, elapsed_ms, options.duration_ms, &params);
            self.document.draw(surface, &frame).await?;

            next_tick += self.tick;
            tokio::time::sleep_until(next_tick.min(deadline)).await;
        }

        self.document.clear_surface(surface).await?;
        Ok(StepOutcome::Ok)
    }

    async fn ensure_surface(&mut self) -> Result<SurfaceId, DocumentError> {
        if let Some(surface) = self.surface {
            return Ok(surface);
        }
        let surface = self.document.create_surface().await?;
        tracing::debug!(%surface, document = self.document.name(), "Overlay surface created");
        self.surface = Some(surface);
        Ok(surface)
    }

    /// Blank the surface without detaching it.
    pub async fn clear(&self) -> Result<(), DocumentError> {
        match self.surface {
            Some(surface) => self.document.clear_surface(surface).await,
            None => Ok(()),
        }
    }

    /// Remove the surface from the document.
    pub async fn destroy(&mut self) -> Result<(), DocumentError> {
        match self.surface.take() {
            Some(surface) => self.document.remove_surface(surface).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use demoreel_document::synthetic::DocumentCall;
    use demoreel_document::{Rect, SyntheticDocument};

    fn setup() -> (Arc<SyntheticDocument>, OverlayRenderer) {
        let doc = Arc::new(
            SyntheticDocument::default()
                .with_element("#cta", Rect::new(300.0, 200.0, 120.0, 40.0)),
        );
        let renderer = OverlayRenderer::new(doc.clone(), &OverlayConfig::default());
        (doc, renderer)
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_lasts_exactly_the_duration() {
        let (doc, mut renderer) = setup();
        let start = Instant::now();
        let outcome = renderer
            .run(HighlightStyle::Spotlight, "#cta", &OverlayOptions::new(2000))
            .await;

        assert_eq!(outcome, StepOutcome::Ok);
        assert_eq!(start.elapsed(), Duration::from_millis(2000));
        let surface = renderer.surface().unwrap();
        // One frame per 16ms tick: 0, 16, ..., 1984.
        assert_eq!(doc.frames_drawn(surface), Some(125));
        assert_eq!(doc.last_frame(surface), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_surface_is_reused_across_runs() {
        let (doc, mut renderer) = setup();
        renderer
            .run(HighlightStyle::Box, "#cta", &OverlayOptions::new(100))
            .await;
        renderer
            .run(HighlightStyle::Zoom, "#cta", &OverlayOptions::new(100))
            .await;

        let created = doc
            .calls()
            .iter()
            .filter(|c| matches!(c, DocumentCall::CreateSurface(_)))
            .count();
        assert_eq!(created, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_selector_skips_immediately() {
        let (doc, mut renderer) = setup();
        let start = Instant::now();
        let outcome = renderer
            .run(HighlightStyle::Arrow, "#missing", &OverlayOptions::new(2000))
            .await;

        assert!(matches!(outcome, StepOutcome::Skipped { .. }));
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(doc.live_surfaces().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_none_style_skips() {
        let (_doc, mut renderer) = setup();
        let outcome = renderer
            .run(HighlightStyle::None, "#cta", &OverlayOptions::new(2000))
            .await;
        assert!(matches!(outcome, StepOutcome::Skipped { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_target_removed_mid_animation() {
        let (doc, mut renderer) = setup();
        let remover = {
            let doc = doc.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                doc.remove_element("#cta");
            })
        };

        let outcome = renderer
            .run(HighlightStyle::Box, "#cta", &OverlayOptions::new(2000))
            .await;
        remover.await.unwrap();

        assert!(matches!(outcome, StepOutcome::Skipped { .. }));
        assert_eq!(doc.last_frame(renderer.surface().unwrap()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reattach_creates_fresh_surface_after_navigation() {
        let (doc, mut renderer) = setup();
        renderer
            .run(HighlightStyle::Box, "#cta", &OverlayOptions::new(50))
            .await;
        let first = renderer.surface().unwrap();

        doc.navigate("about:blank").await.unwrap();
        doc.insert_element(
            "#cta",
            demoreel_document::ElementBox::visible(Rect::new(10.0, 10.0, 50.0, 20.0)),
        );
        renderer.reattach();
        let outcome = renderer
            .run(HighlightStyle::Box, "#cta", &OverlayOptions::new(50))
            .await;

        assert_eq!(outcome, StepOutcome::Ok);
        assert_ne!(renderer.surface(), Some(first));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_surface_is_replaced_without_losing_the_highlight() {
        let (doc, mut renderer) = setup();
        renderer
            .run(HighlightStyle::Box, "#cta", &OverlayOptions::new(50))
            .await;
        let first = renderer.surface().unwrap();

        // A page load without reattach leaves the renderer pointing at a dead surface.
        doc.navigate("about:blank").await.unwrap();
        doc.insert_element(
            "#cta",
            demoreel_document::ElementBox::visible(Rect::new(10.0, 10.0, 50.0, 20.0)),
        );
        let outcome = renderer
            .run(HighlightStyle::Box, "#cta", &OverlayOptions::new(50))
            .await;

        assert_eq!(outcome, StepOutcome::Ok);
        let second = renderer.surface().unwrap();
        assert_ne!(second, first);
        assert!(doc.frames_drawn(second).unwrap() > 0);
        assert_eq!(doc.live_surfaces(), vec![second]);

        let created = doc
            .calls()
            .iter()
            .filter(|c| matches!(c, DocumentCall::CreateSurface(_)))
            .count();
        assert_eq!(created, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_document_skips() {
        let (doc, mut renderer) = setup();
        doc.terminate();
        let outcome = renderer
            .run(HighlightStyle::Arrow, "#cta", &OverlayOptions::new(2000))
            .await;
        assert!(matches!(outcome, StepOutcome::Skipped { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_removes_surface() {
        let (doc, mut renderer) = setup();
        renderer
            .run(HighlightStyle::Zoom, "#cta", &OverlayOptions::new(50))
            .await;
        renderer.destroy().await.unwrap();

        assert!(doc.live_surfaces().is_empty());
        assert_eq!(renderer.surface(), None);
        // Nothing left to destroy.
        renderer.destroy().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_run_stops_animation() {
        let (doc, mut renderer) = setup();
        let _ = tokio::time::timeout(
            Duration::from_millis(100),
            renderer.run(HighlightStyle::Arrow, "#cta", &OverlayOptions::new(2000)),
        )
        .await;
        let surface = renderer.surface().unwrap();
        let drawn = doc.frames_drawn(surface).unwrap();

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(doc.frames_drawn(surface), Some(drawn));
        assert!(drawn <= 8);
    }
}
