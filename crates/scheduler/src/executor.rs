//! Best-effort execution of single scripted actions.

use std::sync::Arc;
use std::time::Duration;

use demoreel_common::config::ExecutorConfig;
use demoreel_document::{Document, DocumentError};
use demoreel_script_model::{Action, ActionKind, StepOutcome};
use tokio::time::Instant;

/// Performs one [`Action`] against a [`Document`].
///
/// Never returns an error: every failure is reported as a
/// [`StepOutcome`] so the caller can keep going.
pub struct ActionExecutor {
    document: Arc<dyn Document>,
    config: ExecutorConfig,
}

impl ActionExecutor {
    pub fn new(document: Arc<dyn Document>, config: ExecutorConfig) -> Self {
        Self { document, config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub async fn run(&self, action: &Action) -> StepOutcome {
        let outcome = match action.kind {
            ActionKind::Click => match action.target() {
                Some(selector) => {
                    self.interact(selector, || self.document.click(selector))
                        .await
                }
                None => StepOutcome::skipped("click without selector"),
            },
            ActionKind::Hover => match action.target() {
                Some(selector) => {
                    self.interact(selector, || self.document.hover(selector))
                        .await
                }
                None => StepOutcome::skipped("hover without selector"),
            },
            ActionKind::Type => match action.target() {
                Some(selector) => {
                    let text = action.value.as_deref().unwrap_or_default();
                    self.interact(selector, || self.document.fill(selector, text))
                        .await
                }
                None => StepOutcome::skipped("type without selector"),
            },
            ActionKind::Scroll => self.scroll(action.value.as_deref()).await,
            ActionKind::Wait => {
                let ms = wait_duration_ms(action.value.as_deref(), self.config.wait_ms);
                tokio::time::sleep(Duration::from_millis(ms)).await;
                StepOutcome::Ok
            }
            ActionKind::Navigate => match action.value.as_deref().map(str::trim) {
                Some(url) if !url.is_empty() => self.navigate(url).await,
                _ => StepOutcome::skipped("navigate without url"),
            },
        };

        match &outcome {
            StepOutcome::Ok => tracing::debug!(action = action.kind.as_str(), "Action done"),
            StepOutcome::Skipped { reason } => {
                tracing::warn!(action = action.kind.as_str(), %reason, "Action skipped")
            }
            StepOutcome::Failed { reason } => {
                tracing::warn!(action = action.kind.as_str(), %reason, "Action failed")
            }
        }
        outcome
    }

    /// Load `url` under the navigation timeout.
    pub async fn navigate(&self, url: &str) -> StepOutcome {
        let limit = Duration::from_millis(self.config.navigation_timeout_ms);
        match tokio::time::timeout(limit, self.document.navigate(url)).await {
            Ok(Ok(())) => {
                tracing::info!(url, "Navigated");
                StepOutcome::Ok
            }
            Ok(Err(e)) => StepOutcome::failed(e.to_string()),
            Err(_) => StepOutcome::failed(format!(
                "navigation to {url} timed out after {}ms",
                self.config.navigation_timeout_ms
            )),
        }
    }

    async fn scroll(&self, value: Option<&str>) -> StepOutcome {
        let (dx, dy) = match value.map(str::trim).filter(|v| !v.is_empty()) {
            None => (0, self.config.scroll_px),
            Some(raw) => parse_scroll(raw).unwrap_or_else(|| {
                tracing::warn!(value = raw, "Unparseable scroll offset, using default");
                (0, self.config.scroll_px)
            }),
        };
        let outcome = match self.document.scroll_by(dx, dy).await {
            Ok(()) => StepOutcome::Ok,
            Err(e) => StepOutcome::failed(e.to_string()),
        };
        tokio::time::sleep(Duration::from_millis(self.config.scroll_settle_ms)).await;
        outcome
    }

    /// Wait for `selector` to become visible, then run `op`.
    async fn interact<F, Fut>(&self, selector: &str, op: F) -> StepOutcome
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<(), DocumentError>>,
    {
        if let Err(outcome) = self.wait_visible(selector).await {
            return outcome;
        }
        match op().await {
            Ok(()) => StepOutcome::Ok,
            Err(DocumentError::NotFound { selector }) => {
                StepOutcome::skipped(format!("'{selector}' vanished before the action"))
            }
            Err(e) => StepOutcome::failed(e.to_string()),
        }
    }

    /// Poll until the element is visible or the element timeout expires.
    async fn wait_visible(&self, selector: &str) -> Result<(), StepOutcome> {
        let deadline = Instant::now() + Duration::from_millis(self.config.element_timeout_ms);
        let poll = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let mut seen = false;

        loop {
            match self.document.element_box(selector).await {
                Ok(Some(element)) if element.visible => return Ok(()),
                Ok(Some(_)) => seen = true,
                Ok(None) => {}
                Err(e) => return Err(StepOutcome::failed(e.to_string())),
            }

            let now = Instant::now();
            if now >= deadline {
                let reason = if seen {
                    format!(
                        "'{selector}' not visible within {}ms",
                        self.config.element_timeout_ms
                    )
                } else {
                    format!("no element matches '{selector}'")
                };
                return Err(StepOutcome::skipped(reason));
            }
            tokio::time::sleep_until((now + poll).min(deadline)).await;
        }
    }
}

/// Parse a scroll offset: `"dy"` or `"dx,dy"` in pixels.
pub fn parse_scroll(value: &str) -> Option<(i64, i64)> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [dy] => Some((0, parse_px(dy)?)),
        [dx, dy] => Some((parse_px(dx)?, parse_px(dy)?)),
        _ => None,
    }
}

fn parse_px(raw: &str) -> Option<i64> {
    let raw = raw.strip_suffix("px").unwrap_or(raw).trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v.round() as i64)
    })
}

/// Parse a wait duration: `"1500"`, `"1500ms"`, or `"1.5s"`.
pub fn parse_wait(value: &str) -> Option<u64> {
    let value = value.trim();
    let (number, scale) = if let Some(ms) = value.strip_suffix("ms") {
        (ms, 1.0)
    } else if let Some(secs) = value.strip_suffix('s') {
        (secs, 1000.0)
    } else {
        (value, 1.0)
    };
    let parsed: f64 = number.trim().parse().ok()?;
    if !parsed.is_finite() || parsed < 0.0 {
        return None;
    }
    Some((parsed * scale).round() as u64)
}

fn wait_duration_ms(value: Option<&str>, default_ms: u64) -> u64 {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => default_ms,
        Some(raw) => parse_wait(raw).unwrap_or_else(|| {
            tracing::warn!(value = raw, default_ms, "Unparseable wait duration, using default");
            default_ms
        }),
    }
}
