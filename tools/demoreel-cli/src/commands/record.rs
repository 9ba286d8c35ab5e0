//! Run a script against a live document, optionally recording the screen.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use demoreel_common::config::AppConfig;
use demoreel_document::{Document, SyntheticDocument, WebDriverDocument};
use demoreel_render_engine::ScreenRecorder;
use demoreel_scheduler::{SchedulerRun, TimelineScheduler};
use demoreel_script_model::Script;

use super::{CAPTURE_FILE, DIAGNOSTICS_FILE, TIMING_FILE};

/// A finished screen capture.
pub struct CaptureFile {
    pub path: PathBuf,
    /// Capture time before the timeline's zero point (ms).
    pub lead_in_ms: u64,
}

/// Everything a recording produced.
pub struct Recording {
    pub run: SchedulerRun,
    pub capture: Option<CaptureFile>,
}

pub async fn run(
    config: &AppConfig,
    script: PathBuf,
    output: PathBuf,
    dry_run: bool,
    no_capture: bool,
) -> anyhow::Result<()> {
    let script = super::load_script(&script)?;
    println!(
        "Recording: {}",
        script.title.as_deref().unwrap_or("untitled script")
    );
    println!("  Output: {}", output.display());
    println!(
        "  Document: {}",
        if dry_run {
            "synthetic (dry run)"
        } else {
            config.webdriver.url.as_str()
        }
    );
    println!();

    let recording = record_script(config, &script, &output, dry_run, !no_capture).await?;
    print_summary(&recording, &output);
    Ok(())
}

/// Drive `script` and write `timing.json` and `diagnostics.json` to `output`.
///
/// The capture (if any) is stopped and the document closed on every path.
pub async fn record_script(
    config: &AppConfig,
    script: &Script,
    output: &Path,
    dry_run: bool,
    capture: bool,
) -> anyhow::Result<Recording> {
    std::fs::create_dir_all(output)?;
    let document = open_document(config, dry_run).await?;

    let mut recorder = if capture && !dry_run {
        match ScreenRecorder::start(&config.capture, &output.join(CAPTURE_FILE)).await {
            Ok(recorder) => Some(recorder),
            Err(e) => {
                close_document(document.as_ref()).await;
                return Err(anyhow::anyhow!("Failed to start screen capture: {e}"));
            }
        }
    } else {
        None
    };

    let mut scheduler = TimelineScheduler::new(document.clone(), config);
    let result = scheduler.run(script).await;

    let stopped = match recorder.as_mut() {
        Some(recorder) => Some(recorder.stop().await),
        None => None,
    };
    close_document(document.as_ref()).await;

    let run = result?;
    run.timing.save(output.join(TIMING_FILE))?;
    run.diagnostics.save(output.join(DIAGNOSTICS_FILE))?;

    let capture = match (stopped, recorder) {
        (Some(stopped), Some(recorder)) => {
            let path = stopped?;
            let lead_in_ms = run
                .epoch
                .saturating_duration_since(recorder.started_at())
                .as_millis() as u64;
            tracing::info!(
                path = %path.display(),
                lead_in_ms,
                "Capture aligned to timeline"
            );
            Some(CaptureFile { path, lead_in_ms })
        }
        _ => None,
    };

    Ok(Recording { run, capture })
}

async fn open_document(config: &AppConfig, dry_run: bool) -> anyhow::Result<Arc<dyn Document>> {
    if dry_run {
        let window = &config.webdriver;
        return Ok(Arc::new(SyntheticDocument::new(
            f64::from(window.width),
            f64::from(window.height),
        )));
    }
    let document = WebDriverDocument::connect(&config.webdriver)
        .await
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to start browser session at {}: {e}",
                config.webdriver.url
            )
        })?;
    Ok(Arc::new(document))
}

async fn close_document(document: &dyn Document) {
    if let Err(e) = document.close().await {
        tracing::warn!(document = document.name(), error = %e, "Failed to close document");
    }
}

fn print_summary(recording: &Recording, output: &Path) {
    let run = &recording.run;
    println!("Timeline ({} ms):", run.timing.total_duration_ms());
    for window in run.timing.sections() {
        println!(
            "  {:<20} {:>8} ms -> {:>8} ms",
            window.id, window.start_time_ms, window.end_time_ms
        );
    }

    let degraded: Vec<_> = run.diagnostics.degraded().collect();
    if !degraded.is_empty() {
        println!("\n{} step(s) did not complete:", degraded.len());
        for step in degraded {
            println!(
                "  - {} #{:?} {:?}: {}",
                step.section_id,
                step.action_index,
                step.phase,
                step.outcome.reason().unwrap_or("")
            );
        }
    }

    println!("\nTiming saved to: {}", output.join(TIMING_FILE).display());
    if let Some(capture) = &recording.capture {
        println!(
            "Capture saved to: {} (lead-in {} ms)",
            capture.path.display(),
            capture.lead_in_ms
        );
    }
}
