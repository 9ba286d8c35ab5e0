//! Merge a screen capture with the aligned narration track.

use std::io::Write;
use std::path::PathBuf;

use demoreel_common::config::AppConfig;
use demoreel_render_engine::merge::{merge, MergeJob, MergeProgress, ProgressCallback};

pub async fn run(
    config: &AppConfig,
    capture: PathBuf,
    audio: PathBuf,
    output: PathBuf,
    offset_ms: u64,
) -> anyhow::Result<()> {
    println!("Merging into: {}", output.display());
    println!("  Capture: {} (skipping {offset_ms} ms)", capture.display());
    println!("  Audio: {}", audio.display());

    let job = MergeJob {
        capture_path: capture,
        audio_path: audio,
        output_path: output,
        capture_offset_ms: offset_ms,
        config: config.export.clone(),
    };
    let output = merge(job, Some(progress_printer())).await?;
    println!("\nMerge complete: {}", output.display());
    Ok(())
}

pub fn progress_printer() -> ProgressCallback {
    Box::new(|p: MergeProgress| {
        print!(
            "\r  Progress: {:.1}% ({:.1}s written, ETA: {:.0}s)  ",
            p.progress * 100.0,
            p.out_time_ms as f64 / 1000.0,
            p.eta_secs,
        );
        let _ = std::io::stdout().flush();
    })
}
