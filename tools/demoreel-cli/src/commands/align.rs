//! Place narration clips on the recorded timeline.

use std::path::{Path, PathBuf};

use demoreel_audio::{AlignmentReport, AlignmentStrategy, AudioAligner, FfmpegAudioEncoder};
use demoreel_common::config::AppConfig;
use demoreel_script_model::{NarrationManifest, TimingMetadata};

pub async fn run(
    config: &AppConfig,
    timing: PathBuf,
    narration: PathBuf,
    output: PathBuf,
) -> anyhow::Result<()> {
    let timing = TimingMetadata::load(&timing)
        .map_err(|e| anyhow::anyhow!("Failed to load timing: {e}"))?;
    let manifest = NarrationManifest::load(&narration)
        .map_err(|e| anyhow::anyhow!("Failed to load narration manifest: {e}"))?;

    println!(
        "Aligning {} clip(s) over {} ms",
        manifest.segments.len(),
        timing.total_duration_ms()
    );
    let report = align_track(config, &manifest, &timing, &output).await?;
    print_report(&report);
    Ok(())
}

/// Render the aligned track to `output`.
pub async fn align_track(
    config: &AppConfig,
    manifest: &NarrationManifest,
    timing: &TimingMetadata,
    output: &Path,
) -> anyhow::Result<AlignmentReport> {
    let aligner = AudioAligner::new(FfmpegAudioEncoder::new(config.audio.sample_rate));
    Ok(aligner.align(&manifest.segments, timing, output).await?)
}

pub fn print_report(report: &AlignmentReport) {
    for clip in &report.placed {
        println!(
            "  {:<20} at {:>8} ms ({} ms)",
            clip.section_id, clip.offset_ms, clip.duration_ms
        );
    }
    for id in &report.dropped {
        println!("  [WARN] Clip for '{id}' left out");
    }
    match report.strategy {
        AlignmentStrategy::Mixed => println!(
            "\nNarration track saved to: {} ({} ms)",
            report.path.display(),
            report.duration_ms
        ),
        AlignmentStrategy::Silence => println!(
            "\nSilent track saved to: {} ({} ms)",
            report.path.display(),
            report.duration_ms
        ),
    }
}
