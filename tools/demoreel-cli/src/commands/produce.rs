//! End-to-end production: record, narrate, align, caption, merge.

use std::path::PathBuf;

use demoreel_audio::{save_captions, segment_with};
use demoreel_common::config::AppConfig;
use demoreel_render_engine::merge::{merge, MergeJob};
use demoreel_script_model::save_json;

use super::{ALIGNMENT_FILE, AUDIO_FILE, CAPTIONS_FILE};

pub async fn run(
    config: &AppConfig,
    script_path: PathBuf,
    output: PathBuf,
    voice: Option<String>,
    video: String,
    dry_run: bool,
) -> anyhow::Result<()> {
    let script = super::load_script(&script_path)?;
    println!(
        "Producing: {}",
        script.title.as_deref().unwrap_or("untitled script")
    );
    println!("  Output: {}", output.display());
    println!();

    println!("[1/5] Recording timeline...");
    let recording =
        super::record::record_script(config, &script, &output, dry_run, !dry_run).await?;
    let timing = &recording.run.timing;
    println!(
        "      {} section(s), {} ms, {} degraded step(s)",
        timing.sections().len(),
        timing.total_duration_ms(),
        recording.run.diagnostics.degraded().count()
    );

    println!("[2/5] Synthesizing narration...");
    let manifest = super::narrate::narrate_script(config, &script, &output, voice).await?;
    println!("      {} clip(s)", manifest.segments.len());

    println!("[3/5] Aligning narration...");
    let audio_path = output.join(AUDIO_FILE);
    let report = super::align::align_track(config, &manifest, timing, &audio_path).await?;
    save_json(&report, output.join(ALIGNMENT_FILE))?;
    super::align::print_report(&report);

    println!("[4/5] Writing captions...");
    let cues = segment_with(&script, timing, config.captions.words_per_cue);
    let captions_path = output.join(CAPTIONS_FILE);
    save_captions(&cues, &captions_path)?;
    println!("      {} cue(s) -> {}", cues.len(), captions_path.display());

    let Some(capture) = recording.capture else {
        println!("[5/5] No screen capture, skipping merge.");
        return Ok(());
    };

    println!("[5/5] Merging capture and narration...");
    let job = MergeJob {
        capture_path: capture.path,
        audio_path,
        output_path: output.join(&video),
        capture_offset_ms: capture.lead_in_ms,
        config: config.export.clone(),
    };
    let final_path = merge(job, Some(super::merge::progress_printer())).await?;
    println!("\nDemo ready: {}", final_path.display());
    Ok(())
}
