//! Synthesize narration clips.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use demoreel_audio::{FfprobeDurationProbe, HttpSpeechSynthesizer, NarrationGenerator};
use demoreel_common::config::AppConfig;
use demoreel_script_model::{NarrationManifest, Script};

use super::{CLIPS_DIR, NARRATION_FILE};

pub async fn run(
    config: &AppConfig,
    script: PathBuf,
    output: PathBuf,
    voice: Option<String>,
) -> anyhow::Result<()> {
    let script = super::load_script(&script)?;
    println!("Narrating {} section(s)", script.sections.len());
    println!("  Endpoint: {}", config.audio.endpoint);
    println!("  Voice: {}", voice.as_deref().unwrap_or(&config.audio.voice));
    println!();

    let manifest = narrate_script(config, &script, &output, voice).await?;
    for segment in &manifest.segments {
        println!(
            "  {:<20} {:>8} ms  {}",
            segment.section_id,
            segment.duration_ms,
            segment.clip_path.display()
        );
    }
    println!(
        "\nManifest saved to: {}",
        output.join(NARRATION_FILE).display()
    );
    Ok(())
}

/// Synthesize clips into `<output>/clips` and save `narration.json`.
pub async fn narrate_script(
    config: &AppConfig,
    script: &Script,
    output: &Path,
    voice: Option<String>,
) -> anyhow::Result<NarrationManifest> {
    let synthesizer = Arc::new(HttpSpeechSynthesizer::from_config(&config.audio)?);
    let mut generator =
        NarrationGenerator::new(synthesizer, Arc::new(FfprobeDurationProbe), &config.audio);
    if let Some(voice) = voice {
        generator = generator.with_voice(voice);
    }

    let report = generator.narrate(script, &output.join(CLIPS_DIR)).await?;
    for dropped in &report.dropped {
        println!(
            "  [WARN] No narration for '{}': {}",
            dropped.section_id, dropped.reason
        );
    }
    report.manifest.save(output.join(NARRATION_FILE))?;
    Ok(report.manifest)
}
