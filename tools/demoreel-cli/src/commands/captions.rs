//! Write captions for a recorded timeline.

use std::path::PathBuf;

use demoreel_audio::{save_captions, segment_with};
use demoreel_common::config::AppConfig;
use demoreel_script_model::TimingMetadata;

pub fn run(
    config: &AppConfig,
    script: PathBuf,
    timing: PathBuf,
    output: PathBuf,
    words_per_cue: Option<usize>,
) -> anyhow::Result<()> {
    let script = super::load_script(&script)?;
    let timing = TimingMetadata::load(&timing)
        .map_err(|e| anyhow::anyhow!("Failed to load timing: {e}"))?;

    let words = words_per_cue.unwrap_or(config.captions.words_per_cue);
    let cues = segment_with(&script, &timing, words);
    save_captions(&cues, &output)?;

    println!("Wrote {} cue(s) to: {}", cues.len(), output.display());
    Ok(())
}
