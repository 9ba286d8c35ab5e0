pub mod align;
pub mod captions;
pub mod check;
pub mod merge;
pub mod narrate;
pub mod produce;
pub mod record;
pub mod validate;

use std::path::Path;

use demoreel_script_model::Script;

/// Artifact names inside an output directory.
pub const TIMING_FILE: &str = "timing.json";
pub const DIAGNOSTICS_FILE: &str = "diagnostics.json";
pub const NARRATION_FILE: &str = "narration.json";
pub const ALIGNMENT_FILE: &str = "alignment.json";
pub const CLIPS_DIR: &str = "clips";
pub const CAPTURE_FILE: &str = "capture.mkv";
pub const AUDIO_FILE: &str = "narration.wav";
pub const CAPTIONS_FILE: &str = "captions.srt";

/// Load a script and log its authoring problems. Problems never stop a run.
pub fn load_script(path: &Path) -> anyhow::Result<Script> {
    let script = Script::load(path)
        .map_err(|e| anyhow::anyhow!("Failed to load script {}: {e}", path.display()))?;
    for issue in script.validate() {
        tracing::warn!(script = %path.display(), "{issue}");
    }
    Ok(script)
}
