//! Narration clips and caption cues derived from a run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{load_json, save_json, ModelError};

/// One synthesized narration clip for a single section.
///
/// Its duration is independent of the section's timing window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSegment {
    pub section_id: String,
    pub clip_path: PathBuf,
    pub duration_ms: u64,
}

/// The set of clips produced for a script (`narration.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationManifest {
    pub segments: Vec<AudioSegment>,
}

impl NarrationManifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        load_json(path)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        save_json(self, path)
    }
}

/// One time-coded caption entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionCue {
    /// 1-based, sequential across the whole script.
    pub index: usize,
    pub start_time_ms: u64,
    pub end_time_ms: u64,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("narration.json");
        let manifest = NarrationManifest {
            segments: vec![AudioSegment {
                section_id: "intro".to_string(),
                clip_path: dir.path().join("intro.mp3"),
                duration_ms: 4216,
            }],
        };
        manifest.save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"sectionId\": \"intro\""));
        assert_eq!(NarrationManifest::load(&path).unwrap(), manifest);
    }

    #[test]
    fn test_missing_manifest_is_io_error() {
        let err = NarrationManifest::load("/nonexistent/narration.json").unwrap_err();
        assert!(matches!(err, ModelError::IoError { .. }));
    }
}
