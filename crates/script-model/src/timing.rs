//! Authoritative timing metadata.
//!
//! Timing is only ever constructed through [`TimingBuilder`], which appends
//! contiguous windows, and is re-validated on deserialization. A value of
//! [`TimingMetadata`] therefore always satisfies:
//! - the first section starts at 0
//! - `start_time_ms <= end_time_ms` for every section
//! - each section starts where the previous one ended
//! - `total_duration_ms` equals the last section's end (0 when empty)

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{load_json, save_json, ModelError};

/// Actual start/end of one section as it occurred during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionTiming {
    pub id: String,
    #[serde(alias = "startTime")]
    pub start_time_ms: u64,
    #[serde(alias = "endTime")]
    pub end_time_ms: u64,
    #[serde(default)]
    pub narration: String,
}

impl SectionTiming {
    /// Window length in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.end_time_ms - self.start_time_ms
    }
}

/// Per-section timing windows for a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawTimingMetadata")]
pub struct TimingMetadata {
    sections: Vec<SectionTiming>,
    total_duration_ms: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTimingMetadata {
    sections: Vec<SectionTiming>,
    #[serde(alias = "totalDuration")]
    total_duration_ms: u64,
}

impl TryFrom<RawTimingMetadata> for TimingMetadata {
    type Error = ModelError;

    fn try_from(raw: RawTimingMetadata) -> Result<Self, Self::Error> {
        let mut builder = TimingBuilder::new();
        for section in raw.sections {
            if section.start_time_ms != builder.cursor_ms() {
                return Err(ModelError::InvalidTiming {
                    message: format!(
                        "section '{}' starts at {}ms but the previous section ends at {}ms",
                        section.id,
                        section.start_time_ms,
                        builder.cursor_ms()
                    ),
                });
            }
            builder.push(section.id, section.end_time_ms, section.narration)?;
        }
        let timing = builder.finish();
        if timing.total_duration_ms != raw.total_duration_ms {
            return Err(ModelError::InvalidTiming {
                message: format!(
                    "totalDurationMs is {} but the last section ends at {}",
                    raw.total_duration_ms, timing.total_duration_ms
                ),
            });
        }
        Ok(timing)
    }
}

impl TimingMetadata {
    /// Timing for a script with no sections.
    pub fn empty() -> Self {
        TimingBuilder::new().finish()
    }

    /// Section windows in script order.
    pub fn sections(&self) -> &[SectionTiming] {
        &self.sections
    }

    /// End of the last section (ms).
    pub fn total_duration_ms(&self) -> u64 {
        self.total_duration_ms
    }

    /// Look up a section window by id.
    pub fn section(&self, id: &str) -> Option<&SectionTiming> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Load timing from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        load_json(path)
    }

    /// Save timing as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        save_json(self, path)
    }
}

/// Appends contiguous section windows.
#[derive(Debug, Default)]
pub struct TimingBuilder {
    sections: Vec<SectionTiming>,
    cursor_ms: u64,
}

impl TimingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Where the next section will start.
    pub fn cursor_ms(&self) -> u64 {
        self.cursor_ms
    }

    /// Append a section that starts at the current cursor and ends at
    /// `end_time_ms`.
    pub fn push(
        &mut self,
        id: impl Into<String>,
        end_time_ms: u64,
        narration: impl Into<String>,
    ) -> Result<&SectionTiming, ModelError> {
        let id = id.into();
        if end_time_ms < self.cursor_ms {
            return Err(ModelError::InvalidTiming {
                message: format!(
                    "section '{id}' ends at {end_time_ms}ms, before its start at {}ms",
                    self.cursor_ms
                ),
            });
        }
        self.sections.push(SectionTiming {
            id,
            start_time_ms: self.cursor_ms,
            end_time_ms,
            narration: narration.into(),
        });
        self.cursor_ms = end_time_ms;
        Ok(&self.sections[self.sections.len() - 1])
    }

    pub fn finish(self) -> TimingMetadata {
        TimingMetadata {
            total_duration_ms: self.cursor_ms,
            sections: self.sections,
        }
    }
}
