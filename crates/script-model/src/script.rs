//! Interaction script types.
//!
//! A script is authored externally as camelCase JSON. It is read-only for
//! every pipeline stage.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{load_json, ModelError};

/// Top-level interaction script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    /// Optional human-readable title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Page loaded before the first section runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_url: Option<String>,

    /// Sections in playback order.
    pub sections: Vec<Section>,
}

/// A named, timed segment of the script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Unique identifier, used to join timing, audio, and captions.
    pub id: String,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Narration spoken over this section. May be empty.
    #[serde(default)]
    pub narration: String,

    /// Minimum section length in seconds.
    #[serde(rename = "duration", alias = "nominalDuration", default)]
    pub nominal_duration_secs: f64,

    /// Actions in execution order.
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// One scripted interaction with the live document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// What to do.
    #[serde(rename = "type")]
    pub kind: ActionKind,

    /// CSS selector of the target element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    /// Kind-specific argument: text to type, URL, scroll offset, wait time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Offset from section start at which the action should begin (ms).
    #[serde(rename = "timing", alias = "timingOffsetMs", default)]
    pub timing_offset_ms: u64,

    /// Visual highlight drawn before the action runs.
    #[serde(default)]
    pub highlight_style: HighlightStyle,

    /// Highlight duration (ms). Also sets how long the step occupies the
    /// timeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_duration_ms: Option<u64>,

    /// Optional text label shown by the box effect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_label: Option<String>,

    /// Optional hex color overriding the configured highlight color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_color: Option<String>,
}

/// Kind of scripted interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Click,
    Scroll,
    Hover,
    Type,
    Wait,
    Navigate,
}

/// Visual highlight effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HighlightStyle {
    /// Directional pointer.
    Arrow,
    /// Dimmed focus region with a cut-out around the target.
    Spotlight,
    /// Bordered box, optionally labelled.
    Box,
    /// Radial emphasis ring.
    Zoom,
    #[default]
    None,
}

impl ActionKind {
    /// Whether this action operates on a target element.
    pub fn requires_selector(self) -> bool {
        matches!(self, ActionKind::Click | ActionKind::Hover | ActionKind::Type)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Click => "click",
            ActionKind::Scroll => "scroll",
            ActionKind::Hover => "hover",
            ActionKind::Type => "type",
            ActionKind::Wait => "wait",
            ActionKind::Navigate => "navigate",
        }
    }
}

impl HighlightStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            HighlightStyle::Arrow => "arrow",
            HighlightStyle::Spotlight => "spotlight",
            HighlightStyle::Box => "box",
            HighlightStyle::Zoom => "zoom",
            HighlightStyle::None => "none",
        }
    }
}

impl Action {
    /// Create an action with no highlight and no arguments.
    pub fn new(kind: ActionKind, timing_offset_ms: u64) -> Self {
        Self {
            kind,
            selector: None,
            value: None,
            timing_offset_ms,
            highlight_style: HighlightStyle::None,
            highlight_duration_ms: None,
            highlight_label: None,
            highlight_color: None,
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_highlight(mut self, style: HighlightStyle, duration_ms: Option<u64>) -> Self {
        self.highlight_style = style;
        self.highlight_duration_ms = duration_ms;
        self
    }

    /// Selector with surrounding whitespace removed; `None` when blank.
    pub fn target(&self) -> Option<&str> {
        self.selector
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Whether the scheduler should draw an overlay before this action.
    pub fn wants_highlight(&self) -> bool {
        self.highlight_style != HighlightStyle::None && self.target().is_some()
    }
}

impl Section {
    /// Create a section without actions.
    pub fn new(id: impl Into<String>, narration: impl Into<String>, duration_secs: f64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            narration: narration.into(),
            nominal_duration_secs: duration_secs,
            actions: vec![],
        }
    }

    /// Minimum section length in milliseconds.
    pub fn nominal_duration_ms(&self) -> u64 {
        let secs = self.nominal_duration_secs;
        if !secs.is_finite() || secs <= 0.0 {
            return 0;
        }
        (secs * 1000.0).round() as u64
    }

    /// Whether this section carries narration text.
    pub fn has_narration(&self) -> bool {
        !self.narration.trim().is_empty()
    }
}

impl Script {
    /// Parse a script from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a script from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        load_json(path)
    }

    /// Look up a section by id.
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Sum of nominal section durations (ms). A lower bound on the run length.
    pub fn nominal_duration_ms(&self) -> u64 {
        self.sections.iter().map(Section::nominal_duration_ms).sum()
    }

    /// Check the script for authoring problems.
    ///
    /// Problems never prevent a run (missing targets degrade to skipped
    /// steps), so they are returned as messages rather than an error.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        if self.sections.is_empty() {
            issues.push("Script has no sections".to_string());
        }

        for section in &self.sections {
            if section.id.trim().is_empty() {
                issues.push("Section with empty id".to_string());
            } else if !seen.insert(section.id.as_str()) {
                issues.push(format!("Duplicate section id '{}'", section.id));
            }

            if !section.nominal_duration_secs.is_finite() || section.nominal_duration_secs < 0.0 {
                issues.push(format!(
                    "Section '{}': duration must be a non-negative number",
                    section.id
                ));
            }

            for (index, action) in section.actions.iter().enumerate() {
                let at = format!("Section '{}' action {} ({})", section.id, index, action.kind.as_str());
                if action.kind.requires_selector() && action.target().is_none() {
                    issues.push(format!("{at}: missing selector"));
                }
                if action.kind == ActionKind::Navigate
                    && action.value.as_deref().map_or(true, |v| v.trim().is_empty())
                {
                    issues.push(format!("{at}: navigate requires a URL value"));
                }
                if action.highlight_style != HighlightStyle::None && action.target().is_none() {
                    issues.push(format!(
                        "{at}: highlight '{}' has no selector and will be skipped",
                        action.highlight_style.as_str()
                    ));
                }
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"{
        "title": "Tour",
        "startUrl": "https://example.com",
        "sections": [
            {
                "id": "intro",
                "name": "Intro",
                "narration": "Welcome to the dashboard",
                "duration": 4.5,
                "actions": [
                    {"type": "hover", "selector": "#nav", "timing": 500, "highlightStyle": "spotlight", "highlightDurationMs": 1500},
                    {"type": "click", "selector": "#start", "timingOffsetMs": 2000, "highlightStyle": "box", "highlightLabel": "Start here"},
                    {"type": "wait", "value": "1s", "timing": 3000}
                ]
            },
            {"id": "outro", "narration": "", "nominalDuration": 2}
        ]
    }"##;

    #[test]
    fn test_parse_script() {
        let script = Script::from_json(SAMPLE).unwrap();
        assert_eq!(script.start_url.as_deref(), Some("https://example.com"));
        assert_eq!(script.sections.len(), 2);

        let intro = &script.sections[0];
        assert_eq!(intro.nominal_duration_ms(), 4500);
        assert_eq!(intro.actions[0].kind, ActionKind::Hover);
        assert_eq!(intro.actions[0].highlight_style, HighlightStyle::Spotlight);
        assert_eq!(intro.actions[0].highlight_duration_ms, Some(1500));
        assert_eq!(intro.actions[1].timing_offset_ms, 2000);
        assert_eq!(intro.actions[1].highlight_label.as_deref(), Some("Start here"));
        assert_eq!(intro.actions[2].highlight_style, HighlightStyle::None);

        let outro = &script.sections[1];
        assert_eq!(outro.nominal_duration_ms(), 2000);
        assert!(!outro.has_narration());
        assert!(outro.actions.is_empty());
        assert_eq!(script.nominal_duration_ms(), 6500);
    }

    #[test]
    fn test_unknown_action_type_is_rejected() {
        let json = r#"{"sections":[{"id":"a","duration":1,"actions":[{"type":"drag"}]}]}"#;
        assert!(Script::from_json(json).is_err());
    }

    #[test]
    fn test_wants_highlight_requires_selector() {
        let with_target = Action::new(ActionKind::Click, 0)
            .with_selector("#go")
            .with_highlight(HighlightStyle::Arrow, None);
        assert!(with_target.wants_highlight());

        let blank_target = Action::new(ActionKind::Click, 0)
            .with_selector("   ")
            .with_highlight(HighlightStyle::Arrow, None);
        assert!(!blank_target.wants_highlight());

        let no_style = Action::new(ActionKind::Click, 0).with_selector("#go");
        assert!(!no_style.wants_highlight());
    }

    #[test]
    fn test_validate_reports_authoring_problems() {
        let mut script = Script::from_json(SAMPLE).unwrap();
        assert!(script.validate().is_empty());

        script.sections[1].id = "intro".to_string();
        script.sections[0].actions.push(Action::new(ActionKind::Navigate, 0));
        script.sections[0]
            .actions
            .push(Action::new(ActionKind::Type, 0).with_highlight(HighlightStyle::Zoom, None));
        script.sections[0].nominal_duration_secs = -1.0;

        let issues = script.validate();
        assert!(issues.iter().any(|i| i.contains("Duplicate section id 'intro'")));
        assert!(issues.iter().any(|i| i.contains("navigate requires a URL")));
        assert!(issues.iter().any(|i| i.contains("missing selector")));
        assert!(issues.iter().any(|i| i.contains("highlight 'zoom'")));
        assert!(issues.iter().any(|i| i.contains("non-negative")));
    }

    #[test]
    fn test_negative_duration_clamps_to_zero_ms() {
        let section = Section::new("s", "", -3.0);
        assert_eq!(section.nominal_duration_ms(), 0);
    }
}
