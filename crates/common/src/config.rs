//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DemoreelError, DemoreelResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Timeline pacing defaults.
    pub scheduler: SchedulerConfig,

    /// Action execution timeouts and defaults.
    pub executor: ExecutorConfig,

    /// Overlay animation settings.
    pub overlay: OverlayConfig,

    /// Narration synthesis and alignment settings.
    pub audio: AudioConfig,

    /// Caption segmentation settings.
    pub captions: CaptionConfig,

    /// WebDriver connection used for the live document.
    pub webdriver: WebDriverConfig,

    /// Screen capture settings.
    pub capture: CaptureConfig,

    /// Final merge settings.
    pub export: ExportConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Timeline pacing defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Highlight duration when an action does not declare one (ms).
    pub default_highlight_ms: u64,

    /// Time an action occupies on the timeline when it declares no
    /// highlight duration (ms).
    pub default_step_ms: u64,

    /// Drift between planned and measured time that triggers a warning (ms).
    pub drift_warn_ms: u64,

    /// Let measured overruns (slow element waits, page loads) lengthen the
    /// recorded windows. Off: windows follow the nominal step accounting.
    pub follow_measured_clock: bool,
}

/// Action execution defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Bound on waiting for a target to become visible (ms).
    pub element_timeout_ms: u64,

    /// Interval between visibility polls (ms).
    pub poll_interval_ms: u64,

    /// Bound on loading a new document (ms).
    pub navigation_timeout_ms: u64,

    /// Vertical scroll offset used when a scroll action has no value (px).
    pub scroll_px: i64,

    /// Delay after scrolling to absorb smooth-scroll animation (ms).
    pub scroll_settle_ms: u64,

    /// Duration of a wait action without a parseable value (ms).
    pub wait_ms: u64,
}

/// Overlay animation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Animation tick interval (ms).
    pub tick_ms: u64,

    /// Default highlight color as hex string.
    pub color: String,

    /// Whether the arrow effect pulses.
    pub pulse: bool,
}

/// Narration synthesis and alignment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// OpenAI-compatible speech endpoint.
    pub endpoint: String,

    /// Speech model identifier.
    pub model: String,

    /// Voice identifier.
    pub voice: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Duration assumed when a clip cannot be probed (ms).
    pub fallback_clip_ms: u64,

    /// Sample rate of synthesized silence.
    pub sample_rate: u32,

    /// Request timeout for synthesis calls (ms).
    pub request_timeout_ms: u64,
}

/// Caption segmentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// Words per caption cue.
    pub words_per_cue: usize,
}

/// WebDriver connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverConfig {
    /// Base URL of the WebDriver server.
    pub url: String,

    /// Browser name requested in capabilities.
    pub browser: String,

    /// Browser window width in CSS pixels.
    pub width: u32,

    /// Browser window height in CSS pixels.
    pub height: u32,

    /// Extra browser arguments.
    pub args: Vec<String>,
}

/// Screen capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Display or device to grab (e.g. `:0.0` on X11).
    pub display: String,

    /// Capture frame rate.
    pub fps: u32,

    /// Captured region width.
    pub width: u32,

    /// Captured region height.
    pub height: u32,
}

/// Final merge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// x264/x265 constant rate factor.
    pub crf: u32,

    /// Audio bitrate in kbps.
    pub audio_bitrate_kbps: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "demoreel=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_highlight_ms: 2000,
            default_step_ms: 1000,
            drift_warn_ms: 500,
            follow_measured_clock: false,
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            element_timeout_ms: 5000,
            poll_interval_ms: 100,
            navigation_timeout_ms: 30_000,
            scroll_px: 300,
            scroll_settle_ms: 500,
            wait_ms: 1000,
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            tick_ms: 16,
            color: "#ff4757".to_string(),
            pulse: true,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/audio/speech".to_string(),
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            fallback_clip_ms: 5000,
            sample_rate: 44_100,
            request_timeout_ms: 60_000,
        }
    }
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self { words_per_cue: 12 }
    }
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:4444".to_string(),
            browser: "chrome".to_string(),
            width: 1280,
            height: 720,
            args: vec![],
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            display: ":0.0".to_string(),
            fps: 30,
            width: 1280,
            height: 720,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            crf: 23,
            audio_bitrate_kbps: 192,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path. Missing keys take their defaults.
    pub fn load_from(path: &Path) -> DemoreelResult<Self> {
        if !path.exists() {
            return Err(DemoreelError::file_not_found(path));
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| DemoreelError::config(format!("{}: {e}", path.display())))
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("demoreel").join("config.json")
}
