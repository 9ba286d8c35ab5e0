//! Narration synthesis.
//!
//! Turns each section's narration text into an audio clip and records its
//! probed duration. Sections are synthesized one after another; a failure
//! for one section drops only that clip.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use demoreel_common::config::AudioConfig;
use demoreel_common::error::{DemoreelError, DemoreelResult};
use demoreel_common::ffmpeg;
use demoreel_script_model::{AudioSegment, NarrationManifest, Script};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Container format requested from the speech service.
const RESPONSE_FORMAT: &str = "mp3";

/// Produces speech audio for a piece of text.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with `voice` and return the encoded audio bytes.
    async fn synthesize(&self, text: &str, voice: &str) -> DemoreelResult<Vec<u8>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Measures the duration of an audio clip.
#[async_trait]
pub trait DurationProbe: Send + Sync {
    async fn duration_ms(&self, path: &Path) -> Option<u64>;
}

/// Probes clips with `ffprobe`.
pub struct FfprobeDurationProbe;

#[async_trait]
impl DurationProbe for FfprobeDurationProbe {
    async fn duration_ms(&self, path: &Path) -> Option<u64> {
        ffmpeg::probe_duration_ms(path).await
    }
}

/// Client for an OpenAI-compatible `/v1/audio/speech` endpoint.
pub struct HttpSpeechSynthesizer {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpSpeechSynthesizer {
    pub fn from_config(config: &AudioConfig) -> DemoreelResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| DemoreelError::audio(format!("Failed to build HTTP client: {e}")))?;

        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!(
                env = %config.api_key_env,
                "No speech API key set, sending unauthenticated requests"
            );
        }

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn request_body(&self, text: &str, voice: &str) -> serde_json::Value {
        json!({
            "model": self.model,
            "input": text,
            "voice": voice,
            "response_format": RESPONSE_FORMAT,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechSynthesizer {
    async fn synthesize(&self, text: &str, voice: &str) -> DemoreelResult<Vec<u8>> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&self.request_body(text, voice));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DemoreelError::audio(format!("Speech request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DemoreelError::audio(format!(
                "Speech service returned {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DemoreelError::audio(format!("Failed to read speech audio: {e}")))?;
        if bytes.is_empty() {
            return Err(DemoreelError::audio("Speech service returned no audio"));
        }
        Ok(bytes.to_vec())
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// A section whose clip could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedClip {
    pub section_id: String,
    pub reason: String,
}

/// Outcome of narrating a whole script.
#[derive(Debug, Clone, Default)]
pub struct NarrationReport {
    pub manifest: NarrationManifest,
    pub dropped: Vec<DroppedClip>,
}

/// Synthesizes and probes one clip per narrated section.
pub struct NarrationGenerator {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    probe: Arc<dyn DurationProbe>,
    voice: String,
    fallback_clip_ms: u64,
}

impl NarrationGenerator {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        probe: Arc<dyn DurationProbe>,
        config: &AudioConfig,
    ) -> Self {
        Self {
            synthesizer,
            probe,
            voice: config.voice.clone(),
            fallback_clip_ms: config.fallback_clip_ms,
        }
    }

    /// Override the configured voice.
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    /// Narrate every section with text, writing clips into `out_dir`.
    ///
    /// Only failing to create `out_dir` is an error.
    pub async fn narrate(&self, script: &Script, out_dir: &Path) -> DemoreelResult<NarrationReport> {
        std::fs::create_dir_all(out_dir)?;
        let mut report = NarrationReport::default();

        for (index, section) in script.sections.iter().enumerate() {
            if !section.has_narration() {
                continue;
            }
            let clip_path = out_dir.join(clip_file_name(index, &section.id));

            match self.clip(section.narration.trim(), &clip_path).await {
                Ok(duration_ms) => {
                    tracing::info!(
                        section = %section.id,
                        path = %clip_path.display(),
                        duration_ms,
                        "Narration clip ready"
                    );
                    report.manifest.segments.push(AudioSegment {
                        section_id: section.id.clone(),
                        clip_path,
                        duration_ms,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        section = %section.id,
                        synthesizer = self.synthesizer.name(),
                        error = %e,
                        "Dropping narration for section"
                    );
                    report.dropped.push(DroppedClip {
                        section_id: section.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    async fn clip(&self, text: &str, path: &Path) -> DemoreelResult<u64> {
        let audio = self.synthesizer.synthesize(text, &self.voice).await?;
        tokio::fs::write(path, &audio).await?;

        Ok(match self.probe.duration_ms(path).await {
            Some(ms) => ms,
            None => {
                tracing::warn!(
                    path = %path.display(),
                    fallback_ms = self.fallback_clip_ms,
                    "Could not probe clip duration, assuming default"
                );
                self.fallback_clip_ms
            }
        })
    }
}

/// File name for a section's clip: index-prefixed, filesystem-safe.
pub fn clip_file_name(index: usize, section_id: &str) -> PathBuf {
    let safe: String = section_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    PathBuf::from(format!("{index:02}-{safe}.{RESPONSE_FORMAT}"))
}
