//! Audio alignment compositor.
//!
//! Places each narration clip at the start of its section's timing window
//! and mixes them into one track. Audio never aborts the pipeline: clips
//! without a window are dropped, and a failed mix falls back to silence of
//! the timeline's full length.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use demoreel_common::error::{DemoreelError, DemoreelResult};
use demoreel_common::ffmpeg;
use demoreel_script_model::{AudioSegment, TimingMetadata};
use serde::{Deserialize, Serialize};

/// A clip positioned on the session timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedClip {
    pub section_id: String,
    pub clip_path: PathBuf,
    /// Delay applied before the clip starts (ms).
    pub offset_ms: u64,
    pub duration_ms: u64,
}

impl PlacedClip {
    pub fn end_ms(&self) -> u64 {
        self.offset_ms + self.duration_ms
    }
}

/// How the output track was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentStrategy {
    /// Silent track spanning the whole timeline.
    Silence,
    /// Delayed clips mixed together.
    Mixed,
}

/// Result of an alignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentReport {
    pub path: PathBuf,
    pub duration_ms: u64,
    pub strategy: AlignmentStrategy,
    pub placed: Vec<PlacedClip>,
    /// Section ids whose clips were left out.
    pub dropped: Vec<String>,
}

/// Renders audio tracks. Implementations own all codec work.
#[async_trait]
pub trait AudioEncoder: Send + Sync {
    /// Write a silent track of `duration_ms` to `output`.
    async fn render_silence(&self, duration_ms: u64, output: &Path) -> DemoreelResult<()>;

    /// Delay each clip by its offset and mix them into `output`. The
    /// result lasts as long as the longest delayed clip.
    async fn render_mix(&self, clips: &[PlacedClip], output: &Path) -> DemoreelResult<()>;
}

/// [`AudioEncoder`] backed by the `ffmpeg` binary.
pub struct FfmpegAudioEncoder {
    sample_rate: u32,
}

impl FfmpegAudioEncoder {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

#[async_trait]
impl AudioEncoder for FfmpegAudioEncoder {
    async fn render_silence(&self, duration_ms: u64, output: &Path) -> DemoreelResult<()> {
        let args = silence_args(duration_ms, self.sample_rate, output);
        ffmpeg::run_ffmpeg(&args, DemoreelError::audio).await
    }

    async fn render_mix(&self, clips: &[PlacedClip], output: &Path) -> DemoreelResult<()> {
        if clips.is_empty() {
            return Err(DemoreelError::audio("Nothing to mix"));
        }
        let args = mix_args(clips, output);
        ffmpeg::run_ffmpeg(&args, DemoreelError::audio).await
    }
}

/// ffmpeg arguments for a silent stereo track.
pub fn silence_args(duration_ms: u64, sample_rate: u32, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-f".to_string(),
        "lavfi".to_string(),
        "-i".to_string(),
        format!("anullsrc=r={sample_rate}:cl=stereo"),
        "-t".to_string(),
        ffmpeg::ms_arg(duration_ms),
        output.display().to_string(),
    ]
}

/// ffmpeg arguments that delay every clip on both channels and mix them.
pub fn mix_args(clips: &[PlacedClip], output: &Path) -> Vec<String> {
    let mut args = vec!["-y".to_string()];
    for clip in clips {
        args.push("-i".to_string());
        args.push(clip.clip_path.display().to_string());
    }
    args.push("-filter_complex".to_string());
    args.push(mix_filter(clips));
    args.push("-map".to_string());
    args.push("[out]".to_string());
    args.push(output.display().to_string());
    args
}

/// Filter graph: `adelay` per input, then `amix` over the delayed streams.
pub fn mix_filter(clips: &[PlacedClip]) -> String {
    if let [clip] = clips {
        return format!("[0:a]adelay={0}|{0}[out]", clip.offset_ms);
    }

    let mut graph: Vec<String> = clips
        .iter()
        .enumerate()
        .map(|(i, clip)| format!("[{i}:a]adelay={0}|{0}[a{i}]", clip.offset_ms))
        .collect();
    let inputs: String = (0..clips.len()).map(|i| format!("[a{i}]")).collect();
    graph.push(format!(
        "{inputs}amix=inputs={}:duration=longest:normalize=0[out]",
        clips.len()
    ));
    graph.join(";")
}

/// Position segments on the timeline. Returns the placed clips and the ids
/// of segments whose section has no window.
///
/// The n-th segment carrying an id goes to the n-th window with that id, so
/// repeated section ids each keep their own start.
pub fn place_segments(
    segments: &[AudioSegment],
    timing: &TimingMetadata,
) -> (Vec<PlacedClip>, Vec<String>) {
    let mut placed = Vec::new();
    let mut dropped = Vec::new();
    let mut seen: HashMap<&str, usize> = HashMap::new();

    for segment in segments {
        let occurrence = seen.entry(segment.section_id.as_str()).or_insert(0);
        let window = timing
            .sections()
            .iter()
            .filter(|w| w.id == segment.section_id)
            .nth(*occurrence);
        *occurrence += 1;

        match window {
            Some(window) => placed.push(PlacedClip {
                section_id: segment.section_id.clone(),
                clip_path: segment.clip_path.clone(),
                offset_ms: window.start_time_ms,
                duration_ms: segment.duration_ms,
            }),
            None => {
                tracing::warn!(
                    section = %segment.section_id,
                    "No timing window for narration clip, dropping it"
                );
                dropped.push(segment.section_id.clone());
            }
        }
    }
    (placed, dropped)
}

/// Maps narration clips onto the authoritative timeline.
pub struct AudioAligner<E: AudioEncoder> {
    encoder: E,
}

impl<E: AudioEncoder> AudioAligner<E> {
    pub fn new(encoder: E) -> Self {
        Self { encoder }
    }

    /// Produce one audio track at `output`.
    ///
    /// Errors only when even the silent fallback cannot be written.
    pub async fn align(
        &self,
        segments: &[AudioSegment],
        timing: &TimingMetadata,
        output: &Path,
    ) -> DemoreelResult<AlignmentReport> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let (placed, dropped) = place_segments(segments, timing);
        if placed.is_empty() {
            tracing::info!(
                total_ms = timing.total_duration_ms(),
                dropped = dropped.len(),
                "No narration to place, writing silence"
            );
            return self.silence(timing, output, dropped).await;
        }

        match self.encoder.render_mix(&placed, output).await {
            Ok(()) => {
                let duration_ms = placed.iter().map(PlacedClip::end_ms).max().unwrap_or(0);
                tracing::info!(
                    clips = placed.len(),
                    duration_ms,
                    path = %output.display(),
                    "Narration aligned"
                );
                Ok(AlignmentReport {
                    path: output.to_path_buf(),
                    duration_ms,
                    strategy: AlignmentStrategy::Mixed,
                    placed,
                    dropped,
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "Mixing failed, falling back to silence");
                let mut dropped = dropped;
                dropped.extend(placed.into_iter().map(|clip| clip.section_id));
                self.silence(timing, output, dropped).await
            }
        }
    }

    async fn silence(
        &self,
        timing: &TimingMetadata,
        output: &Path,
        dropped: Vec<String>,
    ) -> DemoreelResult<AlignmentReport> {
        let duration_ms = timing.total_duration_ms();
        self.encoder.render_silence(duration_ms, output).await?;
        Ok(AlignmentReport {
            path: output.to_path_buf(),
            duration_ms,
            strategy: AlignmentStrategy::Silence,
            placed: Vec::new(),
            dropped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use demoreel_script_model::TimingBuilder;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Render {
        Silence(u64),
        Mix(Vec<PlacedClip>),
    }

    #[derive(Default)]
    struct FakeEncoder {
        fail_mix: bool,
        fail_silence: bool,
        renders: Mutex<Vec<Render>>,
    }

    #[async_trait]
    impl AudioEncoder for FakeEncoder {
        async fn render_silence(&self, duration_ms: u64, _output: &Path) -> DemoreelResult<()> {
            self.renders.lock().unwrap().push(Render::Silence(duration_ms));
            if self.fail_silence {
                return Err(DemoreelError::audio("no encoder"));
            }
            Ok(())
        }

        async fn render_mix(&self, clips: &[PlacedClip], _output: &Path) -> DemoreelResult<()> {
            self.renders.lock().unwrap().push(Render::Mix(clips.to_vec()));
            if self.fail_mix {
                return Err(DemoreelError::audio("amix exploded"));
            }
            Ok(())
        }
    }

    fn timing() -> TimingMetadata {
        let mut builder = TimingBuilder::new();
        builder.push("a", 5000, "First").unwrap();
        builder.push("b", 10_000, "Second").unwrap();
        builder.finish()
    }

    fn segment(id: &str, duration_ms: u64) -> AudioSegment {
        AudioSegment {
            section_id: id.to_string(),
            clip_path: PathBuf::from(format!("/clips/{id}.mp3")),
            duration_ms,
        }
    }

    #[tokio::test]
    async fn test_no_segments_yields_full_length_silence() {
        let aligner = AudioAligner::new(FakeEncoder::default());
        let report = aligner
            .align(&[], &timing(), Path::new("out.m4a"))
            .await
            .unwrap();

        assert_eq!(report.strategy, AlignmentStrategy::Silence);
        assert_eq!(report.duration_ms, 10_000);
        assert_eq!(
            *aligner.encoder.renders.lock().unwrap(),
            vec![Render::Silence(10_000)]
        );
    }

    #[tokio::test]
    async fn test_two_segments_are_offset_by_section_start() {
        let aligner = AudioAligner::new(FakeEncoder::default());
        let report = aligner
            .align(
                &[segment("a", 4200), segment("b", 6100)],
                &timing(),
                Path::new("out.m4a"),
            )
            .await
            .unwrap();

        assert_eq!(report.strategy, AlignmentStrategy::Mixed);
        let offsets: Vec<u64> = report.placed.iter().map(|c| c.offset_ms).collect();
        assert_eq!(offsets, vec![0, 5000]);
        assert_eq!(report.placed[1].offset_ms - report.placed[0].offset_ms, 5000);
        assert_eq!(report.duration_ms, 11_100);
    }

    #[tokio::test]
    async fn test_single_segment_is_still_delayed() {
        let aligner = AudioAligner::new(FakeEncoder::default());
        let report = aligner
            .align(&[segment("b", 3000)], &timing(), Path::new("out.m4a"))
            .await
            .unwrap();
        assert_eq!(report.placed[0].offset_ms, 5000);
        assert_eq!(report.duration_ms, 8000);
    }

    #[tokio::test]
    async fn test_unknown_section_is_dropped() {
        let aligner = AudioAligner::new(FakeEncoder::default());
        let report = aligner
            .align(
                &[segment("a", 1000), segment("ghost", 1000)],
                &timing(),
                Path::new("out.m4a"),
            )
            .await
            .unwrap();
        assert_eq!(report.placed.len(), 1);
        assert_eq!(report.dropped, vec!["ghost".to_string()]);
    }

    #[tokio::test]
    async fn test_only_unknown_sections_falls_back_to_silence() {
        let aligner = AudioAligner::new(FakeEncoder::default());
        let report = aligner
            .align(&[segment("ghost", 1000)], &timing(), Path::new("out.m4a"))
            .await
            .unwrap();
        assert_eq!(report.strategy, AlignmentStrategy::Silence);
        assert_eq!(report.duration_ms, 10_000);
    }

    #[tokio::test]
    async fn test_mix_failure_falls_back_to_silence() {
        let aligner = AudioAligner::new(FakeEncoder {
            fail_mix: true,
            ..Default::default()
        });
        let report = aligner
            .align(
                &[segment("a", 1000), segment("b", 1000)],
                &timing(),
                Path::new("out.m4a"),
            )
            .await
            .unwrap();
        assert_eq!(report.strategy, AlignmentStrategy::Silence);
        assert_eq!(report.duration_ms, 10_000);
        assert_eq!(report.dropped, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_silence_failure_is_an_error() {
        let aligner = AudioAligner::new(FakeEncoder {
            fail_mix: true,
            fail_silence: true,
            ..Default::default()
        });
        let result = aligner
            .align(&[segment("a", 1000)], &timing(), Path::new("out.m4a"))
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_repeated_ids_follow_their_own_windows() {
        let mut builder = TimingBuilder::new();
        builder.push("demo", 3000, "First").unwrap();
        builder.push("pause", 4000, "").unwrap();
        builder.push("demo", 9000, "Second").unwrap();
        let timing = builder.finish();

        let (placed, dropped) = place_segments(
            &[segment("demo", 2500), segment("demo", 4000), segment("demo", 1000)],
            &timing,
        );
        let offsets: Vec<u64> = placed.iter().map(|c| c.offset_ms).collect();
        assert_eq!(offsets, vec![0, 4000]);
        assert_eq!(dropped, vec!["demo".to_string()]);
    }

    #[test]
    fn test_mix_filter_graph() {
        let (placed, _) = place_segments(&[segment("a", 1000), segment("b", 1000)], &timing());
        assert_eq!(
            mix_filter(&placed),
            "[0:a]adelay=0|0[a0];[1:a]adelay=5000|5000[a1];\
             [a0][a1]amix=inputs=2:duration=longest:normalize=0[out]"
        );
        assert_eq!(mix_filter(&placed[1..]), "[0:a]adelay=5000|5000[out]");

        let args = mix_args(&placed, Path::new("/tmp/narration.m4a"));
        assert_eq!(&args[..5], &["-y", "-i", "/clips/a.mp3", "-i", "/clips/b.mp3"]);
        assert_eq!(args.last().map(String::as_str), Some("/tmp/narration.m4a"));
    }

    #[test]
    fn test_silence_args() {
        let args = silence_args(10_000, 44_100, Path::new("silence.m4a"));
        assert!(args.contains(&"anullsrc=r=44100:cl=stereo".to_string()));
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "10.000");
    }
}
