//! Stream merge: screen capture + aligned narration into the final asset.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use demoreel_common::config::ExportConfig;
use demoreel_common::error::{DemoreelError, DemoreelResult};
use demoreel_common::ffmpeg::{self, command_exists};

/// A merge ready to run.
#[derive(Debug, Clone)]
pub struct MergeJob {
    /// Raw screen capture (video is taken from here).
    pub capture_path: PathBuf,

    /// Aligned narration track (audio is taken from here).
    pub audio_path: PathBuf,

    /// Final asset path. Its extension picks the container and codecs.
    pub output_path: PathBuf,

    /// Lead-in to skip at the start of the capture (ms), so the capture's
    /// zero lines up with the timeline's zero.
    pub capture_offset_ms: u64,

    pub config: ExportConfig,
}

/// Progress callback for merging.
pub type ProgressCallback = Box<dyn Fn(MergeProgress) + Send>;

/// Merge progress report.
#[derive(Debug, Clone)]
pub struct MergeProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Output written so far (ms).
    pub out_time_ms: u64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    pub stage: MergeStage,
}

/// Stages of a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStage {
    Preparing,
    Encoding,
    Finalizing,
    Complete,
}

/// Output container, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    /// H.264 + AAC
    Mp4,
    /// VP9 + Opus
    Webm,
    /// Video copied as-is + AAC
    Mkv,
}

impl ContainerFormat {
    pub fn from_path(path: &Path) -> DemoreelResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("mp4") | Some("m4v") | Some("mov") => Ok(Self::Mp4),
            Some("webm") => Ok(Self::Webm),
            Some("mkv") => Ok(Self::Mkv),
            other => Err(DemoreelError::unsupported(format!(
                "Unsupported output container: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }
}

/// Something that can combine a capture and an audio track.
pub trait MergeBackend: Send {
    /// Execute the merge job.
    fn merge(
        &mut self,
        job: &MergeJob,
        expected_duration_ms: Option<u64>,
        progress: Option<ProgressCallback>,
    ) -> DemoreelResult<()>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Merge video from the capture with audio from the narration track.
///
/// The output ends with the shorter input. Any failure is returned: there
/// is no degraded merge.
pub async fn merge(job: MergeJob, progress: Option<ProgressCallback>) -> DemoreelResult<PathBuf> {
    tracing::info!(
        capture = %job.capture_path.display(),
        audio = %job.audio_path.display(),
        output = %job.output_path.display(),
        capture_offset_ms = job.capture_offset_ms,
        "Starting merge"
    );

    for input in [&job.capture_path, &job.audio_path] {
        if !input.exists() {
            return Err(DemoreelError::file_not_found(input.clone()));
        }
    }
    ContainerFormat::from_path(&job.output_path)?;
    if let Some(parent) = job.output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    if let Some(cb) = &progress {
        cb(MergeProgress {
            progress: 0.0,
            out_time_ms: 0,
            eta_secs: 0.0,
            stage: MergeStage::Preparing,
        });
    }

    let expected_duration_ms = expected_duration(&job).await;

    let mut backend: Box<dyn MergeBackend> = Box::new(FfmpegMergeBackend);
    if !backend.is_available() {
        return Err(DemoreelError::unsupported(
            "No supported merge backend found (expected ffmpeg in PATH)",
        ));
    }
    tracing::info!(backend = backend.name(), "Using merge backend");

    let output = job.output_path.clone();
    tokio::task::spawn_blocking(move || backend.merge(&job, expected_duration_ms, progress))
        .await
        .map_err(|e| DemoreelError::render(format!("Merge task panicked: {e}")))??;

    tracing::info!(output = %output.display(), "Merge finished");
    Ok(output)
}

/// Length of the shorter input after the capture lead-in is skipped.
async fn expected_duration(job: &MergeJob) -> Option<u64> {
    let capture = ffmpeg::probe_duration_ms(&job.capture_path)
        .await
        .map(|ms| ms.saturating_sub(job.capture_offset_ms));
    let audio = ffmpeg::probe_duration_ms(&job.audio_path).await;
    match (capture, audio) {
        (Some(c), Some(a)) => Some(c.min(a)),
        (c, a) => c.or(a),
    }
}

/// Full ffmpeg argument list for a merge.
pub fn merge_args(job: &MergeJob, format: ContainerFormat) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-nostats".to_string(),
        "-progress".to_string(),
        "pipe:1".to_string(),
    ];
    if job.capture_offset_ms > 0 {
        args.push("-ss".to_string());
        args.push(ffmpeg::ms_arg(job.capture_offset_ms));
    }
    args.extend([
        "-i".to_string(),
        job.capture_path.display().to_string(),
        "-i".to_string(),
        job.audio_path.display().to_string(),
        "-map".to_string(),
        "0:v:0".to_string(),
        "-map".to_string(),
        "1:a:0".to_string(),
    ]);
    args.extend(codec_args(format, &job.config));
    args.push("-shortest".to_string());
    args.push(job.output_path.display().to_string());
    args
}

fn codec_args(format: ContainerFormat, config: &ExportConfig) -> Vec<String> {
    let crf = config.crf.to_string();
    let audio_bitrate = format!("{}k", config.audio_bitrate_kbps.max(64));

    match format {
        ContainerFormat::Mp4 => vec![
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "medium".to_string(),
            "-crf".to_string(),
            crf,
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            audio_bitrate,
            "-movflags".to_string(),
            "+faststart".to_string(),
        ],
        ContainerFormat::Webm => vec![
            "-c:v".to_string(),
            "libvpx-vp9".to_string(),
            "-crf".to_string(),
            crf,
            "-b:v".to_string(),
            "0".to_string(),
            "-c:a".to_string(),
            "libopus".to_string(),
            "-b:a".to_string(),
            audio_bitrate,
        ],
        ContainerFormat::Mkv => vec![
            "-c:v".to_string(),
            "copy".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            audio_bitrate,
        ],
    }
}

/// Merges by running `ffmpeg` and following its `-progress` output.
pub struct FfmpegMergeBackend;

impl MergeBackend for FfmpegMergeBackend {
    fn merge(
        &mut self,
        job: &MergeJob,
        expected_duration_ms: Option<u64>,
        progress: Option<ProgressCallback>,
    ) -> DemoreelResult<()> {
        let format = ContainerFormat::from_path(&job.output_path)?;
        let args = merge_args(job, format);
        tracing::debug!(?args, "Running ffmpeg");

        let start = std::time::Instant::now();
        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DemoreelError::render(format!("Failed to start ffmpeg: {e}")))?;

        tracing::info!(pid = child.id(), ?format, "ffmpeg merge started");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DemoreelError::render("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DemoreelError::render("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently to avoid ffmpeg blocking on a full stderr pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        let mut state = ProgressState::default();
        loop {
            line.clear();
            let bytes = reader
                .read_line(&mut line)
                .map_err(|e| DemoreelError::render(format!("Failed reading ffmpeg progress: {e}")))?;
            if bytes == 0 {
                break;
            }

            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            state.update(key, value);
            if key == "progress" {
                if let Some(cb) = &progress {
                    cb(progress_report(
                        &state,
                        expected_duration_ms,
                        start.elapsed().as_secs_f64(),
                    ));
                }
            }
        }

        let status = child
            .wait()
            .map_err(|e| DemoreelError::render(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(DemoreelError::render(format!(
                "ffmpeg merge failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }

        if let Some(cb) = &progress {
            cb(MergeProgress {
                progress: 1.0,
                out_time_ms: state.out_time_ms,
                eta_secs: 0.0,
                stage: MergeStage::Complete,
            });
        }
        tracing::info!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            out_time_ms = state.out_time_ms,
            "ffmpeg merge complete"
        );
        Ok(())
    }

    fn is_available(&self) -> bool {
        command_exists("ffmpeg")
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_ms: u64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // Despite the name, ffmpeg reports out_time_ms in microseconds.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.trim().parse::<u64>() {
                    self.out_time_ms = us / 1000;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(
    state: &ProgressState,
    expected_duration_ms: Option<u64>,
    elapsed_secs: f64,
) -> MergeProgress {
    let progress = match expected_duration_ms {
        Some(total) if total > 0 => (state.out_time_ms as f64 / total as f64).clamp(0.0, 1.0),
        _ => 0.0,
    };
    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    MergeProgress {
        progress: if state.complete { 1.0 } else { progress },
        out_time_ms: state.out_time_ms,
        eta_secs,
        stage: if state.complete {
            MergeStage::Finalizing
        } else {
            MergeStage::Encoding
        },
    }
}
