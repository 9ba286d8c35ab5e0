//! Screen capture via an `ffmpeg` child process.
//!
//! The recorder is started before the timeline and stopped after it. The
//! instant the child was spawned is kept so the capture's lead-in can be
//! cut off when merging.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use demoreel_common::config::CaptureConfig;
use demoreel_common::error::{DemoreelError, DemoreelResult};
use demoreel_common::ffmpeg::command_exists;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// How long ffmpeg gets to finalize the file after `q`.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 12;

/// Screen grabbing input device, per operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePlatform {
    X11,
    MacOs,
    Windows,
}

impl CapturePlatform {
    /// Platform this binary was built for.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::X11
        }
    }
}

/// Recorder lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Recording,
    Stopped,
}

/// ffmpeg arguments that grab the screen into `output`.
pub fn capture_args(platform: CapturePlatform, config: &CaptureConfig, output: &Path) -> Vec<String> {
    let fps = config.fps.max(1).to_string();
    let size = format!("{}x{}", config.width, config.height);

    let mut args = vec!["-y".to_string(), "-nostats".to_string()];
    match platform {
        CapturePlatform::X11 => args.extend([
            "-f".to_string(),
            "x11grab".to_string(),
            "-framerate".to_string(),
            fps,
            "-video_size".to_string(),
            size,
            "-i".to_string(),
            config.display.clone(),
        ]),
        CapturePlatform::MacOs => args.extend([
            "-f".to_string(),
            "avfoundation".to_string(),
            "-framerate".to_string(),
            fps,
            "-capture_cursor".to_string(),
            "1".to_string(),
            "-i".to_string(),
            format!("{}:none", config.display),
            "-vf".to_string(),
            format!("scale={}:{}", config.width, config.height),
        ]),
        CapturePlatform::Windows => args.extend([
            "-f".to_string(),
            "gdigrab".to_string(),
            "-framerate".to_string(),
            fps,
            "-video_size".to_string(),
            size,
            "-i".to_string(),
            config.display.clone(),
        ]),
    }
    args.extend([
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "ultrafast".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        output.display().to_string(),
    ]);
    args
}

/// A running screen capture.
pub struct ScreenRecorder {
    child: Child,
    output: PathBuf,
    started_at: Instant,
    state: RecorderState,
    stderr_task: Option<JoinHandle<Vec<String>>>,
}

impl ScreenRecorder {
    /// Start grabbing the screen into `output`.
    pub async fn start(config: &CaptureConfig, output: &Path) -> DemoreelResult<Self> {
        if !command_exists("ffmpeg") {
            return Err(DemoreelError::unsupported(
                "Screen capture requires ffmpeg in PATH",
            ));
        }
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let platform = CapturePlatform::current();
        let args = capture_args(platform, config, output);
        tracing::debug!(?args, "Starting screen capture");

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DemoreelError::render(format!("Failed to start screen capture: {e}")))?;
        let started_at = Instant::now();

        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                let mut tail = Vec::new();
                while let Ok(Some(line)) = lines.next_line().await {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.remove(0);
                    }
                    tail.push(line);
                }
                tail
            })
        });

        tracing::info!(
            pid = child.id(),
            ?platform,
            output = %output.display(),
            fps = config.fps,
            "Screen capture started"
        );
        Ok(Self {
            child,
            output: output.to_path_buf(),
            started_at,
            state: RecorderState::Recording,
            stderr_task,
        })
    }

    /// Instant the capture process was spawned.
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Ask ffmpeg to finish the file, killing it if it does not exit in time.
    pub async fn stop(&mut self) -> DemoreelResult<PathBuf> {
        if self.state == RecorderState::Stopped {
            return Ok(self.output.clone());
        }
        self.state = RecorderState::Stopped;

        if let Some(mut stdin) = self.child.stdin.take() {
            if let Err(e) = stdin.write_all(b"q\n").await {
                tracing::debug!(error = %e, "Could not send quit to ffmpeg");
            }
        }

        let status = match tokio::time::timeout(STOP_GRACE, self.child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                tracing::warn!(
                    grace_secs = STOP_GRACE.as_secs(),
                    "Screen capture did not stop, killing ffmpeg"
                );
                self.child.kill().await?;
                self.child.wait().await?
            }
        };

        let tail = match self.stderr_task.take() {
            Some(task) => task.await.unwrap_or_default(),
            None => Vec::new(),
        };
        if !status.success() && !self.output.exists() {
            return Err(DemoreelError::render(format!(
                "Screen capture failed (status {status}): {}",
                tail.join("\n")
            )));
        }

        tracing::info!(
            output = %self.output.display(),
            recorded_secs = self.started_at.elapsed().as_secs_f64(),
            "Screen capture stopped"
        );
        Ok(self.output.clone())
    }
}
