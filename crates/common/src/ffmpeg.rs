//! Helpers for invoking the external `ffmpeg` and `ffprobe` tools.
//!
//! All codec work is delegated to these binaries; DemoReel only builds
//! argument lists and interprets exit status.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{DemoreelError, DemoreelResult};

/// Number of trailing stderr lines kept in error messages.
const STDERR_TAIL_LINES: usize = 12;

/// Check whether a binary is on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Run `ffmpeg` to completion with the given arguments.
///
/// `to_error` decides which error category a failure is reported as, so
/// callers in different stages keep their own taxonomy.
pub async fn run_ffmpeg(
    args: &[String],
    to_error: fn(String) -> DemoreelError,
) -> DemoreelResult<()> {
    tracing::debug!(?args, "Running ffmpeg");
    let output = tokio::process::Command::new("ffmpeg")
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| to_error(format!("Failed to start ffmpeg: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(to_error(format!(
            "ffmpeg failed (status {}): {}",
            output.status,
            stderr_tail(&stderr)
        )));
    }
    Ok(())
}

/// Probe the duration of a media file in milliseconds.
///
/// Returns `None` when ffprobe is unavailable or reports no duration.
pub async fn probe_duration_ms(path: &Path) -> Option<u64> {
    let output = tokio::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }
    parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
}

/// Parse ffprobe's `format=duration` output (seconds) into milliseconds.
pub fn parse_probe_duration(raw: &str) -> Option<u64> {
    let secs = raw.lines().next()?.trim().parse::<f64>().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some((secs * 1000.0).round() as u64)
}

/// Format milliseconds as an ffmpeg duration argument (`S.mmm`).
pub fn ms_arg(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_duration() {
        assert_eq!(parse_probe_duration("4.216000\n"), Some(4216));
        assert_eq!(parse_probe_duration("0.0005"), Some(1));
        assert_eq!(parse_probe_duration("N/A"), None);
        assert_eq!(parse_probe_duration(""), None);
    }

    #[test]
    fn test_ms_arg() {
        assert_eq!(ms_arg(10_000), "10.000");
        assert_eq!(ms_arg(1_234), "1.234");
        assert_eq!(ms_arg(7), "0.007");
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let text = (0..30).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let tail = stderr_tail(&text);
        assert!(tail.starts_with("line 18"));
        assert!(tail.ends_with("line 29"));
    }
}
