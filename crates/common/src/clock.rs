//! Session clock and drift utilities.
//!
//! The authoritative timeline is anchored to the moment a recording session
//! starts. The clock reads `tokio::time::Instant`, so tests that pause the
//! tokio clock observe fully deterministic elapsed times.

use std::time::Duration;

use tokio::time::Instant;

/// Furthest point [`SessionClock::instant_at`] resolves to (one year).
const MAX_TIMELINE_MS: u64 = 365 * 24 * 60 * 60 * 1000;

/// A monotonic clock anchored to the start of one recording session.
#[derive(Debug, Clone)]
pub struct SessionClock {
    /// The instant the session started.
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339).
    epoch_wall: String,
}

impl SessionClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Milliseconds elapsed since the session started.
    pub fn elapsed_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Wall-clock time at session start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// The underlying epoch instant.
    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    /// The instant `ms` milliseconds into the session, capped at one year.
    pub fn instant_at(&self, ms: u64) -> Instant {
        self.epoch + Duration::from_millis(ms.min(MAX_TIMELINE_MS))
    }

    /// Convert milliseconds to fractional seconds.
    pub fn ms_to_secs(ms: u64) -> f64 {
        ms as f64 / 1000.0
    }

    /// Convert fractional seconds to whole milliseconds (rounded).
    pub fn secs_to_ms(secs: f64) -> u64 {
        if !secs.is_finite() || secs <= 0.0 {
            return 0;
        }
        (secs * 1000.0).round() as u64
    }
}

/// Drift between the planned timeline and the measured clock.
#[derive(Debug, Clone, Copy)]
pub struct DriftMeasurement {
    /// Planned position on the timeline (ms).
    pub planned_ms: u64,
    /// Measured elapsed session time (ms).
    pub measured_ms: u64,
}

impl DriftMeasurement {
    /// Drift in milliseconds (positive = execution is running late).
    pub fn drift_ms(&self) -> i64 {
        let drift = i128::from(self.measured_ms) - i128::from(self.planned_ms);
        drift.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
    }

    /// Whether drift exceeds an acceptable threshold.
    pub fn exceeds_threshold_ms(&self, threshold_ms: u64) -> bool {
        self.drift_ms().unsigned_abs() > threshold_ms
    }
}
