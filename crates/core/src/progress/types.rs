//! Normalized progress value shared by all workers.

use serde::{Serialize, Serializer};
use std::time::Duration;

/// Placeholder for text fields a tool did not report.
pub const NOT_AVAILABLE: &str = "N/A";

/// A snapshot of progress parsed from a tool status line or computed by a worker.
///
/// Values are fixed at construction. `time` is the ETA for downloads and the
/// elapsed media position for transcodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    /// 0-100.
    pub percent: f64,
    pub speed: String,
    #[serde(rename = "time_secs", serialize_with = "serialize_secs")]
    pub time: Duration,
    pub size: String,
    pub frame: u64,
    pub fps: f64,
    pub quality: f64,
    pub bitrate: String,
}

impl Default for ProgressReport {
    fn default() -> Self {
        Self {
            percent: 0.0,
            speed: NOT_AVAILABLE.to_string(),
            time: Duration::ZERO,
            size: NOT_AVAILABLE.to_string(),
            frame: 0,
            fps: 0.0,
            quality: 0.0,
            bitrate: NOT_AVAILABLE.to_string(),
        }
    }
}

impl ProgressReport {
    /// A report carrying only a percentage, clamped to 0-100.
    pub fn from_percent(percent: f64) -> Self {
        Self {
            percent: clamp_percent(percent),
            ..Default::default()
        }
    }

    /// Same report with a different percentage, clamped to 0-100.
    pub fn with_percent(mut self, percent: f64) -> Self {
        self.percent = clamp_percent(percent);
        self
    }
}

pub(crate) fn clamp_percent(percent: f64) -> f64 {
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}

fn serialize_secs<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}
