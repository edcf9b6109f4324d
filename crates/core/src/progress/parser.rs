//! Line grammars for downloader and transcoder status output.
//!
//! Every parser is total: fields that do not match keep their defaults.

use once_cell::sync::Lazy;
use regex_lite::{Captures, Regex};
use std::time::Duration;

use super::types::{clamp_percent, ProgressReport};

static DL_PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"([0-9.]+)%").unwrap());
static DL_SIZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"of\s+~?\s*([0-9.]+[a-zA-Z]*B)").unwrap());
static DL_SPEED: Lazy<Regex> = Lazy::new(|| Regex::new(r"at\s+([0-9a-zA-Z.]+/s)").unwrap());
static DL_ETA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ETA\s+(?:([0-9]+):)?([0-9]+):([0-9]+)").unwrap());

static FF_FRAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"frame=\s*([0-9]+)").unwrap());
static FF_FPS: Lazy<Regex> = Lazy::new(|| Regex::new(r"fps=\s*([0-9.]+)").unwrap());
static FF_QUALITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bq=\s*(-?[0-9.]+)").unwrap());
static FF_SIZE: Lazy<Regex> = Lazy::new(|| Regex::new(r"size=\s*([0-9]+[a-zA-Z]*B)").unwrap());
static FF_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"time=\s*([0-9]+):([0-9]+):([0-9]+(?:\.[0-9]+)?)").unwrap()
});
static FF_BITRATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"bitrate=\s*([a-zA-Z0-9. ]+/\s*s)").unwrap());
static FF_SPEED: Lazy<Regex> = Lazy::new(|| Regex::new(r"speed=\s*([0-9.]+x)").unwrap());
static FF_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Duration:\s*([0-9]+):([0-9]+):([0-9]+(?:\.[0-9]+)?)").unwrap()
});

/// Parses a downloader status line such as
/// `[download]   9.3% of 146.80MiB at  4.22MiB/s ETA 00:31`.
pub fn parse_downloader(line: &str) -> ProgressReport {
    let mut report = ProgressReport::default();

    if let Some(percent) = first_capture(&DL_PERCENT, line).and_then(|p| p.parse::<f64>().ok()) {
        report.percent = clamp_percent(percent);
    }
    if let Some(size) = first_capture(&DL_SIZE, line) {
        report.size = size.to_string();
    }
    if let Some(speed) = first_capture(&DL_SPEED, line) {
        report.speed = speed.to_string();
    }
    if let Some(caps) = DL_ETA.captures(line) {
        let hours = number(&caps, 1).unwrap_or(0.0);
        let minutes = number(&caps, 2).unwrap_or(0.0);
        let seconds = number(&caps, 3).unwrap_or(0.0);
        report.time = seconds_to_duration(hours * 3600.0 + minutes * 60.0 + seconds)
            .unwrap_or_default();
    }

    report
}

/// Whether a transcoder line is a periodic status line.
pub fn is_transcoder_status(line: &str) -> bool {
    FF_TIME.is_match(line)
}

/// Parses a transcoder status line such as
/// `frame= 120 fps=30.0 q=28.0 size=512kB time=00:01:02.50 bitrate=128.0kbits/s speed=2.0x`.
///
/// `percent` is only derived when a non-zero `total` duration is known.
pub fn parse_transcoder(line: &str, total: Option<Duration>) -> ProgressReport {
    let mut report = ProgressReport::default();

    if let Some(frame) = first_capture(&FF_FRAME, line).and_then(|v| v.parse().ok()) {
        report.frame = frame;
    }
    if let Some(fps) = first_capture(&FF_FPS, line).and_then(|v| v.parse().ok()) {
        report.fps = fps;
    }
    if let Some(quality) = first_capture(&FF_QUALITY, line).and_then(|v| v.parse().ok()) {
        report.quality = quality;
    }
    if let Some(size) = first_capture(&FF_SIZE, line) {
        report.size = size.to_string();
    }
    if let Some(caps) = FF_TIME.captures(line) {
        report.time = clock_from_captures(&caps);
    }
    if let Some(bitrate) = first_capture(&FF_BITRATE, line) {
        report.bitrate = bitrate.trim().to_string();
    }
    if let Some(speed) = first_capture(&FF_SPEED, line) {
        report.speed = speed.to_string();
    }

    if let Some(total) = total.filter(|t| !t.is_zero()) {
        report.percent = clamp_percent(report.time.as_secs_f64() / total.as_secs_f64() * 100.0);
    }

    report
}

/// Parses the `Duration: HH:MM:SS.ff` line of the transcoder's input banner.
pub fn parse_duration_line(line: &str) -> Option<Duration> {
    FF_DURATION.captures(line).map(|caps| clock_from_captures(&caps))
}

/// Parses clock text as printed by the downloader's duration query:
/// `SS`, `MM:SS` or `HH:MM:SS`, optionally with a fractional second.
pub fn parse_clock(text: &str) -> Option<Duration> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let mut total = 0.0;
    for part in text.split(':') {
        let value: f64 = part.trim().parse().ok()?;
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        total = total * 60.0 + value;
    }
    seconds_to_duration(total)
}

fn first_capture<'a>(re: &Regex, line: &'a str) -> Option<&'a str> {
    re.captures(line).and_then(|c| c.get(1)).map(|m| m.as_str())
}

fn number(caps: &Captures<'_>, index: usize) -> Option<f64> {
    caps.get(index).and_then(|m| m.as_str().parse().ok())
}

fn clock_from_captures(caps: &Captures<'_>) -> Duration {
    let hours = number(caps, 1).unwrap_or(0.0);
    let minutes = number(caps, 2).unwrap_or(0.0);
    let seconds = number(caps, 3).unwrap_or(0.0);
    seconds_to_duration(hours * 3600.0 + minutes * 60.0 + seconds).unwrap_or_default()
}

/// `None` for negative, non-finite or out-of-range second counts.
fn seconds_to_duration(seconds: f64) -> Option<Duration> {
    if !seconds.is_finite() {
        return None;
    }
    Duration::try_from_secs_f64(seconds).ok()
}
