/*!
 * ffmpeg `-progress` stream parsing.
 */

use std::sync::LazyLock;

use regex::Regex;

static OUT_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^out_time=(\d+):(\d{2}):(\d{2}(?:\.\d+)?)$").expect("valid out_time pattern"));

/// Elapsed output seconds reported by a progress line
///
/// `out_time_us=` (microseconds) is preferred; `out_time=HH:MM:SS.ffffff` is
/// accepted as a fallback. Anything else, including `N/A`, yields `None`.
pub fn parse_progress_seconds(line: &str) -> Option<f64> {
    let line = line.trim();
    if let Some(raw) = line.strip_prefix("out_time_us=") {
        return raw.parse::<i64>().ok().filter(|us| *us >= 0).map(|us| us as f64 / 1_000_000.0);
    }

    let caps = OUT_TIME.captures(line)?;
    let hours: f64 = caps[1].parse().ok()?;
    let minutes: f64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Whether a line is part of the key=value progress block rather than a log message
pub fn is_progress_record(line: &str) -> bool {
    match line.split_once('=') {
        Some((key, _)) => !key.is_empty() && key.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
        None => false,
    }
}

/// Monotonic progress bounded by a known total
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressTracker {
    total: f64,
    position: f64,
}

impl ProgressTracker {
    pub fn new(total: f64) -> Self {
        Self {
            total: total.max(0.0),
            position: 0.0,
        }
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Move to `seconds`, clamped to the total; returns the new position only if it advanced
    pub fn update(&mut self, seconds: f64) -> Option<f64> {
        let clamped = seconds.clamp(0.0, self.total);
        if clamped > self.position {
            self.position = clamped;
            Some(clamped)
        } else {
            None
        }
    }

    /// Fill to the total; returns the new position if it moved
    pub fn finish(&mut self) -> Option<f64> {
        self.update(self.total)
    }
}
