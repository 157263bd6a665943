use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::text::TIMECODE_ARROW;

/// Start and end of a cue, in seconds from the start of the episode
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: f64,
    pub end: f64,
}

impl TimeSpan {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            format_timestamp(self.start),
            TIMECODE_ARROW,
            format_timestamp(self.end)
        )
    }
}

/// Parse a WebVTT cue timing line (`HH:MM:SS.mmm --> HH:MM:SS.mmm`).
///
/// Cue settings after the end timestamp (`align:start position:0%`) are ignored.
pub fn parse_timecode_line(line: &str) -> Result<TimeSpan> {
    let (start, rest) = line
        .split_once(TIMECODE_ARROW)
        .ok_or_else(|| anyhow!("Missing '{}' in time-code line", TIMECODE_ARROW.trim()))?;

    let end = rest
        .split_whitespace()
        .next()
        .ok_or_else(|| anyhow!("Missing end timestamp"))?;

    Ok(TimeSpan::new(
        parse_timestamp(start.trim())?,
        parse_timestamp(end)?,
    ))
}

/// Parse a single timestamp (`HH:MM:SS.mmm`, or `MM:SS.mmm`) into seconds
pub fn parse_timestamp(timestamp: &str) -> Result<f64> {
    let parts: Vec<&str> = timestamp.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => ("0", *m, *s),
        _ => return Err(anyhow!("Invalid timestamp format: {}", timestamp)),
    };

    let hours: u64 = hours.parse()?;
    let minutes: u64 = minutes.parse()?;
    let seconds: f64 = seconds.parse()?;

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(anyhow!("Invalid seconds field: {}", timestamp));
    }

    let whole = hours
        .checked_mul(3600)
        .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
        .ok_or_else(|| anyhow!("Timestamp out of range: {}", timestamp))?;

    Ok(whole as f64 + seconds)
}

/// Format seconds as a WebVTT timestamp (HH:MM:SS.mmm)
pub fn format_timestamp(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}
