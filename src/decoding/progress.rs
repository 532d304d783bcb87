//! Progress tracking from ffmpeg's stderr.
//!
//! ffmpeg announces the input duration once (`Duration: 00:03:12.45`) and then
//! emits carriage-return separated status lines containing `time=00:00:41.20`.

use regex::Regex;

/// Turns ffmpeg status lines into a completion percentage.
pub struct ProgressParser {
    duration_re: Regex,
    time_re: Regex,
    duration_secs: Option<f64>,
}

impl ProgressParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            duration_re: Regex::new(r"Duration:\s*(\d+):(\d{2}):(\d{2}(?:\.\d+)?)")?,
            time_re: Regex::new(r"time=\s*(\d+):(\d{2}):(\d{2}(?:\.\d+)?)")?,
            duration_secs: None,
        })
    }

    /// Feeds one line; returns a percentage when the line advances progress.
    pub fn feed(&mut self, line: &str) -> Option<f32> {
        if self.duration_secs.is_none() {
            if let Some(caps) = self.duration_re.captures(line) {
                self.duration_secs = clock_to_secs(&caps[1], &caps[2], &caps[3]);
                return None;
            }
        }

        let total = self.duration_secs.filter(|d| *d > 0.0)?;
        let caps = self.time_re.captures(line)?;
        let elapsed = clock_to_secs(&caps[1], &caps[2], &caps[3])?;
        Some(((elapsed / total) * 100.0).clamp(0.0, 100.0) as f32)
    }
}

fn clock_to_secs(hours: &str, minutes: &str, seconds: &str) -> Option<f64> {
    let h: f64 = hours.parse().ok()?;
    let m: f64 = minutes.parse().ok()?;
    let s: f64 = seconds.parse().ok()?;
    Some(h * 3600.0 + m * 60.0 + s)
}

/// Splits raw stderr bytes on both `\r` and `\n`, dropping empty pieces.
pub fn split_status_lines(chunk: &[u8]) -> impl Iterator<Item = String> + '_ {
    chunk
        .split(|&b| b == b'\r' || b == b'\n')
        .filter(|piece| !piece.is_empty())
        .map(|piece| String::from_utf8_lossy(piece).trim().to_string())
}
