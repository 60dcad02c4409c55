//! Parser for ffmpeg's `-progress` key/value stream.
//!
//! ffmpeg prints the input description (including `Duration: HH:MM:SS.xx`)
//! to stderr before encoding starts; with `-progress pipe:2` it then writes
//! blocks of `key=value` lines, each block closed by `progress=continue` or
//! `progress=end`.

use hf_core::events::EncodeProgress;

/// Incremental parser fed one stderr line at a time.
#[derive(Debug, Default)]
pub struct ProgressParser {
    duration_secs: Option<f64>,
    out_time_us: Option<i64>,
    frame: Option<u64>,
    fps: Option<f64>,
    speed: Option<String>,
}

/// What a single line produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressLine {
    /// The line was consumed without completing a block.
    Pending,
    /// A progress block was completed.
    Update {
        progress: EncodeProgress,
        /// `true` for the final `progress=end` block.
        finished: bool,
    },
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Input duration, once the `Duration:` line has been seen.
    pub fn duration_secs(&self) -> Option<f64> {
        self.duration_secs
    }

    /// Feed one line of stderr.
    pub fn feed(&mut self, line: &str) -> ProgressLine {
        let line = line.trim();

        if self.duration_secs.is_none() {
            if let Some(rest) = line.strip_prefix("Duration:") {
                self.duration_secs = rest
                    .split(',')
                    .next()
                    .and_then(|ts| parse_timestamp(ts.trim()));
                return ProgressLine::Pending;
            }
        }

        let Some((key, value)) = line.split_once('=') else {
            return ProgressLine::Pending;
        };
        let value = value.trim();

        match key.trim() {
            "out_time_us" | "out_time_ms" => {
                // Both keys carry microseconds.
                self.out_time_us = value.parse::<i64>().ok();
            }
            "frame" => self.frame = value.parse::<u64>().ok(),
            "fps" => self.fps = value.parse::<f64>().ok(),
            "speed" => {
                self.speed = (value != "N/A").then(|| value.to_string());
            }
            "progress" => {
                return ProgressLine::Update {
                    progress: self.snapshot(),
                    finished: value == "end",
                };
            }
            _ => {}
        }

        ProgressLine::Pending
    }

    fn snapshot(&self) -> EncodeProgress {
        let out_time_secs = self
            .out_time_us
            .filter(|us| *us >= 0)
            .map(|us| us as f64 / 1_000_000.0);

        let percent = match (out_time_secs, self.duration_secs) {
            (Some(t), Some(d)) if d > 0.0 => Some((t / d * 100.0).clamp(0.0, 100.0)),
            _ => None,
        };

        EncodeProgress {
            percent,
            frame: self.frame,
            fps: self.fps,
            speed: self.speed.clone(),
            out_time_secs,
        }
    }
}

/// Parse `HH:MM:SS(.frac)` into seconds. Returns `None` for `N/A`.
pub fn parse_timestamp(ts: &str) -> Option<f64> {
    let mut parts = ts.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}
