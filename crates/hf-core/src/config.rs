//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! tool and transcode sections. Every section defaults sensibly so a
//! completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::rendition::{RenditionLadder, RenditionSpec};
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub transcode: TranscodeConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file, failing if it cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let transcode = &self.transcode;
        let encode = &transcode.encode;

        if let Some(ref p) = self.tools.ffmpeg_path {
            if !p.exists() {
                warnings.push(format!(
                    "tools.ffmpeg_path {} does not exist; PATH lookup will be used",
                    p.display()
                ));
            }
        }

        if transcode.timeout_secs == Some(0) {
            warnings.push("transcode.timeout_secs is 0; every job will time out".into());
        }

        if encode.gop_size == 0 {
            warnings.push("transcode.encode.gop_size is 0".into());
        }
        if encode.assumed_frame_rate == 0 {
            warnings.push("transcode.encode.assumed_frame_rate is 0".into());
        }

        let ladder = match RenditionLadder::resolve(transcode.renditions.clone()) {
            Ok(ladder) => ladder,
            Err(e) => {
                warnings.push(format!("transcode.renditions: {e}"));
                return warnings;
            }
        };

        // Segment boundaries only land on keyframes when each segment spans
        // a whole number of GOPs.
        if encode.gop_size > 0 {
            for r in &ladder {
                let frames = u64::from(r.segment_duration) * u64::from(encode.assumed_frame_rate);
                if frames % u64::from(encode.gop_size) != 0 {
                    warnings.push(format!(
                        "rendition {}: {}s segments at {} fps ({} frames) are not a multiple of gop_size {}",
                        r.playlist_name,
                        r.segment_duration,
                        encode.assumed_frame_rate,
                        frames,
                        encode.gop_size
                    ));
                }
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Paths to external tools. Unset entries are looked up in `PATH`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
}

/// What to do when the output directory already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputDirPolicy {
    /// Reuse an existing directory regardless of its contents.
    #[default]
    Reuse,
    /// Refuse to run if the directory exists and is not empty.
    RequireEmpty,
}

/// Job-level transcode settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    /// Ladder override; absent or empty selects the built-in ladder.
    pub renditions: Option<Vec<RenditionSpec>>,
    /// Deadline for the whole job, in seconds.
    pub timeout_secs: Option<u64>,
    pub output_policy: OutputDirPolicy,
    pub encode: EncodeSettings,
}

impl TranscodeConfig {
    /// The job deadline as a [`Duration`].
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Encoder parameters shared by every rendition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeSettings {
    pub video_codec: String,
    pub audio_codec: String,
    pub audio_sample_rate: u32,
    /// Constant rate factor passed as `-crf`.
    pub crf: u32,
    /// Keyframe interval in frames.
    pub gop_size: u32,
    /// Frame rate the GOP size is tuned for. Only used for warnings.
    pub assumed_frame_rate: u32,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".into(),
            audio_codec: "aac".into(),
            audio_sample_rate: 48_000,
            crf: 10,
            gop_size: 48,
            assumed_frame_rate: 24,
        }
    }
}
