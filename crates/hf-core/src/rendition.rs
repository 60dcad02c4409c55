//! Rendition model: one [`RenditionSpec`] per output quality tier, collected
//! into an ordered, validated [`RenditionLadder`].
//!
//! Ladder order is preserved verbatim everywhere downstream: it drives both
//! the encoder argument blocks and the master playlist stream order.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Declarative description of one output quality tier.
///
/// Deserialization accepts the snake_case field names as well as the short
/// keys used by older ladder files (`bv`, `maxrate`, `bufsize`, `ba`,
/// `hlsTime`, `ts_title`, `master_title`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenditionSpec {
    /// Target frame width; the source is fit inside `width x height`.
    pub width: u32,
    /// Target frame height.
    pub height: u32,
    /// Encoder profile name (e.g. "main", "high").
    pub profile: String,
    /// Target video bitrate, e.g. "1400k".
    #[serde(alias = "bv")]
    pub video_bitrate: String,
    /// Peak video bitrate.
    #[serde(alias = "maxrate")]
    pub max_bitrate: String,
    /// Rate-control buffer size.
    #[serde(alias = "bufsize")]
    pub buffer_size: String,
    /// Target audio bitrate.
    #[serde(alias = "ba")]
    pub audio_bitrate: String,
    /// Target segment length in seconds.
    #[serde(alias = "hlsTime", deserialize_with = "de_seconds")]
    pub segment_duration: u32,
    /// Prefix for `.ts` segment files (`<prefix>_000.ts`).
    #[serde(alias = "ts_title")]
    pub segment_prefix: String,
    /// Base name of this rendition's own playlist (`<name>.m3u8`).
    #[serde(alias = "master_title")]
    pub playlist_name: String,
}

impl RenditionSpec {
    /// Video bitrate in bits per second.
    pub fn bandwidth(&self) -> Result<u64> {
        parse_bitrate(&self.video_bitrate)
    }

    fn validate(&self, index: usize) -> Result<()> {
        let field = |name: &str| format!("renditions[{index}].{name}");

        if self.width == 0 {
            return Err(Error::Validation(format!("{} must be positive", field("width"))));
        }
        if self.height == 0 {
            return Err(Error::Validation(format!("{} must be positive", field("height"))));
        }
        if self.segment_duration == 0 {
            return Err(Error::Validation(format!(
                "{} must be positive",
                field("segment_duration")
            )));
        }
        if self.profile.trim().is_empty() {
            return Err(Error::Validation(format!("{} is empty", field("profile"))));
        }

        for (name, value) in [
            ("video_bitrate", &self.video_bitrate),
            ("max_bitrate", &self.max_bitrate),
            ("buffer_size", &self.buffer_size),
            ("audio_bitrate", &self.audio_bitrate),
        ] {
            let bits = parse_bitrate(value)
                .map_err(|e| Error::Validation(format!("{}: {e}", field(name))))?;
            if bits == 0 {
                return Err(Error::Validation(format!("{} must be positive", field(name))));
            }
        }

        for (name, value) in [
            ("segment_prefix", &self.segment_prefix),
            ("playlist_name", &self.playlist_name),
        ] {
            if value.is_empty() {
                return Err(Error::Validation(format!("{} is empty", field(name))));
            }
            if value.contains(['/', '\\']) || value == "." || value == ".." {
                return Err(Error::Validation(format!(
                    "{} must be a plain file name, got {value:?}",
                    field(name)
                )));
            }
        }

        Ok(())
    }
}

/// Accept the segment duration as either a JSON integer or a numeric string.
fn de_seconds<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Int(u32),
        Text(String),
    }

    match Seconds::deserialize(deserializer)? {
        Seconds::Int(n) => Ok(n),
        Seconds::Text(s) => s
            .trim()
            .parse::<u32>()
            .map_err(|e| serde::de::Error::custom(format!("invalid segment duration {s:?}: {e}"))),
    }
}

/// Parse a rate string of the form `<integer><unit>` into bits per second.
///
/// Units: none (bits), `k`/`K` (x1000), `m`/`M` (x1000000).
///
/// ```
/// assert_eq!(hf_core::parse_bitrate("1400k").unwrap(), 1_400_000);
/// assert_eq!(hf_core::parse_bitrate("5M").unwrap(), 5_000_000);
/// ```
pub fn parse_bitrate(value: &str) -> Result<u64> {
    let value = value.trim();
    let (digits, multiplier) = match value.char_indices().last() {
        Some((i, 'k' | 'K')) => (&value[..i], 1_000),
        Some((i, 'm' | 'M')) => (&value[..i], 1_000_000),
        Some(_) => (value, 1),
        None => return Err(Error::Validation("empty bitrate".into())),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Validation(format!(
            "bitrate {value:?} is not of the form <integer><unit>"
        )));
    }

    digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(|| Error::Validation(format!("bitrate {value:?} is out of range")))
}

/// An ordered, non-empty, validated sequence of renditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RenditionLadder(Vec<RenditionSpec>);

impl RenditionLadder {
    /// Validate and wrap a list of renditions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the list is empty, any field is
    /// malformed, or two renditions share a `segment_prefix` or
    /// `playlist_name`.
    pub fn new(renditions: Vec<RenditionSpec>) -> Result<Self> {
        if renditions.is_empty() {
            return Err(Error::Validation("rendition ladder is empty".into()));
        }

        let mut prefixes = HashSet::new();
        let mut playlists = HashSet::new();
        for (i, r) in renditions.iter().enumerate() {
            r.validate(i)?;
            if !prefixes.insert(r.segment_prefix.as_str()) {
                return Err(Error::Validation(format!(
                    "renditions[{i}].segment_prefix {:?} is used more than once",
                    r.segment_prefix
                )));
            }
            if !playlists.insert(r.playlist_name.as_str()) {
                return Err(Error::Validation(format!(
                    "renditions[{i}].playlist_name {:?} is used more than once",
                    r.playlist_name
                )));
            }
        }

        Ok(Self(renditions))
    }

    /// Pick the effective ladder: the caller's if present and non-empty,
    /// otherwise the built-in default. The result is always validated.
    pub fn resolve(renditions: Option<Vec<RenditionSpec>>) -> Result<Self> {
        match renditions {
            Some(list) if !list.is_empty() => Self::new(list),
            _ => {
                tracing::debug!("No renditions supplied; using the default ladder");
                Self::new(default_renditions())
            }
        }
    }

    /// The built-in default ladder.
    pub fn default_ladder() -> Self {
        Self(default_renditions())
    }

    /// Number of renditions.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; a ladder cannot be constructed empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate renditions in ladder order.
    pub fn iter(&self) -> std::slice::Iter<'_, RenditionSpec> {
        self.0.iter()
    }

    /// Borrow the renditions as a slice.
    pub fn as_slice(&self) -> &[RenditionSpec] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a RenditionLadder {
    type Item = &'a RenditionSpec;
    type IntoIter = std::slice::Iter<'a, RenditionSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn tier(
    width: u32,
    height: u32,
    video: &str,
    max: &str,
    buffer: &str,
    audio: &str,
    name: &str,
) -> RenditionSpec {
    RenditionSpec {
        width,
        height,
        profile: "main".into(),
        video_bitrate: video.into(),
        max_bitrate: max.into(),
        buffer_size: buffer.into(),
        audio_bitrate: audio.into(),
        segment_duration: 4,
        segment_prefix: name.into(),
        playlist_name: name.into(),
    }
}

/// Standard 16:9 tiers, lowest first.
fn default_renditions() -> Vec<RenditionSpec> {
    vec![
        tier(640, 360, "800k", "856k", "1200k", "96k", "360p"),
        tier(842, 480, "1400k", "1498k", "2100k", "128k", "480p"),
        tier(1280, 720, "2800k", "2996k", "4200k", "128k", "720p"),
        tier(1920, 1080, "5000k", "5350k", "7500k", "192k", "1080p"),
    ]
}
