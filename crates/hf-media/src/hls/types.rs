//! HLS playlist types.

use hf_core::{RenditionLadder, Result};
use serde::{Deserialize, Serialize};

/// File name of the master playlist inside the output directory.
pub const MASTER_PLAYLIST_NAME: &str = "index.m3u8";

/// Playlist protocol version written to `#EXT-X-VERSION`.
const DEFAULT_VERSION: u32 = 3;

/// A stream variant in a master playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Advertised bandwidth in bits per second.
    pub bandwidth: u64,
    /// Optional resolution as (width, height).
    pub resolution: Option<(u32, u32)>,
    /// URI of the variant's media playlist, relative to the master playlist.
    pub uri: String,
}

/// An HLS master playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterPlaylist {
    /// `#EXT-X-VERSION` value.
    pub version: u32,
    /// Stream variants, in the order they are listed.
    pub variants: Vec<Variant>,
}

impl MasterPlaylist {
    /// One variant per rendition, in ladder order.
    ///
    /// The advertised bandwidth is the rendition's video bitrate expanded to
    /// bits per second; audio and container overhead are not included.
    pub fn from_ladder(ladder: &RenditionLadder) -> Result<Self> {
        let variants = ladder
            .iter()
            .map(|r| {
                Ok(Variant {
                    bandwidth: r.bandwidth()?,
                    resolution: Some((r.width, r.height)),
                    uri: format!("{}.m3u8", r.playlist_name),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            version: DEFAULT_VERSION,
            variants,
        })
    }
}
