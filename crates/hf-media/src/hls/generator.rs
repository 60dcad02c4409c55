//! Master playlist rendering.

use std::fmt;

use hf_core::{RenditionLadder, Result};

use super::types::MasterPlaylist;

/// Output is `#EXTM3U`, `#EXT-X-VERSION`, then an `#EXT-X-STREAM-INF` line and
/// a URI line per variant. Every line ends with `\n`.
impl fmt::Display for MasterPlaylist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "#EXTM3U")?;
        writeln!(f, "#EXT-X-VERSION:{}", self.version)?;

        for variant in &self.variants {
            write!(f, "#EXT-X-STREAM-INF:BANDWIDTH={}", variant.bandwidth)?;
            if let Some((w, h)) = variant.resolution {
                write!(f, ",RESOLUTION={w}x{h}")?;
            }
            writeln!(f)?;
            writeln!(f, "{}", variant.uri)?;
        }

        Ok(())
    }
}

/// Render a [`MasterPlaylist`] as M3U8 text.
pub fn generate_master_playlist(playlist: &MasterPlaylist) -> String {
    playlist.to_string()
}

/// Build and render the master playlist for a ladder in one step.
pub fn build_master_playlist(ladder: &RenditionLadder) -> Result<String> {
    Ok(generate_master_playlist(&MasterPlaylist::from_ladder(ladder)?))
}
