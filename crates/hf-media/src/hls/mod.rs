//! HLS playlist generation.
//!
//! The per-rendition media playlists and segments are written by the encoder;
//! this module only produces the master playlist that ties them together.

mod generator;
mod types;

pub use generator::{build_master_playlist, generate_master_playlist};
pub use types::{MasterPlaylist, Variant, MASTER_PLAYLIST_NAME};
