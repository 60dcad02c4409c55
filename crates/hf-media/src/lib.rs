//! hf-media: HLS master playlist generation.
//!
//! # Modules
//!
//! - [`hls`] - Master playlist model and M3U8 rendering

pub mod hls;

// Re-export commonly used items at the crate root.
pub use hls::{
    build_master_playlist, generate_master_playlist, MasterPlaylist, Variant,
    MASTER_PLAYLIST_NAME,
};
