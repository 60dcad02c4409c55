//! hf-core: shared types, errors, configuration, the rendition model, and the
//! job event channel.
//!
//! This crate is the foundational dependency for all other hf-* crates. It
//! owns the declarative side of a transcode: what renditions to produce
//! ([`RenditionSpec`], [`RenditionLadder`]) and how a job reports back
//! ([`events::EventSender`]).

pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod rendition;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::JobId;
pub use rendition::{parse_bitrate, RenditionLadder, RenditionSpec};
