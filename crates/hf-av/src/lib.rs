//! # hf-av
//!
//! Encoder-facing side of hlsforge.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache the ffmpeg path.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout,
//!   cancellation, and streamed stderr for running external processes.
//! - **Plan compilation** ([`EncodePlan`]) -- turn a rendition ladder into the
//!   ordered ffmpeg argument list for a single multi-output run.
//! - **Progress parsing** ([`ProgressParser`]) -- read ffmpeg's `-progress`
//!   stream into [`hf_core::events::EncodeProgress`] samples.
//! - **Encoders** ([`Encoder`], [`FfmpegEncoder`]) -- the capability the job
//!   supervisor drives.

pub mod command;
pub mod encoder;
pub mod plan;
pub mod progress;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use encoder::{Encoder, FfmpegEncoder, ProgressFn};
pub use plan::{EncodePlan, RenditionBlock};
pub use progress::{ProgressLine, ProgressParser};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
