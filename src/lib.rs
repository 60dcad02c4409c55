//! hlsforge - adaptive-bitrate HLS packaging on top of ffmpeg
//!
//! This library crate exposes the command-line helpers for integration
//! testing. The transcode machinery lives in the `hf-*` workspace crates.

pub mod ladder;
