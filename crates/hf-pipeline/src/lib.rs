//! hf-pipeline: the transcode job supervisor.
//!
//! A [`Supervisor`] takes a [`TranscodeJob`] through
//! `Created -> DirectoryEnsured -> Encoding -> {Completed | Failed}`: it owns
//! the output directory, writes the master playlist, drives an
//! [`hf_av::Encoder`] with the compiled plan, and removes partial output when
//! the encode fails, times out, or is cancelled.

pub mod fs;
pub mod job;
pub mod supervisor;

pub use fs::{LocalFs, OutputFs};
pub use job::{TranscodeJob, TranscodeOptions};
pub use supervisor::Supervisor;
