//! Shared test doubles for integration tests.
//!
//! [`FakeEncoder`] stands in for ffmpeg: it writes segment files into the
//! output directory and then succeeds, fails, or waits to be cancelled.
//! [`FlakyFs`] wraps [`LocalFs`] and injects failures into selected
//! operations.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hf_av::plan::segment_filename;
use hf_av::{Encoder, ProgressFn};
use hf_core::events::{EncodeProgress, EventSender, JobEvent};
use hf_core::{Error, Result};
use hf_pipeline::{LocalFs, OutputFs, Supervisor, TranscodeJob, TranscodeOptions};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// How a [`FakeEncoder`] run ends.
#[derive(Debug, Clone)]
pub enum Outcome {
    Succeed,
    Fail(String),
    /// Block until cancelled.
    Hang,
}

pub struct FakeEncoder {
    /// Segment files written per rendition before the outcome.
    pub segments: u32,
    pub outcome: Outcome,
    pub calls: AtomicUsize,
    pub last_args: Mutex<Vec<String>>,
}

impl FakeEncoder {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            segments: 3,
            outcome,
            calls: AtomicUsize::new(0),
            last_args: Mutex::new(Vec::new()),
        }
    }

    pub fn with_segments(mut self, segments: u32) -> Self {
        self.segments = segments;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_args(&self) -> Vec<String> {
        self.last_args.lock().unwrap().clone()
    }
}

/// Value following `flag` at every occurrence.
pub fn values_after<'a>(args: &'a [String], flag: &str) -> Vec<&'a str> {
    args.windows(2)
        .filter(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .collect()
}

#[async_trait]
impl Encoder for FakeEncoder {
    fn name(&self) -> &str {
        "fake"
    }

    async fn encode(
        &self,
        args: &[String],
        on_progress: &ProgressFn<'_>,
        cancel: CancellationToken,
    ) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_args.lock().unwrap() = args.to_vec();

        for pattern in values_after(args, "-hls_segment_filename") {
            let pattern = Path::new(pattern);
            let dir = pattern.parent().unwrap();
            let prefix = pattern
                .file_name()
                .unwrap()
                .to_string_lossy()
                .trim_end_matches("_%03d.ts")
                .to_string();
            for seq in 0..self.segments {
                tokio::fs::write(dir.join(segment_filename(&prefix, seq)), b"ts").await?;
            }
        }

        on_progress(EncodeProgress {
            percent: Some(25.0),
            ..Default::default()
        });

        match &self.outcome {
            Outcome::Succeed => {
                for playlist in args.iter().filter(|a| a.ends_with(".m3u8")) {
                    tokio::fs::write(playlist, b"#EXTM3U\n#EXT-X-ENDLIST\n").await?;
                }
                Ok(())
            }
            Outcome::Fail(message) => Err(Error::tool("ffmpeg", message.clone())),
            Outcome::Hang => {
                cancel.cancelled().await;
                Err(Error::Cancelled("fake encoder stopped".into()))
            }
        }
    }
}

/// [`LocalFs`] with switchable failures.
#[derive(Default)]
pub struct FlakyFs {
    /// `remove_file` fails for entries with this file name.
    pub fail_remove_of: Option<String>,
    pub fail_remove_dir_all: bool,
    pub fail_write: bool,
}

fn injected(op: &str, path: &Path) -> Error {
    Error::from(std::io::Error::new(
        std::io::ErrorKind::PermissionDenied,
        format!("injected {op} failure at {}", path.display()),
    ))
}

#[async_trait]
impl OutputFs for FlakyFs {
    async fn exists(&self, path: &Path) -> Result<bool> {
        LocalFs.exists(path).await
    }

    async fn is_file(&self, path: &Path) -> Result<bool> {
        LocalFs.is_file(path).await
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        LocalFs.ensure_dir(path).await
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        LocalFs.list_dir(path).await
    }

    async fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if self.fail_write {
            return Err(injected("write", path));
        }
        LocalFs.write_file(path, contents).await
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        if name.is_some() && name == self.fail_remove_of {
            return Err(injected("remove", path));
        }
        LocalFs.remove_file(path).await
    }

    async fn remove_dir(&self, path: &Path) -> Result<()> {
        LocalFs.remove_dir(path).await
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<()> {
        if self.fail_remove_dir_all {
            return Err(injected("remove_dir_all", path));
        }
        LocalFs.remove_dir_all(path).await
    }
}

/// A temp directory holding an input file and a not-yet-created output dir.
pub struct Workspace {
    pub tmp: TempDir,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("input.mp4");
        std::fs::write(&input, b"fake video").unwrap();
        let output = tmp.path().join("hls");
        Self { tmp, input, output }
    }

    pub fn job(&self, options: TranscodeOptions) -> TranscodeJob {
        TranscodeJob::new(&self.input, &self.output, options)
    }

    /// Sorted file names in the output directory.
    pub fn output_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.output)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// A supervisor whose events are collected into the returned vector.
pub fn supervisor_with_events(
    encoder: Arc<FakeEncoder>,
    fs: Arc<dyn OutputFs>,
) -> (Supervisor, Arc<Mutex<Vec<JobEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let supervisor = Supervisor::new(encoder, fs)
        .with_events(EventSender::new(move |e| sink.lock().unwrap().push(e.clone())));
    (supervisor, events)
}
