//! The external encoder, modeled as a capability.
//!
//! An [`Encoder`] runs one compiled argument list to completion. The returned
//! `Result` is the single terminal event (`Ok` = end, `Err` = error); progress
//! travels on the side through a [`ProgressFn`] callback.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use hf_core::events::EncodeProgress;

use crate::command::ToolCommand;
use crate::progress::{ProgressLine, ProgressParser};
use crate::tools::ToolRegistry;

/// Upper bound on a single encoder run. Job deadlines are enforced by the
/// caller; this only catches a wedged process when no deadline is set.
const MAX_ENCODE_DURATION: Duration = Duration::from_secs(86_400);

/// Minimum spacing between progress callbacks.
const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Receives progress samples while an encode runs.
pub type ProgressFn<'a> = dyn Fn(EncodeProgress) + Send + Sync + 'a;

/// Runs an encode described by a flat argument list.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Short name used in logs and errors (e.g. "ffmpeg").
    fn name(&self) -> &str;

    /// Run the encoder to completion.
    ///
    /// # Errors
    ///
    /// Returns the encoder's diagnostic as [`hf_core::Error::Tool`], or
    /// [`hf_core::Error::Cancelled`] once `cancel` fires and the process has
    /// been stopped.
    async fn encode(
        &self,
        args: &[String],
        on_progress: &ProgressFn<'_>,
        cancel: CancellationToken,
    ) -> hf_core::Result<()>;
}

/// [`Encoder`] backed by the ffmpeg command-line tool.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program: PathBuf,
    progress_interval: Duration,
}

impl FfmpegEncoder {
    /// Use the ffmpeg binary found by the registry.
    pub fn from_registry(tools: &ToolRegistry) -> hf_core::Result<Self> {
        let ffmpeg = tools.require("ffmpeg")?;
        Ok(Self::new(ffmpeg.path.clone()))
    }

    /// Use the ffmpeg binary at `program`.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Builder: minimum spacing between progress callbacks.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Build the full command line: progress reporting flags, then the plan.
    fn command(&self, args: &[String]) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.program.clone());
        cmd.timeout(MAX_ENCODE_DURATION);
        cmd.args(["-progress", "pipe:2", "-nostats"]);
        cmd.args(args.iter().cloned());
        cmd
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn encode(
        &self,
        args: &[String],
        on_progress: &ProgressFn<'_>,
        cancel: CancellationToken,
    ) -> hf_core::Result<()> {
        let cmd = self.command(args);
        tracing::debug!("ffmpeg {}", cmd.get_args().join(" "));

        let mut parser = ProgressParser::new();
        let mut last_emit: Option<Instant> = None;
        let interval = self.progress_interval;

        cmd.execute_with_stderr_callback(
            |line| {
                if let ProgressLine::Update { progress, finished } = parser.feed(line) {
                    let due = last_emit.map_or(true, |t| t.elapsed() >= interval);
                    if due || finished {
                        on_progress(progress);
                        last_emit = Some(Instant::now());
                    }
                } else {
                    tracing::trace!("ffmpeg: {line}");
                }
            },
            Some(cancel),
        )
        .await?;

        Ok(())
    }
}
