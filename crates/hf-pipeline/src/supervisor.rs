//! Job supervisor: output directory lifecycle, encoder invocation, and
//! cleanup on failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use hf_av::{EncodePlan, Encoder};
use hf_core::config::OutputDirPolicy;
use hf_core::events::{EncodeProgress, EventSender, JobEvent, JobState};
use hf_core::{Error, JobId, RenditionLadder, Result};
use hf_media::{build_master_playlist, MASTER_PLAYLIST_NAME};
use tokio_util::sync::CancellationToken;

use crate::fs::OutputFs;
use crate::job::TranscodeJob;

/// How long to wait for the encoder to stop after the deadline cancels it.
const STOP_GRACE: Duration = Duration::from_secs(10);

/// Runs transcode jobs against an [`Encoder`] and an [`OutputFs`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use hf_av::{FfmpegEncoder, ToolRegistry};
/// use hf_pipeline::{LocalFs, Supervisor, TranscodeJob, TranscodeOptions};
///
/// # async fn example() -> hf_core::Result<()> {
/// let tools = ToolRegistry::discover(&Default::default());
/// let encoder = FfmpegEncoder::from_registry(&tools)?;
/// let supervisor = Supervisor::new(Arc::new(encoder), Arc::new(LocalFs));
/// let job = TranscodeJob::new("in.mp4", "out", TranscodeOptions::default());
/// let master = supervisor.transcode(&job).await?;
/// println!("{}", master.display());
/// # Ok(())
/// # }
/// ```
pub struct Supervisor {
    encoder: Arc<dyn Encoder>,
    fs: Arc<dyn OutputFs>,
    events: Arc<EventSender>,
    cancellation: CancellationToken,
}

impl Supervisor {
    pub fn new(encoder: Arc<dyn Encoder>, fs: Arc<dyn OutputFs>) -> Self {
        Self {
            encoder,
            fs,
            events: Arc::new(EventSender::noop()),
            cancellation: CancellationToken::new(),
        }
    }

    /// Builder: attach an event observer.
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Arc::new(events);
        self
    }

    /// Builder: attach a cancellation token. Cancelling it stops the encoder
    /// and runs the failure cleanup.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Run `job` to completion, returning the absolute master playlist path.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for a malformed ladder; nothing is created.
    /// - [`Error::NotFound`] when the input file does not exist.
    /// - [`Error::Conflict`] when the output directory is not empty and the
    ///   job requires an empty one.
    /// - [`Error::Io`] when the directory or master playlist cannot be
    ///   written; no cleanup runs and the encoder is not started.
    /// - The encoder's error, [`Error::Timeout`], or [`Error::Cancelled`]
    ///   once encoding has started. The output directory is removed first.
    pub async fn transcode(&self, job: &TranscodeJob) -> Result<PathBuf> {
        let mut state = JobState::Created;
        tracing::info!(
            job_id = %job.id,
            "Transcoding {} -> {}",
            job.input.display(),
            job.output.display()
        );

        let prepared = self.prepare(job, &mut state).await;
        let (output_dir, args) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::error!(job_id = %job.id, "Job failed before encoding: {e}");
                self.transition(job.id, &mut state, JobState::Failed);
                return Err(e);
            }
        };

        self.transition(job.id, &mut state, JobState::Encoding);
        tracing::info!(job_id = %job.id, "Starting {}", self.encoder.name());

        match self.encode(job, &args).await {
            Ok(()) => {
                self.transition(job.id, &mut state, JobState::Completed);
                let master = output_dir.join(MASTER_PLAYLIST_NAME);
                tracing::info!(job_id = %job.id, "Completed: {}", master.display());
                Ok(master)
            }
            Err(e) => {
                tracing::error!(job_id = %job.id, "Encoding failed: {e}");
                self.transition(job.id, &mut state, JobState::Failed);
                self.cleanup(job.id, &output_dir).await;
                Err(e)
            }
        }
    }

    /// Everything up to the encoder launch: validation, pre-flight checks,
    /// the output directory, and the master playlist.
    async fn prepare(
        &self,
        job: &TranscodeJob,
        state: &mut JobState,
    ) -> Result<(PathBuf, Vec<String>)> {
        let ladder = RenditionLadder::resolve(job.options.renditions.clone())?;
        tracing::debug!(job_id = %job.id, renditions = ladder.len(), "Ladder resolved");

        if self.cancellation.is_cancelled() {
            return Err(Error::Cancelled("job cancelled before start".into()));
        }

        // Encoder arguments are strings; a lossy path would name another file.
        require_utf8("input", &job.input)?;
        require_utf8("output", &job.output)?;

        if !self.fs.is_file(&job.input).await? {
            return Err(Error::not_found("input", job.input.display()));
        }

        let output_dir = std::path::absolute(&job.output)?;
        self.ensure_output_dir(&output_dir, job.options.output_policy)
            .await?;
        self.transition(job.id, state, JobState::DirectoryEnsured);

        let playlist = build_master_playlist(&ladder)?;
        self.fs
            .write_file(&output_dir.join(MASTER_PLAYLIST_NAME), playlist.as_bytes())
            .await?;

        let plan = EncodePlan::compile(&job.input, &output_dir, &ladder, &job.options.encode);
        Ok((output_dir, plan.to_args()))
    }

    async fn ensure_output_dir(&self, dir: &Path, policy: OutputDirPolicy) -> Result<()> {
        if policy == OutputDirPolicy::RequireEmpty
            && self.fs.exists(dir).await?
            && !self.fs.list_dir(dir).await?.is_empty()
        {
            return Err(Error::Conflict(format!(
                "output directory {} is not empty",
                dir.display()
            )));
        }
        self.fs.ensure_dir(dir).await
    }

    /// Run the encoder, racing the job deadline. Cancellation reaches the
    /// encoder through a child token.
    async fn encode(&self, job: &TranscodeJob, args: &[String]) -> Result<()> {
        let cancel = self.cancellation.child_token();
        let job_id = job.id;
        let events = self.events.clone();
        let on_progress = move |progress: EncodeProgress| {
            tracing::info!(job_id = %job_id, "Percent complete: {:.2}", progress.percent_or_zero());
            events.send(JobEvent::Progress { job_id, progress });
        };

        let mut encode = self.encoder.encode(args, &on_progress, cancel.clone());

        let Some(after) = job.options.timeout else {
            return encode.await;
        };

        tokio::select! {
            result = &mut encode => result,
            _ = tokio::time::sleep(after) => {
                tracing::warn!(job_id = %job_id, "Deadline of {after:?} expired, stopping encoder");
                cancel.cancel();
                match tokio::time::timeout(STOP_GRACE, encode).await {
                    Ok(Err(e)) => tracing::debug!(job_id = %job_id, "Encoder stopped: {e}"),
                    Ok(Ok(())) => {}
                    Err(_) => tracing::warn!(job_id = %job_id, "Encoder did not stop within {STOP_GRACE:?}"),
                }
                Err(Error::Timeout { after })
            }
        }
    }

    /// Best-effort removal of the output directory. Never fails; problems are
    /// logged and reported as [`JobEvent::CleanupFailed`].
    async fn cleanup(&self, job_id: JobId, dir: &Path) {
        tracing::info!(job_id = %job_id, "Removing partial output in {}", dir.display());

        if let Err(e) = self.remove_entries(dir).await {
            tracing::warn!(job_id = %job_id, "Cleanup of {} incomplete: {e}", dir.display());
            if let Err(e) = self.fs.remove_dir_all(dir).await {
                tracing::warn!(job_id = %job_id, "Could not remove {}: {e}", dir.display());
                self.events.send(JobEvent::CleanupFailed {
                    job_id,
                    path: dir.to_path_buf(),
                    error: e.to_string(),
                });
            }
        }
    }

    /// Delete each entry directly inside `dir`, then `dir` itself. Every
    /// entry is attempted; the first error is returned.
    async fn remove_entries(&self, dir: &Path) -> Result<()> {
        let mut first_error = None;
        for entry in self.fs.list_dir(dir).await? {
            if let Err(e) = self.fs.remove_file(&entry).await {
                tracing::debug!("Failed to remove {}: {e}", entry.display());
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }
        self.fs.remove_dir(dir).await
    }

    fn transition(&self, job_id: JobId, state: &mut JobState, next: JobState) {
        debug_assert!(
            state.can_transition_to(next),
            "illegal transition {state} -> {next}"
        );
        tracing::info!(job_id = %job_id, "{state} -> {next}");
        self.events.send(JobEvent::StateChanged {
            job_id,
            from: *state,
            to: next,
        });
        *state = next;
    }
}

fn require_utf8(what: &str, path: &Path) -> Result<()> {
    if path.to_str().is_none() {
        return Err(Error::Validation(format!(
            "{what} path {} is not valid UTF-8",
            path.display()
        )));
    }
    Ok(())
}
