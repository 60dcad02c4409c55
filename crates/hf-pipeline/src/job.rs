//! The unit of work handed to the supervisor.

use std::path::PathBuf;
use std::time::Duration;

use hf_core::config::{EncodeSettings, OutputDirPolicy, TranscodeConfig};
use hf_core::{JobId, RenditionSpec};

/// Per-job options.
#[derive(Debug, Clone, Default)]
pub struct TranscodeOptions {
    /// Ladder override; `None` or empty selects the built-in ladder.
    pub renditions: Option<Vec<RenditionSpec>>,
    /// Deadline for the encode step. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub output_policy: OutputDirPolicy,
    pub encode: EncodeSettings,
}

impl TranscodeOptions {
    /// Builder: override the rendition ladder.
    pub fn with_renditions(mut self, renditions: Vec<RenditionSpec>) -> Self {
        self.renditions = Some(renditions);
        self
    }

    /// Builder: set the encode deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builder: set the existing-directory policy.
    pub fn with_output_policy(mut self, policy: OutputDirPolicy) -> Self {
        self.output_policy = policy;
        self
    }
}

impl From<&TranscodeConfig> for TranscodeOptions {
    fn from(cfg: &TranscodeConfig) -> Self {
        Self {
            renditions: cfg.renditions.clone(),
            timeout: cfg.timeout(),
            output_policy: cfg.output_policy,
            encode: cfg.encode.clone(),
        }
    }
}

/// A single transcode: one input file into one output directory.
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    pub id: JobId,
    pub input: PathBuf,
    /// Output directory. Owned exclusively by this job while it runs.
    pub output: PathBuf,
    pub options: TranscodeOptions,
}

impl TranscodeJob {
    pub fn new(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        options: TranscodeOptions,
    ) -> Self {
        Self {
            id: JobId::new(),
            input: input.into(),
            output: output.into(),
            options,
        }
    }
}
