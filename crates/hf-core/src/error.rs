//! Unified error type for hlsforge.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for the CLI to derive a process exit code via [`Error::exit_code`].

use std::fmt;
use std::time::Duration;

/// Unified error type covering all failure modes of a transcode job.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required entity (input file, external tool) could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "input", "tool").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// A rendition ladder or configuration value failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The output directory is not in a state the job may take over.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The external encoder failed to start or terminated with an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Diagnostic payload (usually the tail of stderr).
        message: String,
    },

    /// The job deadline expired before the encoder finished.
    #[error("Timed out after {after:?}")]
    Timeout {
        /// The deadline that was exceeded.
        after: Duration,
    },

    /// The job was cancelled by the caller.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to a process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_) => 2,
            Error::Conflict(_) => 3,
            Error::NotFound { .. } => 4,
            Error::Tool { .. } => 5,
            Error::Timeout { .. } => 6,
            Error::Cancelled(_) => 130,
            Error::Io { .. } | Error::Internal(_) => 1,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
