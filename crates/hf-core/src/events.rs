//! Job events and the observer callback that receives them.
//!
//! Events are advisory: nothing in the supervisor makes control decisions
//! based on whether, or how, an observer consumes them.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::ids::JobId;

// ---------------------------------------------------------------------------
// JobState
// ---------------------------------------------------------------------------

/// Lifecycle state of a transcode job.
///
/// `Created -> DirectoryEnsured -> Encoding -> {Completed | Failed}`. A job may
/// also fail from `Created` or `DirectoryEnsured` when pre-flight work fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Created,
    DirectoryEnsured,
    Encoding,
    Completed,
    Failed,
}

impl JobState {
    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Created, DirectoryEnsured)
                | (DirectoryEnsured, Encoding)
                | (Encoding, Completed)
                | (Created | DirectoryEnsured | Encoding, Failed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Created => "created",
            JobState::DirectoryEnsured => "directory_ensured",
            JobState::Encoding => "encoding",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// EncodeProgress
// ---------------------------------------------------------------------------

/// One progress sample from the external encoder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncodeProgress {
    /// Approximate percent complete (0.0 -- 100.0), when the encoder knows the
    /// input duration.
    pub percent: Option<f64>,
    /// Frames written so far.
    pub frame: Option<u64>,
    /// Current encode speed in frames per second.
    pub fps: Option<f64>,
    /// Speed relative to realtime, as reported (e.g. "2.5x").
    pub speed: Option<String>,
    /// Output timestamp reached, in seconds.
    pub out_time_secs: Option<f64>,
}

impl EncodeProgress {
    /// Percent complete with an absent value defaulted to 0 and the result
    /// clamped to `0.0..=100.0`.
    pub fn percent_or_zero(&self) -> f64 {
        self.percent
            .filter(|p| p.is_finite())
            .unwrap_or(0.0)
            .clamp(0.0, 100.0)
    }
}

// ---------------------------------------------------------------------------
// JobEvent
// ---------------------------------------------------------------------------

/// Something that happened during a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    StateChanged {
        job_id: JobId,
        from: JobState,
        to: JobState,
    },
    Progress {
        job_id: JobId,
        progress: EncodeProgress,
    },
    CleanupFailed {
        job_id: JobId,
        path: PathBuf,
        error: String,
    },
}

// ---------------------------------------------------------------------------
// EventSender
// ---------------------------------------------------------------------------

/// Sender for reporting job events to an observer.
pub struct EventSender {
    callback: Box<dyn Fn(&JobEvent) + Send + Sync>,
}

impl EventSender {
    /// Create a new sender from the given callback.
    pub fn new(callback: impl Fn(&JobEvent) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Create a no-op sender that discards all events.
    pub fn noop() -> Self {
        Self {
            callback: Box::new(|_| {}),
        }
    }

    /// Create a sender backed by an unbounded channel.
    ///
    /// Events sent after the receiver is dropped are discarded.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<JobEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = Self::new(move |event| {
            let _ = tx.send(event.clone());
        });
        (sender, rx)
    }

    /// Report an event.
    pub fn send(&self, event: JobEvent) {
        (self.callback)(&event);
    }
}

impl Default for EventSender {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for EventSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSender").finish_non_exhaustive()
    }
}
