//! Supervisor lifecycle tests against a scripted encoder.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{supervisor_with_events, values_after, FakeEncoder, FlakyFs, Outcome, Workspace};
use hf_core::config::OutputDirPolicy;
use hf_core::events::{JobEvent, JobState};
use hf_core::{Error, RenditionLadder};
use hf_pipeline::{LocalFs, Supervisor, TranscodeOptions};
use tokio_util::sync::CancellationToken;

fn ladder_of(names: &[&str]) -> Vec<hf_core::RenditionSpec> {
    let defaults = RenditionLadder::default_ladder();
    names
        .iter()
        .map(|name| {
            defaults
                .iter()
                .find(|r| r.playlist_name == *name)
                .unwrap()
                .clone()
        })
        .collect()
}

fn stream_inf_count(master: &str) -> usize {
    master
        .lines()
        .filter(|l| l.starts_with("#EXT-X-STREAM-INF:"))
        .count()
}

// ---------------------------------------------------------------------------
// Success path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn default_ladder_when_no_renditions() {
    let ws = Workspace::new();
    let encoder = Arc::new(FakeEncoder::new(Outcome::Succeed));
    let supervisor = Supervisor::new(encoder.clone(), Arc::new(LocalFs));

    let master = supervisor
        .transcode(&ws.job(TranscodeOptions::default()))
        .await
        .unwrap();

    let args = encoder.last_args();
    assert_eq!(values_after(&args, "-vf").len(), 4);
    let text = std::fs::read_to_string(&master).unwrap();
    assert_eq!(stream_inf_count(&text), 4);
}

#[tokio::test]
async fn explicit_ladder_size_is_respected() {
    let ws = Workspace::new();
    let encoder = Arc::new(FakeEncoder::new(Outcome::Succeed));
    let supervisor = Supervisor::new(encoder.clone(), Arc::new(LocalFs));

    let options = TranscodeOptions::default().with_renditions(ladder_of(&["1080p", "360p"]));
    let master = supervisor.transcode(&ws.job(options)).await.unwrap();

    let args = encoder.last_args();
    let playlists: Vec<&String> = args.iter().filter(|a| a.ends_with(".m3u8")).collect();
    assert_eq!(playlists.len(), 2);
    assert!(playlists[0].ends_with("1080p.m3u8"));
    assert!(playlists[1].ends_with("360p.m3u8"));

    let text = std::fs::read_to_string(&master).unwrap();
    assert_eq!(stream_inf_count(&text), 2);
    let uris: Vec<&str> = text.lines().filter(|l| l.ends_with(".m3u8")).collect();
    assert_eq!(uris, ["1080p.m3u8", "360p.m3u8"]);
}

#[tokio::test]
async fn output_package_layout() {
    let ws = Workspace::new();
    let encoder = Arc::new(FakeEncoder::new(Outcome::Succeed).with_segments(2));
    let supervisor = Supervisor::new(encoder, Arc::new(LocalFs));

    let options = TranscodeOptions::default().with_renditions(ladder_of(&["720p"]));
    let master = supervisor.transcode(&ws.job(options)).await.unwrap();

    assert_eq!(master, ws.output.join("index.m3u8"));
    assert_eq!(
        ws.output_files(),
        ["720p.m3u8", "720p_000.ts", "720p_001.ts", "index.m3u8"]
    );
}

#[tokio::test]
async fn rerun_into_existing_directory() {
    let ws = Workspace::new();
    std::fs::create_dir(&ws.output).unwrap();

    let encoder = Arc::new(FakeEncoder::new(Outcome::Succeed));
    let supervisor = Supervisor::new(encoder.clone(), Arc::new(LocalFs));

    let first = supervisor
        .transcode(&ws.job(TranscodeOptions::default()))
        .await
        .unwrap();
    let first_args = encoder.last_args();
    let first_master = std::fs::read_to_string(&first).unwrap();

    let second = supervisor
        .transcode(&ws.job(TranscodeOptions::default()))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(encoder.calls(), 2);
    assert_eq!(encoder.last_args(), first_args);
    assert_eq!(std::fs::read_to_string(&second).unwrap(), first_master);
}

#[tokio::test]
async fn events_trace_the_lifecycle() {
    let ws = Workspace::new();
    let encoder = Arc::new(FakeEncoder::new(Outcome::Succeed));
    let (supervisor, events) = supervisor_with_events(encoder, Arc::new(LocalFs));

    let job = ws.job(TranscodeOptions::default());
    supervisor.transcode(&job).await.unwrap();

    let events = events.lock().unwrap();
    let transitions: Vec<(JobState, JobState)> = events
        .iter()
        .filter_map(|e| match e {
            JobEvent::StateChanged { job_id, from, to } => {
                assert_eq!(*job_id, job.id);
                Some((*from, *to))
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        [
            (JobState::Created, JobState::DirectoryEnsured),
            (JobState::DirectoryEnsured, JobState::Encoding),
            (JobState::Encoding, JobState::Completed),
        ]
    );
    assert!(events
        .iter()
        .any(|e| matches!(e, JobEvent::Progress { progress, .. } if progress.percent == Some(25.0))));
}

// ---------------------------------------------------------------------------
// Failure and cleanup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn encoder_failure_removes_output() {
    let ws = Workspace::new();
    let encoder = Arc::new(FakeEncoder::new(Outcome::Fail("Invalid data found".into())).with_segments(5));
    let supervisor = Supervisor::new(encoder.clone(), Arc::new(LocalFs));

    let err = supervisor
        .transcode(&ws.job(TranscodeOptions::default()))
        .await
        .unwrap_err();

    match err {
        Error::Tool { tool, message } => {
            assert_eq!(tool, "ffmpeg");
            assert_eq!(message, "Invalid data found");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(encoder.calls(), 1);
    assert!(!ws.output.exists());
}

#[tokio::test]
async fn failed_deletion_does_not_mask_error() {
    let ws = Workspace::new();
    let encoder = Arc::new(FakeEncoder::new(Outcome::Fail("Conversion failed!".into())));
    let fs = FlakyFs {
        fail_remove_of: Some("480p_001.ts".into()),
        ..Default::default()
    };
    let supervisor = Supervisor::new(encoder, Arc::new(fs));

    let err = supervisor
        .transcode(&ws.job(TranscodeOptions::default()))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Conversion failed!"), "{err}");
    // The recursive fallback still removes the directory.
    assert!(!ws.output.exists());
}

#[tokio::test]
async fn unremovable_output_is_reported() {
    let ws = Workspace::new();
    let encoder = Arc::new(FakeEncoder::new(Outcome::Fail("Conversion failed!".into())));
    let fs = FlakyFs {
        fail_remove_of: Some("index.m3u8".into()),
        fail_remove_dir_all: true,
        ..Default::default()
    };
    let (supervisor, events) = supervisor_with_events(encoder, Arc::new(fs));

    let err = supervisor
        .transcode(&ws.job(TranscodeOptions::default()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Tool { .. }), "{err}");
    let events = events.lock().unwrap();
    let cleanup_failures: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            JobEvent::CleanupFailed { path, .. } => Some(path.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(cleanup_failures, [ws.output.clone()]);
    assert!(matches!(
        events.last(),
        Some(JobEvent::CleanupFailed { .. })
    ));
}

#[tokio::test]
async fn master_write_failure_skips_encoder_and_cleanup() {
    let ws = Workspace::new();
    let encoder = Arc::new(FakeEncoder::new(Outcome::Succeed));
    let fs = FlakyFs {
        fail_write: true,
        ..Default::default()
    };
    let supervisor = Supervisor::new(encoder.clone(), Arc::new(fs));

    let err = supervisor
        .transcode(&ws.job(TranscodeOptions::default()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Io { .. }), "{err}");
    assert_eq!(encoder.calls(), 0);
    assert!(ws.output.is_dir());
}

// ---------------------------------------------------------------------------
// Fail-fast checks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_ladder_creates_nothing() {
    let ws = Workspace::new();
    let encoder = Arc::new(FakeEncoder::new(Outcome::Succeed));
    let supervisor = Supervisor::new(encoder.clone(), Arc::new(LocalFs));

    let mut ladder = ladder_of(&["360p", "480p"]);
    ladder[1].segment_prefix = ladder[0].segment_prefix.clone();
    let options = TranscodeOptions::default().with_renditions(ladder);

    let err = supervisor.transcode(&ws.job(options)).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)), "{err}");
    assert_eq!(err.exit_code(), 2);
    assert!(!ws.output.exists());
    assert_eq!(encoder.calls(), 0);
}

#[tokio::test]
async fn missing_input_is_not_found() {
    let ws = Workspace::new();
    std::fs::remove_file(&ws.input).unwrap();
    let encoder = Arc::new(FakeEncoder::new(Outcome::Succeed));
    let (supervisor, events) = supervisor_with_events(encoder.clone(), Arc::new(LocalFs));

    let err = supervisor
        .transcode(&ws.job(TranscodeOptions::default()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound { .. }), "{err}");
    assert!(!ws.output.exists());
    assert_eq!(encoder.calls(), 0);
    assert!(matches!(
        events.lock().unwrap().as_slice(),
        [JobEvent::StateChanged {
            from: JobState::Created,
            to: JobState::Failed,
            ..
        }]
    ));
}

#[tokio::test]
async fn require_empty_rejects_populated_directory() {
    let ws = Workspace::new();
    std::fs::create_dir(&ws.output).unwrap();
    std::fs::write(ws.output.join("notes.txt"), b"keep me").unwrap();

    let encoder = Arc::new(FakeEncoder::new(Outcome::Succeed));
    let supervisor = Supervisor::new(encoder.clone(), Arc::new(LocalFs));
    let options = TranscodeOptions::default().with_output_policy(OutputDirPolicy::RequireEmpty);

    let err = supervisor.transcode(&ws.job(options)).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)), "{err}");
    assert_eq!(encoder.calls(), 0);
    assert_eq!(ws.output_files(), ["notes.txt"]);
}

#[tokio::test]
async fn require_empty_accepts_empty_directory() {
    let ws = Workspace::new();
    std::fs::create_dir(&ws.output).unwrap();

    let encoder = Arc::new(FakeEncoder::new(Outcome::Succeed));
    let supervisor = Supervisor::new(encoder, Arc::new(LocalFs));
    let options = TranscodeOptions::default().with_output_policy(OutputDirPolicy::RequireEmpty);

    supervisor.transcode(&ws.job(options)).await.unwrap();
}

// ---------------------------------------------------------------------------
// Deadline and cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deadline_stops_encoder_and_cleans_up() {
    let ws = Workspace::new();
    let encoder = Arc::new(FakeEncoder::new(Outcome::Hang));
    let supervisor = Supervisor::new(encoder, Arc::new(LocalFs));
    let options = TranscodeOptions::default().with_timeout(Duration::from_millis(100));

    let err = supervisor.transcode(&ws.job(options)).await.unwrap_err();

    assert!(
        matches!(err, Error::Timeout { after } if after == Duration::from_millis(100)),
        "{err}"
    );
    assert_eq!(err.exit_code(), 6);
    assert!(!ws.output.exists());
}

#[tokio::test]
async fn cancellation_stops_encoder_and_cleans_up() {
    let ws = Workspace::new();
    let encoder = Arc::new(FakeEncoder::new(Outcome::Hang));
    let token = CancellationToken::new();
    let supervisor = Supervisor::new(encoder, Arc::new(LocalFs)).with_cancellation(token.clone());

    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = supervisor
        .transcode(&ws.job(TranscodeOptions::default()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled(_)), "{err}");
    assert!(!ws.output.exists());
}

#[tokio::test]
async fn cancelled_before_start_creates_nothing() {
    let ws = Workspace::new();
    let encoder = Arc::new(FakeEncoder::new(Outcome::Succeed));
    let token = CancellationToken::new();
    token.cancel();
    let supervisor = Supervisor::new(encoder.clone(), Arc::new(LocalFs)).with_cancellation(token);

    let err = supervisor
        .transcode(&ws.job(TranscodeOptions::default()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled(_)), "{err}");
    assert_eq!(encoder.calls(), 0);
    assert!(!ws.output.exists());
}
