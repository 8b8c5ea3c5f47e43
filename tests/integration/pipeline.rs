#![allow(missing_docs)]

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use beadview::pipeline::{Pipeline, PipelineConfig, PipelineEvent};
use tempfile::TempDir;

const ISSUE_A1: &str = r#"{"id":"a-1","title":"T","status":"open","issue_type":"task","priority":2,"created_at":"2026-01-01T00:00:00Z","updated_at":"2026-01-01T00:00:00Z"}"#;

fn setup_log(content: &str) -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("issues.jsonl");
    std::fs::write(&log, content).unwrap();
    (dir, log)
}

fn write_atomic(log: &Path, content: &str) {
    let tmp = log.with_extension("jsonl.tmp");
    std::fs::write(&tmp, content).unwrap();
    std::fs::rename(&tmp, log).unwrap();
}

fn recv_ready(
    events: &std::sync::mpsc::Receiver<PipelineEvent>,
    within: Duration,
) -> Option<u64> {
    let deadline = Instant::now() + within;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match events.recv_timeout(left) {
            Ok(PipelineEvent::SnapshotReady { hash }) => return Some(hash),
            Ok(PipelineEvent::BuildFailed { .. }) => continue,
            Err(_) => return None,
        }
    }
}

#[test]
fn watcher_rebuilds_after_atomic_rename_exactly_once() {
    let (_dir, log) = setup_log(ISSUE_A1);
    let mut config = PipelineConfig::new(&log);
    config.debounce = Duration::from_millis(80);
    let (pipeline, events) = Pipeline::spawn(config).unwrap();

    pipeline.trigger();
    let first = recv_ready(&events, Duration::from_secs(5)).expect("initial build");

    let updated = format!("{ISSUE_A1}\n{}\n", ISSUE_A1.replace("a-1", "a-2"));
    write_atomic(&log, &updated);

    let second = recv_ready(&events, Duration::from_secs(5)).expect("rebuild after rename");
    assert_ne!(first, second);
    assert_eq!(pipeline.current().unwrap().len(), 2);

    // The rename burst coalesced: no further snapshot arrives.
    assert!(events.recv_timeout(Duration::from_millis(500)).is_err());
}

#[test]
fn unchanged_bytes_keep_the_same_snapshot_reference() {
    let (_dir, log) = setup_log(ISSUE_A1);
    let (pipeline, events) =
        Pipeline::spawn(PipelineConfig::new(&log).without_watcher()).unwrap();

    pipeline.trigger();
    recv_ready(&events, Duration::from_secs(5)).expect("first build");
    let snapshot = pipeline.current().unwrap();
    let hash = pipeline.last_hash().unwrap();

    // Touch the file with identical content; dedup applies.
    std::fs::write(&log, ISSUE_A1).unwrap();
    pipeline.trigger();
    assert!(events.recv_timeout(Duration::from_millis(500)).is_err());

    assert!(Arc::ptr_eq(&snapshot, &pipeline.current().unwrap()));
    assert_eq!(pipeline.last_hash(), Some(hash));
    assert!(pipeline.last_error().is_none());
}

#[test]
fn snapshot_survives_log_corruption_and_recovers() {
    let (_dir, log) = setup_log(ISSUE_A1);
    let (pipeline, events) =
        Pipeline::spawn(PipelineConfig::new(&log).without_watcher()).unwrap();

    pipeline.trigger();
    recv_ready(&events, Duration::from_secs(5)).expect("first build");

    // A half-written log still yields the valid subset.
    std::fs::write(&log, format!("{ISSUE_A1}\n{{\"id\":\"trunc")).unwrap();
    pipeline.trigger();
    recv_ready(&events, Duration::from_secs(5)).expect("tolerant rebuild");
    let snapshot = pipeline.current().unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.parse_stats().skipped, 1);
}

#[test]
fn shutdown_is_bounded_and_final() {
    let (_dir, log) = setup_log(ISSUE_A1);
    let (mut pipeline, events) = Pipeline::spawn(PipelineConfig::new(&log)).unwrap();
    pipeline.trigger();
    recv_ready(&events, Duration::from_secs(5)).expect("first build");

    let started = Instant::now();
    pipeline.shutdown();
    assert!(started.elapsed() < Duration::from_secs(3));

    // No publishes after shutdown, even with fresh triggers.
    pipeline.trigger();
    assert!(events.recv_timeout(Duration::from_millis(300)).is_err());
}

#[test]
fn empty_log_is_a_valid_empty_snapshot() {
    let (_dir, log) = setup_log("");
    let (pipeline, events) =
        Pipeline::spawn(PipelineConfig::new(&log).without_watcher()).unwrap();
    pipeline.trigger();
    recv_ready(&events, Duration::from_secs(5)).expect("build");
    let snapshot = pipeline.current().unwrap();
    assert!(snapshot.is_empty());
    assert!(pipeline.last_error().is_none());
}
