// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use ork_core::{BuildUpdate, HealthState, LogStream, RunnerStatus};

use super::*;

fn monitor() -> StatusMonitor {
    StatusMonitor::new(Duration::from_millis(50))
}

#[tokio::test]
async fn register_then_snapshot_counts_total() {
    let m = monitor();
    m.register("db", "infra", Some(100));
    m.register("api", "backend", None);

    let snapshot = m.snapshot();
    assert_eq!(snapshot.summary.total, 2);
    assert_eq!(snapshot.get("db").unwrap().pid, Some(100));
    assert_eq!(snapshot.get("api").unwrap().status, RunnerStatus::Pending);
}

#[tokio::test]
async fn every_mutation_publishes_a_snapshot() {
    let m = monitor();
    let mut rx = m.subscribe();

    m.register("api", "backend", None);
    m.update_status("api", RunnerStatus::Starting);
    m.update_pid("api", Some(7));
    m.update_health("api", HealthState::Checking);
    m.increment_restart("api");

    let mut seen = 0;
    while let Ok(snapshot) =
        tokio::time::timeout(Duration::from_millis(100), rx.recv()).await
    {
        let snapshot = snapshot.unwrap();
        assert_eq!(snapshot.summary.total, 1);
        seen += 1;
        if seen == 5 {
            break;
        }
    }
    assert_eq!(seen, 5);
}

#[tokio::test]
async fn snapshot_timestamps_are_monotonic() {
    let m = monitor();
    let mut rx = m.subscribe();
    m.register("a", "x", None);
    tokio::time::sleep(Duration::from_millis(5)).await;
    m.update_status("a", RunnerStatus::Running);

    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    assert!(second.timestamp_ms >= first.timestamp_ms);
}

#[tokio::test]
async fn mutating_unknown_process_is_silent() {
    let m = monitor();
    let mut rx = m.subscribe();
    m.update_status("ghost", RunnerStatus::Running);
    let res = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
    assert!(res.is_err(), "no snapshot expected for unknown process");
}

#[tokio::test]
async fn starting_sets_start_time() {
    let m = monitor();
    m.register("api", "backend", None);
    assert!(m.snapshot().get("api").unwrap().started_at_ms.is_none());
    m.update_status("api", RunnerStatus::Starting);
    assert!(m.snapshot().get("api").unwrap().started_at_ms.is_some());
}

#[tokio::test]
async fn build_updates_merge_partially() {
    let m = monitor();
    m.register("web", "frontend", None);
    m.update_build("web", &BuildUpdate { progress: Some(40), ..Default::default() });
    m.update_build(
        "web",
        &BuildUpdate { errors: Some(1), warnings: Some(2), ..Default::default() },
    );

    let info = m.snapshot().get("web").unwrap().clone();
    assert_eq!(info.build.progress, 40);
    assert_eq!(info.build.errors, 1);
    assert_eq!(info.build.warnings, 2);
}

#[tokio::test]
async fn summary_tracks_status_changes() {
    let m = monitor();
    m.register("a", "x", None);
    m.register("b", "x", None);
    m.update_status("a", RunnerStatus::Running);
    m.update_status("b", RunnerStatus::Failed);

    let summary = m.snapshot().summary;
    assert_eq!(summary.running, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.total, 2);
}

#[tokio::test]
async fn log_ring_is_capped_and_tailed() {
    let m = monitor();
    m.register("api", "backend", None);
    m.set_log_capacity("api", 3);
    for i in 0..10 {
        m.append_log("api", LogStream::Stdout, &format!("line {i}"));
    }
    let tail = m.logs_tail("api", 10).unwrap();
    assert_eq!(tail.len(), 3);
    assert_eq!(tail[0].content, "line 7");
    assert!(m.logs_tail("ghost", 1).is_none());
}

#[tokio::test]
async fn unregister_and_clear_shrink_the_map() {
    let m = monitor();
    m.register("a", "x", None);
    m.register("b", "x", None);
    m.unregister("a");
    assert_eq!(m.snapshot().summary.total, 1);
    m.clear();
    assert_eq!(m.snapshot().summary.total, 0);
}

#[tokio::test]
async fn heartbeat_emits_without_mutations() {
    let m = StatusMonitor::new(Duration::from_millis(20));
    m.register("self", "test", Some(std::process::id()));
    m.update_status("self", RunnerStatus::Running);
    m.start_sampling();

    let mut rx = m.subscribe();
    // Two heartbeats with no interleaved mutations.
    let first = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
    let second = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
    assert!(first.is_ok() && second.is_ok());

    m.stop();
}

#[tokio::test]
async fn snapshots_are_deep_copies() {
    let m = monitor();
    m.register("a", "x", None);
    let before = m.snapshot();
    m.update_status("a", RunnerStatus::Running);
    // The earlier snapshot is unaffected by later mutations.
    assert_eq!(before.get("a").unwrap().status, RunnerStatus::Pending);
}
