//! Restart policy: a flaky process is retried exactly `max_retries`
//! times and then left failed.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use ork_core::{RunnerEvent, RunnerStatus};
use ork_engine::ProcessRunner;

use crate::prelude::config;

#[tokio::test]
async fn flaky_process_event_sequence() {
    let config = config(
        r#"
project_name = "flaky"

[processes.flaky]
type = "shell"
command = "sleep 0.05; exit 1"
restart_policy = "on-failure"
max_retries = 2
restart_delay = 100
"#,
    );
    let runner = ProcessRunner::new(
        config.processes["flaky"].clone(),
        CancellationToken::new(),
    )
    .expect("runner");
    let mut events = runner.subscribe();

    runner.start().await.expect("initial start succeeds");

    // Collect until the third (final) exit has been observed.
    let mut exits = 0;
    let mut labels: Vec<String> = Vec::new();
    while exits < 3 {
        let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
            .await
            .expect("restart sequence timed out")
            .expect("event stream closed");
        match event {
            RunnerEvent::Status { status: RunnerStatus::Starting } => {
                labels.push("starting".to_string());
            }
            RunnerEvent::Status { status: RunnerStatus::Failed } => {
                labels.push("failed".to_string());
            }
            RunnerEvent::Restarting { attempt } => {
                labels.push(format!("restarting({attempt})"));
            }
            RunnerEvent::Exited { .. } => exits += 1,
            _ => {}
        }
    }
    // Allow the final `failed` status through, then ensure no fourth
    // generation begins.
    tokio::time::sleep(Duration::from_millis(300)).await;
    while let Ok(event) = events.try_recv() {
        match event {
            RunnerEvent::Status { status: RunnerStatus::Starting } => {
                panic!("no fourth start may happen");
            }
            RunnerEvent::Status { status: RunnerStatus::Failed } => {
                labels.push("failed".to_string());
            }
            RunnerEvent::Exited { .. } => exits += 1,
            _ => {}
        }
    }

    assert_eq!(
        labels,
        vec![
            "starting",
            "failed",
            "restarting(1)",
            "starting",
            "failed",
            "restarting(2)",
            "starting",
            "failed",
        ]
    );
    assert_eq!(exits, 3, "three generations, three exits");
    assert_eq!(runner.restart_count(), 2);
    assert_eq!(runner.status(), RunnerStatus::Failed);
}
