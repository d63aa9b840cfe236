//! IPC broadcast: every connected client observes the same stream of
//! status updates.

use std::time::Duration;

use serial_test::serial;
use tokio::io::BufReader;
use tokio::net::UnixStream;

use ork_adapters::NoOpUiSession;
use ork_daemon::startup;
use ork_wire::{decode, read_line, ServerMessage};

use crate::prelude::{config, scoped_socket_dir};

const SINGLE: &str = r#"
project_name = "broadcast"

[processes.svc]
type = "shell"
command = "sleep 30"
"#;

/// Collect status updates for roughly the given window.
async fn collect_updates(
    stream: UnixStream,
    window: Duration,
) -> Vec<(u64, Vec<(String, String)>)> {
    let mut reader = BufReader::new(stream);
    let mut updates = Vec::new();
    let deadline = tokio::time::Instant::now() + window;

    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            return updates;
        }
        let line = match tokio::time::timeout(remaining, read_line(&mut reader)).await {
            Ok(Ok(line)) => line,
            _ => return updates,
        };
        if let Ok(ServerMessage::StatusUpdate { timestamp, processes, .. }) = decode(&line) {
            let summary = processes
                .iter()
                .map(|p| (p.name.clone(), p.status.to_string()))
                .collect();
            updates.push((timestamp, summary));
        }
    }
}

#[tokio::test]
#[serial]
async fn two_clients_observe_identical_update_sequences() {
    let _guard = scoped_socket_dir();
    std::env::set_var("ORCKIT_UPDATE_MS", "100");

    let daemon = startup(config(SINGLE), NoOpUiSession::new()).await.expect("startup");
    let socket = daemon.socket_path().clone();

    let a = UnixStream::connect(&socket).await.expect("client a");
    let b = UnixStream::connect(&socket).await.expect("client b");

    let window = Duration::from_secs(1);
    let (from_a, from_b) = tokio::join!(
        collect_updates(a, window),
        collect_updates(b, window),
    );

    // Heartbeats come at a 100ms cadence; both clients keep up.
    assert!(from_a.len() >= 5, "client a saw {} updates", from_a.len());
    assert!(from_b.len() >= 5, "client b saw {} updates", from_b.len());

    // Connection times differ slightly, so compare on the common
    // timestamps: those snapshots must be identical in content.
    let common: Vec<_> = from_a
        .iter()
        .filter(|(ts, _)| from_b.iter().any(|(other, _)| other == ts))
        .collect();
    assert!(common.len() >= 4, "clients share {} snapshots", common.len());
    for (ts, content) in common {
        let other = from_b
            .iter()
            .find(|(other_ts, _)| other_ts == ts)
            .map(|(_, content)| content)
            .expect("common timestamp");
        assert_eq!(content, other, "divergent snapshot at ts {ts}");
    }

    std::env::remove_var("ORCKIT_UPDATE_MS");
    daemon.shutdown().await.expect("shutdown");
}
