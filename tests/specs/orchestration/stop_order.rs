//! Shutdown: processes stop in reverse start order and nothing is left
//! behind, neither children nor the socket file.

use serial_test::serial;

use ork_adapters::NoOpUiSession;
use ork_core::RunnerStatus;
use ork_daemon::startup;

use crate::prelude::{config, scoped_socket_dir};

const CHAIN: &str = r#"
project_name = "stop-order"

[processes.db]
type = "shell"
command = "sleep 30"

[processes.api]
type = "shell"
command = "sleep 30"
dependencies = ["db"]

[processes.web]
type = "shell"
command = "sleep 30"
dependencies = ["api"]
"#;

#[tokio::test]
#[serial]
async fn shutdown_is_reverse_start_order_and_leaves_nothing() {
    let _guard = scoped_socket_dir();

    let daemon = startup(config(CHAIN), NoOpUiSession::new()).await.expect("startup");
    let socket = daemon.socket_path().clone();
    assert!(socket.exists());

    let pids: Vec<(String, u32)> = ["db", "api", "web"]
        .iter()
        .map(|name| {
            let runner = daemon.orchestrator().runner(name).expect("runner");
            assert_eq!(runner.status(), RunnerStatus::Running);
            (name.to_string(), runner.pid().expect("pid"))
        })
        .collect();

    let mut snapshots = daemon.monitor().subscribe();
    daemon.shutdown().await.expect("shutdown");

    // First snapshot showing each process stopped fixes the stop order.
    let mut stop_order = Vec::new();
    while let Ok(snapshot) = snapshots.try_recv() {
        for info in &snapshot.processes {
            if info.status == RunnerStatus::Stopped && !stop_order.contains(&info.name) {
                stop_order.push(info.name.clone());
            }
        }
    }
    assert_eq!(stop_order, vec!["web", "api", "db"]);

    // No children survive.
    for (name, pid) in pids {
        let alive =
            nix_kill_probe(pid);
        assert!(!alive, "{name} (pid {pid}) should be gone");
    }

    // No socket file survives.
    assert!(!socket.exists());
}

/// Probe pid existence with `kill -0` via the shell, avoiding a direct
/// libc dependency in the spec suite.
fn nix_kill_probe(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
