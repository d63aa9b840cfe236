// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serial_test::serial;

use ork_adapters::NoOpUiSession;
use ork_core::{Config, RunnerStatus};

use super::*;

fn config(project: &str) -> Config {
    Config::from_toml_str(&format!(
        r#"
project_name = "{project}"

[processes.svc]
type = "shell"
command = "sleep 30"
"#
    ))
    .expect("config")
}

fn scoped_socket_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    std::env::set_var("ORCKIT_SOCKET_DIR", dir.path());
    dir
}

#[tokio::test]
#[serial]
async fn startup_binds_socket_and_shutdown_removes_it() {
    let _dir = scoped_socket_dir();

    let daemon = startup(config("lc-basic"), NoOpUiSession::new()).await.expect("startup");
    let socket = daemon.socket_path().clone();
    assert!(socket.exists(), "socket file should exist while running");
    assert!(socket.ends_with("orckit-lc-basic.sock"));
    assert_eq!(
        daemon.orchestrator().runner("svc").unwrap().status(),
        RunnerStatus::Running
    );

    daemon.shutdown().await.expect("shutdown");
    assert!(!socket.exists(), "socket file should be removed on shutdown");

    std::env::remove_var("ORCKIT_SOCKET_DIR");
}

#[tokio::test]
#[serial]
async fn stale_socket_is_replaced_on_startup() {
    let _dir = scoped_socket_dir();

    let stale = crate::env::socket_path("lc-stale");
    std::fs::write(&stale, b"").expect("plant stale file");

    let daemon = startup(config("lc-stale"), NoOpUiSession::new()).await.expect("startup");
    daemon.shutdown().await.expect("shutdown");

    std::env::remove_var("ORCKIT_SOCKET_DIR");
}

#[tokio::test]
#[serial]
async fn failed_startup_cleans_up_the_socket() {
    let _dir = scoped_socket_dir();

    let config = Config::from_toml_str(
        r#"
project_name = "lc-fail"

[processes.broken]
type = "build-once"
command = "exit 9"
[processes.broken.ready_check]
kind = "exit-code"
"#,
    )
    .expect("config");

    let socket = crate::env::socket_path("lc-fail");
    let err = startup(config, NoOpUiSession::new()).await.unwrap_err();
    assert!(matches!(err, LifecycleError::Orchestrator(_)));
    assert!(!socket.exists(), "socket removed after failed startup");

    std::env::remove_var("ORCKIT_SOCKET_DIR");
}

#[tokio::test]
#[serial]
async fn shutdown_leaves_no_child_processes() {
    let _dir = scoped_socket_dir();

    let daemon = startup(config("lc-children"), NoOpUiSession::new()).await.expect("startup");
    let pid = daemon.orchestrator().runner("svc").unwrap().pid().expect("pid");
    daemon.shutdown().await.expect("shutdown");

    // After shutdown the child must be gone: signal 0 probes existence.
    let alive = nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok();
    assert!(!alive, "child {pid} should have been stopped");

    std::env::remove_var("ORCKIT_SOCKET_DIR");
}
