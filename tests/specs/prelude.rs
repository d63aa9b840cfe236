//! Shared helpers for the behavioral specs.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use ork_adapters::FakeUiSession;
use ork_core::Config;
use ork_daemon::Orchestrator;
use ork_engine::StatusMonitor;
use ork_wire::ServerMessage;

/// Parse and validate a config from TOML.
pub fn config(toml_src: &str) -> Config {
    Config::from_toml_str(toml_src).expect("spec config must validate")
}

/// Build an orchestrator with a fake UI and a fast monitor heartbeat.
pub fn orchestrator(toml_src: &str) -> Orchestrator<FakeUiSession> {
    let (logs, _) = broadcast::channel::<ServerMessage>(256);
    Orchestrator::new(
        config(toml_src),
        FakeUiSession::new(),
        StatusMonitor::new(Duration::from_millis(100)),
        logs,
        CancellationToken::new(),
    )
    .expect("orchestrator must build")
}

/// Point the daemon's socket directory at a fresh temp dir.
///
/// The returned guard removes the override on drop. Tests using it must
/// be `#[serial]` since the override is process-global.
pub struct SocketDirGuard {
    _dir: tempfile::TempDir,
}

pub fn scoped_socket_dir() -> SocketDirGuard {
    let dir = tempfile::tempdir().expect("tempdir");
    std::env::set_var("ORCKIT_SOCKET_DIR", dir.path());
    SocketDirGuard { _dir: dir }
}

impl Drop for SocketDirGuard {
    fn drop(&mut self) {
        std::env::remove_var("ORCKIT_SOCKET_DIR");
    }
}
