// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orckit daemon (orkd)
//!
//! Supervises a project's process graph: starts it in dependency waves,
//! probes readiness, and serves live status over a Unix socket.
//!
//! Architecture:
//! - IPC listener task: socket I/O, forwards viewer commands
//! - Orchestrator: owns the runners, drives startup/shutdown

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use ork_adapters::{NoOpUiSession, TmuxUiSession, UiSession};
use ork_core::Config;
use ork_daemon::lifecycle;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before touching the config
    let arg = std::env::args().nth(1);
    let config_path = match arg.as_deref() {
        Some("--version") | Some("-V") | Some("-v") => {
            println!("orkd {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some("--help") | Some("-h") | Some("help") | None => {
            println!("orkd {}", env!("CARGO_PKG_VERSION"));
            println!("Orckit daemon - supervises a project's dev processes");
            println!();
            println!("USAGE:");
            println!("    orkd <config.toml>");
            println!();
            println!("The daemon is typically started by the `ork` CLI and should not");
            println!("be invoked directly. It listens on a Unix socket for commands");
            println!("from status viewers.");
            println!();
            println!("OPTIONS:");
            println!("    -h, --help       Print help information");
            println!("    -v, --version    Print version information");
            if arg.is_none() {
                std::process::exit(2);
            }
            return Ok(());
        }
        Some(path) => path.to_string(),
    };

    setup_logging();

    let raw = std::fs::read_to_string(&config_path)
        .map_err(|e| format!("could not read {config_path}: {e}"))?;
    let config = Config::from_toml_str(&raw)?;

    // The tmux UI is opt-in; headless runs use the no-op session.
    let use_tmux = std::env::var("ORCKIT_UI").map(|v| v == "tmux").unwrap_or(false);
    if use_tmux {
        let ui = TmuxUiSession::new(&config.project_name);
        run(config, ui).await
    } else {
        run(config, NoOpUiSession::new()).await
    }
}

async fn run<U: UiSession>(config: Config, ui: U) -> Result<(), Box<dyn std::error::Error>> {
    let project = config.project_name.clone();
    let daemon = lifecycle::startup(config, ui).await?;
    info!(%project, "orckit is up");

    wait_for_shutdown_signal().await;

    info!("shutting down");
    if let Err(e) = daemon.shutdown().await {
        error!(error = %e, "shutdown finished with errors");
        return Err(e.into());
    }
    Ok(())
}

async fn wait_for_shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "could not install SIGTERM handler");
            return;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "could not install SIGINT handler");
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigint.recv() => info!("received SIGINT"),
    }
}

fn setup_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).init();
    // Keep the appender guard alive for the process lifetime.
    std::mem::forget(guard);
}
