//! Readiness fan-out: a dependent's start is gated on its dependency's
//! HTTP health, and the probe retries until the expected status shows.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use ork_core::{ReadyCheck, ReadyStrategy, RunnerStatus};
use ork_engine::ProcessRunner;

use crate::prelude::config;

/// Minimal HTTP fixture: serves 503 for the first `failures` requests,
/// then 200. Returns the bound port and a hit counter.
async fn flaky_http_server(failures: u32) -> (u16, Arc<AtomicU32>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    let hits = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&hits);

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let response = if n < failures {
                "HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
            } else {
                "HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
            };
            let _ = stream.write_all(response.as_bytes()).await;
        }
    });

    (port, hits)
}

#[tokio::test]
async fn dependent_starts_only_after_http_readiness() {
    let (port, hits) = flaky_http_server(2).await;

    let config = config(
        r#"
project_name = "fanout"

[processes.api]
type = "shell"
command = "sleep 30"

[processes.web]
type = "shell"
command = "sleep 30"
dependencies = ["api"]
"#,
    );

    let mut api_cfg = config.processes["api"].clone();
    api_cfg.ready_check = Some(ReadyCheck {
        strategy: ReadyStrategy::Http {
            url: format!("http://localhost:{port}/health"),
            expected_status: 200,
        },
        timeout: Duration::from_secs(10),
        interval: Duration::from_millis(100),
        max_attempts: 20,
    });

    let cancel = CancellationToken::new();
    let api = ProcessRunner::new(api_cfg, cancel.child_token()).expect("api runner");
    let web =
        ProcessRunner::new(config.processes["web"].clone(), cancel.child_token()).expect("web");

    // The wave barrier: web starts only after api's start resolves.
    api.start().await.expect("api becomes ready");
    assert_eq!(api.status(), RunnerStatus::Running);
    assert_eq!(
        hits.load(Ordering::SeqCst),
        3,
        "two refusals plus the success, no more"
    );

    web.start().await.expect("web start");
    assert_eq!(web.status(), RunnerStatus::Running);

    web.stop().await.expect("web stop");
    api.stop().await.expect("api stop");
}

#[tokio::test]
async fn wrong_status_code_keeps_probing_until_timeout() {
    // The server always answers 503; expecting 200 must exhaust the
    // attempt budget.
    let (port, hits) = flaky_http_server(u32::MAX).await;

    let config = config(
        r#"
project_name = "wrong-status"

[processes.api]
type = "shell"
command = "sleep 30"
"#,
    );
    let mut api_cfg = config.processes["api"].clone();
    api_cfg.ready_check = Some(ReadyCheck {
        strategy: ReadyStrategy::Http {
            url: format!("http://localhost:{port}/health"),
            expected_status: 200,
        },
        timeout: Duration::from_secs(10),
        interval: Duration::from_millis(50),
        max_attempts: 4,
    });

    let api = ProcessRunner::new(api_cfg, CancellationToken::new()).expect("runner");
    let err = api.start().await.unwrap_err();
    assert!(err.to_string().contains("not ready after 4 attempts"), "{err}");
    assert_eq!(api.status(), RunnerStatus::Failed);
    assert_eq!(hits.load(Ordering::SeqCst), 4);

    let _ = api.stop().await;
}
