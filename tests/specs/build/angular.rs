//! Deep-mode Angular integration: structured build output drives build
//! metrics and the building/running status round trip.

use std::time::Duration;

use ork_core::RunnerStatus;
use ork_wire::CommandAction;

use crate::prelude::orchestrator;

/// A stand-in dev server that speaks the Angular JSON protocol.
const NG_STUB: &str = r#"
project_name = "ng-deep"

[processes.ng]
type = "bundler-angular"
category = "frontend"
integration_mode = "deep"
command = '''
sleep 0.1
echo '{"type":"build-start"}'
echo '{"type":"build-progress","progress":50}'
echo 'not json, dropped silently'
echo '{"type":"build-complete","success":true,"time":1234,"errors":[],"warnings":[]}'
sleep 30
'''
"#;

#[tokio::test]
async fn angular_deep_mode_updates_build_metrics() {
    let orchestrator = orchestrator(NG_STUB);
    orchestrator.start().await.expect("start");

    // Wait for the stubbed build cycle to play out.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = orchestrator.monitor().snapshot();
        let info = snapshot.get("ng").expect("registered");
        if info.build.last_build_success == Some(true) {
            assert_eq!(info.build.errors, 0);
            assert_eq!(info.build.warnings, 0);
            assert_eq!(info.build.last_build_duration_ms, Some(1234));
            assert_eq!(info.build.progress, 100);
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "build metrics never arrived: {:?}",
            info.build
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    // The malformed line did not disturb the runner.
    assert_eq!(orchestrator.runner("ng").unwrap().status(), RunnerStatus::Running);

    // The retained log still shows the non-JSON line as plain output.
    let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
    orchestrator
        .handle_command(ork_daemon::IpcCommand {
            action: CommandAction::Logs,
            process_name: "ng".to_string(),
            options: None,
            reply: reply_tx,
        })
        .await;
    let reply = reply_rx.await.expect("reply");
    assert!(reply.success);
    let data = reply.data.expect("log data");
    let lines = data["lines"].as_array().expect("lines");
    assert!(lines.iter().any(|l| l["content"] == "not json, dropped silently"));

    orchestrator.shutdown().await.expect("shutdown");
}
