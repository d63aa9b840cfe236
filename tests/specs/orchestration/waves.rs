//! Wave ordering: dependents never start before their dependencies are
//! running.

use ork_core::RunnerStatus;

use crate::prelude::orchestrator;

/// Config `{a, b -> a, c -> a}`: waves `[{a}, {b, c}]`. `a` takes a
/// moment to become ready, so any premature start of `b`/`c` would be
/// visible in the snapshot stream.
const FAN_OUT: &str = r#"
project_name = "waves"

[processes.a]
type = "shell"
command = "sleep 0.2; echo up; sleep 30"
[processes.a.ready_check]
kind = "log-pattern"
pattern = "up"
interval = 50
timeout = "10s"

[processes.b]
type = "shell"
command = "sleep 30"
dependencies = ["a"]

[processes.c]
type = "shell"
command = "sleep 30"
dependencies = ["a"]
"#;

#[tokio::test]
async fn dependents_wait_for_the_first_wave() {
    let orchestrator = orchestrator(FAN_OUT);
    assert_eq!(
        orchestrator.plan().waves,
        vec![vec!["a".to_string()], vec!["b".to_string(), "c".to_string()]]
    );

    let mut snapshots = orchestrator.monitor().subscribe();
    orchestrator.start().await.expect("start");

    // Replay the snapshot history: wherever b or c has left `pending`,
    // a must already be `running` (or further along).
    let mut checked = 0;
    while let Ok(snapshot) = snapshots.try_recv() {
        let a = snapshot.get("a");
        for dependent in ["b", "c"] {
            if let Some(info) = snapshot.get(dependent) {
                if info.status != RunnerStatus::Pending {
                    let a = a.expect("a is registered");
                    assert!(
                        matches!(a.status, RunnerStatus::Running | RunnerStatus::Building),
                        "{dependent} was {:?} while a was {:?}",
                        info.status,
                        a.status
                    );
                    checked += 1;
                }
            }
        }
    }
    assert!(checked > 0, "snapshot stream must show the second wave starting");

    for name in ["a", "b", "c"] {
        assert_eq!(orchestrator.runner(name).unwrap().status(), RunnerStatus::Running);
    }

    orchestrator.shutdown().await.expect("shutdown");
}
