// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use yare::parameterized;

use super::*;

#[test]
fn defaults_apply() {
    let check: ReadyCheck = toml::from_str(
        r#"
kind = "tcp"
host = "localhost"
port = 5432
"#,
    )
    .unwrap();

    assert_eq!(check.timeout, Duration::from_secs(60));
    assert_eq!(check.interval, Duration::from_secs(1));
    assert_eq!(check.max_attempts, 60);
    assert_eq!(check.strategy, ReadyStrategy::Tcp { host: "localhost".into(), port: 5432 });
}

#[test]
fn http_default_expected_status_is_200() {
    let check: ReadyCheck = toml::from_str(
        r#"
kind = "http"
url = "http://localhost:3000/health"
"#,
    )
    .unwrap();

    match check.strategy {
        ReadyStrategy::Http { expected_status, .. } => assert_eq!(expected_status, 200),
        other => panic!("unexpected strategy: {other:?}"),
    }
}

#[test]
fn unknown_kind_is_rejected() {
    let res: Result<ReadyCheck, _> = toml::from_str("kind = \"grpc\"\nport = 50051");
    assert!(res.is_err());
}

#[parameterized(
    http = { r#"kind = "http"
url = "http://localhost/x""#, "http" },
    tcp = { r#"kind = "tcp"
host = "h"
port = 1"#, "tcp" },
    log = { r#"kind = "log-pattern"
pattern = "ready""#, "log-pattern" },
    custom = { r#"kind = "custom"
command = "true""#, "custom" },
    exit = { r#"kind = "exit-code""#, "exit-code" },
)]
fn kind_names(toml_src: &str, expected: &str) {
    let check: ReadyCheck = toml::from_str(toml_src).unwrap();
    assert_eq!(check.strategy.kind(), expected);
}

#[test]
fn exit_code_is_not_polled() {
    assert!(!ReadyStrategy::ExitCode {}.is_polled());
    assert!(ReadyStrategy::Tcp { host: "h".into(), port: 1 }.is_polled());
}

#[test]
fn interval_accepts_millis_integer() {
    let check: ReadyCheck = toml::from_str(
        r#"
kind = "custom"
command = "true"
interval = 250
max_attempts = 10
"#,
    )
    .unwrap();
    assert_eq!(check.interval, Duration::from_millis(250));
    assert_eq!(check.max_attempts, 10);
}
