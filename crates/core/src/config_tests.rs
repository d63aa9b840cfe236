// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const MINIMAL: &str = r#"
project_name = "demo"

[processes.db]
type = "container"
command = "docker run --rm -p 5432:5432 postgres:16"

[processes.api]
type = "node"
command = "npm run dev"
dependencies = ["db"]
"#;

#[test]
fn minimal_config_validates() {
    let config = Config::from_toml_str(MINIMAL).unwrap();
    assert_eq!(config.project_name, "demo");
    assert_eq!(config.processes.len(), 2);
    // Names are filled from map keys.
    assert_eq!(config.processes["db"].name, "db");
    assert_eq!(config.processes["api"].name, "api");
    assert!(config.has_container_processes());
    assert!(config.has_node_processes());
}

#[test]
fn empty_project_name_is_rejected() {
    let err = Config::from_toml_str("project_name = \"  \"").unwrap_err();
    assert!(matches!(err, ConfigError::EmptyProjectName));
}

#[test]
fn empty_command_is_rejected() {
    let err = Config::from_toml_str(
        r#"
project_name = "demo"
[processes.api]
type = "shell"
command = "  "
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::EmptyCommand { name } if name == "api"));
}

#[test]
fn unknown_process_type_is_a_parse_error() {
    let err = Config::from_toml_str(
        r#"
project_name = "demo"
[processes.api]
type = "systemd"
command = "true"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn expected_status_out_of_range_is_rejected() {
    let err = Config::from_toml_str(
        r#"
project_name = "demo"
[processes.api]
type = "shell"
command = "serve"
[processes.api.ready_check]
kind = "http"
url = "http://localhost:3000"
expected_status = 600
"#,
    )
    .unwrap_err();
    assert!(
        matches!(err, ConfigError::InvalidExpectedStatus { status: 600, .. }),
        "got {err:?}"
    );
}

#[test]
fn zero_timeout_is_rejected() {
    let err = Config::from_toml_str(
        r#"
project_name = "demo"
[processes.api]
type = "shell"
command = "serve"
[processes.api.ready_check]
kind = "tcp"
host = "localhost"
port = 3000
timeout = 0
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::ZeroDuration { field: "ready_check.timeout", .. }));
}

#[test]
fn malformed_duration_is_a_parse_error() {
    let err = Config::from_toml_str(
        r#"
project_name = "demo"
[processes.api]
type = "shell"
command = "serve"
restart_delay = "whenever"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn invalid_log_pattern_is_rejected() {
    let err = Config::from_toml_str(
        r#"
project_name = "demo"
[processes.api]
type = "shell"
command = "serve"
[processes.api.ready_check]
kind = "log-pattern"
pattern = "ready["
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidPattern { .. }));
}

#[test]
fn invalid_filter_pattern_is_rejected() {
    let err = Config::from_toml_str(
        r#"
project_name = "demo"
[processes.api]
type = "shell"
command = "serve"
[processes.api.output_filter]
suppress = ["(unclosed"]
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidFilterPattern { .. }));
}

#[test]
fn unknown_dependency_is_rejected() {
    let err = Config::from_toml_str(
        r#"
project_name = "demo"
[processes.api]
type = "shell"
command = "serve"
dependencies = ["db"]
"#,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Resolve(ResolveError::UnknownDependency { .. })
    ));
}

#[test]
fn dependency_cycle_is_rejected() {
    let err = Config::from_toml_str(
        r#"
project_name = "demo"
[processes.a]
type = "shell"
command = "true"
dependencies = ["b"]
[processes.b]
type = "shell"
command = "true"
dependencies = ["a"]
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Resolve(ResolveError::CycleDetected { .. })));
}

#[test]
fn global_hooks_and_preflight_parse() {
    let config = Config::from_toml_str(
        r#"
project_name = "demo"

[hooks]
pre_start_all = "mkdir -p .cache"
post_stop_all = "rm -rf .cache"

[[preflight.checks]]
name = "git"
command = "git --version"
fix_hint = "install git"
condition = "test -d .git"

[processes.api]
type = "shell"
command = "serve"
"#,
    )
    .unwrap();

    assert_eq!(config.hooks.pre_start_all.as_deref(), Some("mkdir -p .cache"));
    let preflight = config.preflight.unwrap();
    assert_eq!(preflight.checks.len(), 1);
    assert_eq!(preflight.checks[0].condition.as_deref(), Some("test -d .git"));
}

#[test]
fn config_round_trips_through_toml() {
    let config = Config::from_toml_str(MINIMAL).unwrap();
    let serialized = toml::to_string(&config).unwrap();
    let reparsed = Config::from_toml_str(&serialized).unwrap();
    assert_eq!(config, reparsed);
}
