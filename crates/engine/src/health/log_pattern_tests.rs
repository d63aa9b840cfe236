// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use regex::Regex;

use super::*;

fn prober(pattern: &str) -> LogPatternProber {
    LogPatternProber::new(Regex::new(pattern).unwrap())
}

#[tokio::test]
async fn unmatched_prober_is_not_ready() {
    let p = prober("listening on");
    assert!(!p.probe().await.ok);
}

#[tokio::test]
async fn first_match_satisfies() {
    let p = prober(r"listening on port \d+");
    p.observe("booting...");
    assert!(!p.probe().await.ok);
    p.observe("listening on port 3000");
    assert!(p.probe().await.ok);
}

#[tokio::test]
async fn stays_satisfied_across_further_lines() {
    let p = prober("ready");
    p.observe("ready");
    p.observe("some other line");
    p.observe("and another");
    assert!(p.probe().await.ok);
}

#[tokio::test]
async fn reset_clears_the_match() {
    let p = prober("ready");
    p.observe("ready");
    assert!(p.probe().await.ok);
    p.reset();
    assert!(!p.probe().await.ok);
    p.observe("ready again");
    assert!(p.probe().await.ok);
}
