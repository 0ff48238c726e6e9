// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recovery specs: archival, restart restore, and snapshot round-trips.

use crate::prelude::*;
use sk_core::{AgentEvent, RunId, SubagentsConfig};
use std::time::Duration;

/// A run that never signals is archived after its deadline and its child
/// session deleted best-effort.
#[tokio::test(start_paused = true)]
async fn silent_run_is_archived() {
    let h = Harness::with_config(SubagentsConfig {
        archive_after_minutes: 1,
        ..Default::default()
    });
    h.register("run-1", None);
    settle().await;

    h.clock.advance(Duration::from_secs(61));
    tokio::time::sleep(Duration::from_secs(61)).await;

    assert!(h.runtime.get_run(&RunId::new("run-1")).is_none());
    assert_eq!(h.gateway.deleted_sessions(), vec!["child-run-1".to_string()]);
    assert_eq!(h.announcer.attempts(), 0);
}

/// The announce fails, cleanup reopens, and a restart restore re-attempts
/// the announce exactly once.
#[tokio::test(start_paused = true)]
async fn failed_announce_is_retried_after_restart() {
    let h = Harness::new();
    h.register("run-2", None);
    h.announcer.fail_times(1);
    h.runtime.handle_agent_event(AgentEvent::ended("run-2", Some(200))).await;

    let record = h.runtime.get_run(&RunId::new("run-2")).unwrap();
    assert!(!record.cleanup_handled);
    assert!(!record.is_cleanup_complete());
    assert_eq!(h.announcer.attempts(), 1);
    assert!(h.announcer.delivered().is_empty());

    let h2 = h.restart();
    h2.runtime.init_registry().await;

    assert_eq!(h2.announcer.attempts(), 1);
    assert_eq!(h2.announcer.delivered().len(), 1);
    assert!(h2.runtime.get_run(&RunId::new("run-2")).unwrap().is_cleanup_complete());

    // Another restart restore changes nothing
    let h3 = h2.restart();
    h3.runtime.init_registry().await;
    settle().await;
    assert_eq!(h3.announcer.attempts(), 0);
}

/// A run with no terminal outcome re-arms the wait probe after restart;
/// a completed one is left untouched.
#[tokio::test(start_paused = true)]
async fn restore_resumes_at_the_right_point() {
    let h = Harness::new();
    h.register("pending", None);
    h.register("finished", None);
    h.runtime.handle_agent_event(AgentEvent::ended("finished", Some(200))).await;
    assert_eq!(h.announcer.delivered().len(), 1);

    let h2 = h.restart();
    h2.runtime.init_registry().await;
    settle().await;

    assert_eq!(h2.gateway.wait_count(&RunId::new("pending")), 1);
    assert_eq!(h2.gateway.wait_count(&RunId::new("finished")), 0);
    assert_eq!(h2.announcer.attempts(), 0);
}

/// The snapshot on disk round-trips the full record, unknown fields kept.
#[tokio::test(start_paused = true)]
async fn snapshot_round_trips_across_restart() {
    let h = Harness::new();
    h.register("run-3", None);

    // Inject a field the current schema does not know
    let path = h.state_dir.join("subagents/runs.json");
    let mut doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    doc["runs"]["run-3"]["legacyNote"] = serde_json::Value::String("keep me".to_string());
    std::fs::write(&path, doc.to_string()).unwrap();

    let h2 = h.restart();
    h2.runtime.init_registry().await;
    let record = h2.runtime.get_run(&RunId::new("run-3")).unwrap();
    assert_eq!(record.task, "summarize the logs");
    assert_eq!(record.extra.get("legacyNote").unwrap(), "keep me");

    // Any later persist writes the field back out
    h2.runtime.handle_agent_event(AgentEvent::started("run-3", Some(50))).await;
    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(doc["runs"]["run-3"]["legacyNote"], "keep me");
    assert_eq!(doc["runs"]["run-3"]["startedAt"], 50);
}
