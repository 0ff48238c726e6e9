// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run lifecycle specs: happy path, retries, and the wait prober.

use crate::prelude::*;
use sk_core::{AgentEvent, CleanupPolicy, OrchestrationOverrides, RunId, RunOutcome};
use sk_engine::WaitReply;
use std::time::Duration;

fn retrying(max_retries: u32) -> OrchestrationOverrides {
    OrchestrationOverrides {
        retry_on_failure: Some(true),
        max_retries: Some(max_retries),
        initial_delay_ms: Some(10),
        backoff_multiplier: Some(2.0),
        ..Default::default()
    }
}

/// Default policy, start then end: one announce with an ok outcome, no
/// retries, no verification.
#[tokio::test(start_paused = true)]
async fn happy_path_announces_once() {
    let h = Harness::new();
    h.register("run-1", None);
    h.runtime.handle_agent_event(AgentEvent::started("run-1", Some(100))).await;
    h.runtime.handle_agent_event(AgentEvent::ended("run-1", Some(200))).await;

    let delivered = h.announcer.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].outcome, Some(RunOutcome::Ok));
    assert_eq!(delivered[0].retry_count, 0);
    assert_eq!(delivered[0].verification_result, None);
    assert_eq!(delivered[0].started_at, Some(100));
    assert_eq!(delivered[0].ended_at, Some(200));
    assert_eq!(h.announcer.attempts(), 1);
}

/// With cleanup=delete, the record and the child session are removed after
/// the announce.
#[tokio::test(start_paused = true)]
async fn delete_policy_drops_record_and_session() {
    let h = Harness::new();
    h.register_with_cleanup("run-1", CleanupPolicy::Delete, None);
    h.runtime.handle_agent_event(AgentEvent::ended("run-1", Some(200))).await;

    assert_eq!(h.announcer.delivered().len(), 1);
    assert!(h.runtime.get_run(&RunId::new("run-1")).is_none());
    assert_eq!(h.gateway.deleted_sessions(), vec!["child-run-1".to_string()]);
}

/// Failure, one backoff retry under a derived id, then success.
#[tokio::test(start_paused = true)]
async fn retry_then_success() {
    let h = Harness::new();
    h.register("run-2", Some(retrying(2)));
    h.runtime.handle_agent_event(AgentEvent::errored("run-2", "boom", Some(100))).await;

    tokio::time::sleep(Duration::from_millis(12)).await;
    let started = h.gateway.started_runs();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].0, RunId::new("run-2-retry-1"));
    assert!(started[0].1.contains("[RETRY ATTEMPT 1/2]"));
    assert!(started[0].1.contains("boom"));

    h.runtime.handle_agent_event(AgentEvent::ended("run-2", Some(300))).await;
    let delivered = h.announcer.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].retry_count, 1);
    assert_eq!(delivered[0].outcome, Some(RunOutcome::Ok));
}

/// Retry budget of one: the retried attempt fails too, and the failure
/// announces without further dispatches.
#[tokio::test(start_paused = true)]
async fn exhausted_retries_stop() {
    let h = Harness::new();
    h.register("run-3", Some(retrying(1)));
    h.runtime.handle_agent_event(AgentEvent::errored("run-3", "first", Some(100))).await;
    tokio::time::sleep(Duration::from_millis(12)).await;
    h.runtime.handle_agent_event(AgentEvent::errored("run-3", "second", Some(200))).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(h.gateway.started_runs().len(), 1);
    let delivered = h.announcer.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].retry_count, 1);
    assert!(matches!(delivered[0].outcome, Some(RunOutcome::Error { .. })));

    let record = h.runtime.get_run(&RunId::new("run-3")).unwrap();
    assert!(record.retry_count <= record.max_retries);
}

/// The prober path alone (no in-process lifecycle events) completes a run.
#[tokio::test(start_paused = true)]
async fn wait_probe_completes_cross_process_runs() {
    let h = Harness::new();
    h.gateway.push_wait_reply("run-4", WaitReply::ok(Some(100), Some(200)));
    h.register("run-4", None);
    settle().await;

    let delivered = h.announcer.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].started_at, Some(100));
    assert_eq!(delivered[0].ended_at, Some(200));
}

/// Listener and prober race on the same completion: exactly one announce.
#[tokio::test(start_paused = true)]
async fn racing_signals_announce_once() {
    let h = Harness::new();
    h.gateway.push_wait_reply("run-5", WaitReply::ok(None, Some(250)));
    h.register("run-5", None);
    h.runtime.handle_agent_event(AgentEvent::ended("run-5", Some(200))).await;
    settle().await;

    assert_eq!(h.announcer.attempts(), 1);
    assert_eq!(h.announcer.delivered().len(), 1);
}
