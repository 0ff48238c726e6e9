// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the engine crate.

use crate::adapters::{FakeAnnouncer, FakeGateway};
use crate::runtime::{RegisterParams, Runtime, RuntimeConfig, RuntimeDeps};
use sk_core::{CleanupPolicy, FakeClock, OrchestrationOverrides, RunId, SubagentsConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Convenience alias for the fully-typed test runtime.
pub(crate) type TestRuntime = Runtime<FakeGateway, FakeAnnouncer, FakeClock>;

/// Test context holding the runtime, adapters, and the state directory.
pub(crate) struct TestContext {
    pub runtime: Arc<TestRuntime>,
    pub gateway: FakeGateway,
    pub announcer: FakeAnnouncer,
    pub clock: FakeClock,
    pub state_dir: PathBuf,
    _tmp: Arc<TempDir>,
}

/// Create a runtime over a fresh temp state directory with default config.
pub(crate) fn setup() -> TestContext {
    setup_with_config(SubagentsConfig::default())
}

pub(crate) fn setup_with_config(subagents: SubagentsConfig) -> TestContext {
    let tmp = Arc::new(tempfile::tempdir().unwrap());
    let state_dir = tmp.path().to_path_buf();
    build(tmp, state_dir, subagents)
}

/// Fresh runtime and adapters over the same state directory — a simulated
/// process restart.
pub(crate) fn restart(ctx: &TestContext) -> TestContext {
    ctx.runtime.reset();
    build(
        Arc::clone(&ctx._tmp),
        ctx.state_dir.clone(),
        ctx.runtime.subagents.clone(),
    )
}

fn build(tmp: Arc<TempDir>, state_dir: PathBuf, subagents: SubagentsConfig) -> TestContext {
    let gateway = FakeGateway::new();
    let announcer = FakeAnnouncer::new();
    let clock = FakeClock::new();
    let runtime = Arc::new(Runtime::new(
        RuntimeDeps { gateway: gateway.clone(), announcer: announcer.clone() },
        clock.clone(),
        RuntimeConfig { state_dir: state_dir.clone(), subagents },
    ));
    TestContext { runtime, gateway, announcer, clock, state_dir, _tmp: tmp }
}

/// Default registration parameters for a run.
pub(crate) fn params(run_id: &str) -> RegisterParams {
    RegisterParams {
        run_id: RunId::new(run_id),
        child_session_key: format!("child-{run_id}"),
        requester_session_key: "parent-session".to_string(),
        requester_origin: "cli".to_string(),
        requester_display_key: "parent".to_string(),
        task: "write the report".to_string(),
        label: None,
        cleanup: CleanupPolicy::Keep,
        orchestration: None,
    }
}

/// Registration parameters with a per-call orchestration override.
pub(crate) fn params_with(run_id: &str, orchestration: OrchestrationOverrides) -> RegisterParams {
    RegisterParams { orchestration: Some(orchestration), ..params(run_id) }
}

/// Yield to let spawned probe/retry tasks make progress.
pub(crate) async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
