// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for engine specs.

use sk_core::{CleanupPolicy, FakeClock, OrchestrationOverrides, RunId, SubagentsConfig};
use sk_engine::{FakeAnnouncer, FakeGateway, RegisterParams, Runtime, RuntimeConfig, RuntimeDeps};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub type TestRuntime = Runtime<FakeGateway, FakeAnnouncer, FakeClock>;

/// One engine process: runtime, fake adapters, and a state directory.
pub struct Harness {
    pub runtime: Arc<TestRuntime>,
    pub gateway: FakeGateway,
    pub announcer: FakeAnnouncer,
    pub clock: FakeClock,
    pub state_dir: PathBuf,
    _tmp: Arc<TempDir>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(SubagentsConfig::default())
    }

    pub fn with_config(subagents: SubagentsConfig) -> Self {
        let tmp = Arc::new(tempfile::tempdir().unwrap());
        let state_dir = tmp.path().to_path_buf();
        Self::build(tmp, state_dir, subagents)
    }

    /// Fresh runtime and adapters over the same state directory — a
    /// simulated process restart.
    pub fn restart(&self) -> Self {
        self.runtime.reset();
        Self::build(Arc::clone(&self._tmp), self.state_dir.clone(), SubagentsConfig::default())
    }

    fn build(tmp: Arc<TempDir>, state_dir: PathBuf, subagents: SubagentsConfig) -> Self {
        let gateway = FakeGateway::new();
        let announcer = FakeAnnouncer::new();
        let clock = FakeClock::new();
        let runtime = Arc::new(Runtime::new(
            RuntimeDeps { gateway: gateway.clone(), announcer: announcer.clone() },
            clock.clone(),
            RuntimeConfig { state_dir: state_dir.clone(), subagents },
        ));
        Self { runtime, gateway, announcer, clock, state_dir, _tmp: tmp }
    }

    /// Register a run with the default keep policy.
    pub fn register(&self, run_id: &str, orchestration: Option<OrchestrationOverrides>) {
        self.register_with_cleanup(run_id, CleanupPolicy::Keep, orchestration);
    }

    pub fn register_with_cleanup(
        &self,
        run_id: &str,
        cleanup: CleanupPolicy,
        orchestration: Option<OrchestrationOverrides>,
    ) {
        self.runtime.register(RegisterParams {
            run_id: RunId::new(run_id),
            child_session_key: format!("child-{run_id}"),
            requester_session_key: "parent-session".to_string(),
            requester_origin: "cli".to_string(),
            requester_display_key: "parent".to_string(),
            task: "summarize the logs".to_string(),
            label: None,
            cleanup,
            orchestration,
        });
    }
}

/// Yield to let spawned probe/retry tasks make progress.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
