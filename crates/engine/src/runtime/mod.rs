// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime for the subagent orchestration engine
//!
//! One `Runtime` per process. It owns the run registry, the verification
//! hook table, the in-flight retry/verification guard sets, and the
//! background tasks (wait probes, retry timers, the archival sweeper). All
//! record mutations take the registry lock briefly and never hold it across
//! a suspension point.

mod cleanup;
mod lifecycle;
mod prober;
mod restore;
mod retry;
mod sweeper;
mod verify;

#[cfg(test)]
pub(crate) mod test_helpers;

use crate::adapters::{Announcer, Gateway};
use crate::storage::RunStore;
use parking_lot::Mutex;
use sk_core::{
    resolve_orchestration, CleanupPolicy, Clock, OrchestrationOverrides, RunId, RunRecord,
    SubagentsConfig,
};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use verify::{HookError, HookInput, HookVerdict, VerificationHook};

/// Runtime path and policy configuration
pub struct RuntimeConfig {
    /// Root state directory (e.g. ~/.local/state/sidekick)
    pub state_dir: PathBuf,
    /// `agents.defaults.subagents` section of the process configuration
    pub subagents: SubagentsConfig,
}

/// Runtime adapter dependencies
pub struct RuntimeDeps<G, N> {
    pub gateway: G,
    pub announcer: N,
}

/// Parameters for registering a new run.
#[derive(Debug, Clone)]
pub struct RegisterParams {
    pub run_id: RunId,
    pub child_session_key: String,
    pub requester_session_key: String,
    /// Normalised transport/context tag for announce delivery.
    pub requester_origin: String,
    pub requester_display_key: String,
    /// Original prompt text; retries rewrite around it.
    pub task: String,
    pub label: Option<String>,
    pub cleanup: CleanupPolicy,
    /// Per-call orchestration override; highest precedence layer.
    pub orchestration: Option<OrchestrationOverrides>,
}

/// Runtime that coordinates subagent runs.
///
/// Shared via `Arc`; background tasks hold clones. Two runtimes must not
/// share a persistence directory.
pub struct Runtime<G, N, C: Clock> {
    pub(crate) gateway: G,
    pub(crate) announcer: N,
    pub(crate) clock: C,
    pub(crate) subagents: SubagentsConfig,
    pub(crate) store: RunStore,
    pub(crate) runs: Mutex<HashMap<RunId, RunRecord>>,
    pub(crate) hooks: Mutex<HashMap<String, Arc<dyn VerificationHook>>>,
    /// Runs with a retry currently scheduled or dispatching.
    pub(crate) pending_retries: Mutex<HashSet<RunId>>,
    /// Runs with verification currently executing.
    pub(crate) pending_verifications: Mutex<HashSet<RunId>>,
    /// Runs already resumed by `init_registry`.
    pub(crate) resumed: Mutex<HashSet<RunId>>,
    pub(crate) restored: AtomicBool,
    pub(crate) sweeper_running: AtomicBool,
    pub(crate) shutdown: Mutex<CancellationToken>,
}

impl<G, N, C> Runtime<G, N, C>
where
    G: Gateway,
    N: Announcer,
    C: Clock,
{
    /// Create a new runtime
    pub fn new(deps: RuntimeDeps<G, N>, clock: C, config: RuntimeConfig) -> Self {
        Self {
            gateway: deps.gateway,
            announcer: deps.announcer,
            clock,
            subagents: config.subagents,
            store: RunStore::new(&config.state_dir),
            runs: Mutex::new(HashMap::new()),
            hooks: Mutex::new(HashMap::new()),
            pending_retries: Mutex::new(HashSet::new()),
            pending_verifications: Mutex::new(HashSet::new()),
            resumed: Mutex::new(HashSet::new()),
            restored: AtomicBool::new(false),
            sweeper_running: AtomicBool::new(false),
            shutdown: Mutex::new(CancellationToken::new()),
        }
    }

    /// Register a new run and arm its completion signals.
    ///
    /// The effective orchestration policy is composed here (per-call override
    /// over process configuration over defaults) and snapshotted into the
    /// record for its entire lifetime.
    pub fn register(self: &Arc<Self>, params: RegisterParams) {
        let now = self.clock.epoch_ms();
        let orchestration =
            resolve_orchestration(params.orchestration.as_ref(), &self.subagents.orchestration);
        let archive_at_ms = self.subagents.archive_after_ms().map(|ms| now + ms);
        let record = RunRecord {
            run_id: params.run_id.clone(),
            child_session_key: params.child_session_key,
            requester_session_key: params.requester_session_key,
            requester_origin: params.requester_origin,
            requester_display_key: params.requester_display_key,
            task: params.task,
            label: params.label,
            cleanup: params.cleanup,
            created_at: now,
            started_at: None,
            ended_at: None,
            outcome: None,
            archive_at_ms,
            cleanup_handled: false,
            cleanup_completed_at: None,
            retry_count: 0,
            max_retries: orchestration.max_retries,
            next_retry_at: None,
            is_retry: false,
            verification_attempted: false,
            verification_result: None,
            orchestration_config: orchestration,
            extra: serde_json::Map::new(),
        };
        self.runs.lock().insert(params.run_id.clone(), record);
        self.persist();
        tracing::info!(run_id = %params.run_id, "subagent run registered");

        self.arm_wait_probe(&params.run_id);
        if archive_at_ms.is_some() {
            self.ensure_sweeper();
        }
    }

    /// Remove a record unconditionally. Test/admin use.
    pub fn release(&self, run_id: &RunId) -> bool {
        let removed = self.runs.lock().remove(run_id).is_some();
        if removed {
            self.persist();
        }
        removed
    }

    /// All records registered by the given requester session.
    pub fn list_for_requester(&self, requester_session_key: &str) -> Vec<RunRecord> {
        self.runs
            .lock()
            .values()
            .filter(|r| r.requester_session_key == requester_session_key)
            .cloned()
            .collect()
    }

    /// Look up a record by id.
    pub fn get_run(&self, run_id: &RunId) -> Option<RunRecord> {
        self.runs.lock().get(run_id).cloned()
    }

    /// Tear down all engine state, including hooks, guard sets, and
    /// background tasks. Test use only.
    pub fn reset(&self) {
        let token = {
            let mut guard = self.shutdown.lock();
            std::mem::replace(&mut *guard, CancellationToken::new())
        };
        token.cancel();
        self.runs.lock().clear();
        self.hooks.lock().clear();
        self.pending_retries.lock().clear();
        self.pending_verifications.lock().clear();
        self.resumed.lock().clear();
        self.restored.store(false, std::sync::atomic::Ordering::SeqCst);
        self.sweeper_running.store(false, std::sync::atomic::Ordering::SeqCst);
    }

    /// Token observed by every background task spawned by this runtime.
    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.lock().clone()
    }

    /// Mutate a record under the registry lock and persist if it existed.
    pub(crate) fn update_run(&self, run_id: &RunId, f: impl FnOnce(&mut RunRecord)) -> bool {
        let updated = {
            let mut runs = self.runs.lock();
            match runs.get_mut(run_id) {
                Some(record) => {
                    f(record);
                    true
                }
                None => false,
            }
        };
        if updated {
            self.persist();
        }
        updated
    }

    /// Serialize the current map to disk. Failures are warnings only; the
    /// in-memory registry stays authoritative.
    pub(crate) fn persist(&self) {
        let snapshot = self.runs.lock().clone();
        if let Err(e) = self.store.persist(&snapshot) {
            tracing::warn!(error = %e, "failed to persist subagent runs");
        }
    }

    /// Post-completion policy: on a terminal outcome, retry if eligible,
    /// otherwise verify if configured, otherwise clean up.
    pub(crate) async fn handle_run_completion(self: &Arc<Self>, run_id: &RunId) {
        let Some(record) = self.get_run(run_id) else { return };
        if record.is_cleanup_complete() {
            return;
        }
        match &record.outcome {
            Some(outcome) if outcome.is_error() && self.should_retry(&record) => {
                self.spawn_retry(run_id);
            }
            Some(outcome) if outcome.is_ok() && record.orchestration_config.verify_completion => {
                self.run_verification(run_id).await;
            }
            _ => self.finish_run(run_id).await,
        }
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
