// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic archival of runs past their deadline.

use super::Runtime;
use crate::adapters::{Announcer, Gateway};
use sk_core::{Clock, RunId};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

/// How often the sweeper walks the registry.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

impl<G, N, C> Runtime<G, N, C>
where
    G: Gateway,
    N: Announcer,
    C: Clock,
{
    /// Start the sweeper when any record can expire; no-op while running.
    pub(crate) fn ensure_sweeper(self: &Arc<Self>) {
        if self.sweeper_running.swap(true, Ordering::SeqCst) {
            return;
        }
        let runtime = Arc::clone(self);
        let shutdown = self.shutdown_token();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; nothing is due that early.
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        runtime.sweeper_running.store(false, Ordering::SeqCst);
                        return;
                    }
                    _ = interval.tick() => {}
                }
                if runtime.sweep_expired().await {
                    runtime.sweeper_running.store(false, Ordering::SeqCst);
                    return;
                }
            }
        });
    }

    /// Archive every run past its deadline, with a best-effort session
    /// delete. Returns true when the registry has emptied and the sweeper
    /// should stop.
    pub(crate) async fn sweep_expired(self: &Arc<Self>) -> bool {
        let now = self.clock.epoch_ms();
        let expired: Vec<(RunId, String)> = {
            let runs = self.runs.lock();
            runs.values()
                .filter(|r| r.archive_at_ms.is_some_and(|at| at <= now))
                .map(|r| (r.run_id.clone(), r.child_session_key.clone()))
                .collect()
        };
        if !expired.is_empty() {
            {
                let mut runs = self.runs.lock();
                for (run_id, _) in &expired {
                    runs.remove(run_id);
                }
            }
            self.persist();
        }
        for (run_id, child_key) in &expired {
            tracing::info!(run_id = %run_id, "archived expired subagent run");
            if let Err(e) = self.gateway.delete_session(child_key, true).await {
                tracing::debug!(run_id = %run_id, error = %e, "session delete after archive failed");
            }
        }
        self.runs.lock().is_empty()
    }
}

#[cfg(test)]
#[path = "sweeper_tests.rs"]
mod tests;
