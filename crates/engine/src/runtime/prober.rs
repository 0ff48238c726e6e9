// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wait prober: cross-process completion fallback.
//!
//! A subagent may run in a process that never sees our in-process lifecycle
//! events. Each registered run therefore also gets one `agent.wait` RPC
//! against the gateway; whichever signal lands first wins, and the cleanup
//! guard keeps the loser from re-opening terminal housekeeping.

use super::Runtime;
use crate::adapters::{Announcer, Gateway, WaitReply};
use sk_core::{Clock, RunId, RunOutcome};
use std::sync::Arc;
use std::time::Duration;

impl<G, N, C> Runtime<G, N, C>
where
    G: Gateway,
    N: Announcer,
    C: Clock,
{
    /// Launch a one-shot `agent.wait` probe for the run.
    pub(crate) fn arm_wait_probe(self: &Arc<Self>, run_id: &RunId) {
        let runtime = Arc::clone(self);
        let run_id = run_id.clone();
        let shutdown = self.shutdown_token();
        let timeout_ms = self.subagents.wait_timeout_ms();
        tokio::spawn(async move {
            // Outer deadline survives gateway-side jitter.
            let deadline = Duration::from_millis(timeout_ms + 10_000);
            let wait = runtime.gateway.wait_for_run(&run_id, timeout_ms);
            let reply = tokio::select! {
                _ = shutdown.cancelled() => return,
                reply = tokio::time::timeout(deadline, wait) => reply,
            };
            match reply {
                Ok(Ok(reply)) => runtime.apply_wait_reply(&run_id, reply).await,
                Ok(Err(e)) => {
                    tracing::warn!(run_id = %run_id, error = %e, "agent.wait probe failed");
                }
                Err(_) => {
                    tracing::debug!(run_id = %run_id, "agent.wait probe deadline elapsed");
                }
            }
        });
    }

    /// Apply a wait reply as a terminal transition, mirroring the listener.
    /// Timestamps are last-writer-wins between the two paths.
    pub(crate) async fn apply_wait_reply(self: &Arc<Self>, run_id: &RunId, reply: WaitReply) {
        let outcome = match reply.status.as_str() {
            "ok" => RunOutcome::Ok,
            "error" => RunOutcome::Error { error: reply.error.clone() },
            other => {
                tracing::debug!(run_id = %run_id, status = other, "ignoring agent.wait status");
                return;
            }
        };
        let now = self.clock.epoch_ms();
        {
            let mut runs = self.runs.lock();
            let Some(record) = runs.get_mut(run_id) else { return };
            if record.is_cleanup_complete() {
                return;
            }
            // Another path already began cleanup; do not reopen it.
            if record.cleanup_handled {
                return;
            }
            if let Some(started_at) = reply.started_at {
                record.started_at = Some(started_at);
            }
            record.ended_at = Some(reply.ended_at.unwrap_or(now));
            record.outcome = Some(outcome);
        }
        self.persist();
        self.handle_run_completion(run_id).await;
    }
}

#[cfg(test)]
#[path = "prober_tests.rs"]
mod tests;
