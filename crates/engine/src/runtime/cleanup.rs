// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cleanup and announce: at-most-once terminal housekeeping per run.

use super::Runtime;
use crate::adapters::{Announcer, Gateway};
use sk_core::{CleanupPolicy, Clock, RunId};
use std::sync::Arc;
use std::time::Duration;

/// Timeout for announce delivery.
const ANNOUNCE_TIMEOUT: Duration = Duration::from_secs(30);

impl<G, N, C> Runtime<G, N, C>
where
    G: Gateway,
    N: Announcer,
    C: Clock,
{
    /// Atomically claim cleanup for a run.
    ///
    /// Returns true only when the record exists, has not completed cleanup,
    /// and no other caller holds the claim; the claim itself is the
    /// `cleanup_handled` flag. Callers that get false must not proceed.
    pub(crate) fn begin_cleanup(&self, run_id: &RunId) -> bool {
        {
            let mut runs = self.runs.lock();
            let Some(record) = runs.get_mut(run_id) else { return false };
            if record.is_cleanup_complete() || record.cleanup_handled {
                return false;
            }
            record.cleanup_handled = true;
        }
        self.persist();
        true
    }

    /// Announce the run summary and finalize the record.
    pub(crate) async fn finish_run(self: &Arc<Self>, run_id: &RunId) {
        if !self.begin_cleanup(run_id) {
            return;
        }
        let Some(record) = self.get_run(run_id) else { return };
        let summary = record.summary();
        let delivered =
            match tokio::time::timeout(ANNOUNCE_TIMEOUT, self.announcer.deliver(&summary)).await {
                Ok(Ok(())) => true,
                Ok(Err(e)) => {
                    tracing::warn!(run_id = %run_id, error = %e, "announce failed");
                    false
                }
                Err(_) => {
                    tracing::warn!(run_id = %run_id, "announce timed out");
                    false
                }
            };

        if record.cleanup == CleanupPolicy::Delete {
            // The child session goes away with the record.
            if let Err(e) = self.gateway.delete_session(&record.child_session_key, true).await {
                tracing::warn!(run_id = %run_id, error = %e, "failed to delete child session");
            }
            self.runs.lock().remove(run_id);
            self.persist();
            tracing::info!(run_id = %run_id, "subagent run announced and deleted");
        } else if !delivered {
            // Release the claim so a later signal can retry the announce.
            self.update_run(run_id, |r| r.cleanup_handled = false);
        } else {
            let now = self.clock.epoch_ms();
            self.update_run(run_id, |r| r.cleanup_completed_at = Some(now));
            tracing::info!(run_id = %run_id, "subagent run announced");
        }
    }
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod tests;
