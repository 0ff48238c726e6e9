// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Restore persisted runs after process restart.

use super::Runtime;
use crate::adapters::{Announcer, Gateway};
use sk_core::{Clock, RunRecord};
use std::collections::hash_map::Entry;
use std::sync::atomic::Ordering;
use std::sync::Arc;

impl<G, N, C> Runtime<G, N, C>
where
    G: Gateway,
    N: Announcer,
    C: Clock,
{
    /// Load the snapshot and resume each restored record at the right point
    /// in its state machine. Runs once per process; later calls are no-ops.
    /// Records registered before this call win over persisted counterparts.
    pub async fn init_registry(self: &Arc<Self>) {
        if self.restored.swap(true, Ordering::SeqCst) {
            return;
        }
        let snapshot = self.store.load_or_default();
        if snapshot.is_empty() {
            return;
        }

        let restored: Vec<RunRecord> = {
            let mut runs = self.runs.lock();
            let mut restored = Vec::new();
            for (run_id, record) in snapshot {
                if let Entry::Vacant(slot) = runs.entry(run_id) {
                    slot.insert(record.clone());
                    restored.push(record);
                }
            }
            restored
        };
        self.persist();
        tracing::info!(count = restored.len(), "restored subagent runs from snapshot");

        let mut any_archive = false;
        for record in restored {
            if record.archive_at_ms.is_some() {
                any_archive = true;
            }
            if !self.resumed.lock().insert(record.run_id.clone()) {
                continue;
            }
            if record.is_cleanup_complete() {
                // Terminal; only the sweeper may still touch it.
                continue;
            }
            if record.has_ended() {
                // Crashed between terminal outcome and announce.
                self.finish_run(&record.run_id).await;
            } else {
                self.arm_wait_probe(&record.run_id);
            }
        }
        if any_archive {
            self.ensure_sweeper();
        }
    }
}

#[cfg(test)]
#[path = "restore_tests.rs"]
mod tests;
