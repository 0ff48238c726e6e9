// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle listener: maps agent-event bus signals onto run records.

use super::Runtime;
use crate::adapters::{Announcer, Gateway};
use sk_core::{AgentEvent, Clock, LifecyclePhase, RunOutcome};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

impl<G, N, C> Runtime<G, N, C>
where
    G: Gateway,
    N: Announcer,
    C: Clock,
{
    /// Consume bus deliveries until the channel closes or the engine shuts
    /// down. The host subscribes once per process and feeds every event in;
    /// filtering happens here.
    pub fn spawn_event_listener(
        self: &Arc<Self>,
        mut rx: mpsc::Receiver<AgentEvent>,
    ) -> JoinHandle<()> {
        let runtime = Arc::clone(self);
        let shutdown = self.shutdown_token();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    event = rx.recv() => match event {
                        Some(event) => runtime.handle_agent_event(event).await,
                        None => break,
                    },
                }
            }
        })
    }

    /// Apply one bus event. Only `lifecycle` events for registered runs act;
    /// records past cleanup ignore everything.
    pub async fn handle_agent_event(self: &Arc<Self>, event: AgentEvent) {
        if !event.is_lifecycle() {
            return;
        }
        let run_id = event.run_id.clone();
        let now = self.clock.epoch_ms();
        let terminal = {
            let mut runs = self.runs.lock();
            let Some(record) = runs.get_mut(&run_id) else { return };
            if record.is_cleanup_complete() {
                return;
            }
            match event.data.phase {
                LifecyclePhase::Start => {
                    let Some(started_at) = event.data.started_at else { return };
                    record.started_at = Some(started_at);
                    false
                }
                LifecyclePhase::End => {
                    record.ended_at = Some(event.data.ended_at.unwrap_or(now));
                    record.outcome = Some(RunOutcome::Ok);
                    true
                }
                LifecyclePhase::Error => {
                    record.ended_at = Some(event.data.ended_at.unwrap_or(now));
                    record.outcome = Some(RunOutcome::Error { error: event.data.error.clone() });
                    true
                }
            }
        };
        self.persist();
        if terminal {
            tracing::info!(run_id = %run_id, "subagent run reached a terminal outcome");
            self.handle_run_completion(&run_id).await;
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
