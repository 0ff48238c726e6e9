// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry scheduler: backoff, prompt rewriting, re-dispatch.
//!
//! A failed run that still has retry budget sleeps out its backoff, then is
//! re-spawned on the same child session under a derived run id with a prompt
//! that carries the previous error. The original record keeps all state;
//! only per-attempt fields reset.

use super::Runtime;
use crate::adapters::{Announcer, Gateway};
use sk_core::{Clock, RunId, RunRecord};
use std::sync::Arc;
use std::time::Duration;

/// Timeout for the `agent.start` retry dispatch.
const START_TIMEOUT: Duration = Duration::from_secs(30);

impl<G, N, C> Runtime<G, N, C>
where
    G: Gateway,
    N: Announcer,
    C: Clock,
{
    /// A failed run is eligible for another attempt.
    pub(crate) fn should_retry(&self, record: &RunRecord) -> bool {
        record.orchestration_config.retry_on_failure
            && record.retry_count < record.max_retries
            && record.outcome.as_ref().is_some_and(|o| o.is_error())
    }

    /// Schedule a retry unless one is already in flight for this run.
    pub(crate) fn spawn_retry(self: &Arc<Self>, run_id: &RunId) {
        if !self.pending_retries.lock().insert(run_id.clone()) {
            return;
        }
        let runtime = Arc::clone(self);
        let run_id = run_id.clone();
        let shutdown = self.shutdown_token();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = runtime.run_retry(&run_id) => {}
            }
            runtime.pending_retries.lock().remove(&run_id);
        });
    }

    async fn run_retry(self: &Arc<Self>, run_id: &RunId) {
        let Some(record) = self.get_run(run_id) else { return };
        // Backoff uses the number of retries already completed.
        let delay =
            Duration::from_millis(record.orchestration_config.backoff_delay_ms(record.retry_count));
        let attempt = record.retry_count + 1;
        let previous_error = record
            .outcome
            .as_ref()
            .and_then(|o| o.error())
            .unwrap_or("Unknown error")
            .to_string();

        let next_retry_at = self.clock.epoch_ms() + delay.as_millis() as u64;
        if !self.update_run(run_id, |r| {
            r.retry_count = attempt;
            r.next_retry_at = Some(next_retry_at);
        }) {
            return;
        }
        tracing::info!(
            run_id = %run_id,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "retry scheduled"
        );

        tokio::time::sleep(delay).await;

        // The record may have been released or finished while we slept.
        let Some(record) = self.get_run(run_id) else { return };
        if record.is_cleanup_complete() {
            return;
        }

        let prompt = retry_prompt(&record.task, &previous_error, attempt, record.max_retries);

        let started_at = self.clock.epoch_ms();
        if !self.update_run(run_id, |r| {
            r.ended_at = None;
            r.outcome = None;
            r.cleanup_handled = false;
            r.started_at = Some(started_at);
            r.is_retry = true;
        }) {
            return;
        }

        let retry_run_id = run_id.retry_id(attempt);
        if let Err(e) = self
            .gateway
            .start_run(&record.child_session_key, &prompt, &retry_run_id, START_TIMEOUT)
            .await
        {
            // Leave the reset record in place; the next completion signal
            // re-evaluates policy.
            tracing::warn!(run_id = %run_id, error = %e, "retry dispatch failed");
        }
        // Terminal signals for the new attempt still arrive under the
        // original run id.
        self.arm_wait_probe(run_id);
    }
}

/// Compose the retry prompt handed to the re-spawned agent.
pub(crate) fn retry_prompt(
    task: &str,
    previous_error: &str,
    attempt: u32,
    max_retries: u32,
) -> String {
    format!(
        "[RETRY ATTEMPT {attempt}/{max_retries}]\n\
         \n\
         The previous attempt failed with this error:\n\
         \n\
         ```\n\
         {previous_error}\n\
         ```\n\
         \n\
         Take a different approach this time. Consider what went wrong and \
         adjust your strategy before starting over.\n\
         \n\
         Original task:\n\
         \n\
         ```\n\
         {task}\n\
         ```\n\
         \n\
         Complete the original task, avoiding the failure above."
    )
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
