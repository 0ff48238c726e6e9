// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Verification pipeline: optional post-success check.
//!
//! When a run ends `ok` and its policy asks for verification, the engine
//! runs either a named, registered hook or the built-in agent-backed check
//! (an `agent.query` against the child session asking it to confirm
//! completion). A failed verdict can downgrade the outcome to a
//! retry-eligible failure.

use super::Runtime;
use crate::adapters::{Announcer, Gateway};
use async_trait::async_trait;
use sk_core::{Clock, RunId, RunOutcome, RunRecord, VerificationStatus};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Longest reply excerpt carried into a failure reason.
const REASON_EXCERPT_CHARS: usize = 200;

/// Error raised by a verification hook; converted to a failed verdict with
/// the message as reason.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("{0}")]
    Failed(String),
}

/// Input handed to a verification hook.
#[derive(Debug, Clone)]
pub struct HookInput {
    pub run_id: RunId,
    pub task: String,
    pub outcome: Option<RunOutcome>,
    pub record: RunRecord,
}

/// Verdict returned by a verification hook.
#[derive(Debug, Clone)]
pub struct HookVerdict {
    pub passed: bool,
    pub reason: Option<String>,
}

/// A named, externally registered verification function.
#[async_trait]
pub trait VerificationHook: Send + Sync {
    async fn verify(&self, input: HookInput) -> Result<HookVerdict, HookError>;
}

/// Outcome of verdict selection and classification.
#[derive(Debug)]
enum Verdict {
    Passed(Option<String>),
    Failed(String),
    /// The named hook was not registered; treated as passed.
    Skipped,
}

impl<G, N, C> Runtime<G, N, C>
where
    G: Gateway,
    N: Announcer,
    C: Clock,
{
    /// Register a verification hook under a name, replacing any previous one.
    pub fn register_hook(&self, name: impl Into<String>, hook: Arc<dyn VerificationHook>) {
        self.hooks.lock().insert(name.into(), hook);
    }

    /// Remove a named hook; returns whether it existed.
    pub fn unregister_hook(&self, name: &str) -> bool {
        self.hooks.lock().remove(name).is_some()
    }

    /// Run verification unless one is already in flight for this run.
    pub(crate) async fn run_verification(self: &Arc<Self>, run_id: &RunId) {
        if !self.pending_verifications.lock().insert(run_id.clone()) {
            return;
        }
        self.verify_run(run_id).await;
        self.pending_verifications.lock().remove(run_id);
    }

    async fn verify_run(self: &Arc<Self>, run_id: &RunId) {
        let Some(record) = self.get_run(run_id) else { return };
        let verdict = self.compute_verdict(&record).await;
        match verdict {
            Verdict::Passed(reason) => {
                if let Some(reason) = reason {
                    tracing::debug!(run_id = %run_id, reason = %reason, "verification passed");
                }
                self.update_run(run_id, |r| {
                    r.verification_attempted = true;
                    r.verification_result = Some(VerificationStatus::Passed);
                });
                self.finish_run(run_id).await;
            }
            Verdict::Skipped => {
                self.update_run(run_id, |r| {
                    r.verification_attempted = true;
                    r.verification_result = Some(VerificationStatus::Skipped);
                });
                self.finish_run(run_id).await;
            }
            Verdict::Failed(reason) => {
                tracing::info!(run_id = %run_id, reason = %reason, "verification failed");
                let downgrade = record.orchestration_config.retry_on_verification_failure;
                self.update_run(run_id, |r| {
                    r.verification_attempted = true;
                    r.verification_result = Some(VerificationStatus::Failed);
                    if downgrade {
                        // Re-enters the failure path so retry policy applies.
                        r.outcome =
                            Some(RunOutcome::failure(format!("Verification failed: {reason}")));
                    }
                });
                if downgrade {
                    if let Some(record) = self.get_run(run_id) {
                        if self.should_retry(&record) {
                            self.spawn_retry(run_id);
                            return;
                        }
                    }
                }
                self.finish_run(run_id).await;
            }
        }
    }

    async fn compute_verdict(&self, record: &RunRecord) -> Verdict {
        let policy = &record.orchestration_config;
        let timeout = Duration::from_millis(policy.verification_timeout_seconds * 1_000);

        if !policy.verification_hook.is_empty() {
            let hook = self.hooks.lock().get(&policy.verification_hook).cloned();
            let Some(hook) = hook else {
                tracing::warn!(
                    run_id = %record.run_id,
                    hook = %policy.verification_hook,
                    "verification hook not registered; skipping"
                );
                return Verdict::Skipped;
            };
            let input = HookInput {
                run_id: record.run_id.clone(),
                task: record.task.clone(),
                outcome: record.outcome.clone(),
                record: record.clone(),
            };
            return match tokio::time::timeout(timeout, hook.verify(input)).await {
                Ok(Ok(verdict)) if verdict.passed => Verdict::Passed(verdict.reason),
                Ok(Ok(verdict)) => Verdict::Failed(
                    verdict
                        .reason
                        .unwrap_or_else(|| "verification hook rejected the run".to_string()),
                ),
                Ok(Err(e)) => Verdict::Failed(e.to_string()),
                Err(_) => Verdict::Failed(format!(
                    "verification hook timed out after {}s",
                    policy.verification_timeout_seconds
                )),
            };
        }

        if let Some(outcome) = &record.outcome {
            if outcome.is_error() {
                return Verdict::Failed(outcome.error().unwrap_or("Unknown error").to_string());
            }
        }

        if !policy.verification_prompt.is_empty() {
            return self.verify_with_agent(record, timeout).await;
        }

        Verdict::Passed(None)
    }

    async fn verify_with_agent(&self, record: &RunRecord, timeout: Duration) -> Verdict {
        let prompt =
            verification_query(&record.task, &record.orchestration_config.verification_prompt);
        match self.gateway.query_session(&record.child_session_key, &prompt, timeout).await {
            Ok(reply) => classify_reply(reply.as_deref()),
            Err(e) => Verdict::Failed(format!("verification query failed: {e}")),
        }
    }
}

/// Compose the built-in confirmation prompt.
fn verification_query(task: &str, verification_prompt: &str) -> String {
    format!(
        "You were asked to complete this task:\n\
         \n\
         {task}\n\
         \n\
         {verification_prompt}\n\
         \n\
         Did you complete the task successfully? Start your reply with \
         \"yes\" or \"no\" and explain briefly."
    )
}

/// Classify the agent's confirmation reply.
fn classify_reply(reply: Option<&str>) -> Verdict {
    let Some(reply) = reply else {
        return Verdict::Passed(Some("unclear response".to_string()));
    };
    let normalized = reply.trim().to_lowercase();
    if normalized.starts_with("yes") || normalized.contains("completed successfully") {
        return Verdict::Passed(None);
    }
    if normalized.starts_with("no")
        || normalized.contains("failed")
        || normalized.contains("incomplete")
    {
        let excerpt: String = reply.trim().chars().take(REASON_EXCERPT_CHARS).collect();
        return Verdict::Failed(excerpt);
    }
    Verdict::Passed(Some("unclear response".to_string()))
}

#[cfg(test)]
#[path = "verify_tests.rs"]
mod tests;
