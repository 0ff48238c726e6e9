// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry and verification policy for subagent runs.
//!
//! The effective policy for a run is composed at registration time by
//! overlaying, highest precedence first: the per-call override, the process
//! configuration, and the hard-coded defaults. The result is snapshotted into
//! the record and is authoritative for the run's entire lifetime.

use serde::{Deserialize, Serialize};

/// Resolved orchestration policy, snapshotted into each run record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestrationConfig {
    pub retry_on_failure: bool,
    pub max_retries: u32,
    pub backoff_multiplier: f64,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub verify_completion: bool,
    /// Prompt for the built-in agent-backed verification; empty disables it.
    pub verification_prompt: String,
    pub verification_timeout_seconds: u64,
    pub retry_on_verification_failure: bool,
    /// Name of a registered verification hook; empty means built-in.
    pub verification_hook: String,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            retry_on_failure: false,
            max_retries: 3,
            backoff_multiplier: 2.0,
            initial_delay_ms: 1_000,
            max_delay_ms: 60_000,
            verify_completion: false,
            verification_prompt: String::new(),
            verification_timeout_seconds: 30,
            retry_on_verification_failure: true,
            verification_hook: String::new(),
        }
    }
}

impl OrchestrationConfig {
    /// Backoff delay in milliseconds for the next retry, where `completed`
    /// is the number of retries already completed (pre-increment count).
    pub fn backoff_delay_ms(&self, completed: u32) -> u64 {
        let raw = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(completed as i32);
        raw.min(self.max_delay_ms as f64) as u64
    }
}

/// Partial orchestration policy used for overlaying.
///
/// Both the process configuration and per-call overrides use this form; a
/// `None` field defers to the next layer down.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestrationOverrides {
    pub retry_on_failure: Option<bool>,
    pub max_retries: Option<u32>,
    pub backoff_multiplier: Option<f64>,
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub verify_completion: Option<bool>,
    pub verification_prompt: Option<String>,
    pub verification_timeout_seconds: Option<u64>,
    pub retry_on_verification_failure: Option<bool>,
    pub verification_hook: Option<String>,
}

impl OrchestrationOverrides {
    /// Overlay these overrides onto `base`, field by field.
    pub fn apply(&self, base: &OrchestrationConfig) -> OrchestrationConfig {
        OrchestrationConfig {
            retry_on_failure: self.retry_on_failure.unwrap_or(base.retry_on_failure),
            max_retries: self.max_retries.unwrap_or(base.max_retries),
            backoff_multiplier: self.backoff_multiplier.unwrap_or(base.backoff_multiplier),
            initial_delay_ms: self.initial_delay_ms.unwrap_or(base.initial_delay_ms),
            max_delay_ms: self.max_delay_ms.unwrap_or(base.max_delay_ms),
            verify_completion: self.verify_completion.unwrap_or(base.verify_completion),
            verification_prompt: self
                .verification_prompt
                .clone()
                .unwrap_or_else(|| base.verification_prompt.clone()),
            verification_timeout_seconds: self
                .verification_timeout_seconds
                .unwrap_or(base.verification_timeout_seconds),
            retry_on_verification_failure: self
                .retry_on_verification_failure
                .unwrap_or(base.retry_on_verification_failure),
            verification_hook: self
                .verification_hook
                .clone()
                .unwrap_or_else(|| base.verification_hook.clone()),
        }
    }
}

/// Compose the effective policy for a run registration.
///
/// Precedence: per-call override, then process configuration, then defaults.
pub fn resolve_orchestration(
    call: Option<&OrchestrationOverrides>,
    process: &OrchestrationOverrides,
) -> OrchestrationConfig {
    let base = process.apply(&OrchestrationConfig::default());
    match call {
        Some(overrides) => overrides.apply(&base),
        None => base,
    }
}

#[cfg(test)]
#[path = "orchestration_tests.rs"]
mod tests;
