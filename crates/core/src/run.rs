// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run identifiers and the persistent run record.
//!
//! A "run" is a single invocation of a child agent for a task. `RunRecord` is
//! the engine's only persisted entity: one record per run, serialized with the
//! camelCase property names of the on-disk snapshot. Fields the engine does
//! not recognise survive a load/persist round-trip through `extra`.

use crate::orchestration::OrchestrationConfig;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Unique identifier for a subagent run.
///
/// Chosen by the caller at registration and opaque to the engine. Retry
/// dispatches use derived `{run_id}-retry-{n}` ids on the gateway, but all
/// engine state stays keyed by the original id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    /// Create a new RunId from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string value of this RunId.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derived gateway id for retry attempt `n` of this run.
    pub fn retry_id(&self, attempt: u32) -> RunId {
        RunId(format!("{}-retry-{}", self.0, attempt))
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RunId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for RunId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for RunId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for RunId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Latest terminal outcome of a run.
///
/// Wire form is `{"status":"ok"}` or `{"status":"error","error":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RunOutcome {
    Ok,
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl RunOutcome {
    /// Error outcome carrying a message.
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Error { error: Some(error.into()) }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Error message, if this is an error outcome that carries one.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Ok => None,
            Self::Error { error } => error.as_deref(),
        }
    }
}

/// Post-announce policy for the child session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupPolicy {
    /// Delete the child session and drop the record once announced.
    Delete,
    /// Keep the child session; the record lives until archived.
    #[default]
    Keep,
}

impl fmt::Display for CleanupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delete => write!(f, "delete"),
            Self::Keep => write!(f, "keep"),
        }
    }
}

/// Latest verification verdict for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Passed,
    Failed,
    /// No verification ran (e.g. the named hook was not registered);
    /// treated as passed.
    Skipped,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Persistent orchestration state for a single run.
///
/// All timestamps are epoch milliseconds. Only `run_id`, `child_session_key`
/// and `task` are required on load; everything else defaults so that older
/// snapshot schemas deserialize into a usable record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub run_id: RunId,
    /// Child agent session, as known to the gateway.
    pub child_session_key: String,
    /// Parent session; announce target.
    #[serde(default)]
    pub requester_session_key: String,
    /// Normalised transport/context tag for announce delivery.
    #[serde(default)]
    pub requester_origin: String,
    /// Human-readable requester label used in announce text.
    #[serde(default)]
    pub requester_display_key: String,
    /// Original prompt text.
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub cleanup: CleanupPolicy,
    #[serde(default)]
    pub created_at: u64,
    /// First `start` lifecycle event; updated again on retry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    /// Present once the run has terminated at least once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<RunOutcome>,
    /// Archival deadline; absent means the record is never archived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_at_ms: Option<u64>,
    /// Guard: cleanup (announce + finalize) is in flight or done.
    #[serde(default)]
    pub cleanup_handled: bool,
    /// Set-once; presence makes the record terminal for all signals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleanup_completed_at: Option<u64>,
    #[serde(default)]
    pub retry_count: u32,
    /// Snapshot of `max_retries` policy at registration.
    #[serde(default)]
    pub max_retries: u32,
    /// Backoff deadline for the currently scheduled retry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_retry_at: Option<u64>,
    #[serde(default)]
    pub is_retry: bool,
    /// Set together with `verification_result` when verification ran to
    /// completion.
    #[serde(default)]
    pub verification_attempted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_result: Option<VerificationStatus>,
    /// Policy snapshot taken at registration; never mutated afterwards.
    #[serde(default)]
    pub orchestration_config: OrchestrationConfig,
    /// Fields from other schema versions, preserved verbatim on round-trip.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RunRecord {
    /// Cleanup has run to completion; the record ignores all further signals.
    pub fn is_cleanup_complete(&self) -> bool {
        self.cleanup_completed_at.is_some()
    }

    /// The run has a terminal outcome recorded for the current attempt.
    pub fn has_ended(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Build the announce payload for this record.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id.clone(),
            child_session_key: self.child_session_key.clone(),
            requester_session_key: self.requester_session_key.clone(),
            requester_origin: self.requester_origin.clone(),
            requester_display_key: self.requester_display_key.clone(),
            task: self.task.clone(),
            label: self.label.clone(),
            created_at: self.created_at,
            started_at: self.started_at,
            ended_at: self.ended_at,
            outcome: self.outcome.clone(),
            retry_count: self.retry_count,
            verification_result: self.verification_result,
        }
    }
}

/// Run summary delivered to the requester session on announce.
///
/// Carries keys, never object references; the requester resolves them
/// against its own session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: RunId,
    pub child_session_key: String,
    pub requester_session_key: String,
    pub requester_origin: String,
    pub requester_display_key: String,
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<RunOutcome>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_result: Option<VerificationStatus>,
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
