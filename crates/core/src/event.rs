// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent-event bus payloads consumed by the lifecycle listener.
//!
//! The bus multiplexes several streams; the engine only acts on
//! `stream == "lifecycle"` events addressed to a registered run id.

use crate::run::RunId;
use serde::{Deserialize, Serialize};

/// Stream tag of lifecycle events.
pub const LIFECYCLE_STREAM: &str = "lifecycle";

/// Lifecycle phase reported by the child agent runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    Start,
    End,
    Error,
}

/// Payload of a lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleData {
    pub phase: LifecyclePhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One event delivered by the agent-event bus subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEvent {
    pub stream: String,
    pub run_id: RunId,
    pub data: LifecycleData,
}

impl AgentEvent {
    pub fn is_lifecycle(&self) -> bool {
        self.stream == LIFECYCLE_STREAM
    }

    /// Lifecycle `start` event.
    pub fn started(run_id: impl Into<RunId>, started_at: Option<u64>) -> Self {
        Self {
            stream: LIFECYCLE_STREAM.to_string(),
            run_id: run_id.into(),
            data: LifecycleData {
                phase: LifecyclePhase::Start,
                started_at,
                ended_at: None,
                error: None,
            },
        }
    }

    /// Lifecycle `end` event.
    pub fn ended(run_id: impl Into<RunId>, ended_at: Option<u64>) -> Self {
        Self {
            stream: LIFECYCLE_STREAM.to_string(),
            run_id: run_id.into(),
            data: LifecycleData {
                phase: LifecyclePhase::End,
                started_at: None,
                ended_at,
                error: None,
            },
        }
    }

    /// Lifecycle `error` event.
    pub fn errored(
        run_id: impl Into<RunId>,
        error: impl Into<String>,
        ended_at: Option<u64>,
    ) -> Self {
        Self {
            stream: LIFECYCLE_STREAM.to_string(),
            run_id: run_id.into(),
            data: LifecycleData {
                phase: LifecyclePhase::Error,
                started_at: None,
                ended_at,
                error: Some(error.into()),
            },
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
