// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process configuration for the subagent engine.
//!
//! This is the `agents.defaults.subagents` section of the host CLI's config
//! file; the host deserializes it and hands it to the engine unchanged.

use crate::orchestration::OrchestrationOverrides;
use serde::{Deserialize, Serialize};

/// Configuration section `agents.defaults.subagents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubagentsConfig {
    /// Minutes until a run record is archived; `<= 0` disables archival.
    pub archive_after_minutes: i64,
    /// `agent.wait` timeout handed to the gateway, in seconds.
    pub wait_timeout_seconds: u64,
    /// Process-level orchestration policy, overlaid onto defaults.
    pub orchestration: OrchestrationOverrides,
}

impl Default for SubagentsConfig {
    fn default() -> Self {
        Self {
            archive_after_minutes: 60,
            wait_timeout_seconds: 600,
            orchestration: OrchestrationOverrides::default(),
        }
    }
}

impl SubagentsConfig {
    /// Archival lifetime in milliseconds, or `None` when archival is disabled.
    pub fn archive_after_ms(&self) -> Option<u64> {
        if self.archive_after_minutes <= 0 {
            None
        } else {
            Some(self.archive_after_minutes as u64 * 60_000)
        }
    }

    /// `agent.wait` timeout in milliseconds.
    pub fn wait_timeout_ms(&self) -> u64 {
        self.wait_timeout_seconds * 1_000
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
