// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot persistence for the run registry.
//!
//! The registry is small (one record per active run), so every persisting
//! mutation rewrites the whole document: `<state_dir>/subagents/runs.json`
//! with a schema version and a `runs` map. Writes go to a temp file followed
//! by a rename, so the previous good snapshot survives a crash mid-write.

use serde::{Deserialize, Serialize};
use sk_core::{RunId, RunRecord};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current snapshot schema version
pub const SNAPSHOT_VERSION: u32 = 2;

/// Errors that can occur in snapshot operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk document: `{"version": 2, "runs": {"<runId>": {...}}}`.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDoc {
    version: u32,
    #[serde(default)]
    runs: serde_json::Map<String, serde_json::Value>,
}

/// Store for the run snapshot under `<state_dir>/subagents/runs.json`.
#[derive(Debug, Clone)]
pub struct RunStore {
    path: PathBuf,
}

impl RunStore {
    pub fn new(state_dir: &Path) -> Self {
        Self { path: state_dir.join("subagents").join("runs.json") }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot.
    ///
    /// A missing file yields an empty map. Records that fail to deserialize
    /// are skipped with a warning. Version-1 documents load the same way:
    /// fields the current schema does not know land in each record's `extra`
    /// map and are written back verbatim.
    pub fn load(&self) -> Result<HashMap<RunId, RunRecord>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };
        let doc: SnapshotDoc = serde_json::from_str(&raw)?;
        if doc.version != SNAPSHOT_VERSION {
            tracing::info!(version = doc.version, "migrating runs snapshot schema");
        }
        let mut runs = HashMap::new();
        for (key, value) in doc.runs {
            match serde_json::from_value::<RunRecord>(value) {
                Ok(record) => {
                    runs.insert(RunId::new(key), record);
                }
                Err(e) => {
                    tracing::warn!(run_id = %key, error = %e, "skipping malformed run record");
                }
            }
        }
        Ok(runs)
    }

    /// Load, absorbing errors into an empty map. Startup path.
    pub fn load_or_default(&self) -> HashMap<RunId, RunRecord> {
        match self.load() {
            Ok(runs) => runs,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to load runs snapshot");
                HashMap::new()
            }
        }
    }

    /// Replace the snapshot with the given records, atomically.
    pub fn persist(&self, runs: &HashMap<RunId, RunRecord>) -> Result<(), StoreError> {
        let mut map = serde_json::Map::new();
        for (run_id, record) in runs {
            map.insert(run_id.as_str().to_string(), serde_json::to_value(record)?);
        }
        let doc = SnapshotDoc { version: SNAPSHOT_VERSION, runs: map };
        let body = serde_json::to_string_pretty(&doc)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
