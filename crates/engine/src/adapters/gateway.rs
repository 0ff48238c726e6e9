// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gateway RPC adapter.
//!
//! The gateway is the external endpoint that manages agent lifecycles. The
//! engine uses four of its methods: `agent.start`, `agent.query`,
//! `agent.wait`, and `sessions.delete`, each with a caller-provided timeout.

use async_trait::async_trait;
use sk_core::RunId;
use std::time::Duration;
use thiserror::Error;

/// Errors from gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway call failed: {0}")]
    CallFailed(String),
    #[error("gateway call timed out")]
    Timeout,
}

/// Reply to an `agent.wait` call.
///
/// `status` values other than `"ok"` and `"error"` (e.g. a gateway-side
/// timeout marker) are ignored by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitReply {
    pub status: String,
    pub started_at: Option<u64>,
    pub ended_at: Option<u64>,
    pub error: Option<String>,
}

impl WaitReply {
    pub fn ok(started_at: Option<u64>, ended_at: Option<u64>) -> Self {
        Self { status: "ok".to_string(), started_at, ended_at, error: None }
    }

    pub fn error(error: impl Into<String>, ended_at: Option<u64>) -> Self {
        Self {
            status: "error".to_string(),
            started_at: None,
            ended_at,
            error: Some(error.into()),
        }
    }
}

/// Adapter for the gateway RPC surface
#[async_trait]
pub trait Gateway: Clone + Send + Sync + 'static {
    /// `agent.start`: launch a run on a child session.
    async fn start_run(
        &self,
        key: &str,
        prompt: &str,
        run_id: &RunId,
        timeout: Duration,
    ) -> Result<(), GatewayError>;

    /// `agent.query`: one-shot prompt against a child session; returns the
    /// reply text when the agent produced one.
    async fn query_session(
        &self,
        key: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<Option<String>, GatewayError>;

    /// `agent.wait`: block until the run completes or `timeout_ms` elapses
    /// gateway-side.
    async fn wait_for_run(&self, run_id: &RunId, timeout_ms: u64)
        -> Result<WaitReply, GatewayError>;

    /// `sessions.delete`: delete a child session.
    async fn delete_session(&self, key: &str, delete_transcript: bool) -> Result<(), GatewayError>;
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{Gateway, GatewayError, WaitReply};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use sk_core::RunId;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;
    use std::time::Duration;

    /// Recorded gateway call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum GatewayCall {
        Start { key: String, prompt: String, run_id: RunId },
        Query { key: String, prompt: String },
        Wait { run_id: RunId, timeout_ms: u64 },
        DeleteSession { key: String, delete_transcript: bool },
    }

    #[derive(Default)]
    struct Inner {
        calls: Vec<GatewayCall>,
        wait_replies: HashMap<RunId, VecDeque<WaitReply>>,
        query_replies: VecDeque<Option<String>>,
        fail_start: bool,
        fail_query: bool,
    }

    /// Fake gateway recording calls with scripted replies.
    ///
    /// `agent.wait` pends forever unless a reply was scripted for the run id
    /// before the probe was armed, mimicking a run that never completes.
    #[derive(Clone, Default)]
    pub struct FakeGateway {
        inner: Arc<Mutex<Inner>>,
    }

    impl FakeGateway {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<GatewayCall> {
            self.inner.lock().calls.clone()
        }

        /// `(run_id, prompt)` of every `agent.start` call, in order.
        pub fn started_runs(&self) -> Vec<(RunId, String)> {
            self.inner
                .lock()
                .calls
                .iter()
                .filter_map(|call| match call {
                    GatewayCall::Start { run_id, prompt, .. } => {
                        Some((run_id.clone(), prompt.clone()))
                    }
                    _ => None,
                })
                .collect()
        }

        /// Session keys passed to `sessions.delete`, in order.
        pub fn deleted_sessions(&self) -> Vec<String> {
            self.inner
                .lock()
                .calls
                .iter()
                .filter_map(|call| match call {
                    GatewayCall::DeleteSession { key, .. } => Some(key.clone()),
                    _ => None,
                })
                .collect()
        }

        /// Number of `agent.wait` probes issued for the run.
        pub fn wait_count(&self, run_id: &RunId) -> usize {
            self.inner
                .lock()
                .calls
                .iter()
                .filter(|call| matches!(call, GatewayCall::Wait { run_id: id, .. } if id == run_id))
                .count()
        }

        pub fn push_wait_reply(&self, run_id: impl Into<RunId>, reply: WaitReply) {
            self.inner.lock().wait_replies.entry(run_id.into()).or_default().push_back(reply);
        }

        pub fn push_query_reply(&self, reply: Option<&str>) {
            self.inner.lock().query_replies.push_back(reply.map(str::to_string));
        }

        pub fn set_fail_start(&self, fail: bool) {
            self.inner.lock().fail_start = fail;
        }

        pub fn set_fail_query(&self, fail: bool) {
            self.inner.lock().fail_query = fail;
        }
    }

    #[async_trait]
    impl Gateway for FakeGateway {
        async fn start_run(
            &self,
            key: &str,
            prompt: &str,
            run_id: &RunId,
            _timeout: Duration,
        ) -> Result<(), GatewayError> {
            let fail = {
                let mut inner = self.inner.lock();
                inner.calls.push(GatewayCall::Start {
                    key: key.to_string(),
                    prompt: prompt.to_string(),
                    run_id: run_id.clone(),
                });
                inner.fail_start
            };
            if fail {
                return Err(GatewayError::CallFailed("start refused".to_string()));
            }
            Ok(())
        }

        async fn query_session(
            &self,
            key: &str,
            prompt: &str,
            _timeout: Duration,
        ) -> Result<Option<String>, GatewayError> {
            let (fail, reply) = {
                let mut inner = self.inner.lock();
                inner.calls.push(GatewayCall::Query {
                    key: key.to_string(),
                    prompt: prompt.to_string(),
                });
                (inner.fail_query, inner.query_replies.pop_front().flatten())
            };
            if fail {
                return Err(GatewayError::CallFailed("query refused".to_string()));
            }
            Ok(reply)
        }

        async fn wait_for_run(
            &self,
            run_id: &RunId,
            timeout_ms: u64,
        ) -> Result<WaitReply, GatewayError> {
            let reply = {
                let mut inner = self.inner.lock();
                inner
                    .calls
                    .push(GatewayCall::Wait { run_id: run_id.clone(), timeout_ms });
                inner.wait_replies.get_mut(run_id).and_then(VecDeque::pop_front)
            };
            match reply {
                Some(reply) => Ok(reply),
                None => std::future::pending().await,
            }
        }

        async fn delete_session(
            &self,
            key: &str,
            delete_transcript: bool,
        ) -> Result<(), GatewayError> {
            self.inner.lock().calls.push(GatewayCall::DeleteSession {
                key: key.to_string(),
                delete_transcript,
            });
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeGateway, GatewayCall};
