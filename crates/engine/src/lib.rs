// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sk-engine: Subagent orchestration engine for the Sidekick CLI
//!
//! Manages child agent "runs" spawned on behalf of a parent session: a
//! persisted registry of run records, a lifecycle listener fed by the
//! agent-event bus, a cross-process wait prober, an exponential-backoff retry
//! scheduler with prompt rewriting, an optional verification step that can
//! downgrade a success into a retry-eligible failure, at-most-once
//! announce-and-cleanup, time-based archival, and crash-recovery resume.
//!
//! The child agent itself lives behind the [`Gateway`] adapter; announce
//! delivery lives behind [`Announcer`]. The engine never crashes the
//! surrounding process: gateway, announce, and persistence failures are
//! logged and absorbed.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod env;
pub mod runtime;
pub mod storage;


pub use adapters::{AnnounceError, Announcer, Gateway, GatewayError, WaitReply};
pub use runtime::{
    HookError, HookInput, HookVerdict, RegisterParams, Runtime, RuntimeConfig, RuntimeDeps,
    VerificationHook,
};
pub use storage::{RunStore, StoreError, SNAPSHOT_VERSION};

#[cfg(any(test, feature = "test-support"))]
pub use adapters::{FakeAnnouncer, FakeGateway, GatewayCall};
