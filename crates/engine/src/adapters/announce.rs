// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Announce adapter: delivers run summaries back to the requester session.

use async_trait::async_trait;
use sk_core::RunSummary;
use thiserror::Error;

/// Errors from announce delivery
#[derive(Debug, Error)]
pub enum AnnounceError {
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Adapter for announce delivery
#[async_trait]
pub trait Announcer: Clone + Send + Sync + 'static {
    /// Deliver the run summary to the requester; an error means the announce
    /// did not land and may be re-attempted later.
    async fn deliver(&self, summary: &RunSummary) -> Result<(), AnnounceError>;
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{AnnounceError, Announcer};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use sk_core::RunSummary;
    use std::sync::Arc;

    #[derive(Default)]
    struct Inner {
        delivered: Vec<RunSummary>,
        attempts: u32,
        fail_remaining: u32,
    }

    /// Fake announcer recording delivered summaries; failures can be scripted.
    #[derive(Clone, Default)]
    pub struct FakeAnnouncer {
        inner: Arc<Mutex<Inner>>,
    }

    impl FakeAnnouncer {
        pub fn new() -> Self {
            Self::default()
        }

        /// Summaries that were successfully delivered, in order.
        pub fn delivered(&self) -> Vec<RunSummary> {
            self.inner.lock().delivered.clone()
        }

        /// Total delivery attempts, including failures.
        pub fn attempts(&self) -> u32 {
            self.inner.lock().attempts
        }

        /// Make the next `n` deliveries fail.
        pub fn fail_times(&self, n: u32) {
            self.inner.lock().fail_remaining = n;
        }
    }

    #[async_trait]
    impl Announcer for FakeAnnouncer {
        async fn deliver(&self, summary: &RunSummary) -> Result<(), AnnounceError> {
            let mut inner = self.inner.lock();
            inner.attempts += 1;
            if inner.fail_remaining > 0 {
                inner.fail_remaining -= 1;
                return Err(AnnounceError::DeliveryFailed("scripted failure".to_string()));
            }
            inner.delivered.push(summary.clone());
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeAnnouncer;
