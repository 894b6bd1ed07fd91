// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fixed-delay retry policy shared by the bootstrap functions.
//!
//! Each function names its own ceiling and delay; the loop itself is the same
//! everywhere. Delays are constant (no backoff, no jitter) and nothing sleeps
//! after the final attempt.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Retry ceiling and delay for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Sleep between consecutive attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Connection URL populator: 5 attempts, 5 s apart.
    pub const DB_URL: Self = Self::fixed(5, Duration::from_secs(5));

    /// Extension enabler: 10 attempts, 10 s apart.
    pub const EXTENSION: Self = Self::fixed(10, Duration::from_secs(10));

    /// Reflect job: 3 attempts, 5 s apart.
    pub const REFLECT: Self = Self::fixed(3, Duration::from_secs(5));

    /// A policy with a fixed delay.
    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Same ceiling, different delay.
    pub const fn with_delay(self, delay: Duration) -> Self {
        Self { delay, ..self }
    }

    /// Run `op` until it succeeds, fails with an error `retryable` rejects,
    /// or the ceiling is reached. The closure receives the 1-based attempt
    /// number. The last error is returned unchanged.
    pub async fn run<T, E, F, Fut, P>(
        &self,
        operation: &str,
        mut op: F,
        retryable: P,
    ) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if attempt < max_attempts && retryable(&e) => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_secs = self.delay.as_secs_f64(),
                        error = %e,
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
