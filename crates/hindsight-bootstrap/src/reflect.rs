// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Scheduled reflect job.
//!
//! Asks the memory service to consolidate recent experiences for one memory
//! bank. Client errors (4xx) are returned immediately; server errors and
//! connection failures are retried with a fixed delay because the load
//! balancer may not be ready yet.

use serde::Serialize;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

/// Default memory bank.
pub const DEFAULT_BANK_ID: &str = "johnny-robot";

/// Default consolidation instruction.
pub const DEFAULT_QUERY: &str =
    "Summarize recent learnings and update opinions based on new experiences.";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Reflect job settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectConfig {
    /// Base URL of the memory service.
    pub api_url: String,
    /// Memory bank to reflect on.
    pub bank_id: String,
    /// Instruction sent to the service.
    pub query: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry ceiling and delay.
    pub retry: RetryPolicy,
}

impl ReflectConfig {
    /// Settings for `api_url` with every other field defaulted.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            bank_id: DEFAULT_BANK_ID.to_string(),
            query: DEFAULT_QUERY.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::REFLECT,
        }
    }

    /// Load settings from environment variables.
    ///
    /// `HINDSIGHT_API_URL` is required; `HINDSIGHT_BANK_ID`,
    /// `HINDSIGHT_REFLECT_QUERY` and `HINDSIGHT_REFLECT_TIMEOUT_SECS` are optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = std::env::var("HINDSIGHT_API_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("HINDSIGHT_API_URL"))?;

        let mut config = Self::new(api_url);

        if let Ok(bank_id) = std::env::var("HINDSIGHT_BANK_ID") {
            config.bank_id = bank_id;
        }
        if let Ok(query) = std::env::var("HINDSIGHT_REFLECT_QUERY") {
            config.query = query;
        }
        if let Ok(value) = std::env::var("HINDSIGHT_REFLECT_TIMEOUT_SECS") {
            let secs: u64 = value.parse().map_err(|_| {
                ConfigError::Invalid(
                    "HINDSIGHT_REFLECT_TIMEOUT_SECS",
                    "must be a number of seconds",
                )
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Full reflect endpoint.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1/default/banks/{}/reflect",
            self.api_url.trim_end_matches('/'),
            self.bank_id
        )
    }
}

/// Non-error result of a reflect call.
#[derive(Debug, Clone, PartialEq)]
pub enum ReflectOutcome {
    /// The service accepted the request.
    Completed {
        /// Decoded response body.
        result: Value,
    },
    /// The service rejected the request (4xx); not retried.
    Rejected {
        /// HTTP status.
        status: u16,
        /// Response body text.
        body: String,
    },
}

/// Reflect call failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReflectError {
    /// The service kept answering with a server error.
    #[error("HTTP {status} after {attempts} attempts: {body}")]
    Server {
        /// Last HTTP status.
        status: u16,
        /// Last response body text.
        body: String,
        /// Attempts made.
        attempts: u32,
    },

    /// The service could not be reached.
    #[error("Connection failed after {attempts} attempts: {message}")]
    Connection {
        /// Attempts made.
        attempts: u32,
        /// Last transport error.
        message: String,
    },

    /// Anything else, not retried.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Failure of a single attempt.
#[derive(Debug, Error)]
enum AttemptError {
    #[error("HTTP {status}")]
    Server { status: u16, body: String },
    #[error("connection error: {0}")]
    Connection(String),
    #[error("{0}")]
    Unexpected(String),
}

impl AttemptError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Server { .. } | Self::Connection(_))
    }

    fn into_final(self, attempts: u32) -> ReflectError {
        match self {
            Self::Server { status, body } => ReflectError::Server {
                status,
                body,
                attempts,
            },
            Self::Connection(message) => ReflectError::Connection { attempts, message },
            Self::Unexpected(message) => ReflectError::Unexpected(message),
        }
    }
}

/// Client for the reflect endpoint.
pub struct ReflectJob {
    client: reqwest::Client,
    config: ReflectConfig,
}

impl ReflectJob {
    /// Create a job with its own HTTP client.
    pub fn new(config: ReflectConfig) -> Result<Self, ReflectError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ReflectError::Unexpected(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Settings this job runs with.
    pub fn config(&self) -> &ReflectConfig {
        &self.config
    }

    /// Call the reflect endpoint, retrying server and connection errors.
    pub async fn run(&self) -> Result<ReflectOutcome, ReflectError> {
        let endpoint = self.config.endpoint();
        let attempts = AtomicU32::new(0);

        let endpoint_ref = endpoint.as_str();
        let attempts_ref = &attempts;

        let result = self
            .config
            .retry
            .run(
                "reflect",
                move |attempt| {
                    attempts_ref.store(attempt, Ordering::SeqCst);
                    self.attempt(endpoint_ref)
                },
                AttemptError::is_retryable,
            )
            .await;

        match result {
            Ok(outcome) => {
                match &outcome {
                    ReflectOutcome::Completed { .. } => {
                        info!(bank_id = %self.config.bank_id, "Reflect completed")
                    }
                    ReflectOutcome::Rejected { status, .. } => {
                        error!(bank_id = %self.config.bank_id, status, "Reflect rejected")
                    }
                }
                Ok(outcome)
            }
            Err(e) => {
                let err = e.into_final(attempts.load(Ordering::SeqCst));
                error!(bank_id = %self.config.bank_id, error = %err, "Reflect failed");
                Err(err)
            }
        }
    }

    async fn attempt(&self, endpoint: &str) -> Result<ReflectOutcome, AttemptError> {
        let response = self
            .client
            .post(endpoint)
            .json(&json!({ "query": self.config.query }))
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    AttemptError::Unexpected(e.to_string())
                } else {
                    AttemptError::Connection(e.to_string())
                }
            })?;

        let status = response.status();

        if status.is_success() {
            let result = response
                .json::<Value>()
                .await
                .map_err(|e| AttemptError::Unexpected(e.to_string()))?;
            return Ok(ReflectOutcome::Completed { result });
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            return Ok(ReflectOutcome::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Err(AttemptError::Server {
            status: status.as_u16(),
            body,
        })
    }
}

/// Return value of the scheduled function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectResponse {
    /// HTTP-style status code.
    pub status_code: u16,
    /// JSON-encoded body.
    pub body: String,
}

impl ReflectResponse {
    fn new(status_code: u16, body: Value) -> Self {
        Self {
            status_code,
            body: body.to_string(),
        }
    }

    /// Response for a job that could not be configured.
    pub fn config_error(err: &ConfigError) -> Self {
        Self::new(500, json!({ "error": err.to_string() }))
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

impl From<Result<ReflectOutcome, ReflectError>> for ReflectResponse {
    fn from(result: Result<ReflectOutcome, ReflectError>) -> Self {
        match result {
            Ok(ReflectOutcome::Completed { result }) => {
                Self::new(200, json!({ "success": true, "result": result }))
            }
            Ok(ReflectOutcome::Rejected { status, body }) => {
                Self::new(status, json!({ "error": format!("HTTP {}: {}", status, body) }))
            }
            Err(err) => {
                let status = match &err {
                    ReflectError::Server { status, .. } => *status,
                    _ => 500,
                };
                Self::new(status, json!({ "error": err.to_string() }))
            }
        }
    }
}
