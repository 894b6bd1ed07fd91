// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Secret store trait definitions.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Errors from secret store operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SecretError {
    /// The secret does not exist.
    #[error("Secret not found: {0}")]
    NotFound(String),

    /// The backing service failed.
    #[error("Secret store error for {secret_id}: {message}")]
    Backend {
        /// Secret being accessed.
        secret_id: String,
        /// Error description from the backend.
        message: String,
        /// Whether retrying may succeed.
        transient: bool,
    },

    /// The secret exists but its value has the wrong shape.
    #[error("Malformed secret {secret_id}: {reason}")]
    Malformed {
        /// Secret being decoded.
        secret_id: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl SecretError {
    /// Whether the failure may clear up on its own.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Backend { transient: true, .. })
    }
}

/// Result type for secret store operations.
pub type Result<T> = std::result::Result<T, SecretError>;

/// Named secret storage.
///
/// Values are opaque strings. Implementations must never log them.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read the current value of a secret.
    async fn get_secret_value(&self, secret_id: &str) -> Result<String>;

    /// Replace the current value of a secret.
    async fn put_secret_value(&self, secret_id: &str, value: &str) -> Result<()>;
}

/// Generated database master credentials.
#[derive(Clone, Deserialize)]
pub struct DatabaseCredentials {
    /// Master username, when stored alongside the password.
    #[serde(default)]
    pub username: Option<String>,
    /// Master password.
    pub password: String,
}

impl DatabaseCredentials {
    /// Parse the JSON document stored in the credentials secret.
    pub fn from_secret_string(secret_id: &str, value: &str) -> Result<Self> {
        serde_json::from_str(value).map_err(|e| SecretError::Malformed {
            secret_id: secret_id.to_string(),
            reason: e.to_string(),
        })
    }
}

impl std::fmt::Debug for DatabaseCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
