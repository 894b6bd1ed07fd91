// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for hindsight-bootstrap.

use thiserror::Error;

/// Bootstrap function errors.
///
/// A bootstrap function either returns a response or one of these; the
/// provisioning system treats any error as a failed step.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BootstrapError {
    /// The provisioning event could not be decoded.
    #[error("Event error: {0}")]
    Event(#[from] crate::event::EventError),

    /// Secret store operation failed.
    #[error("Secret error: {0}")]
    Secret(#[from] crate::secrets::SecretError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] crate::extension::DatabaseError),

    /// Input was rejected before any side effect.
    #[error("Validation error: {0}")]
    Validation(#[from] crate::llm_key::ValidationError),

    /// Configuration loading failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl BootstrapError {
    /// Whether the underlying failure may clear up on its own.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Secret(e) => e.is_transient(),
            Self::Database(e) => e.is_transient(),
            Self::Event(_) | Self::Validation(_) | Self::Config(_) => false,
        }
    }
}

/// Result type using BootstrapError.
pub type Result<T> = std::result::Result<T, BootstrapError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("{0} not set")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
