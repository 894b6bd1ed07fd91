// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for hindsight-stack.

use thiserror::Error;

use crate::tier::Tier;

/// Errors raised while declaring or validating a stack.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StackError {
    /// Configuration loading failed.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::settings::ConfigError),

    /// No configuration record exists for the requested tier.
    #[error("No configuration for tier: {0}")]
    UnknownTier(Tier),

    /// A tier name could not be parsed.
    #[error("Invalid tier: {0}")]
    InvalidTier(String),

    /// A schedule expression could not be parsed.
    #[error("Invalid schedule expression '{expression}': {reason}")]
    InvalidSchedule {
        /// The rejected expression.
        expression: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A dependency edge names a resource that was never declared.
    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    /// A resource was declared twice.
    #[error("Duplicate resource: {0}")]
    DuplicateResource(String),

    /// A resource was made to depend on itself.
    #[error("Resource cannot depend on itself: {0}")]
    SelfDependency(String),

    /// The dependency graph contains a cycle.
    #[error("Dependency cycle between: {}", .0.join(", "))]
    Cycle(Vec<String>),

    /// A declared ordering constraint does not hold.
    #[error("Ordering violation: {0}")]
    Ordering(String),

    /// JSON rendering failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type using StackError.
pub type Result<T> = std::result::Result<T, StackError>;
