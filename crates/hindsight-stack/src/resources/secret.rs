// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Secrets and who writes them.
//!
//! Every secret has exactly one writer: either the provider's password
//! generator or a bootstrap step. Readers are the compute tasks that bind the
//! secret into their environment.

use serde::Serialize;

use super::ResourceId;

/// Generation rules for a provider-generated password.
///
/// The database password must stay alphanumeric. The memory service hands
/// its connection URL to a configuration parser that treats `%` as
/// interpolation syntax, so the URL is assembled without percent-encoding
/// and the alphabet is what keeps that safe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordPolicy {
    /// Username stored next to the generated value.
    pub username: String,
    /// JSON key the generated value is stored under.
    pub generate_key: String,
    /// Whether punctuation is excluded from the alphabet.
    pub exclude_punctuation: bool,
}

impl PasswordPolicy {
    /// Alphanumeric-only policy for database master credentials.
    pub fn database_master(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            generate_key: "password".to_string(),
            exclude_punctuation: true,
        }
    }
}

/// The single writer of a secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "step", rename_all = "snake_case")]
pub enum SecretWriter {
    /// Generated by the provider when the secret is created.
    Generated,
    /// Written by a bootstrap step.
    Step(ResourceId),
}

/// An encrypted store holding a single sensitive value.
#[derive(Debug, Clone, Serialize)]
pub struct Secret {
    /// Resource identifier.
    pub id: ResourceId,
    /// Operator-facing description.
    pub description: String,
    /// Who writes the value.
    pub writer: SecretWriter,
    /// Generation rules, for generated secrets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_policy: Option<PasswordPolicy>,
}

impl Secret {
    /// A secret generated by the provider under `policy`.
    pub fn generated(
        id: impl Into<ResourceId>,
        description: impl Into<String>,
        policy: PasswordPolicy,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            writer: SecretWriter::Generated,
            password_policy: Some(policy),
        }
    }

    /// A secret populated by a bootstrap step.
    pub fn written_by(
        id: impl Into<ResourceId>,
        description: impl Into<String>,
        step: impl Into<ResourceId>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            writer: SecretWriter::Step(step.into()),
            password_policy: None,
        }
    }
}
