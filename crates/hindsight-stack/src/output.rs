// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Values exchanged with the operator: parameters supplied at deploy time and
//! outputs surfaced afterwards.

use serde::Serialize;

use crate::resources::{PropertyValue, ResourceId};

/// A deploy-time parameter the provisioning system binds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackParameter {
    /// Parameter name, as used in `${param.<name>}` placeholders.
    pub name: String,
    /// Operator-facing description.
    pub description: String,
    /// Whether the value is masked in consoles and logs.
    pub no_echo: bool,
    /// Whether the operator supplied a value.
    pub supplied: bool,
}

/// A named deployment output.
#[derive(Debug, Clone, Serialize)]
pub struct StackOutput {
    /// Output key.
    pub key: String,
    /// Value, resolved by the provisioning system.
    pub value: PropertyValue,
    /// Operator-facing description.
    pub description: String,
}

impl StackOutput {
    /// Output of `resource.attribute`.
    pub fn of(
        key: impl Into<String>,
        resource: &ResourceId,
        attribute: &str,
        description: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            value: PropertyValue::reference(resource, attribute),
            description: description.into(),
        }
    }
}
