// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Resource descriptors owned by a stack.
//!
//! These describe desired state only. Nothing here talks to a provider.

pub mod compute;
pub mod database;
pub mod function;
pub mod network;
pub mod role;
pub mod secret;

use std::fmt;

use serde::Serialize;

pub use compute::{Cluster, ContainerSpec, HealthCheck, LogConfig, Service, TaskDefinition};
pub use database::{DatabaseEngine, DatabaseInstance, IngressRule, RemovalPolicy};
pub use function::{
    BootstrapFunction, FunctionKind, GrantAccess, PropertyValue, ProvisioningStep, SecretGrant,
};
pub use network::{Network, SubnetGroup, SubnetKind};
pub use role::Role;
pub use secret::{PasswordPolicy, Secret, SecretWriter};

/// Logical identifier of a resource inside one stack.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Create an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
