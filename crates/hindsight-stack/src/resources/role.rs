// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Roles assumed by container tasks.
//!
//! A task runs with two roles. The execution role is what the platform uses
//! to pull the image, ship logs, and resolve secret bindings before the
//! container starts. The task role is what the running process itself holds.

use serde::Serialize;

use super::{GrantAccess, ResourceId, SecretGrant};

/// Principal allowed to assume container task roles.
pub const TASK_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";

/// Managed policy every execution role carries.
pub const EXECUTION_POLICY: &str = "service-role/AmazonECSTaskExecutionRolePolicy";

/// An identity a task runs as.
#[derive(Debug, Clone, Serialize)]
pub struct Role {
    /// Resource identifier.
    pub id: ResourceId,
    /// Principal allowed to assume the role.
    pub assumed_by: String,
    /// Attached managed policies.
    pub managed_policies: Vec<String>,
    /// Secret permissions.
    pub grants: Vec<SecretGrant>,
}

impl Role {
    /// Execution role for container tasks.
    pub fn task_execution(id: impl Into<ResourceId>) -> Self {
        Self {
            id: id.into(),
            assumed_by: TASK_PRINCIPAL.to_string(),
            managed_policies: vec![EXECUTION_POLICY.to_string()],
            grants: Vec::new(),
        }
    }

    /// Runtime role for container tasks, with no permissions attached.
    pub fn task(id: impl Into<ResourceId>) -> Self {
        Self {
            id: id.into(),
            assumed_by: TASK_PRINCIPAL.to_string(),
            managed_policies: Vec::new(),
            grants: Vec::new(),
        }
    }

    /// Grant access on a secret.
    pub fn grant(mut self, secret: &ResourceId, access: GrantAccess) -> Self {
        self.grants.push(SecretGrant {
            secret: secret.clone(),
            access,
        });
        self
    }

    /// Whether the role may perform `access` on `secret`.
    pub fn can(&self, secret: &ResourceId, access: GrantAccess) -> bool {
        self.grants
            .iter()
            .any(|grant| &grant.secret == secret && grant.access == access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_role_grants() {
        let secret = ResourceId::new("DbUrlSecret");
        let role = Role::task_execution("TaskExecutionRole").grant(&secret, GrantAccess::Read);

        assert!(role.can(&secret, GrantAccess::Read));
        assert!(!role.can(&secret, GrantAccess::Write));
        assert_eq!(role.managed_policies, vec![EXECUTION_POLICY]);
        assert!(Role::task("TaskRole").grants.is_empty());
    }
}
