// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Managed relational database instance.

use serde::Serialize;

use super::ResourceId;

/// Database engine and version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "engine", content = "version", rename_all = "lowercase")]
pub enum DatabaseEngine {
    /// PostgreSQL at the given version.
    Postgres(String),
}

/// What happens to the instance when the stack is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Take a final snapshot, then delete.
    Snapshot,
}

/// Inbound rule allowing a peer to reach the database port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngressRule {
    /// Peer allowed in.
    pub from: ResourceId,
    /// TCP port opened.
    pub port: u16,
    /// Operator-facing description.
    pub description: String,
}

/// The stack's database instance.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseInstance {
    /// Resource identifier.
    pub id: ResourceId,
    /// Engine and version.
    pub engine: DatabaseEngine,
    /// Size class, varies by tier.
    pub instance_class: String,
    /// Network the instance lives in (private subnets).
    pub network: ResourceId,
    /// Application database created at launch.
    pub database_name: String,
    /// Master user.
    pub username: String,
    /// Secret holding the generated master password.
    pub credentials: ResourceId,
    /// Listener port.
    pub port: u16,
    /// Destruction policy.
    pub removal_policy: RemovalPolicy,
    /// Whether deletion is refused.
    pub deletion_protection: bool,
    /// Days of automated backups.
    pub backup_retention_days: u32,
    /// Whether performance insights are collected.
    pub performance_insights: bool,
    /// Peers allowed to connect.
    pub ingress: Vec<IngressRule>,
}

impl DatabaseInstance {
    /// Allow `from` to reach the database port.
    pub fn allow_from(&mut self, from: impl Into<ResourceId>, description: impl Into<String>) {
        self.ingress.push(IngressRule {
            from: from.into(),
            port: self.port,
            description: description.into(),
        });
    }

    /// Whether `peer` may connect.
    pub fn allows(&self, peer: &ResourceId) -> bool {
        self.ingress.iter().any(|rule| &rule.from == peer)
    }
}
