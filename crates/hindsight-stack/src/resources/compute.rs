// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Container cluster, task definitions, and load-balanced services.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use super::function::serialize_secs;
use super::{PropertyValue, ResourceId};

/// Container cluster shared by both services.
#[derive(Debug, Clone, Serialize)]
pub struct Cluster {
    /// Resource identifier.
    pub id: ResourceId,
    /// Network the cluster runs in.
    pub network: ResourceId,
    /// Whether container insights are collected.
    pub container_insights: bool,
}

/// Log shipping for a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogConfig {
    /// Stream prefix in the log group.
    pub stream_prefix: String,
    /// Days logs are kept.
    pub retention_days: u32,
}

/// The single container of a task definition.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerSpec {
    /// Container name.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// Command override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    /// Plain environment variables.
    pub environment: BTreeMap<String, PropertyValue>,
    /// Environment variables resolved from secrets at task start.
    pub secrets: BTreeMap<String, ResourceId>,
    /// Container port.
    pub port: u16,
    /// Log shipping.
    pub logging: LogConfig,
}

/// Immutable task definition; redeploying creates a new revision.
#[derive(Debug, Clone, Serialize)]
pub struct TaskDefinition {
    /// Resource identifier.
    pub id: ResourceId,
    /// CPU units.
    pub cpu: u32,
    /// Memory (MiB).
    pub memory_mib: u32,
    /// Ephemeral storage (GiB); `None` keeps the platform default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ephemeral_storage_gib: Option<u32>,
    /// Role that resolves the container's secret bindings at start.
    pub execution_role: ResourceId,
    /// Role the running container assumes; `None` runs without one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_role: Option<ResourceId>,
    /// The container.
    pub container: ContainerSpec,
}

impl TaskDefinition {
    /// Secrets this task reads at start.
    pub fn secret_readers(&self) -> impl Iterator<Item = &ResourceId> {
        self.container.secrets.values()
    }
}

/// Load balancer health check; the sole liveness gate for traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    /// Path probed.
    pub path: String,
    /// Time between probes.
    #[serde(serialize_with = "serialize_secs")]
    pub interval: Duration,
    /// Probe timeout.
    #[serde(serialize_with = "serialize_secs")]
    pub timeout: Duration,
    /// Consecutive successes before healthy.
    pub healthy_threshold: u32,
    /// Consecutive failures before unhealthy.
    pub unhealthy_threshold: u32,
}

impl HealthCheck {
    /// 30s interval, 2 healthy / 3 unhealthy, with the given path and timeout.
    pub fn standard(path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            interval: Duration::from_secs(30),
            timeout,
            healthy_threshold: 2,
            unhealthy_threshold: 3,
        }
    }
}

/// Public load-balanced service running homogeneous, replaceable tasks.
#[derive(Debug, Clone, Serialize)]
pub struct Service {
    /// Resource identifier.
    pub id: ResourceId,
    /// Cluster the tasks run in.
    pub cluster: ResourceId,
    /// Task definition run.
    pub task_definition: ResourceId,
    /// Number of tasks kept running.
    pub desired_count: u32,
    /// Whether the load balancer is internet-facing.
    pub public_load_balancer: bool,
    /// Listener port (plain HTTP).
    pub listener_port: u16,
    /// Target health check.
    pub health_check: HealthCheck,
    /// Time a new task may fail checks before being replaced.
    #[serde(serialize_with = "serialize_secs")]
    pub health_check_grace_period: Duration,
    /// Load balancer idle timeout override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout_secs: Option<u64>,
}
