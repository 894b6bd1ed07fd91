// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Hindsight Stack - Deployment Model
//!
//! Declarative description of everything needed to run the Hindsight memory
//! service and its web console: network, managed PostgreSQL, secrets,
//! container services, the scheduled reflect job, and the ordering edges
//! between them. This crate only declares desired state; the bootstrap logic
//! the steps invoke lives in `hindsight-bootstrap`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                    TierTable (dev, prod)  +  AppSettings             │
//! └──────────────────────────────────────────────────────────────────────┘
//!                                   │ Stack::synthesize
//!                                   ▼
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  Network ─ Database ─ Secrets ─ Bootstrap steps ─ Compute ─ Schedule │
//! │                 (DependencyGraph orders all of it)                   │
//! └──────────────────────────────────────────────────────────────────────┘
//!                                   │ provisioning_order / to_json
//!                                   ▼
//!                         provisioning system
//! ```
//!
//! # Tiers
//!
//! | Setting | dev | prod |
//! |---------|-----|------|
//! | Database class | `db.t3.micro` | `db.t3.small` |
//! | API task | 512 CPU / 1024 MiB | 1024 CPU / 2048 MiB |
//! | API tasks | 1 | 2 |
//! | Reflect schedule | `rate(1 hour)` | `rate(15 minutes)` |
//! | Backups / deletion protection | 1 day / off | 7 days / on |
//!
//! # Modules
//!
//! - [`tier`]: Deployment tiers and their sizing records
//! - [`settings`]: Tier-independent settings loaded from the environment
//! - [`schedule`]: Schedule expressions and the reflect timer
//! - [`resources`]: Resource descriptors
//! - [`graph`]: Dependency graph and provisioning order
//! - [`stack`]: Stack synthesis and validation
//! - [`output`]: Operator outputs

#![deny(missing_docs)]

/// Error types for stack declaration.
pub mod error;

/// Dependency graph between resources.
pub mod graph;

/// Operator outputs.
pub mod output;

/// Resource descriptors.
pub mod resources;

/// Schedule expressions.
pub mod schedule;

/// Tier-independent settings.
pub mod settings;

/// Stack synthesis.
pub mod stack;

/// Deployment tiers.
pub mod tier;

pub use error::{Result, StackError};
pub use settings::AppSettings;
pub use stack::{DeployParams, Stack, synthesize_all};
pub use tier::{Tier, TierConfig, TierTable};
