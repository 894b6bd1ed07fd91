// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Hindsight Bootstrap - Provisioning Functions
//!
//! The one-shot functions a Hindsight deployment runs while it comes up, and
//! the scheduled reflect job that runs afterwards.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                 ProvisioningEvent (Create / Update / Delete)       │
//! └────────────────────────────────────────────────────────────────────┘
//!          │                        │                        │
//!          ▼                        ▼                        ▼
//!  ┌────────────────┐    ┌────────────────────┐    ┌────────────────┐
//!  │ExtensionEnabler│    │   DbUrlPopulator   │    │ LlmKeyPopulator│
//!  └────────────────┘    └────────────────────┘    └────────────────┘
//!     │         │              │                          │
//!     ▼         ▼              ▼                          ▼
//!  DatabaseConnector      SecretStore  ◄──────────────────┘
//!  (PgConnector)          (AwsSecretStore)
//!
//!  ReflectSchedule ──► ReflectJob ──► POST /v1/default/banks/{id}/reflect
//! ```
//!
//! Every provisioning step is idempotent: running it twice with the same
//! inputs leaves the same state, and `Delete` never touches anything.
//!
//! # Retries
//!
//! | Function | Attempts | Delay | Retried on |
//! |----------|----------|-------|------------|
//! | DB URL populator | 5 | 5 s | secret store failures |
//! | Extension enabler | 10 | 10 s | connection failures |
//! | Reflect job | 3 | 5 s | 5xx, connection failures |
//! | API key populator | 1 | - | never |
//!
//! # Modules
//!
//! - [`event`]: Provisioning event envelope and response
//! - [`retry`]: Fixed-delay retry policy
//! - [`secrets`]: Secret store trait and backends
//! - [`db_url`]: Connection URL populator
//! - [`extension`]: Vector extension enabler
//! - [`llm_key`]: API key populator
//! - [`reflect`]: Scheduled reflect job

#![deny(missing_docs)]

/// Connection URL populator.
pub mod db_url;

/// Error types for bootstrap functions.
pub mod error;

/// Provisioning event envelope.
pub mod event;

/// Vector extension enabler.
pub mod extension;

/// API key populator.
pub mod llm_key;

/// Scheduled reflect job.
pub mod reflect;

/// Fixed-delay retry policy.
pub mod retry;

/// Secret storage.
pub mod secrets;

pub use db_url::DbUrlPopulator;
pub use error::{BootstrapError, ConfigError, Result};
pub use event::{ProvisioningEvent, ProvisioningResponse, RequestType};
pub use extension::ExtensionEnabler;
pub use llm_key::LlmKeyPopulator;
pub use reflect::{ReflectConfig, ReflectJob, ReflectResponse};
pub use retry::RetryPolicy;
pub use secrets::SecretStore;
