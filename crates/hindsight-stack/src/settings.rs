// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tier-independent application settings.

use std::time::Duration;

use serde::Serialize;

/// Region used when nothing else is configured.
pub const DEFAULT_REGION: &str = "ca-central-1";

/// Settings shared by every tier: images, ports, model selection, and
/// database naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppSettings {
    /// Target region applied to every tier.
    pub region: String,
    /// Memory service container image.
    pub service_image: String,
    /// Port the memory service listens on.
    pub api_port: u16,
    /// Console container image.
    pub console_image: String,
    /// Port the console listens on.
    pub console_port: u16,
    /// LLM provider passed to the memory service.
    pub llm_provider: String,
    /// LLM model passed to the memory service.
    pub llm_model: String,
    /// Name of the application database.
    pub database_name: String,
    /// Master user of the application database.
    pub database_username: String,
    /// Database listener port.
    pub database_port: u16,
    /// Health check path of the memory service (checks database connectivity).
    pub api_health_check_path: String,
    /// Health check path of the console (its root redirects).
    pub console_health_check_path: String,
    /// Load balancer idle timeout for the memory service.
    pub idle_timeout: Duration,
    /// Memory bank the reflect job targets.
    pub reflect_bank_id: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            service_image: "ghcr.io/vectorize-io/hindsight:latest".to_string(),
            api_port: 8888,
            console_image: "node:20-alpine".to_string(),
            console_port: 9999,
            llm_provider: "openai".to_string(),
            llm_model: "gpt-4o-mini".to_string(),
            database_name: "hindsight".to_string(),
            database_username: "hindsight_admin".to_string(),
            database_port: 5432,
            api_health_check_path: "/health".to_string(),
            console_health_check_path: "/api/health".to_string(),
            idle_timeout: Duration::from_secs(120),
            reflect_bank_id: "johnny-robot".to_string(),
        }
    }
}

impl AppSettings {
    /// Load settings from environment variables, falling back to defaults.
    ///
    /// Optional:
    /// - `HINDSIGHT_REGION`: target region (default: `ca-central-1`)
    /// - `HINDSIGHT_IMAGE`: memory service image
    /// - `HINDSIGHT_LLM_PROVIDER`: LLM provider (default: `openai`)
    /// - `HINDSIGHT_LLM_MODEL`: LLM model (default: `gpt-4o-mini`)
    /// - `HINDSIGHT_API_PORT`: memory service port (default: 8888)
    /// - `HINDSIGHT_BANK_ID`: memory bank for the reflect job
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api_port = match std::env::var("HINDSIGHT_API_PORT") {
            Ok(value) => value.parse().map_err(|_| {
                ConfigError::Invalid("HINDSIGHT_API_PORT", "must be a valid port number")
            })?,
            Err(_) => defaults.api_port,
        };

        let llm_provider = non_empty_var("HINDSIGHT_LLM_PROVIDER")?;

        Ok(Self {
            region: std::env::var("HINDSIGHT_REGION").unwrap_or(defaults.region),
            service_image: std::env::var("HINDSIGHT_IMAGE").unwrap_or(defaults.service_image),
            api_port,
            llm_provider: llm_provider.unwrap_or(defaults.llm_provider),
            llm_model: std::env::var("HINDSIGHT_LLM_MODEL").unwrap_or(defaults.llm_model),
            reflect_bank_id: std::env::var("HINDSIGHT_BANK_ID").unwrap_or(defaults.reflect_bank_id),
            ..defaults
        })
    }
}

fn non_empty_var(key: &'static str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(value) if value.trim().is_empty() => Err(ConfigError::Invalid(key, "must not be empty")),
        Ok(value) => Ok(Some(value)),
        Err(_) => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
