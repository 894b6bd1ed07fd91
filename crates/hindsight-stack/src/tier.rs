// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Deployment tiers and their sizing records.
//!
//! Each tier is an entirely independent instantiation of the stack. The
//! per-tier knobs live in an immutable [`TierConfig`] and the set of known
//! tiers in a [`TierTable`] that callers pass into synthesis explicitly.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Result, StackError};
use crate::schedule::{RateUnit, ScheduleExpression};

/// A named deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Development environment.
    Dev,
    /// Production environment.
    Prod,
}

impl Tier {
    /// All tiers, in declaration order.
    pub const ALL: [Tier; 2] = [Tier::Dev, Tier::Prod];

    /// Short identifier used in names and descriptions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Dev => "dev",
            Tier::Prod => "prod",
        }
    }

    /// Human readable label used in stack descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            Tier::Dev => "Development",
            Tier::Prod => "Production",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Tier::Dev),
            "prod" | "production" => Ok(Tier::Prod),
            other => Err(StackError::InvalidTier(other.to_string())),
        }
    }
}

/// Sizing and policy record for one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierConfig {
    /// Which tier this record describes.
    pub tier: Tier,
    /// Target account; `None` uses the caller's default account.
    pub account: Option<String>,
    /// Target region.
    pub region: String,
    /// Database instance size class (e.g. `db.t3.micro`).
    pub database_instance_class: String,
    /// CPU units for the API task.
    pub api_task_cpu: u32,
    /// Memory (MiB) for the API task.
    pub api_task_memory_mib: u32,
    /// Number of API tasks kept running.
    pub api_desired_count: u32,
    /// How often the reflect job fires.
    pub reflect_schedule: ScheduleExpression,
    /// Days of automated database backups kept.
    pub database_backup_retention_days: u32,
    /// Whether the database refuses deletion.
    pub deletion_protection: bool,
    /// Whether database performance insights are enabled.
    pub performance_insights: bool,
    /// Days container logs are retained.
    pub log_retention_days: u32,
}

impl TierConfig {
    /// Standard record for `tier`.
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Dev => Self::dev(),
            Tier::Prod => Self::prod(),
        }
    }

    /// Development sizing: smallest instance, one task, hourly reflect.
    pub fn dev() -> Self {
        Self {
            tier: Tier::Dev,
            account: None,
            region: crate::settings::DEFAULT_REGION.to_string(),
            database_instance_class: "db.t3.micro".to_string(),
            api_task_cpu: 512,
            api_task_memory_mib: 1024,
            api_desired_count: 1,
            reflect_schedule: ScheduleExpression::rate(1, RateUnit::Hour),
            database_backup_retention_days: 1,
            deletion_protection: false,
            performance_insights: false,
            log_retention_days: 7,
        }
    }

    /// Production sizing: two tasks for availability, reflect every 15 minutes.
    pub fn prod() -> Self {
        Self {
            tier: Tier::Prod,
            account: None,
            region: crate::settings::DEFAULT_REGION.to_string(),
            database_instance_class: "db.t3.small".to_string(),
            api_task_cpu: 1024,
            api_task_memory_mib: 2048,
            api_desired_count: 2,
            reflect_schedule: ScheduleExpression::rate(15, RateUnit::Minute),
            database_backup_retention_days: 7,
            deletion_protection: true,
            performance_insights: true,
            log_retention_days: 30,
        }
    }

    /// Whether this record describes the production tier.
    pub fn is_production(&self) -> bool {
        self.tier == Tier::Prod
    }

    /// Set the target region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set the target account.
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }
}

/// Per-tier configuration records keyed by tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierTable {
    entries: BTreeMap<Tier, TierConfig>,
}

impl TierTable {
    /// The standard table with a record for every tier.
    pub fn standard() -> Self {
        let entries = Tier::ALL
            .into_iter()
            .map(|tier| (tier, TierConfig::for_tier(tier)))
            .collect();
        Self { entries }
    }

    /// Replace (or add) the record for `config.tier`.
    pub fn with(mut self, config: TierConfig) -> Self {
        self.entries.insert(config.tier, config);
        self
    }

    /// Apply a region to every tier.
    pub fn with_region(self, region: &str) -> Self {
        let entries = self
            .entries
            .into_iter()
            .map(|(tier, config)| (tier, config.with_region(region)))
            .collect();
        Self { entries }
    }

    /// Look up the record for a tier.
    pub fn get(&self, tier: Tier) -> Result<&TierConfig> {
        self.entries.get(&tier).ok_or(StackError::UnknownTier(tier))
    }

    /// Iterate records in tier order.
    pub fn iter(&self) -> impl Iterator<Item = &TierConfig> {
        self.entries.values()
    }
}

impl Default for TierTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_from_str() {
        assert_eq!("dev".parse::<Tier>().unwrap(), Tier::Dev);
        assert_eq!("Production".parse::<Tier>().unwrap(), Tier::Prod);
        assert!(matches!(
            "staging".parse::<Tier>(),
            Err(StackError::InvalidTier(name)) if name == "staging"
        ));
    }

    #[test]
    fn test_prod_is_stricter_than_dev() {
        let dev = TierConfig::dev();
        let prod = TierConfig::prod();

        assert!(!dev.deletion_protection);
        assert!(prod.deletion_protection);
        assert!(prod.database_backup_retention_days > dev.database_backup_retention_days);
        assert!(prod.api_desired_count > dev.api_desired_count);
        assert_eq!(prod.reflect_schedule.to_string(), "rate(15 minutes)");
        assert_eq!(dev.reflect_schedule.to_string(), "rate(1 hour)");
    }

    #[test]
    fn test_table_lookup_and_override() {
        let table = TierTable::standard();
        assert_eq!(table.iter().count(), Tier::ALL.len());
        for tier in Tier::ALL {
            assert_eq!(table.get(tier).unwrap().tier, tier);
        }
        assert_eq!(table.get(Tier::Dev).unwrap().api_task_cpu, 512);

        let mut custom = TierConfig::dev();
        custom.api_desired_count = 3;
        let table = table.with(custom).with_region("eu-west-1");

        let dev = table.get(Tier::Dev).unwrap();
        assert_eq!(dev.api_desired_count, 3);
        assert_eq!(dev.region, "eu-west-1");
        assert_eq!(table.get(Tier::Prod).unwrap().region, "eu-west-1");
    }
}
