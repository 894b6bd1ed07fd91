// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Schedule expressions and the timer rule that fires the reflect job.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::error::{Result, StackError};
use crate::resources::ResourceId;

/// Unit of a rate expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateUnit {
    /// Minutes
    Minute,
    /// Hours
    Hour,
    /// Days
    Day,
}

impl RateUnit {
    fn seconds(&self) -> u64 {
        match self {
            RateUnit::Minute => 60,
            RateUnit::Hour => 3_600,
            RateUnit::Day => 86_400,
        }
    }

    fn name(&self, value: u32) -> &'static str {
        match (self, value == 1) {
            (RateUnit::Minute, true) => "minute",
            (RateUnit::Minute, false) => "minutes",
            (RateUnit::Hour, true) => "hour",
            (RateUnit::Hour, false) => "hours",
            (RateUnit::Day, true) => "day",
            (RateUnit::Day, false) => "days",
        }
    }
}

/// A cron-like schedule in the scheduler's `rate(...)` / `cron(...)` syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleExpression {
    /// Fire every `value` units.
    Rate {
        /// Number of units between firings (> 0).
        value: u32,
        /// Unit of `value`.
        unit: RateUnit,
    },
    /// Six-field cron expression, stored without the `cron(...)` wrapper.
    Cron(String),
}

impl ScheduleExpression {
    /// Build a rate expression. `value` must be positive.
    pub fn rate(value: u32, unit: RateUnit) -> Self {
        debug_assert!(value > 0, "rate value must be positive");
        Self::Rate { value, unit }
    }

    /// Interval between firings for rate expressions.
    pub fn period(&self) -> Option<Duration> {
        match self {
            Self::Rate { value, unit } => {
                Some(Duration::from_secs(u64::from(*value) * unit.seconds()))
            }
            Self::Cron(_) => None,
        }
    }
}

impl fmt::Display for ScheduleExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rate { value, unit } => write!(f, "rate({} {})", value, unit.name(*value)),
            Self::Cron(fields) => write!(f, "cron({})", fields),
        }
    }
}

impl FromStr for ScheduleExpression {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason| StackError::InvalidSchedule {
            expression: s.to_string(),
            reason,
        };
        let s = s.trim();

        if let Some(body) = s.strip_prefix("rate(").and_then(|r| r.strip_suffix(')')) {
            let mut parts = body.split_whitespace();
            let (Some(value), Some(unit), None) = (parts.next(), parts.next(), parts.next()) else {
                return Err(invalid("rate needs a value and a unit"));
            };
            let value: u32 = value
                .parse()
                .map_err(|_| invalid("rate value must be a positive integer"))?;
            if value == 0 {
                return Err(invalid("rate value must be a positive integer"));
            }
            let (unit, plural) = match unit {
                "minute" => (RateUnit::Minute, false),
                "minutes" => (RateUnit::Minute, true),
                "hour" => (RateUnit::Hour, false),
                "hours" => (RateUnit::Hour, true),
                "day" => (RateUnit::Day, false),
                "days" => (RateUnit::Day, true),
                _ => return Err(invalid("rate unit must be minute(s), hour(s) or day(s)")),
            };
            if plural == (value == 1) {
                return Err(invalid("rate unit must be singular only when the value is 1"));
            }
            return Ok(Self::Rate { value, unit });
        }

        if let Some(body) = s.strip_prefix("cron(").and_then(|r| r.strip_suffix(')')) {
            let fields: Vec<&str> = body.split_whitespace().collect();
            if fields.len() != 6 {
                return Err(invalid("cron expression needs exactly six fields"));
            }
            return Ok(Self::Cron(fields.join(" ")));
        }

        Err(invalid("expected rate(...) or cron(...)"))
    }
}

impl Serialize for ScheduleExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Timer rule bound to a bootstrap function.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleRule {
    /// Rule identifier.
    pub id: ResourceId,
    /// When the rule fires.
    pub expression: ScheduleExpression,
    /// Function invoked on each firing.
    pub target: ResourceId,
    /// Operator-facing description.
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rates() {
        let hourly: ScheduleExpression = "rate(1 hour)".parse().unwrap();
        assert_eq!(hourly, ScheduleExpression::rate(1, RateUnit::Hour));
        assert_eq!(hourly.period(), Some(Duration::from_secs(3_600)));

        let quarter: ScheduleExpression = "rate(15 minutes)".parse().unwrap();
        assert_eq!(quarter.period(), Some(Duration::from_secs(900)));
        assert_eq!(quarter.to_string(), "rate(15 minutes)");
    }

    #[test]
    fn test_rate_unit_plurality_enforced() {
        assert!("rate(1 hours)".parse::<ScheduleExpression>().is_err());
        assert!("rate(5 minute)".parse::<ScheduleExpression>().is_err());
        assert!("rate(0 minutes)".parse::<ScheduleExpression>().is_err());
        assert!("rate(2 weeks)".parse::<ScheduleExpression>().is_err());
    }

    #[test]
    fn test_parse_cron() {
        let cron: ScheduleExpression = "cron(0 12 * * ? *)".parse().unwrap();
        assert_eq!(cron.to_string(), "cron(0 12 * * ? *)");
        assert_eq!(cron.period(), None);

        let err = "cron(0 12 * *)".parse::<ScheduleExpression>().unwrap_err();
        assert!(err.to_string().contains("six fields"));
    }

    #[test]
    fn test_rejects_unknown_syntax() {
        assert!("every 5 minutes".parse::<ScheduleExpression>().is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&ScheduleExpression::rate(1, RateUnit::Day)).unwrap();
        assert_eq!(json, "\"rate(1 day)\"");
    }
}
