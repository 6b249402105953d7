//! Parse/validate boundary between loosely-typed request input and the domain.
//!
//! Everything the engine receives has passed through one of these functions:
//! identifiers are non-empty, timestamps are RFC 3339 with an explicit
//! offset (truncated to millisecond precision, the storage resolution), and
//! conversion rates are non-negative.

use crate::domain::{Decimal, DepositId, Frequency, TaskId, UserId};
use chrono::{DateTime, Datelike, FixedOffset, SubsecRound};
use std::str::FromStr;
use thiserror::Error;

/// Earliest and latest calendar years accepted for deposit timestamps.
const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },
    #[error("{0}")]
    InvalidFrequency(String),
    #[error("invalid conversion rate '{0}': must be a non-negative number")]
    InvalidConversionRate(String),
}

fn non_empty(field: &'static str, raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(trimmed.to_string())
}

pub fn parse_user_id(raw: &str) -> Result<UserId, ValidationError> {
    non_empty("userId", raw).map(UserId::new)
}

pub fn parse_task_id(raw: &str) -> Result<TaskId, ValidationError> {
    non_empty("taskId", raw).map(TaskId::new)
}

pub fn parse_deposit_id(raw: &str) -> Result<DepositId, ValidationError> {
    non_empty("id", raw).map(DepositId::new)
}

pub fn parse_task_name(raw: &str) -> Result<String, ValidationError> {
    non_empty("name", raw)
}

pub fn parse_frequency(raw: &str) -> Result<Frequency, ValidationError> {
    Frequency::from_str(raw).map_err(|e| ValidationError::InvalidFrequency(e.to_string()))
}

/// Parse an RFC 3339 timestamp, keeping its UTC offset.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, ValidationError> {
    let parsed = DateTime::parse_from_rfc3339(raw.trim()).map_err(|e| {
        ValidationError::InvalidTimestamp {
            value: raw.to_string(),
            reason: e.to_string(),
        }
    })?;
    check_timestamp(parsed)
}

/// Range-check an already typed timestamp and truncate it to milliseconds.
pub fn check_timestamp(
    timestamp: DateTime<FixedOffset>,
) -> Result<DateTime<FixedOffset>, ValidationError> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&timestamp.year()) {
        return Err(ValidationError::InvalidTimestamp {
            value: timestamp.to_rfc3339(),
            reason: format!("year must be between {} and {}", MIN_YEAR, MAX_YEAR),
        });
    }
    Ok(timestamp.trunc_subsecs(3))
}

pub fn check_conversion_rate(rate: Decimal) -> Result<Decimal, ValidationError> {
    if rate.is_negative() {
        return Err(ValidationError::InvalidConversionRate(rate.to_canonical_string()));
    }
    Ok(rate)
}
