//! Domain types for the vice bank.
//!
//! This module provides:
//! - Lossless token amounts via the Decimal wrapper
//! - Identifier newtypes and the Frequency unit
//! - Task and TaskDeposit records
//! - Stable deposit ordering for deterministic processing
//! - The typed parse/validate boundary for request input

pub mod decimal;
pub mod ordering;
pub mod primitives;
pub mod task;
pub mod task_deposit;
pub mod validate;

pub use decimal::Decimal;
pub use ordering::{sort_deposits_deterministic, DepositOrderingKey};
pub use primitives::{DepositId, Frequency, FrequencyParseError, TaskId, UserId};
pub use task::Task;
pub use task_deposit::{total_tokens, NewTaskDeposit, TaskDeposit, TaskDepositUpdate};
pub use validate::ValidationError;
