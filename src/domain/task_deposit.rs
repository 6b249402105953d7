//! Task deposit records and the inputs that create or move them.

use crate::domain::{Decimal, DepositId, Frequency, Task, TaskId, UserId};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A single "I did task X at time T" record.
///
/// `task_name`, `conversion_rate` and `frequency` are snapshots of the task
/// taken when the deposit was created. `tokens_earned` is derived: it is
/// either `conversion_rate` (this deposit is its window's earner) or zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDeposit {
    pub id: DepositId,
    pub user_id: UserId,
    pub task_id: TaskId,
    pub date: DateTime<FixedOffset>,
    pub task_name: String,
    pub conversion_rate: Decimal,
    pub frequency: Frequency,
    pub tokens_earned: Decimal,
}

impl TaskDeposit {
    /// Build a deposit for `task` at `date`, snapshotting the task's fields.
    pub fn from_task(task: &Task, date: DateTime<FixedOffset>, tokens_earned: Decimal) -> Self {
        Self {
            id: DepositId::generate(),
            user_id: task.user_id.clone(),
            task_id: task.id.clone(),
            date,
            task_name: task.name.clone(),
            conversion_rate: task.conversion_rate,
            frequency: task.frequency,
            tokens_earned,
        }
    }

    /// Milliseconds since the Unix epoch, the ordering and range key.
    pub fn time_ms(&self) -> i64 {
        self.date.timestamp_millis()
    }

    /// True when this deposit is credited for its window.
    pub fn is_earner(&self) -> bool {
        self.tokens_earned.is_positive()
    }
}

/// Validated input for recording a new deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTaskDeposit {
    pub user_id: UserId,
    pub task_id: TaskId,
    pub date: DateTime<FixedOffset>,
}

/// Validated input for moving an existing deposit to another timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDepositUpdate {
    pub id: DepositId,
    pub user_id: UserId,
    pub date: DateTime<FixedOffset>,
}

/// Total tokens currently credited across `deposits`.
pub fn total_tokens(deposits: &[TaskDeposit]) -> Decimal {
    deposits.iter().map(|d| d.tokens_earned).sum()
}
