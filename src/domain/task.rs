//! Recurring task definitions.

use crate::domain::{Decimal, Frequency, TaskId, UserId};
use serde::{Deserialize, Serialize};

/// A recurring activity that earns tokens once per frequency window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub user_id: UserId,
    pub name: String,
    pub frequency: Frequency,
    /// Tokens credited to the earning deposit of each window.
    pub conversion_rate: Decimal,
}

impl Task {
    /// Create a task with a freshly generated id.
    pub fn new(user_id: UserId, name: String, frequency: Frequency, conversion_rate: Decimal) -> Self {
        Self {
            id: TaskId::generate(),
            user_id,
            name,
            frequency,
            conversion_rate,
        }
    }
}
