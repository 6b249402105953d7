//! Stable deposit ordering for deterministic processing.

use crate::domain::TaskDeposit;

/// Stable ordering key for deposits.
///
/// Ordering: instant (ms since epoch) -> deposit id. Two deposits recorded
/// at the same instant are ordered by id so repeated sorts agree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DepositOrderingKey {
    pub time_ms: i64,
    pub id: String,
}

impl DepositOrderingKey {
    pub fn from_deposit(deposit: &TaskDeposit) -> Self {
        DepositOrderingKey {
            time_ms: deposit.time_ms(),
            id: deposit.id.as_str().to_string(),
        }
    }
}

/// Sort deposits deterministically, earliest first.
pub fn sort_deposits_deterministic(deposits: &mut [TaskDeposit]) {
    deposits.sort_by_cached_key(DepositOrderingKey::from_deposit);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, DepositId, Frequency, TaskId, UserId};
    use chrono::DateTime;

    fn deposit(id: &str, date: &str) -> TaskDeposit {
        TaskDeposit {
            id: DepositId::new(id.to_string()),
            user_id: UserId::new("user-1".to_string()),
            task_id: TaskId::new("task-1".to_string()),
            date: DateTime::parse_from_rfc3339(date).unwrap(),
            task_name: "Run".to_string(),
            conversion_rate: Decimal::from(1),
            frequency: Frequency::Daily,
            tokens_earned: Decimal::zero(),
        }
    }

    #[test]
    fn test_sort_by_instant_across_offsets() {
        let mut deposits = vec![
            deposit("a", "2024-01-01T10:00:00+00:00"),
            // 09:00 UTC, earlier despite the larger wall-clock hour
            deposit("b", "2024-01-01T11:00:00+02:00"),
        ];
        sort_deposits_deterministic(&mut deposits);
        assert_eq!(deposits[0].id.as_str(), "b");
        assert_eq!(deposits[1].id.as_str(), "a");
    }

    #[test]
    fn test_ties_broken_by_id() {
        let mut deposits = vec![
            deposit("z", "2024-01-01T10:00:00Z"),
            deposit("m", "2024-01-01T10:00:00Z"),
            deposit("a", "2024-01-01T10:00:00Z"),
        ];
        sort_deposits_deterministic(&mut deposits);
        let ids: Vec<&str> = deposits.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "m", "z"]);
    }
}
