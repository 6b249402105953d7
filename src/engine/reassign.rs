use crate::domain::{sort_deposits_deterministic, Decimal, TaskDeposit};

/// Re-derive `tokens_earned` for deposits that share one task window.
///
/// The earliest deposit (by instant, then id) earns its own snapshot
/// conversion rate; every other deposit earns zero. The output is sorted
/// earliest first. Callers guarantee that all inputs belong to one window.
pub fn reassign(mut deposits: Vec<TaskDeposit>) -> Vec<TaskDeposit> {
    sort_deposits_deterministic(&mut deposits);

    for (i, deposit) in deposits.iter_mut().enumerate() {
        deposit.tokens_earned = if i == 0 {
            deposit.conversion_rate
        } else {
            Decimal::zero()
        };
    }

    deposits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DepositId, Frequency, TaskId, UserId};
    use chrono::DateTime;

    fn deposit(id: &str, date: &str, tokens: i64) -> TaskDeposit {
        TaskDeposit {
            id: DepositId::new(id.to_string()),
            user_id: UserId::new("user-1".to_string()),
            task_id: TaskId::new("task-1".to_string()),
            date: DateTime::parse_from_rfc3339(date).unwrap(),
            task_name: "Meditate".to_string(),
            conversion_rate: Decimal::from(5),
            frequency: Frequency::Daily,
            tokens_earned: Decimal::from(tokens),
        }
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert!(reassign(Vec::new()).is_empty());
    }

    #[test]
    fn test_earliest_earns_conversion_rate() {
        let out = reassign(vec![
            deposit("late", "2024-01-01T20:00:00Z", 5),
            deposit("early", "2024-01-01T08:00:00Z", 0),
            deposit("mid", "2024-01-01T12:00:00Z", 0),
        ]);

        let summary: Vec<(&str, Decimal)> =
            out.iter().map(|d| (d.id.as_str(), d.tokens_earned)).collect();
        assert_eq!(
            summary,
            vec![
                ("early", Decimal::from(5)),
                ("mid", Decimal::zero()),
                ("late", Decimal::zero()),
            ]
        );
    }

    #[test]
    fn test_uses_each_deposits_own_snapshot_rate() {
        let mut first = deposit("a", "2024-01-01T08:00:00Z", 0);
        first.conversion_rate = Decimal::from(3);
        let out = reassign(vec![deposit("b", "2024-01-01T09:00:00Z", 5), first]);
        assert_eq!(out[0].tokens_earned, Decimal::from(3));
        assert!(out[1].tokens_earned.is_zero());
    }

    #[test]
    fn test_identical_timestamps_resolved_by_id() {
        let forward = reassign(vec![
            deposit("b", "2024-01-01T08:00:00Z", 0),
            deposit("a", "2024-01-01T08:00:00Z", 0),
        ]);
        let backward = reassign(vec![
            deposit("a", "2024-01-01T08:00:00Z", 0),
            deposit("b", "2024-01-01T08:00:00Z", 0),
        ]);
        assert_eq!(forward, backward);
        assert_eq!(forward[0].id.as_str(), "a");
        assert_eq!(forward[0].tokens_earned, Decimal::from(5));
    }

    #[test]
    fn test_reassign_is_idempotent() {
        let input = vec![
            deposit("x", "2024-01-01T18:00:00Z", 5),
            deposit("y", "2024-01-01T06:00:00Z", 0),
            deposit("z", "2024-01-01T06:00:00Z", 0),
        ];
        let once = reassign(input);
        let twice = reassign(once.clone());
        assert_eq!(once, twice);
        assert_eq!(
            once.iter().filter(|d| d.is_earner()).count(),
            1,
            "exactly one earner"
        );
    }
}
