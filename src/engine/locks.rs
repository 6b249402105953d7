use crate::domain::{TaskId, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Async keyed mutex serializing deposit mutations per (owner, task).
///
/// Every reconciliation is a read-modify-write over one task's window; two
/// interleaved calls for the same task could both decide they are the sole
/// earner. Calls for different tasks proceed in parallel.
#[derive(Debug, Default)]
pub struct TaskLocks {
    locks: Mutex<HashMap<(UserId, TaskId), Arc<Mutex<()>>>>,
}

impl TaskLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `(user, task)`.
    pub async fn acquire(&self, user: &UserId, task: &TaskId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Drop entries nobody else holds so the map tracks live keys only.
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            locks
                .entry((user.clone(), task.clone()))
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn key(task: &str) -> (UserId, TaskId) {
        (
            UserId::new("user-1".to_string()),
            TaskId::new(task.to_string()),
        )
    }

    #[tokio::test]
    async fn test_same_task_is_exclusive() {
        let locks = Arc::new(TaskLocks::new());
        let (user, task) = key("t1");

        let guard = locks.acquire(&user, &task).await;

        let contender = {
            let locks = locks.clone();
            let (user, task) = (user.clone(), task.clone());
            tokio::spawn(async move {
                let _g = locks.acquire(&user, &task).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished(), "second acquire must wait");

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("contender should acquire after release")
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_tasks_do_not_block() {
        let locks = TaskLocks::new();
        let (user, t1) = key("t1");
        let (_, t2) = key("t2");

        let _g1 = locks.acquire(&user, &t1).await;
        let acquired = tokio::time::timeout(Duration::from_secs(1), locks.acquire(&user, &t2)).await;
        assert!(acquired.is_ok());
    }
}
