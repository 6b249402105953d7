//! In-memory storage backend.

use super::{BalanceStore, DepositChanges, DepositFilter, DepositStore, StoreError, TaskStore};
use crate::domain::{
    sort_deposits_deterministic, Decimal, DepositId, Task, TaskDeposit, TaskId, UserId,
};
use crate::engine::Window;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Complete record set of one backend. Also the on-disk JSON document
/// layout of [`super::JsonFileStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreState {
    #[serde(default)]
    pub tasks: BTreeMap<TaskId, Task>,
    #[serde(default)]
    pub deposits: BTreeMap<DepositId, TaskDeposit>,
    #[serde(default)]
    pub balances: BTreeMap<UserId, Decimal>,
}

impl StoreState {
    pub(crate) fn get_task(&self, user: &UserId, id: &TaskId) -> Option<Task> {
        self.tasks.get(id).filter(|t| t.user_id == *user).cloned()
    }

    pub(crate) fn list_tasks(&self, user: &UserId) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .values()
            .filter(|t| t.user_id == *user)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        tasks
    }

    pub(crate) fn update_task(&mut self, task: &Task) -> bool {
        match self.tasks.get_mut(&task.id) {
            Some(existing) if existing.user_id == task.user_id => {
                *existing = task.clone();
                true
            }
            _ => false,
        }
    }

    pub(crate) fn delete_task(&mut self, user: &UserId, id: &TaskId) -> bool {
        if self.get_task(user, id).is_none() {
            return false;
        }
        self.tasks.remove(id).is_some()
    }

    pub(crate) fn get_deposit(&self, user: &UserId, id: &DepositId) -> Option<TaskDeposit> {
        self.deposits.get(id).filter(|d| d.user_id == *user).cloned()
    }

    pub(crate) fn deposits_in_window(
        &self,
        user: &UserId,
        task: &TaskId,
        window: &Window,
    ) -> Vec<TaskDeposit> {
        let (start, end) = (window.start_ms(), window.end_ms());
        self.deposits
            .values()
            .filter(|d| d.user_id == *user && d.task_id == *task)
            .filter(|d| (start..=end).contains(&d.time_ms()))
            .cloned()
            .collect()
    }

    pub(crate) fn list_deposits(&self, user: &UserId, filter: &DepositFilter) -> Vec<TaskDeposit> {
        let mut deposits: Vec<TaskDeposit> = self
            .deposits
            .values()
            .filter(|d| d.user_id == *user && filter.matches(d))
            .cloned()
            .collect();
        sort_deposits_deterministic(&mut deposits);
        deposits
    }

    pub(crate) fn apply(&mut self, changes: &DepositChanges) {
        for id in &changes.removals {
            self.deposits.remove(id);
        }
        for deposit in &changes.upserts {
            self.deposits.insert(deposit.id.clone(), deposit.clone());
        }
    }

    pub(crate) fn balance(&self, user: &UserId) -> Decimal {
        self.balances.get(user).copied().unwrap_or_default()
    }

    pub(crate) fn add_balance(&mut self, user: &UserId, delta: Decimal) -> Decimal {
        let balance = self.balances.entry(user.clone()).or_default();
        *balance += delta;
        *balance
    }
}

/// Storage backend that keeps every record in process memory.
///
/// Callers receive clones; the canonical records never leave the lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing record set.
    pub fn with_state(state: StoreState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// Copy of the current record set.
    pub async fn snapshot(&self) -> StoreState {
        self.state.read().await.clone()
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn get_task(&self, user: &UserId, id: &TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.state.read().await.get_task(user, id))
    }

    async fn list_tasks(&self, user: &UserId) -> Result<Vec<Task>, StoreError> {
        Ok(self.state.read().await.list_tasks(user))
    }

    async fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .tasks
            .insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn update_task(&self, task: &Task) -> Result<bool, StoreError> {
        Ok(self.state.write().await.update_task(task))
    }

    async fn delete_task(&self, user: &UserId, id: &TaskId) -> Result<bool, StoreError> {
        Ok(self.state.write().await.delete_task(user, id))
    }
}

#[async_trait]
impl DepositStore for MemoryStore {
    async fn get_deposit(
        &self,
        user: &UserId,
        id: &DepositId,
    ) -> Result<Option<TaskDeposit>, StoreError> {
        Ok(self.state.read().await.get_deposit(user, id))
    }

    async fn deposits_in_window(
        &self,
        user: &UserId,
        task: &TaskId,
        window: &Window,
    ) -> Result<Vec<TaskDeposit>, StoreError> {
        Ok(self.state.read().await.deposits_in_window(user, task, window))
    }

    async fn list_deposits(
        &self,
        user: &UserId,
        filter: &DepositFilter,
    ) -> Result<Vec<TaskDeposit>, StoreError> {
        Ok(self.state.read().await.list_deposits(user, filter))
    }

    async fn commit(&self, changes: &DepositChanges) -> Result<(), StoreError> {
        self.state.write().await.apply(changes);
        Ok(())
    }
}

#[async_trait]
impl BalanceStore for MemoryStore {
    async fn get_balance(&self, user: &UserId) -> Result<Decimal, StoreError> {
        Ok(self.state.read().await.balance(user))
    }

    async fn set_balance(&self, user: &UserId, tokens: Decimal) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .balances
            .insert(user.clone(), tokens);
        Ok(())
    }

    async fn add_to_balance(&self, user: &UserId, delta: Decimal) -> Result<Decimal, StoreError> {
        Ok(self.state.write().await.add_balance(user, delta))
    }
}
