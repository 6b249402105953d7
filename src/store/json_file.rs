//! Flat JSON file storage backend.
//!
//! The whole record set lives in memory and is rewritten to disk after every
//! mutation. Writes go to a sibling temp file first and are then renamed over
//! the target, so a crash mid-write leaves the previous document intact.

use super::memory::StoreState;
use super::{BalanceStore, DepositChanges, DepositFilter, DepositStore, StoreError, TaskStore};
use crate::domain::{Decimal, DepositId, Task, TaskDeposit, TaskId, UserId};
use crate::engine::Window;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: RwLock<StoreState>,
}

impl JsonFileStore {
    /// Open the document at `path`, starting empty when it does not exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let state = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => StoreState::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreState::default(),
            Err(e) => return Err(e.into()),
        };

        info!(
            path = %path.display(),
            tasks = state.tasks.len(),
            deposits = state.deposits.len(),
            "JSON store opened"
        );

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `mutate` to a copy of the state, persist it, then publish it.
    ///
    /// The write lock is held across the disk write so mutations are
    /// serialized and the file always matches the published state.
    async fn mutate<T>(&self, mutate: impl FnOnce(&mut StoreState) -> T) -> Result<T, StoreError> {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        let out = mutate(&mut next);
        self.persist(&next).await?;
        *guard = next;
        Ok(out)
    }

    async fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "JSON store persisted");
        Ok(())
    }
}

#[async_trait]
impl TaskStore for JsonFileStore {
    async fn get_task(&self, user: &UserId, id: &TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.state.read().await.get_task(user, id))
    }

    async fn list_tasks(&self, user: &UserId) -> Result<Vec<Task>, StoreError> {
        Ok(self.state.read().await.list_tasks(user))
    }

    async fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        self.mutate(|s| {
            s.tasks.insert(task.id.clone(), task.clone());
        })
        .await
    }

    async fn update_task(&self, task: &Task) -> Result<bool, StoreError> {
        self.mutate(|s| s.update_task(task)).await
    }

    async fn delete_task(&self, user: &UserId, id: &TaskId) -> Result<bool, StoreError> {
        self.mutate(|s| s.delete_task(user, id)).await
    }
}

#[async_trait]
impl DepositStore for JsonFileStore {
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
        if changes.is_empty() {
            return Ok(());
        }
        self.mutate(|s| s.apply(changes)).await
    }
}

#[async_trait]
impl BalanceStore for JsonFileStore {
    async fn get_balance(&self, user: &UserId) -> Result<Decimal, StoreError> {
        Ok(self.state.read().await.balance(user))
    }

    async fn set_balance(&self, user: &UserId, tokens: Decimal) -> Result<(), StoreError> {
        self.mutate(|s| {
            s.balances.insert(user.clone(), tokens);
        })
        .await
    }

    async fn add_to_balance(&self, user: &UserId, delta: Decimal) -> Result<Decimal, StoreError> {
        self.mutate(|s| s.add_balance(user, delta)).await
    }
}
