//! Storage abstraction for tasks, task deposits and token balances.
//!
//! Three interchangeable backends implement every trait here:
//! - [`MemoryStore`] keeps everything in process memory
//! - [`JsonFileStore`] persists the same state as one JSON document
//! - [`crate::db::Repository`] persists to SQLite through sqlx

use crate::domain::{Decimal, DepositId, TaskDeposit, Task, TaskId, UserId};
use crate::engine::Window;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use std::sync::Arc;
use thiserror::Error;

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// Error type for storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

/// Optional filters for listing deposits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepositFilter {
    pub task_id: Option<TaskId>,
    pub from: Option<DateTime<FixedOffset>>,
    pub to: Option<DateTime<FixedOffset>>,
}

impl DepositFilter {
    pub fn matches(&self, deposit: &TaskDeposit) -> bool {
        self.task_id.as_ref().map_or(true, |t| *t == deposit.task_id)
            && self.from.map_or(true, |f| deposit.time_ms() >= f.timestamp_millis())
            && self.to.map_or(true, |t| deposit.time_ms() <= t.timestamp_millis())
    }
}

/// Complete write set of one engine operation, applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepositChanges {
    pub upserts: Vec<TaskDeposit>,
    pub removals: Vec<DepositId>,
}

impl DepositChanges {
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.removals.is_empty()
    }
}

/// Task registry.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn get_task(&self, user: &UserId, id: &TaskId) -> Result<Option<Task>, StoreError>;

    /// Tasks owned by `user`, ordered by name then id.
    async fn list_tasks(&self, user: &UserId) -> Result<Vec<Task>, StoreError>;

    async fn insert_task(&self, task: &Task) -> Result<(), StoreError>;

    /// Replace a task's fields. Returns false when no such task exists.
    async fn update_task(&self, task: &Task) -> Result<bool, StoreError>;

    /// Returns false when no such task exists.
    async fn delete_task(&self, user: &UserId, id: &TaskId) -> Result<bool, StoreError>;
}

/// Ownership-keyed collection of task deposits.
#[async_trait]
pub trait DepositStore: Send + Sync {
    async fn get_deposit(
        &self,
        user: &UserId,
        id: &DepositId,
    ) -> Result<Option<TaskDeposit>, StoreError>;

    /// Every deposit of `user` for `task` whose instant lies in `window`,
    /// bounds included. Order is unspecified.
    async fn deposits_in_window(
        &self,
        user: &UserId,
        task: &TaskId,
        window: &Window,
    ) -> Result<Vec<TaskDeposit>, StoreError>;

    /// Deposits of `user` matching `filter`, earliest first (ties by id).
    async fn list_deposits(
        &self,
        user: &UserId,
        filter: &DepositFilter,
    ) -> Result<Vec<TaskDeposit>, StoreError>;

    /// Apply every upsert and removal atomically.
    async fn commit(&self, changes: &DepositChanges) -> Result<(), StoreError>;
}

/// Per-user token balances.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Current balance; zero for a user never written.
    async fn get_balance(&self, user: &UserId) -> Result<Decimal, StoreError>;

    async fn set_balance(&self, user: &UserId, tokens: Decimal) -> Result<(), StoreError>;

    /// Add `delta` to the balance as one atomic step and return the result.
    /// Concurrent calls for the same user never lose an update.
    async fn add_to_balance(&self, user: &UserId, delta: Decimal) -> Result<Decimal, StoreError>;
}

/// The three stores behind one backend, shared across the service.
#[derive(Clone)]
pub struct Stores {
    pub tasks: Arc<dyn TaskStore>,
    pub deposits: Arc<dyn DepositStore>,
    pub balances: Arc<dyn BalanceStore>,
}

impl Stores {
    /// Use one backend for all three concerns.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: TaskStore + DepositStore + BalanceStore + 'static,
    {
        Self {
            tasks: backend.clone(),
            deposits: backend.clone(),
            balances: backend,
        }
    }
}
