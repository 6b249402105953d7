//! Token-earning reconciliation for task deposits.
//!
//! Each mutating call is one transition over a task's deposit set that must
//! keep the window invariant: within every frequency window of a task at most
//! one deposit earns tokens, and it earns exactly its snapshot conversion
//! rate. The full write set is assembled before anything is persisted, and
//! the returned `tokens_added` is the net change across every record touched.

use super::locks::TaskLocks;
use super::reassign::reassign;
use super::window::Window;
use super::EngineError;
use crate::domain::validate::{check_conversion_rate, check_timestamp};
use crate::domain::{
    sort_deposits_deterministic, total_tokens, Decimal, DepositId, Frequency, NewTaskDeposit,
    TaskDeposit, TaskDepositUpdate, UserId,
};
use crate::store::{DepositChanges, DepositStore, TaskStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Tokens credited to one deposit before and after an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenChange {
    pub deposit_id: DepositId,
    pub previous: Decimal,
    pub current: Decimal,
}

impl TokenChange {
    pub fn delta(&self) -> Decimal {
        self.current - self.previous
    }
}

/// Result of one engine operation.
///
/// `task_deposit` is the new deposit for an add, the pre-update snapshot for
/// an update and the removed record for a delete. `changes` lists every
/// deposit whose `tokens_earned` moved, including promotions of other
/// deposits; `tokens_added` is the sum of their deltas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositOutcome {
    pub task_deposit: TaskDeposit,
    pub tokens_added: Decimal,
    pub changes: Vec<TokenChange>,
}

#[derive(Debug, Default)]
struct WritePlan {
    changes: DepositChanges,
    token_changes: Vec<TokenChange>,
}

impl WritePlan {
    fn write(&mut self, previous: Decimal, deposit: TaskDeposit) {
        if previous != deposit.tokens_earned {
            self.token_changes.push(TokenChange {
                deposit_id: deposit.id.clone(),
                previous,
                current: deposit.tokens_earned,
            });
        }
        self.changes.upserts.push(deposit);
    }

    fn remove(&mut self, deposit: &TaskDeposit) {
        if !deposit.tokens_earned.is_zero() {
            self.token_changes.push(TokenChange {
                deposit_id: deposit.id.clone(),
                previous: deposit.tokens_earned,
                current: Decimal::zero(),
            });
        }
        self.changes.removals.push(deposit.id.clone());
    }

    fn touches(&self, id: &DepositId) -> bool {
        self.changes.upserts.iter().any(|d| d.id == *id) || self.changes.removals.contains(id)
    }

    /// Promote the earliest of `remaining` when none of them earns.
    fn restore_earner(&mut self, remaining: Vec<TaskDeposit>) {
        let mut remaining: Vec<TaskDeposit> =
            remaining.into_iter().filter(|d| !self.touches(&d.id)).collect();
        if remaining.is_empty() || !total_tokens(&remaining).is_zero() {
            return;
        }

        // Pre-sorted so reassign keeps the order and the zip lines up.
        sort_deposits_deterministic(&mut remaining);
        let before: Vec<Decimal> = remaining.iter().map(|d| d.tokens_earned).collect();
        for (previous, deposit) in before.into_iter().zip(reassign(remaining)) {
            if previous != deposit.tokens_earned {
                self.write(previous, deposit);
            }
        }
    }

    fn tokens_added(&self) -> Decimal {
        self.token_changes.iter().map(TokenChange::delta).sum()
    }

    fn into_outcome(self, task_deposit: TaskDeposit) -> DepositOutcome {
        DepositOutcome {
            tokens_added: self.tokens_added(),
            task_deposit,
            changes: self.token_changes,
        }
    }
}

/// Add, move and delete task deposits while keeping one earner per window.
pub struct ReconciliationEngine {
    tasks: Arc<dyn TaskStore>,
    deposits: Arc<dyn DepositStore>,
    locks: TaskLocks,
}

impl ReconciliationEngine {
    pub fn new(tasks: Arc<dyn TaskStore>, deposits: Arc<dyn DepositStore>) -> Self {
        Self {
            tasks,
            deposits,
            locks: TaskLocks::new(),
        }
    }

    /// Record a new deposit. It earns the task's conversion rate only when
    /// its window holds no other deposit yet.
    ///
    /// # Errors
    /// `NotFound` if the task does not exist for this owner; nothing is
    /// persisted in that case.
    pub async fn add_task_deposit(
        &self,
        new: NewTaskDeposit,
    ) -> Result<DepositOutcome, EngineError> {
        let date = check_timestamp(new.date)?;
        let task = self
            .tasks
            .get_task(&new.user_id, &new.task_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("task {}", new.task_id)))?;
        check_conversion_rate(task.conversion_rate)?;
        let window = Window::canonical(date, task.frequency)?;

        let _guard = self.locks.acquire(&task.user_id, &task.id).await;

        let occupants = self
            .deposits
            .deposits_in_window(&task.user_id, &task.id, &window)
            .await?;
        let tokens = if occupants.is_empty() {
            task.conversion_rate
        } else {
            Decimal::zero()
        };
        let deposit = TaskDeposit::from_task(&task, date, tokens);

        let mut plan = WritePlan::default();
        plan.write(Decimal::zero(), deposit.clone());
        self.deposits.commit(&plan.changes).await?;

        info!(
            user = %deposit.user_id,
            task = %deposit.task_id,
            deposit = %deposit.id,
            occupants = occupants.len(),
            tokens_earned = %deposit.tokens_earned,
            "Task deposit added"
        );

        Ok(plan.into_outcome(deposit))
    }

    /// Move a deposit to a new timestamp.
    ///
    /// The moved deposit earns only if its destination window has no earner.
    /// When it leaves its previous window and that window is left without an
    /// earner, the earliest remaining deposit there is promoted.
    ///
    /// # Errors
    /// `NotFound` if no such deposit exists for this owner.
    pub async fn update_task_deposit(
        &self,
        update: TaskDepositUpdate,
    ) -> Result<DepositOutcome, EngineError> {
        let date = check_timestamp(update.date)?;
        let task_id = self.require_deposit(&update.user_id, &update.id).await?.task_id;

        let _guard = self.locks.acquire(&update.user_id, &task_id).await;
        // Re-read under the lock; the record may have changed while we waited.
        let existing = self.require_deposit(&update.user_id, &update.id).await?;

        let old_window = Window::canonical(existing.date, existing.frequency)?;
        let new_window = Window::canonical(date, existing.frequency)?;

        let occupants = self.other_occupants(&existing, &new_window).await?;
        let mut updated = existing.clone();
        updated.date = date;
        updated.tokens_earned = if total_tokens(&occupants).is_positive() {
            Decimal::zero()
        } else {
            existing.conversion_rate
        };

        let mut plan = WritePlan::default();
        plan.write(existing.tokens_earned, updated);

        let moved = old_window != new_window;
        if moved {
            let vacated = self.other_occupants(&existing, &old_window).await?;
            plan.restore_earner(vacated);
        }

        self.deposits.commit(&plan.changes).await?;

        info!(
            user = %existing.user_id,
            task = %existing.task_id,
            deposit = %existing.id,
            moved_window = moved,
            records_written = plan.changes.upserts.len(),
            "Task deposit updated"
        );

        Ok(plan.into_outcome(existing))
    }

    /// Remove a deposit. If it was its window's earner and other deposits
    /// remain there, the earliest of them is promoted in the same commit.
    ///
    /// # Errors
    /// `NotFound` if no such deposit exists for this owner.
    pub async fn delete_task_deposit(
        &self,
        user: &UserId,
        id: &DepositId,
    ) -> Result<DepositOutcome, EngineError> {
        let task_id = self.require_deposit(user, id).await?.task_id;

        let _guard = self.locks.acquire(user, &task_id).await;
        let existing = self.require_deposit(user, id).await?;

        let window = Window::canonical(existing.date, existing.frequency)?;
        let remaining = self.other_occupants(&existing, &window).await?;

        let mut plan = WritePlan::default();
        plan.remove(&existing);
        plan.restore_earner(remaining);

        self.deposits.commit(&plan.changes).await?;

        info!(
            user = %existing.user_id,
            task = %existing.task_id,
            deposit = %existing.id,
            promoted = plan.changes.upserts.len(),
            "Task deposit deleted"
        );

        Ok(plan.into_outcome(existing))
    }

    /// Deposits sharing `deposit`'s window under `frequency`, earliest first.
    pub async fn deposits_for_frequency(
        &self,
        deposit: &TaskDeposit,
        frequency: Frequency,
    ) -> Result<Vec<TaskDeposit>, EngineError> {
        let window = Window::canonical(deposit.date, frequency)?;
        let mut deposits = self
            .deposits
            .deposits_in_window(&deposit.user_id, &deposit.task_id, &window)
            .await?;
        sort_deposits_deterministic(&mut deposits);
        Ok(deposits)
    }

    async fn require_deposit(
        &self,
        user: &UserId,
        id: &DepositId,
    ) -> Result<TaskDeposit, EngineError> {
        self.deposits
            .get_deposit(user, id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("task deposit {}", id)))
    }

    /// Occupants of `window` for `deposit`'s task, excluding `deposit` itself.
    async fn other_occupants(
        &self,
        deposit: &TaskDeposit,
        window: &Window,
    ) -> Result<Vec<TaskDeposit>, EngineError> {
        let occupants = self
            .deposits
            .deposits_in_window(&deposit.user_id, &deposit.task_id, window)
            .await?;
        debug!(
            deposit = %deposit.id,
            window_start = %window.start,
            occupants = occupants.len(),
            "Fetched window occupants"
        );
        Ok(occupants.into_iter().filter(|d| d.id != deposit.id).collect())
    }
}
