use crate::domain::{Decimal, DepositId, NewTaskDeposit, TaskDepositUpdate, UserId};
use crate::engine::{DepositOutcome, EngineError, ReconciliationEngine};
use crate::store::{BalanceStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// An engine outcome together with the owner's balance after it was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositReceipt {
    pub outcome: DepositOutcome,
    pub balance: Decimal,
}

/// Runs deposit operations through the engine, then carries the net token
/// change over to the owner's balance.
///
/// The two steps are not transactional. When the balance write fails the
/// deposit change stays committed and the unapplied delta is logged.
#[derive(Clone)]
pub struct ViceBank {
    engine: Arc<ReconciliationEngine>,
    balances: Arc<dyn BalanceStore>,
}

impl ViceBank {
    pub fn new(engine: Arc<ReconciliationEngine>, balances: Arc<dyn BalanceStore>) -> Self {
        Self { engine, balances }
    }

    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }

    pub async fn add_deposit(
        &self,
        new: NewTaskDeposit,
    ) -> Result<DepositReceipt, OrchestrationError> {
        let user = new.user_id.clone();
        let outcome = self.engine.add_task_deposit(new).await?;
        self.settle(&user, outcome).await
    }

    pub async fn update_deposit(
        &self,
        update: TaskDepositUpdate,
    ) -> Result<DepositReceipt, OrchestrationError> {
        let user = update.user_id.clone();
        let outcome = self.engine.update_task_deposit(update).await?;
        self.settle(&user, outcome).await
    }

    pub async fn delete_deposit(
        &self,
        user: &UserId,
        id: &DepositId,
    ) -> Result<DepositReceipt, OrchestrationError> {
        let outcome = self.engine.delete_task_deposit(user, id).await?;
        self.settle(user, outcome).await
    }

    async fn settle(
        &self,
        user: &UserId,
        outcome: DepositOutcome,
    ) -> Result<DepositReceipt, OrchestrationError> {
        let delta = outcome.tokens_added;
        match self.apply_delta(user, delta).await {
            Ok(balance) => Ok(DepositReceipt { outcome, balance }),
            Err(err) => {
                error!(
                    user = %user,
                    deposit = %outcome.task_deposit.id,
                    unapplied_delta = %delta,
                    error = %err,
                    "Balance update failed after deposit change was committed"
                );
                Err(OrchestrationError::Balance(err))
            }
        }
    }

    async fn apply_delta(&self, user: &UserId, delta: Decimal) -> Result<Decimal, StoreError> {
        if delta.is_zero() {
            return self.balances.get_balance(user).await;
        }

        let balance = self.balances.add_to_balance(user, delta).await?;
        info!(user = %user, delta = %delta, balance = %balance, "Token balance updated");
        Ok(balance)
    }
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("balance update failed: {0}")]
    Balance(StoreError),
}
