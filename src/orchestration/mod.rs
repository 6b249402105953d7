//! Coordination between the reconciliation engine and token balances.

pub mod vice_bank;

pub use vice_bank::{DepositReceipt, OrchestrationError, ViceBank};
