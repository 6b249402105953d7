//! Token-earning engine: window arithmetic, credit reassignment and the
//! reconciliation of deposit adds, moves and deletes.

use crate::domain::ValidationError;
use crate::store::StoreError;
use thiserror::Error;

pub mod locks;
pub mod reassign;
pub mod reconcile;
pub mod window;

pub use locks::TaskLocks;
pub use reassign::reassign;
pub use reconcile::{DepositOutcome, ReconciliationEngine, TokenChange};
pub use window::{Window, WindowError};

#[derive(Debug, Error)]
pub enum EngineError {
    /// The referenced task or deposit does not exist for this owner.
    #[error("Not found: {0}")]
    NotFound(String),
    /// Malformed input that slipped past the request boundary.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Storage failure: {0}")]
    Internal(#[from] StoreError),
}

impl From<WindowError> for EngineError {
    fn from(err: WindowError) -> Self {
        EngineError::InvalidInput(err.to_string())
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::InvalidInput(err.to_string())
    }
}
