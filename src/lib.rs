pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod store;

pub use config::{Config, StorageBackend};
pub use db::{init_db, Repository};
pub use domain::{
    Decimal, DepositId, Frequency, NewTaskDeposit, Task, TaskDeposit, TaskDepositUpdate, TaskId,
    UserId,
};
pub use engine::{DepositOutcome, EngineError, ReconciliationEngine, TokenChange};
pub use error::AppError;
pub use orchestration::{DepositReceipt, ViceBank};
pub use store::{JsonFileStore, MemoryStore, Stores};

use std::sync::Arc;

/// Open the storage backend selected by `config`.
pub async fn open_stores(config: &Config) -> Result<Stores, AppError> {
    match config.storage {
        StorageBackend::Sqlite => {
            let path = config
                .database_path
                .as_deref()
                .ok_or_else(|| AppError::Config("DATABASE_PATH is not set".into()))?;
            let pool = init_db(path).await.map_err(|e| {
                AppError::Config(format!("failed to initialize database {}: {}", path, e))
            })?;
            Ok(Stores::from_backend(Arc::new(Repository::new(pool))))
        }
        StorageBackend::Json => {
            let path = config
                .data_file
                .as_deref()
                .ok_or_else(|| AppError::Config("DATA_FILE is not set".into()))?;
            let store = JsonFileStore::open(path).await.map_err(|e| {
                AppError::Config(format!("failed to open data file {}: {}", path, e))
            })?;
            Ok(Stores::from_backend(Arc::new(store)))
        }
        StorageBackend::Memory => Ok(Stores::from_backend(Arc::new(MemoryStore::new()))),
    }
}

/// Wire the engine and balance propagation over `stores`.
pub fn build_state(stores: Stores, storage: StorageBackend) -> api::AppState {
    let engine = Arc::new(ReconciliationEngine::new(
        stores.tasks.clone(),
        stores.deposits.clone(),
    ));
    let vice_bank = Arc::new(ViceBank::new(engine, stores.balances.clone()));
    api::AppState {
        stores,
        vice_bank,
        storage,
    }
}
