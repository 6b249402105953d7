//! Repository layer for SQLite persistence.
//!
//! `Repository` implements every storage trait of [`crate::store`].
//! Methods are organized across submodules by domain:
//! - `tasks.rs` - Task registry
//! - `deposits.rs` - Task deposits and atomic change sets
//! - `balances.rs` - Token balances

mod balances;
mod deposits;
mod tasks;

use crate::domain::{Decimal, Frequency};
use crate::store::StoreError;
use chrono::{DateTime, FixedOffset};
use sqlx::sqlite::SqlitePool;
use std::str::FromStr;

/// Repository for database operations.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse_decimal(id: &str, column: &str, raw: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str(raw).map_err(|e| StoreError::Corrupt {
        id: id.to_string(),
        reason: format!("{} '{}': {}", column, raw, e),
    })
}

fn parse_frequency(id: &str, raw: &str) -> Result<Frequency, StoreError> {
    Frequency::from_str(raw).map_err(|e| StoreError::Corrupt {
        id: id.to_string(),
        reason: e.to_string(),
    })
}

fn parse_date(id: &str, raw: &str) -> Result<DateTime<FixedOffset>, StoreError> {
    DateTime::parse_from_rfc3339(raw).map_err(|e| StoreError::Corrupt {
        id: id.to_string(),
        reason: format!("date '{}': {}", raw, e),
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Repository;
    use crate::db::migrations::init_db;
    use tempfile::TempDir;

    pub async fn setup_test_db() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_helpers_report_corrupt_rows() {
        assert!(matches!(
            parse_decimal("d1", "tokens_earned", "abc"),
            Err(StoreError::Corrupt { .. })
        ));
        assert!(parse_frequency("t1", "hourly").is_err());
        assert!(parse_date("d1", "2024-13-01").is_err());
        assert_eq!(
            parse_decimal("d1", "tokens_earned", "1.50").unwrap(),
            Decimal::from_str("1.5").unwrap()
        );
    }
}
