//! Task deposit operations for the repository.

use super::{parse_date, parse_decimal, parse_frequency, Repository};
use crate::domain::{DepositId, TaskDeposit, TaskId, UserId};
use crate::engine::Window;
use crate::store::{DepositChanges, DepositFilter, DepositStore, StoreError};
use async_trait::async_trait;
use chrono::SecondsFormat;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

const DEPOSIT_COLUMNS: &str =
    "id, user_id, task_id, date, task_name, conversion_rate, frequency, tokens_earned";

fn row_to_deposit(row: &SqliteRow) -> Result<TaskDeposit, StoreError> {
    let id: String = row.try_get("id")?;
    let date: String = row.try_get("date")?;
    let conversion_rate: String = row.try_get("conversion_rate")?;
    let frequency: String = row.try_get("frequency")?;
    let tokens_earned: String = row.try_get("tokens_earned")?;

    Ok(TaskDeposit {
        date: parse_date(&id, &date)?,
        conversion_rate: parse_decimal(&id, "conversion_rate", &conversion_rate)?,
        frequency: parse_frequency(&id, &frequency)?,
        tokens_earned: parse_decimal(&id, "tokens_earned", &tokens_earned)?,
        user_id: UserId::new(row.try_get("user_id")?),
        task_id: TaskId::new(row.try_get("task_id")?),
        task_name: row.try_get("task_name")?,
        id: DepositId::new(id),
    })
}

#[async_trait]
impl DepositStore for Repository {
    async fn get_deposit(
        &self,
        user: &UserId,
        id: &DepositId,
    ) -> Result<Option<TaskDeposit>, StoreError> {
        let sql = format!(
            "SELECT {} FROM task_deposits WHERE id = ? AND user_id = ?",
            DEPOSIT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .bind(user.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_deposit).transpose()
    }

    async fn deposits_in_window(
        &self,
        user: &UserId,
        task: &TaskId,
        window: &Window,
    ) -> Result<Vec<TaskDeposit>, StoreError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM task_deposits
            WHERE user_id = ? AND task_id = ? AND time_ms BETWEEN ? AND ?
            ORDER BY time_ms ASC, id ASC
            "#,
            DEPOSIT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user.as_str())
            .bind(task.as_str())
            .bind(window.start_ms())
            .bind(window.end_ms())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_deposit).collect()
    }

    async fn list_deposits(
        &self,
        user: &UserId,
        filter: &DepositFilter,
    ) -> Result<Vec<TaskDeposit>, StoreError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM task_deposits
            WHERE user_id = ?
              AND (? IS NULL OR task_id = ?)
              AND (? IS NULL OR time_ms >= ?)
              AND (? IS NULL OR time_ms <= ?)
            ORDER BY time_ms ASC, id ASC
            "#,
            DEPOSIT_COLUMNS
        );
        let task_id = filter.task_id.as_ref().map(|t| t.as_str());
        let from = filter.from.map(|f| f.timestamp_millis());
        let to = filter.to.map(|t| t.timestamp_millis());

        let rows = sqlx::query(&sql)
            .bind(user.as_str())
            .bind(task_id)
            .bind(task_id)
            .bind(from)
            .bind(from)
            .bind(to)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_deposit).collect()
    }

    async fn commit(&self, changes: &DepositChanges) -> Result<(), StoreError> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for id in &changes.removals {
            sqlx::query("DELETE FROM task_deposits WHERE id = ?")
                .bind(id.as_str())
                .execute(&mut *tx)
                .await?;
        }

        for deposit in &changes.upserts {
            sqlx::query(
                r#"
                INSERT INTO task_deposits (
                    id, user_id, task_id, date, time_ms, task_name,
                    conversion_rate, frequency, tokens_earned
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    date = excluded.date,
                    time_ms = excluded.time_ms,
                    tokens_earned = excluded.tokens_earned
                "#,
            )
            .bind(deposit.id.as_str())
            .bind(deposit.user_id.as_str())
            .bind(deposit.task_id.as_str())
            .bind(deposit.date.to_rfc3339_opts(SecondsFormat::Millis, false))
            .bind(deposit.time_ms())
            .bind(&deposit.task_name)
            .bind(deposit.conversion_rate.to_canonical_string())
            .bind(deposit.frequency.as_str())
            .bind(deposit.tokens_earned.to_canonical_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(
            upserts = changes.upserts.len(),
            removals = changes.removals.len(),
            "Committed deposit changes"
        );
        Ok(())
    }
}
