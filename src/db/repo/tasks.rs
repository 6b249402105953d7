use super::{parse_decimal, parse_frequency, Repository};
use crate::domain::{Task, TaskId, UserId};
use crate::store::{StoreError, TaskStore};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

fn row_to_task(row: &SqliteRow) -> Result<Task, StoreError> {
    let id: String = row.try_get("id")?;
    let frequency: String = row.try_get("frequency")?;
    let conversion_rate: String = row.try_get("conversion_rate")?;

    Ok(Task {
        frequency: parse_frequency(&id, &frequency)?,
        conversion_rate: parse_decimal(&id, "conversion_rate", &conversion_rate)?,
        user_id: UserId::new(row.try_get("user_id")?),
        name: row.try_get("name")?,
        id: TaskId::new(id),
    })
}

#[async_trait]
impl TaskStore for Repository {
    async fn get_task(&self, user: &UserId, id: &TaskId) -> Result<Option<Task>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, name, frequency, conversion_rate
            FROM tasks
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(id.as_str())
        .bind(user.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_task).transpose()
    }

    async fn list_tasks(&self, user: &UserId) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, name, frequency, conversion_rate
            FROM tasks
            WHERE user_id = ?
            ORDER BY name ASC, id ASC
            "#,
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_task).collect()
    }

    async fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO tasks (id, user_id, name, frequency, conversion_rate, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(task.id.as_str())
        .bind(task.user_id.as_str())
        .bind(&task.name)
        .bind(task.frequency.as_str())
        .bind(task.conversion_rate.to_canonical_string())
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_task(&self, task: &Task) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET name = ?, frequency = ?, conversion_rate = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(&task.name)
        .bind(task.frequency.as_str())
        .bind(task.conversion_rate.to_canonical_string())
        .bind(task.id.as_str())
        .bind(task.user_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_task(&self, user: &UserId, id: &TaskId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ? AND user_id = ?")
            .bind(id.as_str())
            .bind(user.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
