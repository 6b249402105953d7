use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::api::AppState;
use crate::domain::validate::{
    check_conversion_rate, parse_frequency, parse_task_id, parse_task_name, parse_user_id,
};
use crate::domain::{Decimal, Frequency, Task};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    pub user_id: String,
    pub name: String,
    pub frequency: String,
    pub conversion_rate: Decimal,
}

struct TaskFields {
    name: String,
    frequency: Frequency,
    conversion_rate: Decimal,
}

impl TaskRequest {
    fn fields(&self) -> Result<TaskFields, AppError> {
        Ok(TaskFields {
            name: parse_task_name(&self.name)?,
            frequency: parse_frequency(&self.frequency)?,
            conversion_rate: check_conversion_rate(self.conversion_rate)?,
        })
    }
}

pub async fn create_task(
    State(state): State<AppState>,
    Json(body): Json<TaskRequest>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let user = parse_user_id(&body.user_id)?;
    let fields = body.fields()?;
    let task = Task::new(user, fields.name, fields.frequency, fields.conversion_rate);

    state.stores.tasks.insert_task(&task).await?;
    tracing::info!(user = %task.user_id, task = %task.id, "Task created");

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn list_tasks(
    Query(params): Query<OwnerQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Task>>, AppError> {
    let user = parse_user_id(&params.user_id)?;
    let tasks = state.stores.tasks.list_tasks(&user).await?;
    Ok(Json(tasks))
}

pub async fn get_task(
    Path(id): Path<String>,
    Query(params): Query<OwnerQuery>,
    State(state): State<AppState>,
) -> Result<Json<Task>, AppError> {
    let user = parse_user_id(&params.user_id)?;
    let id = parse_task_id(&id)?;

    state
        .stores
        .tasks
        .get_task(&user, &id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("task {}", id)))
}

/// Replace a task's fields. Existing deposits keep their snapshots.
pub async fn update_task(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<TaskRequest>,
) -> Result<Json<Task>, AppError> {
    let fields = body.fields()?;
    let task = Task {
        id: parse_task_id(&id)?,
        user_id: parse_user_id(&body.user_id)?,
        name: fields.name,
        frequency: fields.frequency,
        conversion_rate: fields.conversion_rate,
    };

    if !state.stores.tasks.update_task(&task).await? {
        return Err(AppError::NotFound(format!("task {}", task.id)));
    }
    Ok(Json(task))
}

pub async fn delete_task(
    Path(id): Path<String>,
    Query(params): Query<OwnerQuery>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let user = parse_user_id(&params.user_id)?;
    let id = parse_task_id(&id)?;

    if !state.stores.tasks.delete_task(&user, &id).await? {
        return Err(AppError::NotFound(format!("task {}", id)));
    }
    tracing::info!(user = %user, task = %id, "Task deleted");
    Ok(StatusCode::NO_CONTENT)
}
