use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::validate::{
    parse_deposit_id, parse_frequency, parse_task_id, parse_timestamp, parse_user_id,
};
use crate::domain::{total_tokens, Decimal, NewTaskDeposit, TaskDeposit, TaskDepositUpdate};
use crate::engine::{TokenChange, Window};
use crate::error::AppError;
use crate::orchestration::DepositReceipt;
use crate::store::DepositFilter;
use chrono::{DateTime, FixedOffset};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDepositRequest {
    pub user_id: String,
    pub task_id: String,
    pub date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDepositRequest {
    pub user_id: String,
    pub date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositsQuery {
    pub user_id: String,
    pub task_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowQuery {
    pub user_id: String,
    pub frequency: Option<String>,
}

/// Body of every mutating deposit response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositResponse {
    pub task_deposit: TaskDeposit,
    pub tokens_added: Decimal,
    pub changed_deposits: Vec<TokenChange>,
    pub balance: Decimal,
}

impl From<DepositReceipt> for DepositResponse {
    fn from(receipt: DepositReceipt) -> Self {
        DepositResponse {
            task_deposit: receipt.outcome.task_deposit,
            tokens_added: receipt.outcome.tokens_added,
            changed_deposits: receipt.outcome.changes,
            balance: receipt.balance,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositsResponse {
    pub total_tokens: Decimal,
    pub deposit_count: usize,
    pub deposits: Vec<TaskDeposit>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowResponse {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub deposits: Vec<TaskDeposit>,
}

pub async fn add_deposit(
    State(state): State<AppState>,
    Json(body): Json<AddDepositRequest>,
) -> Result<(StatusCode, Json<DepositResponse>), AppError> {
    let new = NewTaskDeposit {
        user_id: parse_user_id(&body.user_id)?,
        task_id: parse_task_id(&body.task_id)?,
        date: parse_timestamp(&body.date)?,
    };

    let receipt = state.vice_bank.add_deposit(new).await?;
    Ok((StatusCode::CREATED, Json(receipt.into())))
}

pub async fn list_deposits(
    Query(params): Query<DepositsQuery>,
    State(state): State<AppState>,
) -> Result<Json<DepositsResponse>, AppError> {
    let user = parse_user_id(&params.user_id)?;
    let filter = DepositFilter {
        task_id: params.task_id.as_deref().map(parse_task_id).transpose()?,
        from: params.from.as_deref().map(parse_timestamp).transpose()?,
        to: params.to.as_deref().map(parse_timestamp).transpose()?,
    };
    if let (Some(from), Some(to)) = (filter.from, filter.to) {
        if from > to {
            return Err(AppError::BadRequest("from must be <= to".into()));
        }
    }

    let deposits = state.stores.deposits.list_deposits(&user, &filter).await?;

    Ok(Json(DepositsResponse {
        total_tokens: total_tokens(&deposits),
        deposit_count: deposits.len(),
        deposits,
    }))
}

pub async fn update_deposit(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<UpdateDepositRequest>,
) -> Result<Json<DepositResponse>, AppError> {
    let update = TaskDepositUpdate {
        id: parse_deposit_id(&id)?,
        user_id: parse_user_id(&body.user_id)?,
        date: parse_timestamp(&body.date)?,
    };

    let receipt = state.vice_bank.update_deposit(update).await?;
    Ok(Json(receipt.into()))
}

pub async fn delete_deposit(
    Path(id): Path<String>,
    Query(params): Query<OwnerQuery>,
    State(state): State<AppState>,
) -> Result<Json<DepositResponse>, AppError> {
    let user = parse_user_id(&params.user_id)?;
    let id = parse_deposit_id(&id)?;

    let receipt = state.vice_bank.delete_deposit(&user, &id).await?;
    Ok(Json(receipt.into()))
}

/// Deposits sharing a deposit's window. Defaults to the deposit's own
/// frequency snapshot.
pub async fn get_deposit_window(
    Path(id): Path<String>,
    Query(params): Query<WindowQuery>,
    State(state): State<AppState>,
) -> Result<Json<WindowResponse>, AppError> {
    let user = parse_user_id(&params.user_id)?;
    let id = parse_deposit_id(&id)?;

    let deposit = state
        .stores
        .deposits
        .get_deposit(&user, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("task deposit {}", id)))?;
    let frequency = match params.frequency.as_deref() {
        Some(raw) => parse_frequency(raw)?,
        None => deposit.frequency,
    };

    let window = Window::canonical(deposit.date, frequency)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let deposits = state
        .vice_bank
        .engine()
        .deposits_for_frequency(&deposit, frequency)
        .await?;

    Ok(Json(WindowResponse {
        start: window.start,
        end: window.end,
        deposits,
    }))
}
