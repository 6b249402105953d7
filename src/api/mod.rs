pub mod balance;
pub mod deposits;
pub mod health;
pub mod tasks;

use crate::config::StorageBackend;
use crate::orchestration::ViceBank;
use crate::store::Stores;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub vice_bank: Arc<ViceBank>,
    pub storage: StorageBackend,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/tasks", post(tasks::create_task).get(tasks::list_tasks))
        .route(
            "/v1/tasks/:id",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route(
            "/v1/deposits",
            post(deposits::add_deposit).get(deposits::list_deposits),
        )
        .route(
            "/v1/deposits/:id",
            axum::routing::put(deposits::update_deposit).delete(deposits::delete_deposit),
        )
        .route("/v1/deposits/:id/window", get(deposits::get_deposit_window))
        .route("/v1/balance", get(balance::get_balance))
        .layer(cors)
        .with_state(state)
}
