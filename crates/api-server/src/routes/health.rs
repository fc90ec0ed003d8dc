//! Health check endpoints

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    active_sessions: usize,
    active_connections: usize,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    sessions: Vec<String>,
    connection_count: usize,
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        active_sessions: state.registry.len().await,
        active_connections: state.fanout.connection_count().await,
    })
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        sessions: state.registry.list_ids().await,
        connection_count: state.fanout.connection_count().await,
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(status))
        .route("/health", get(health))
}
