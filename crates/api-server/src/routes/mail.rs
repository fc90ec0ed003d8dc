//! Mail API endpoints
//!
//! REST face of the mail store, serving the same lookups the agent's mail
//! tools use.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use ea_core::mail::MailRecord;
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    30
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct FetchRequest {
    pub ids: Vec<String>,
}

type MailResult = Result<Json<Vec<MailRecord>>, (StatusCode, String)>;

fn storage_error(e: ea_core::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

async fn recent(State(state): State<AppState>, Query(query): Query<RecentQuery>) -> MailResult {
    let records = state
        .mail
        .recent(query.limit)
        .await
        .map_err(storage_error)?;
    Ok(Json(records))
}

async fn search(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> MailResult {
    let records = state.mail.search(&query.q).await.map_err(storage_error)?;
    Ok(Json(records))
}

async fn fetch(State(state): State<AppState>, Json(request): Json<FetchRequest>) -> MailResult {
    let records = state
        .mail
        .fetch_by_ids(&request.ids)
        .await
        .map_err(storage_error)?;
    Ok(Json(records))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/emails/recent", get(recent))
        .route("/emails/search", get(search))
        .route("/emails/fetch", post(fetch))
}
