//! Search handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validation_error;
use crate::AppState;
use axiotome_common::{errors::Result, models::SearchResult};

/// Search request
#[derive(Debug, Deserialize, Validate)]
pub struct SearchBooksRequest {
    #[validate(length(max = 10000))]
    pub query: String,

    /// Maximum results to return (defaults to the configured count)
    #[serde(default)]
    #[validate(range(max = 10000))]
    pub top_k: Option<usize>,
}

/// Search response
#[derive(Debug, Serialize)]
pub struct SearchBooksResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
    pub total_results: usize,
    pub cached: bool,
    pub processing_time_ms: u64,
}

/// Full-text search across every indexed book
pub async fn search_books(
    State(state): State<AppState>,
    Json(request): Json<SearchBooksRequest>,
) -> Result<Json<SearchBooksResponse>> {
    request.validate().map_err(validation_error)?;

    let response = state.search.search(&request.query, request.top_k)?;
    let processing_time_ms = response.elapsed.as_millis() as u64;
    let cached = response.cached;
    let results = response.into_results();

    tracing::info!(
        query = %request.query,
        results = results.len(),
        cached,
        latency_ms = processing_time_ms,
        "Search completed"
    );

    Ok(Json(SearchBooksResponse {
        query: request.query,
        total_results: results.len(),
        results,
        cached,
        processing_time_ms,
    }))
}
