//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;
use axiotome_common::VERSION;
use axiotome_search::IndexStats;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub service: String,
    pub registered_books: usize,
    pub index: IndexStats,
    pub cached_queries: usize,
    pub model: String,
    pub asks_in_flight: usize,
    pub asks_waiting: usize,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: VERSION.to_string(),
    })
}

/// Readiness probe - reports index size and answer load
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let gate = state.ask.gate();

    Json(ReadyResponse {
        status: "ready".to_string(),
        service: state.config.observability.service_name.clone(),
        registered_books: state.library.len(),
        index: state.search.stats(),
        cached_queries: state.search.cached_queries(),
        model: state.ask.model_name().to_string(),
        asks_in_flight: gate.in_flight(),
        asks_waiting: gate.waiting(),
    })
}
