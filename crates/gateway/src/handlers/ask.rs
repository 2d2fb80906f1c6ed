//! Question answering handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

use super::validation_error;
use crate::AppState;
use axiotome_common::errors::Result;

/// Question request
#[derive(Debug, Deserialize, Validate)]
pub struct AskAiRequest {
    #[validate(length(min = 1, max = 20000))]
    pub question: String,

    /// Caller-selected passages; retrieved from the library when absent
    #[serde(default)]
    #[validate(length(max = 500000))]
    pub context: Option<String>,
}

/// Answer response
#[derive(Debug, Serialize)]
pub struct AskAiResponse {
    pub answer: String,
    pub low_confidence: bool,
    pub context_chars: usize,
    pub attempts: u32,
    pub processing_time_ms: u64,
}

/// Answer a question grounded in the library
pub async fn ask_ai(
    State(state): State<AppState>,
    Json(request): Json<AskAiRequest>,
) -> Result<Json<AskAiResponse>> {
    let start = Instant::now();

    request.validate().map_err(validation_error)?;

    let answer = state
        .ask
        .ask_ai(&request.question, request.context.as_deref())
        .await?;

    Ok(Json(AskAiResponse {
        answer: answer.answer,
        low_confidence: answer.low_confidence,
        context_chars: answer.context_chars,
        attempts: answer.attempts,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}
