//! Summary handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

use super::validation_error;
use crate::AppState;
use axiotome_common::{
    errors::{AppError, Result},
    models::BookId,
};
use axiotome_context::SummaryTarget;

/// Summary request: exactly one of `book_id` or `text`
#[derive(Debug, Deserialize, Validate)]
pub struct SummarizeRequest {
    #[serde(default)]
    pub book_id: Option<BookId>,

    #[serde(default)]
    #[validate(length(max = 500000))]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub summary: String,
    pub source_chars: usize,
    pub truncated: bool,
    pub attempts: u32,
    pub processing_time_ms: u64,
}

/// Summarize a registered book or a supplied text
pub async fn summarize(
    State(state): State<AppState>,
    Json(request): Json<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>> {
    let start = Instant::now();

    request.validate().map_err(validation_error)?;

    let target = match (request.book_id, request.text) {
        (Some(book_id), None) => SummaryTarget::Book(book_id),
        (None, Some(text)) => SummaryTarget::Text(text),
        _ => {
            return Err(AppError::invalid(
                "book_id",
                "Provide exactly one of book_id or text",
            ))
        }
    };

    let summary = state.ask.summarize(target).await?;

    Ok(Json(SummarizeResponse {
        summary: summary.summary,
        source_chars: summary.source_chars,
        truncated: summary.truncated,
        attempts: summary.attempts,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}
