//! Book registration handlers
//!
//! Registering a book indexes its lines; deleting it removes them.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validation_error;
use crate::AppState;
use axiotome_common::{
    errors::Result,
    models::{BookId, BookRecord},
};
use axiotome_search::{IngestOutcome, NewBook};

/// Request to register a book with its extracted text
#[derive(Debug, Deserialize, Validate)]
pub struct AddBookRequest {
    #[validate(length(min = 1, max = 1000))]
    pub title: String,

    #[validate(length(max = 1000))]
    pub author: Option<String>,

    #[serde(default)]
    pub file_path: String,

    #[serde(default)]
    pub total_pages: u32,

    /// Extracted text, one entry per line
    #[serde(default)]
    pub lines: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AddBookResponse {
    pub book: BookRecord,
    pub index: IngestOutcome,
}

/// Register a book and index its text
pub async fn add_book(
    State(state): State<AppState>,
    Json(request): Json<AddBookRequest>,
) -> Result<(StatusCode, Json<AddBookResponse>)> {
    request.validate().map_err(validation_error)?;

    let (book, index) = state.library.add_book(NewBook {
        title: request.title,
        author: request.author,
        file_path: request.file_path,
        total_pages: request.total_pages,
        lines: request.lines,
    });

    Ok((StatusCode::CREATED, Json(AddBookResponse { book, index })))
}

/// List registered books
pub async fn list_books(State(state): State<AppState>) -> Json<Vec<BookRecord>> {
    Json(state.library.books())
}

/// Unregister a book and drop it from the index
pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<BookId>,
) -> Result<StatusCode> {
    state.library.delete_book(id)?;
    Ok(StatusCode::NO_CONTENT)
}
