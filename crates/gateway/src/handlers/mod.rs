//! API handlers module

pub mod ask;
pub mod books;
pub mod health;
pub mod search;
pub mod summarize;

use axiotome_common::errors::AppError;
use validator::ValidationErrors;

/// Map request validation failures onto `InvalidInput`, naming the first offending field
pub(crate) fn validation_error(errors: ValidationErrors) -> AppError {
    let field = errors.field_errors().keys().next().map(|f| f.to_string());
    AppError::InvalidInput {
        message: errors.to_string(),
        field,
    }
}
