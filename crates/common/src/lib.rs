//! Axiotome Common Library
//!
//! Shared code for the Axiotome search and answering core including:
//! - Domain models (books, lines, search results, answers)
//! - Error types and handling
//! - Configuration management
//! - Query result caching
//! - Context assembly and answer synthesis
//! - Metrics and observability

pub mod cache;
pub mod config;
pub mod context;
pub mod errors;
pub mod metrics;
pub mod models;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use models::{Answer, BookDocument, BookId, BookRecord, Line, QuerySession, SearchResult};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
