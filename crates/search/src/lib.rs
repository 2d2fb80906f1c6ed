//! Axiotome Search
//!
//! Full-text search across a personal book library:
//! - Inverted index with snapshot-swap concurrency
//! - TF-IDF ranked line retrieval with snippets
//! - Generation-aware query result caching
//! - Book registry seam for rebuilding the derived index
//! - Library keeping registry and index changes in step

pub mod indexer;
pub mod library;
pub mod registry;
pub mod retrieval;
pub mod service;

pub use indexer::{IndexStats, Indexer, IngestOutcome, Tokenizer, TokenizerConfig};
pub use library::Library;
pub use registry::{BookRegistry, InMemoryRegistry, NewBook};
pub use retrieval::{QueryProcessor, SnippetOptions};
pub use service::{SearchResponse, SearchService};
