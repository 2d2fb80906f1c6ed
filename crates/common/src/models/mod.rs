//! Domain models
//!
//! Plain data shared by the search and answering crates

mod book;
mod search;

pub use book::{BookDocument, BookId, BookRecord, Line};
pub use search::{Answer, QuerySession, SearchResult, Summary};
