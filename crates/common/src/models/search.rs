//! Search results, query sessions and answers

use super::BookId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A ranked line hit produced by a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Book the line belongs to
    pub book_index: BookId,

    /// Zero-based line number within the book
    pub line_number: usize,

    /// Snippet around the matching line
    pub context: String,

    /// TF-IDF relevance (>= 0, higher is better)
    pub relevance_score: f64,
}

/// Ephemeral record of one query and what it produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySession {
    pub id: Uuid,

    pub query: String,

    pub timestamp: DateTime<Utc>,

    pub results: Vec<SearchResult>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<Answer>,
}

impl QuerySession {
    /// Start a session for `query` with the results it produced
    pub fn new(query: impl Into<String>, results: Vec<SearchResult>) -> Self {
        Self {
            id: Uuid::now_v7(),
            query: query.into(),
            timestamp: Utc::now(),
            results,
            answer: None,
        }
    }

    pub fn with_answer(mut self, answer: Answer) -> Self {
        self.answer = Some(answer);
        self
    }
}

/// Synthesized answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Model output, unmodified
    pub answer: String,

    /// Set when no context grounded the prompt
    pub low_confidence: bool,

    /// Characters of context sent to the model
    pub context_chars: usize,

    /// Model calls made, retries included
    pub attempts: u32,
}

/// Synthesized summary of a book or a caller-supplied text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub summary: String,

    /// Characters of source text sent to the model
    pub source_chars: usize,

    /// Set when the source was cut to fit the prompt ceiling
    pub truncated: bool,

    pub attempts: u32,
}
