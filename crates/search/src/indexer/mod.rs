//! Inverted index over book lines
//!
//! Provides:
//! - Tokenization shared by ingestion and querying
//! - Idempotent per-book ingest and removal
//! - Snapshot-swap publication: one writer at a time, readers never block
//!   on a writer and never observe a partial ingest

mod snapshot;
mod tokenizer;

pub use snapshot::{IndexSnapshot, Posting};
pub use tokenizer::{Tokenizer, TokenizerConfig};

use axiotome_common::metrics;
use axiotome_common::models::{BookDocument, BookId};
use serde::Serialize;
use snapshot::PreparedBook;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

/// Result of an ingest call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// A new snapshot was published
    Indexed { lines: usize, terms: usize },
    /// The book was already indexed with identical text
    Unchanged,
    /// No lines were supplied; existing postings are kept
    Empty,
}

impl IngestOutcome {
    /// True when the published index changed
    pub fn changed(&self) -> bool {
        matches!(self, IngestOutcome::Indexed { .. })
    }
}

/// Index size summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub books: usize,
    pub lines: usize,
    pub terms: usize,
    pub generation: u64,
}

/// Multi-book inverted index
pub struct Indexer {
    tokenizer: Tokenizer,
    current: RwLock<Arc<IndexSnapshot>>,
    writer: Mutex<()>,
}

impl Indexer {
    /// Create an empty index
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self {
            tokenizer,
            current: RwLock::new(Arc::new(IndexSnapshot::default())),
            writer: Mutex::new(()),
        }
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Current published snapshot
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        // Published snapshots are immutable, so a poisoned lock still guards a valid value
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Index `lines` as the full text of `book_id`, replacing any previous version
    pub fn ingest<I, S>(&self, book_id: BookId, lines: I) -> IngestOutcome
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let document = BookDocument::new(book_id, lines);
        if document.is_empty() {
            debug!(book_id, "Ignoring ingest without lines");
            return IngestOutcome::Empty;
        }

        let prepared = PreparedBook::build(document, &self.tokenizer);

        let _writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let current = self.snapshot();

        if current
            .document(book_id)
            .is_some_and(|existing| existing.same_text(prepared.document()))
        {
            debug!(book_id, "Book already indexed with identical text");
            return IngestOutcome::Unchanged;
        }

        let lines = prepared.document().len();
        let terms = prepared.term_count();
        let next = current.with_book(prepared);
        let generation = next.generation();
        metrics::record_index_mutation("ingest", next.total_lines(), next.term_count());
        self.publish(next);

        info!(book_id, lines, terms, generation, "Indexed book");

        IngestOutcome::Indexed { lines, terms }
    }

    /// Drop every posting for `book_id`; returns false when it was not indexed
    pub fn remove(&self, book_id: BookId) -> bool {
        let _writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let current = self.snapshot();

        let Some(next) = current.without_book(book_id) else {
            debug!(book_id, "Remove for unknown book ignored");
            return false;
        };

        let lines = current.total_lines() - next.total_lines();
        let generation = next.generation();
        metrics::record_index_mutation("remove", next.total_lines(), next.term_count());
        self.publish(next);

        info!(book_id, lines, generation, "Removed book from index");

        true
    }

    pub fn stats(&self) -> IndexStats {
        let snapshot = self.snapshot();
        IndexStats {
            books: snapshot.book_count(),
            lines: snapshot.total_lines(),
            terms: snapshot.term_count(),
            generation: snapshot.generation(),
        }
    }

    fn publish(&self, next: IndexSnapshot) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(next);
    }
}

impl Default for Indexer {
    fn default() -> Self {
        Self::new(Tokenizer::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_then_remove() {
        let indexer = Indexer::default();

        let outcome = indexer.ingest(1, ["Rust ownership model", "Go goroutines"]);
        assert_eq!(outcome, IngestOutcome::Indexed { lines: 2, terms: 5 });
        assert_eq!(indexer.snapshot().postings("ownership").len(), 1);

        assert!(indexer.remove(1));
        assert!(indexer.snapshot().postings("ownership").is_empty());
        assert_eq!(indexer.stats().lines, 0);
        assert!(!indexer.remove(1));
    }

    #[test]
    fn test_ingest_idempotent() {
        let indexer = Indexer::default();
        indexer.ingest(1, ["Rust ownership model"]);
        let first = indexer.snapshot();

        assert_eq!(indexer.ingest(1, ["Rust ownership model"]), IngestOutcome::Unchanged);

        let second = indexer.snapshot();
        assert!(first.same_content(&second));
        assert_eq!(first.generation(), second.generation());
    }

    #[test]
    fn test_reingest_replaces_postings() {
        let indexer = Indexer::default();
        indexer.ingest(1, ["Rust ownership model"]);

        indexer.ingest(1, ["Borrow checker"]);

        let snapshot = indexer.snapshot();
        assert!(snapshot.postings("ownership").is_empty());
        assert_eq!(snapshot.postings("borrow").len(), 1);
        assert_eq!(snapshot.total_lines(), 1);
    }

    #[test]
    fn test_replacement_equals_fresh_ingest() {
        let replaced = Indexer::default();
        replaced.ingest(1, ["Java streams"]);
        replaced.ingest(2, ["Rust traits"]);
        replaced.ingest(1, ["Rust ownership model"]);

        let fresh = Indexer::default();
        fresh.ingest(2, ["Rust traits"]);
        fresh.ingest(1, ["Rust ownership model"]);

        assert!(replaced.snapshot().same_content(&fresh.snapshot()));
    }

    #[test]
    fn test_empty_ingest_keeps_existing_book() {
        let indexer = Indexer::default();
        indexer.ingest(1, ["Rust ownership model"]);

        assert_eq!(indexer.ingest(1, Vec::<String>::new()), IngestOutcome::Empty);
        assert_eq!(indexer.snapshot().postings("rust").len(), 1);
    }

    #[test]
    fn test_readers_keep_old_snapshot() {
        let indexer = Indexer::default();
        indexer.ingest(1, ["Rust ownership model"]);
        let before = indexer.snapshot();

        indexer.remove(1);

        assert_eq!(before.postings("rust").len(), 1);
        assert!(indexer.snapshot().postings("rust").is_empty());
    }

    #[test]
    fn test_stats_generation_advances() {
        let indexer = Indexer::default();
        assert_eq!(indexer.stats().generation, 0);

        indexer.ingest(1, ["a line"]);
        indexer.ingest(2, ["another line"]);
        indexer.remove(2);

        let stats = indexer.stats();
        assert_eq!(stats.books, 1);
        assert_eq!(stats.generation, 3);
    }
}
