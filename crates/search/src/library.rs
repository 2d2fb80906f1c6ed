//! Registry and index kept in step
//!
//! Every change to the set of registered books goes through `Library`, which
//! applies the registry change and the matching index change under one lock.
//! The index therefore never holds postings for a book the registry dropped.

use crate::indexer::IngestOutcome;
use crate::registry::{BookRegistry, InMemoryRegistry, NewBook};
use crate::service::SearchService;
use axiotome_common::errors::Result;
use axiotome_common::models::{BookId, BookRecord};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

pub struct Library {
    registry: InMemoryRegistry,
    search: Arc<SearchService>,
    writer: Mutex<()>,
}

impl Library {
    pub fn new(registry: InMemoryRegistry, search: Arc<SearchService>) -> Self {
        Self {
            registry,
            search,
            writer: Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a book and index its text
    pub fn add_book(&self, book: NewBook) -> (BookRecord, IngestOutcome) {
        let _guard = self.lock();
        let lines = book.lines.clone();
        let record = self.registry.register(book);
        let outcome = self.search.ingest(record.id, lines);
        info!(book_id = record.id, title = %record.title, "Book registered");
        (record, outcome)
    }

    /// Unregister a book and drop its postings
    pub fn delete_book(&self, book_id: BookId) -> Result<BookRecord> {
        let _guard = self.lock();
        let record = self.registry.unregister(book_id)?;
        self.search.remove(book_id);
        info!(book_id, "Book deleted");
        Ok(record)
    }

    pub fn books(&self) -> Vec<BookRecord> {
        self.registry.books()
    }

    /// Rebuild the index from the registry
    pub fn rebuild(&self) -> usize {
        let _guard = self.lock();
        self.search.rebuild(&self.registry)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}
