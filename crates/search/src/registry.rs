//! Book registry seam
//!
//! The registry owns book metadata and extracted text; the index is derived
//! from it and can always be rebuilt from it.

use axiotome_common::errors::{AppError, Result};
use axiotome_common::models::{BookId, BookRecord};
use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Source of truth for books and their text
pub trait BookRegistry: Send + Sync {
    /// Every registered book, ordered by id
    fn books(&self) -> Vec<BookRecord>;

    /// Extracted text of a book, one entry per line
    fn lines(&self, book_id: BookId) -> Option<Vec<String>>;
}

/// Registration request for a book whose text has already been extracted
#[derive(Debug, Clone, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: Option<String>,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub total_pages: u32,
    pub lines: Vec<String>,
}

struct StoredBook {
    record: BookRecord,
    lines: Arc<Vec<String>>,
}

#[derive(Default)]
struct Shelf {
    books: BTreeMap<BookId, StoredBook>,
    /// Highest id ever handed out; ids are never reissued
    last_id: BookId,
}

/// Process-local registry
#[derive(Default)]
pub struct InMemoryRegistry {
    shelf: RwLock<Shelf>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Shelf> {
        self.shelf.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Shelf> {
        self.shelf.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a book under a fresh id
    pub fn register(&self, book: NewBook) -> BookRecord {
        let mut shelf = self.write();
        shelf.last_id += 1;
        let id = shelf.last_id;

        let record = BookRecord {
            id,
            title: book.title,
            author: book.author,
            file_path: book.file_path,
            added_date: Utc::now(),
            last_read: None,
            current_page: 0,
            total_pages: book.total_pages,
        };

        shelf.books.insert(
            id,
            StoredBook {
                record: record.clone(),
                lines: Arc::new(book.lines),
            },
        );
        record
    }

    /// Insert or replace a book with a caller-chosen id
    pub fn insert(&self, record: BookRecord, lines: Vec<String>) -> Option<BookRecord> {
        let mut shelf = self.write();
        shelf.last_id = shelf.last_id.max(record.id);
        shelf
            .books
            .insert(
                record.id,
                StoredBook {
                    record,
                    lines: Arc::new(lines),
                },
            )
            .map(|previous| previous.record)
    }

    pub fn get(&self, book_id: BookId) -> Option<BookRecord> {
        self.read().books.get(&book_id).map(|b| b.record.clone())
    }

    /// Remove a book, failing with `BookNotFound` for unknown ids
    pub fn unregister(&self, book_id: BookId) -> Result<BookRecord> {
        self.write()
            .books
            .remove(&book_id)
            .map(|b| b.record)
            .ok_or(AppError::BookNotFound { id: book_id })
    }

    pub fn len(&self) -> usize {
        self.read().books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BookRegistry for InMemoryRegistry {
    fn books(&self) -> Vec<BookRecord> {
        self.read().books.values().map(|b| b.record.clone()).collect()
    }

    fn lines(&self, book_id: BookId) -> Option<Vec<String>> {
        self.read().books.get(&book_id).map(|b| b.lines.as_ref().clone())
    }
}
