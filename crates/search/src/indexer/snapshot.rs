//! Immutable index snapshots
//!
//! A snapshot is never mutated once published. Writers derive the next
//! snapshot from the current one, sharing every posting list the mutation
//! does not touch.

use super::tokenizer::Tokenizer;
use axiotome_common::models::{BookDocument, BookId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Occurrence of a term on one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub book_id: BookId,
    pub line_number: usize,
    /// Occurrences of the term on this line
    pub term_frequency: u32,
}

/// A book as stored in a snapshot: its text plus the terms it contributed
#[derive(Debug, PartialEq)]
struct IndexedBook {
    document: BookDocument,
    terms: Vec<String>,
}

/// Postings for a single book, built outside the writer lock
#[derive(Debug)]
pub(crate) struct PreparedBook {
    document: BookDocument,
    postings: BTreeMap<String, Vec<Posting>>,
}

impl PreparedBook {
    pub(crate) fn build(document: BookDocument, tokenizer: &Tokenizer) -> Self {
        let book_id = document.book_id();
        let mut postings: BTreeMap<String, Vec<Posting>> = BTreeMap::new();

        for line in document.lines() {
            let mut counts: BTreeMap<String, u32> = BTreeMap::new();
            for token in tokenizer.tokenize(&line.text) {
                *counts.entry(token).or_insert(0) += 1;
            }
            for (term, term_frequency) in counts {
                postings.entry(term).or_default().push(Posting {
                    book_id,
                    line_number: line.line_number,
                    term_frequency,
                });
            }
        }

        Self { document, postings }
    }

    pub(crate) fn document(&self) -> &BookDocument {
        &self.document
    }

    pub(crate) fn term_count(&self) -> usize {
        self.postings.len()
    }
}

/// Point-in-time view of the whole index
#[derive(Debug, Clone, Default)]
pub struct IndexSnapshot {
    /// Term -> postings sorted by (book_id, line_number)
    postings: HashMap<String, Arc<Vec<Posting>>>,
    books: BTreeMap<BookId, Arc<IndexedBook>>,
    total_lines: usize,
    generation: u64,
}

impl IndexSnapshot {
    /// Postings for `term`, empty when the term is unknown
    pub fn postings(&self, term: &str) -> &[Posting] {
        self.postings.get(term).map(|p| p.as_slice()).unwrap_or(&[])
    }

    /// Number of lines containing `term`
    pub fn doc_frequency(&self, term: &str) -> usize {
        self.postings(term).len()
    }

    pub fn document(&self, book_id: BookId) -> Option<&BookDocument> {
        self.books.get(&book_id).map(|b| &b.document)
    }

    pub fn contains_book(&self, book_id: BookId) -> bool {
        self.books.contains_key(&book_id)
    }

    pub fn book_ids(&self) -> impl Iterator<Item = BookId> + '_ {
        self.books.keys().copied()
    }

    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    pub fn total_lines(&self) -> usize {
        self.total_lines
    }

    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Same books, text and postings; generation is ignored
    pub fn same_content(&self, other: &IndexSnapshot) -> bool {
        self.total_lines == other.total_lines
            && self.postings == other.postings
            && self.books == other.books
    }

    /// Next snapshot with `book` replacing any previous version of it
    pub(crate) fn with_book(&self, book: PreparedBook) -> IndexSnapshot {
        let book_id = book.document.book_id();
        let mut next = self.clone();
        next.drop_book(book_id);

        let terms: Vec<String> = book.postings.keys().cloned().collect();
        for (term, postings) in book.postings {
            let list = Arc::make_mut(next.postings.entry(term).or_default());
            let at = list.partition_point(|p| p.book_id < book_id);
            list.splice(at..at, postings);
        }

        next.total_lines += book.document.len();
        next.books.insert(
            book_id,
            Arc::new(IndexedBook {
                document: book.document,
                terms,
            }),
        );
        next.generation = self.generation + 1;
        next
    }

    /// Next snapshot without `book_id`, or `None` when it is not indexed
    pub(crate) fn without_book(&self, book_id: BookId) -> Option<IndexSnapshot> {
        if !self.contains_book(book_id) {
            return None;
        }
        let mut next = self.clone();
        next.drop_book(book_id);
        next.generation = self.generation + 1;
        Some(next)
    }

    fn drop_book(&mut self, book_id: BookId) {
        let Some(book) = self.books.remove(&book_id) else {
            return;
        };

        for term in &book.terms {
            let Some(shared) = self.postings.get_mut(term) else {
                continue;
            };
            let list = Arc::make_mut(shared);
            let start = list.partition_point(|p| p.book_id < book_id);
            let end = list.partition_point(|p| p.book_id <= book_id);
            list.drain(start..end);
            if list.is_empty() {
                self.postings.remove(term);
            }
        }

        self.total_lines -= book.document.len();
    }
}
