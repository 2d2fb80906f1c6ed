//! Book records and their extracted text

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Book identifier as assigned by the book registry
pub type BookId = i64;

/// Registry-side book metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: BookId,

    pub title: String,

    pub author: Option<String>,

    /// Location of the source PDF
    pub file_path: String,

    pub added_date: DateTime<Utc>,

    pub last_read: Option<DateTime<Utc>>,

    pub current_page: u32,

    pub total_pages: u32,
}

/// One line of extracted book text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    /// Zero-based position within the book
    pub line_number: usize,
    pub text: String,
}

/// Immutable, ordered text of a single book
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDocument {
    book_id: BookId,
    lines: Arc<[Line]>,
}

impl BookDocument {
    /// Build a document, numbering lines from zero in the given order
    pub fn new<I, S>(book_id: BookId, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<Line> = lines
            .into_iter()
            .enumerate()
            .map(|(line_number, text)| Line {
                line_number,
                text: text.into(),
            })
            .collect();

        Self {
            book_id,
            lines: lines.into(),
        }
    }

    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn line(&self, line_number: usize) -> Option<&Line> {
        self.lines.get(line_number)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// True when both documents hold the same text, line for line
    pub fn same_text(&self, other: &BookDocument) -> bool {
        self.lines.len() == other.lines.len()
            && self
                .lines
                .iter()
                .zip(other.lines.iter())
                .all(|(a, b)| a.text == b.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_numbered_in_order() {
        let doc = BookDocument::new(7, ["Rust ownership model", "Go goroutines"]);

        assert_eq!(doc.book_id(), 7);
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.line(1).map(|l| l.line_number), Some(1));
        assert_eq!(doc.line(1).map(|l| l.text.as_str()), Some("Go goroutines"));
        assert!(doc.line(2).is_none());
    }

    #[test]
    fn test_same_text_ignores_book_id() {
        let a = BookDocument::new(1, ["a", "b"]);
        let b = BookDocument::new(2, ["a", "b"]);
        let c = BookDocument::new(1, ["a", "c"]);

        assert!(a.same_text(&b));
        assert!(!a.same_text(&c));
    }
}
