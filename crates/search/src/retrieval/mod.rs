//! Relevance-ranked retrieval over an index snapshot
//!
//! Provides:
//! - Candidate generation from the postings of the query terms
//! - TF-IDF scoring with a deterministic tie-break
//! - Snippet extraction for the surviving hits

mod snippet;

pub use snippet::{extract_snippet, SnippetOptions};

use crate::indexer::IndexSnapshot;
use axiotome_common::config::SearchConfig;
use axiotome_common::models::{BookId, SearchResult};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Scores candidate lines and shapes the top hits into results
#[derive(Debug, Clone, Default)]
pub struct QueryProcessor {
    snippets: SnippetOptions,
}

impl QueryProcessor {
    pub fn new(snippets: SnippetOptions) -> Self {
        Self { snippets }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(SnippetOptions {
            radius: config.snippet_radius,
            max_chars: config.max_snippet_chars,
        })
    }

    /// Rank lines matching any of `terms` and return the best `top_k`
    ///
    /// `terms` may contain duplicates; each distinct term is scored once.
    pub fn search(&self, snapshot: &IndexSnapshot, terms: &[String], top_k: usize) -> Vec<SearchResult> {
        if top_k == 0 || snapshot.total_lines() == 0 {
            return Vec::new();
        }

        let mut distinct: Vec<&str> = terms.iter().map(String::as_str).collect();
        distinct.sort_unstable();
        distinct.dedup();

        let total_lines = snapshot.total_lines() as f64;
        let mut scores: HashMap<(BookId, usize), f64> = HashMap::new();

        // Sorted term order keeps per-line float sums identical across runs
        for term in distinct {
            let postings = snapshot.postings(term);
            if postings.is_empty() {
                continue;
            }
            let idf = inverse_document_frequency(total_lines, postings.len());
            for posting in postings {
                *scores
                    .entry((posting.book_id, posting.line_number))
                    .or_insert(0.0) += f64::from(posting.term_frequency) * idf;
            }
        }

        let mut ranked: Vec<((BookId, usize), f64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| rank_order(a, b));
        ranked.truncate(top_k);

        ranked
            .into_iter()
            .filter_map(|((book_id, line_number), score)| {
                let document = snapshot.document(book_id)?;
                Some(SearchResult {
                    book_index: book_id,
                    line_number,
                    context: extract_snippet(document, line_number, terms, self.snippets),
                    relevance_score: score,
                })
            })
            .collect()
    }
}

/// `ln(N / (df + 1) + 1)`: stays positive even for terms present on every line
fn inverse_document_frequency(total_lines: f64, doc_frequency: usize) -> f64 {
    (total_lines / (doc_frequency as f64 + 1.0) + 1.0).ln()
}

/// Descending score, then ascending (book, line)
fn rank_order(a: &((BookId, usize), f64), b: &((BookId, usize), f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::Indexer;

    fn terms(indexer: &Indexer, query: &str) -> Vec<String> {
        indexer.tokenizer().tokenize(query)
    }

    fn library() -> Indexer {
        let indexer = Indexer::default();
        indexer.ingest(1, ["Rust ownership model", "Go goroutines"]);
        indexer.ingest(2, ["Java streams"]);
        indexer
    }

    #[test]
    fn test_single_match_with_snippet() {
        let indexer = library();
        let processor = QueryProcessor::default();

        let results = processor.search(&indexer.snapshot(), &terms(&indexer, "ownership"), 20);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].book_index, 1);
        assert_eq!(results[0].line_number, 0);
        assert!(results[0].context.contains("Rust ownership model"));
        assert!(results[0].relevance_score > 0.0);
    }

    #[test]
    fn test_results_follow_removal() {
        let indexer = library();
        let processor = QueryProcessor::default();

        indexer.remove(2);

        assert!(processor.search(&indexer.snapshot(), &terms(&indexer, "java"), 20).is_empty());
    }

    #[test]
    fn test_ordering_and_tie_break() {
        let indexer = Indexer::default();
        indexer.ingest(2, ["borrow", "borrow borrow checker"]);
        indexer.ingest(1, ["borrow", "unrelated"]);
        let processor = QueryProcessor::default();

        let results = processor.search(&indexer.snapshot(), &terms(&indexer, "borrow"), 20);

        let keys: Vec<(BookId, usize)> = results.iter().map(|r| (r.book_index, r.line_number)).collect();
        assert_eq!(keys, vec![(2, 1), (1, 0), (2, 0)]);
        for pair in results.windows(2) {
            assert!(pair[0].relevance_score >= pair[1].relevance_score);
        }
    }

    #[test]
    fn test_more_query_terms_rank_higher() {
        let indexer = Indexer::default();
        indexer.ingest(1, ["rust traits", "rust ownership", "ownership in java"]);
        let processor = QueryProcessor::default();

        let results = processor.search(&indexer.snapshot(), &terms(&indexer, "rust ownership"), 20);

        assert_eq!(results[0].line_number, 1);
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_duplicate_terms_scored_once() {
        let indexer = library();
        let processor = QueryProcessor::default();
        let snapshot = indexer.snapshot();

        let once = processor.search(&snapshot, &terms(&indexer, "rust"), 20);
        let twice = processor.search(&snapshot, &terms(&indexer, "rust rust RUST"), 20);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_top_k_truncation() {
        let indexer = Indexer::default();
        indexer.ingest(1, (0..50).map(|i| format!("rust line {}", i)));
        let processor = QueryProcessor::default();
        let snapshot = indexer.snapshot();

        assert_eq!(processor.search(&snapshot, &terms(&indexer, "rust"), 20).len(), 20);
        assert!(processor.search(&snapshot, &terms(&indexer, "rust"), 0).is_empty());
    }

    #[test]
    fn test_unknown_and_empty_terms() {
        let indexer = library();
        let processor = QueryProcessor::default();
        let snapshot = indexer.snapshot();

        assert!(processor.search(&snapshot, &[], 20).is_empty());
        assert!(processor.search(&snapshot, &terms(&indexer, "haskell"), 20).is_empty());
        assert!(processor.search(&IndexSnapshot::default(), &terms(&indexer, "rust"), 20).is_empty());
    }

    #[test]
    fn test_idf_positive() {
        assert!(inverse_document_frequency(1.0, 1) > 0.0);
        assert!(inverse_document_frequency(100.0, 1) > inverse_document_frequency(100.0, 50));
    }
}
