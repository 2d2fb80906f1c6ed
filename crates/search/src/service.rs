//! Cached search facade
//!
//! `SearchService` owns the index, the query processor and the query cache,
//! and is the only place that mutates the index so the cache can be flushed
//! alongside every mutation.

use crate::indexer::{IndexStats, Indexer, IngestOutcome, Tokenizer, TokenizerConfig};
use crate::registry::BookRegistry;
use crate::retrieval::QueryProcessor;
use axiotome_common::cache::QueryCache;
use axiotome_common::config::AppConfig;
use axiotome_common::errors::{AppError, Result};
use axiotome_common::metrics;
use axiotome_common::models::{BookDocument, BookId, QuerySession, SearchResult};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Outcome of one search call
#[derive(Debug, Clone)]
pub struct SearchResponse {
    /// Query and ranked results; the original session when served from cache
    pub session: QuerySession,
    pub cached: bool,
    pub elapsed: Duration,
}

impl SearchResponse {
    pub fn results(&self) -> &[SearchResult] {
        &self.session.results
    }

    pub fn into_results(self) -> Vec<SearchResult> {
        self.session.results
    }
}

/// Search entry point shared by `search_books` and context retrieval
pub struct SearchService {
    indexer: Indexer,
    processor: QueryProcessor,
    cache: QueryCache<QuerySession>,
    default_top_k: usize,
    max_top_k: usize,
    max_query_chars: usize,
}

impl SearchService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            indexer: Indexer::new(Tokenizer::new(TokenizerConfig::from(&config.index))),
            processor: QueryProcessor::from_config(&config.search),
            cache: QueryCache::new(&config.cache, "search"),
            default_top_k: config.search.default_top_k,
            max_top_k: config.search.max_top_k,
            max_query_chars: config.search.max_query_chars,
        }
    }

    /// Ranked lines for `query`; `top_k` defaults to the configured count and
    /// is clamped to the configured maximum
    pub fn search(&self, query: &str, top_k: Option<usize>) -> Result<SearchResponse> {
        let start = Instant::now();

        let query_chars = query.chars().count();
        if query_chars > self.max_query_chars {
            return Err(AppError::invalid(
                "query",
                format!(
                    "Query is {} characters, maximum is {}",
                    query_chars, self.max_query_chars
                ),
            ));
        }

        let top_k = top_k.unwrap_or(self.default_top_k).min(self.max_top_k);
        let terms: BTreeSet<String> = self.indexer.tokenizer().tokenize(query).into_iter().collect();

        if terms.is_empty() || top_k == 0 {
            debug!(query, top_k, "Query has nothing to match");
            return Ok(SearchResponse {
                session: QuerySession::new(query, Vec::new()),
                cached: false,
                elapsed: start.elapsed(),
            });
        }

        let terms: Vec<String> = terms.into_iter().collect();
        let key = format!("{}#{}", terms.join(" "), top_k);
        let snapshot = self.indexer.snapshot();
        let generation = snapshot.generation();

        let (session, cached) = match self.cache.get(&key, generation) {
            Some(session) => (session, true),
            None => {
                let results = self.processor.search(&snapshot, &terms, top_k);
                let session = QuerySession::new(query, results);
                self.cache.insert(key, generation, session.clone());
                (session, false)
            }
        };

        let elapsed = start.elapsed();
        metrics::record_search(elapsed.as_secs_f64(), cached, session.results.len());
        debug!(
            query,
            top_k,
            cached,
            results = session.results.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Search completed"
        );

        Ok(SearchResponse {
            session,
            cached,
            elapsed,
        })
    }

    /// Index `lines` as the text of `book_id`; flushes the cache when the index changed
    pub fn ingest<I, S>(&self, book_id: BookId, lines: I) -> IngestOutcome
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let outcome = self.indexer.ingest(book_id, lines);
        if outcome.changed() {
            self.cache.clear();
        }
        outcome
    }

    /// Remove `book_id` from the index; flushes the cache when it was indexed
    pub fn remove(&self, book_id: BookId) -> bool {
        let removed = self.indexer.remove(book_id);
        if removed {
            self.cache.clear();
        }
        removed
    }

    /// Bring the index in line with `registry`: index every registered book
    /// and drop books the registry no longer knows or holds no text for
    pub fn rebuild(&self, registry: &dyn BookRegistry) -> usize {
        let registered: BTreeSet<BookId> = registry.books().iter().map(|b| b.id).collect();

        let stale: Vec<BookId> = self
            .indexer
            .snapshot()
            .book_ids()
            .filter(|id| !registered.contains(id))
            .collect();
        for book_id in stale {
            self.indexer.remove(book_id);
        }

        let mut indexed = 0;
        for &book_id in &registered {
            let lines = registry.lines(book_id).unwrap_or_default();
            if lines.is_empty() {
                // The registry has no text for it, so neither may the index
                if self.indexer.remove(book_id) {
                    debug!(book_id, "Dropped indexed text the registry no longer holds");
                }
                continue;
            }
            if self.indexer.ingest(book_id, lines) != IngestOutcome::Empty {
                indexed += 1;
            }
        }

        self.cache.clear();
        info!(books = indexed, "Index rebuilt from registry");
        indexed
    }

    pub fn stats(&self) -> IndexStats {
        self.indexer.stats()
    }

    /// Entries currently held by the query cache
    pub fn cached_queries(&self) -> usize {
        self.cache.len()
    }

    /// Indexed text of `book_id`
    pub fn document(&self, book_id: BookId) -> Option<BookDocument> {
        self.indexer.snapshot().document(book_id).cloned()
    }
}

impl Default for SearchService {
    fn default() -> Self {
        Self::new(&AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{InMemoryRegistry, NewBook};
    use std::sync::Arc;

    fn service() -> SearchService {
        let service = SearchService::default();
        service.ingest(1, ["Rust ownership model", "Go goroutines"]);
        service.ingest(2, ["Java streams"]);
        service
    }

    fn keys(response: &SearchResponse) -> Vec<(BookId, usize)> {
        response
            .results()
            .iter()
            .map(|r| (r.book_index, r.line_number))
            .collect()
    }

    #[test]
    fn test_search_books_example() {
        let service = service();

        let response = service.search("ownership", None).unwrap();

        assert_eq!(response.results().len(), 1);
        assert_eq!(keys(&response), vec![(1, 0)]);
        assert!(response.results()[0].context.contains("Rust ownership model"));
        assert!(!response.cached);

        service.remove(2);
        assert!(service.search("java", None).unwrap().results().is_empty());
    }

    #[test]
    fn test_empty_queries() {
        let service = service();

        assert!(service.search("", None).unwrap().results().is_empty());
        assert!(service.search("   ", None).unwrap().results().is_empty());
        assert!(service.search("the of and", None).unwrap().results().is_empty());
        assert!(service.search("rust", Some(0)).unwrap().results().is_empty());
        assert_eq!(service.cached_queries(), 0);
    }

    #[test]
    fn test_overlong_query_rejected() {
        let service = service();
        let query = "rust ".repeat(300);

        let err = service.search(&query, None).unwrap_err();

        assert!(matches!(err, AppError::InvalidInput { .. }));
    }

    #[test]
    fn test_top_k_clamped() {
        let mut config = AppConfig::default();
        config.search.max_top_k = 5;
        let service = SearchService::new(&config);
        service.ingest(1, (0..20).map(|i| format!("rust line {}", i)));

        assert_eq!(service.search("rust", Some(100)).unwrap().results().len(), 5);
        assert_eq!(service.search("rust", Some(3)).unwrap().results().len(), 3);
    }

    #[test]
    fn test_cache_hit_for_equivalent_queries() {
        let service = service();

        let first = service.search("Rust ownership", None).unwrap();
        let second = service.search("ownership,  RUST", None).unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.results(), second.results());
        assert_eq!(first.session.id, second.session.id);
    }

    #[test]
    fn test_mutation_flushes_cache() {
        let service = service();
        assert_eq!(service.search("java", None).unwrap().results().len(), 1);
        assert!(service.search("java", None).unwrap().cached);

        service.ingest(3, ["More Java generics"]);

        let after = service.search("java", None).unwrap();
        assert!(!after.cached);
        assert_eq!(after.results().len(), 2);

        service.remove(3);
        let removed = service.search("java", None).unwrap();
        assert!(!removed.cached);
        assert_eq!(removed.results().len(), 1);
    }

    #[test]
    fn test_unchanged_ingest_keeps_cache() {
        let service = service();
        service.search("java", None).unwrap();

        service.ingest(2, ["Java streams"]);

        assert!(service.search("java", None).unwrap().cached);
    }

    #[test]
    fn test_results_independent_of_ingest_order() {
        let forward = SearchService::default();
        forward.ingest(1, ["borrow checker", "rust borrow"]);
        forward.ingest(2, ["borrow"]);

        let backward = SearchService::default();
        backward.ingest(2, ["borrow"]);
        backward.ingest(1, ["borrow checker", "rust borrow"]);

        let a = forward.search("borrow", None).unwrap();
        let b = backward.search("borrow", None).unwrap();
        assert_eq!(a.results(), b.results());
    }

    #[test]
    fn test_concurrent_searches_match_sequential() {
        let service = Arc::new(SearchService::default());
        for book in 0..10 {
            service.ingest(book, (0..100).map(|i| format!("rust ownership line {} of book {}", i, book)));
        }
        let expected = service.search("ownership book", Some(50)).unwrap().into_results();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let service = Arc::clone(&service);
                    scope.spawn(move || service.search("ownership book", Some(50)).unwrap().into_results())
                })
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }

    #[test]
    fn test_searches_during_ingest_see_whole_books() {
        let mut config = AppConfig::default();
        config.search.max_top_k = 2000;
        let service = Arc::new(SearchService::new(&config));
        service.ingest(0, ["marker line"]);

        std::thread::scope(|scope| {
            let writer = Arc::clone(&service);
            scope.spawn(move || {
                for book in 1..50 {
                    writer.ingest(book, (0..20).map(|_| "marker line"));
                }
            });

            for _ in 0..50 {
                let response = service.search("marker", Some(2000)).unwrap();
                // Every book contributes all 20 lines or none of them
                let partial = response.results().len().saturating_sub(1) % 20;
                assert_eq!(partial, 0);
            }
        });
    }

    #[test]
    fn test_document_follows_index() {
        let service = service();

        let document = service.document(1).unwrap();
        assert_eq!(document.len(), 2);
        assert_eq!(document.line(1).map(|l| l.text.as_str()), Some("Go goroutines"));

        service.remove(1);
        assert!(service.document(1).is_none());
    }

    #[test]
    fn test_rebuild_from_registry() {
        let registry = InMemoryRegistry::new();
        registry.register(NewBook {
            title: "Rust".into(),
            author: None,
            file_path: "/books/rust.pdf".into(),
            total_pages: 10,
            lines: vec!["Rust ownership model".into()],
        });
        let service = service();

        let indexed = service.rebuild(&registry);

        assert_eq!(indexed, 1);
        assert_eq!(service.stats().books, 1);
        assert!(service.search("java", None).unwrap().results().is_empty());
        assert_eq!(service.search("ownership", None).unwrap().results().len(), 1);
    }

    #[test]
    fn test_rebuild_drops_text_registry_lacks() {
        let registry = InMemoryRegistry::new();
        registry.register(NewBook {
            title: "Rust".into(),
            author: None,
            file_path: "/books/rust.pdf".into(),
            total_pages: 10,
            lines: vec![],
        });
        let service = SearchService::default();
        service.ingest(1, ["Rust ownership model"]);
        assert_eq!(service.search("ownership", None).unwrap().results().len(), 1);

        let indexed = service.rebuild(&registry);

        assert_eq!(indexed, 0);
        assert_eq!(service.stats().books, 0);
        assert!(service.search("ownership", None).unwrap().results().is_empty());
    }
}
