//! Context Assembler - Packs ranked snippets into a bounded prompt context
//!
//! Provides:
//! - Greedy packing in ranking order under a character budget
//! - Skip-and-continue for snippets that would overflow
//! - Hard truncation of an oversized leading snippet
//!
//! All lengths are counted in `char`s, so truncation never splits a
//! UTF-8 sequence.

use crate::models::SearchResult;

/// Separator placed between packed snippets; counts toward the budget
pub const SNIPPET_SEPARATOR: &str = "\n\n";

/// Context assembler
#[derive(Debug, Clone, Default)]
pub struct ContextAssembler;

impl ContextAssembler {
    /// Create a new context assembler
    pub fn new() -> Self {
        Self
    }

    /// Pack result snippets into at most `budget` characters.
    ///
    /// Returns the assembled text and how many results were included.
    pub fn assemble(&self, results: &[SearchResult], budget: usize) -> (String, usize) {
        self.assemble_snippets(results.iter().map(|r| r.context.as_str()), budget)
    }

    /// Pack arbitrary snippets, in order, into at most `budget` characters
    pub fn assemble_snippets<'a, I>(&self, snippets: I, budget: usize) -> (String, usize)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let separator_len = SNIPPET_SEPARATOR.chars().count();

        let mut text = String::new();
        let mut len = 0usize;
        let mut used = 0usize;

        if budget == 0 {
            return (text, used);
        }

        for snippet in snippets {
            if snippet.is_empty() {
                continue;
            }
            let snippet_len = snippet.chars().count();

            if used == 0 {
                if snippet_len > budget {
                    // Leading snippet alone overflows: keep its head, budget is now full
                    text.extend(snippet.chars().take(budget));
                    return (text, 1);
                }
                text.push_str(snippet);
                len = snippet_len;
                used = 1;
                continue;
            }

            let needed = separator_len + snippet_len;
            if len + needed <= budget {
                text.push_str(SNIPPET_SEPARATOR);
                text.push_str(snippet);
                len += needed;
                used += 1;
            }
        }

        (text, used)
    }

    /// Apply the assembly rule to a single caller-supplied context
    pub fn truncate(&self, context: &str, budget: usize) -> String {
        if context.chars().count() <= budget {
            return context.to_string();
        }
        self.assemble_snippets(std::iter::once(context), budget).0
    }
}

/// Length of `text` in characters
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
