//! Tokenizer shared by ingestion and query processing
//!
//! Provides:
//! - Lowercasing and Unicode-aware splitting on non-alphanumeric boundaries
//! - Optional English stopword removal
//! - Overlapping character bigrams for CJK runs (scripts written without spaces)
//!
//! Tokenizing never fails: unusual input degrades to whatever tokens can be
//! recovered from it.

use axiotome_common::config::IndexConfig;
use std::collections::HashSet;

/// Tokenizer configuration
#[derive(Debug, Clone)]
pub struct TokenizerConfig {
    /// Drop common English function words
    pub remove_stopwords: bool,

    /// Split CJK runs into overlapping bigrams
    pub cjk_bigrams: bool,

    /// Minimum length of a non-CJK token in characters
    pub min_token_chars: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            remove_stopwords: true,
            cjk_bigrams: true,
            min_token_chars: 1,
        }
    }
}

impl From<&IndexConfig> for TokenizerConfig {
    fn from(config: &IndexConfig) -> Self {
        Self {
            remove_stopwords: config.remove_stopwords,
            cjk_bigrams: config.cjk_bigrams,
            min_token_chars: config.min_token_chars.max(1),
        }
    }
}

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been",
    "in", "on", "at", "to", "for", "of", "with", "by", "from",
    "and", "or", "but", "not", "this", "that", "these", "those",
    "it", "its", "as", "do", "does", "did", "has", "have", "had",
    "can", "could", "will", "would", "should", "may", "might",
    "what", "which", "who", "how", "why", "when", "i", "me", "my",
];

/// Deterministic text tokenizer
#[derive(Debug, Clone)]
pub struct Tokenizer {
    config: TokenizerConfig,
    stop_words: HashSet<&'static str>,
}

impl Tokenizer {
    /// Create a new tokenizer
    pub fn new(config: TokenizerConfig) -> Self {
        let stop_words = if config.remove_stopwords {
            STOP_WORDS.iter().copied().collect()
        } else {
            HashSet::new()
        };

        Self { config, stop_words }
    }

    /// Split `text` into index terms, in order of appearance (duplicates kept)
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut word = String::new();
        let mut cjk_run: Vec<char> = Vec::new();

        for c in text.chars() {
            if self.config.cjk_bigrams && c.is_alphanumeric() && is_cjk(c) {
                self.flush_word(&mut word, &mut tokens);
                cjk_run.push(c);
            } else if c.is_alphanumeric() {
                flush_cjk(&mut cjk_run, &mut tokens);
                word.extend(c.to_lowercase());
            } else {
                self.flush_word(&mut word, &mut tokens);
                flush_cjk(&mut cjk_run, &mut tokens);
            }
        }
        self.flush_word(&mut word, &mut tokens);
        flush_cjk(&mut cjk_run, &mut tokens);

        tokens
    }

    /// Canonical form of a query: sorted distinct terms joined by spaces
    pub fn normalize(&self, text: &str) -> String {
        let mut terms = self.tokenize(text);
        terms.sort();
        terms.dedup();
        terms.join(" ")
    }

    fn flush_word(&self, word: &mut String, tokens: &mut Vec<String>) {
        if word.is_empty() {
            return;
        }
        let keep = word.chars().count() >= self.config.min_token_chars
            && !self.stop_words.contains(word.as_str());
        if keep {
            tokens.push(std::mem::take(word));
        } else {
            word.clear();
        }
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(TokenizerConfig::default())
    }
}

fn flush_cjk(run: &mut Vec<char>, tokens: &mut Vec<String>) {
    match run.len() {
        0 => {}
        1 => tokens.push(run[0].to_string()),
        _ => tokens.extend(run.windows(2).map(|pair| pair.iter().collect::<String>())),
    }
    run.clear();
}

/// Ideographs, kana and hangul: scripts that do not separate words with spaces
fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{309F}'     // Hiragana
        | '\u{30A0}'..='\u{30FF}'   // Katakana
        | '\u{31F0}'..='\u{31FF}'   // Katakana phonetic extensions
        | '\u{3400}'..='\u{4DBF}'   // CJK extension A
        | '\u{4E00}'..='\u{9FFF}'   // CJK unified ideographs
        | '\u{AC00}'..='\u{D7AF}'   // Hangul syllables
        | '\u{F900}'..='\u{FAFF}'   // CJK compatibility ideographs
        | '\u{FF66}'..='\u{FF9F}'   // Halfwidth katakana
        | '\u{20000}'..='\u{2A6DF}' // CJK extension B
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_and_split() {
        let tokenizer = Tokenizer::default();

        assert_eq!(
            tokenizer.tokenize("Rust ownership-model, v2!"),
            vec!["rust", "ownership", "model", "v2"]
        );
    }

    #[test]
    fn test_stopwords_removed() {
        let tokenizer = Tokenizer::default();

        assert_eq!(tokenizer.tokenize("What is the ownership of a value"), vec!["ownership", "value"]);
    }

    #[test]
    fn test_stopwords_kept_when_disabled() {
        let tokenizer = Tokenizer::new(TokenizerConfig {
            remove_stopwords: false,
            ..TokenizerConfig::default()
        });

        assert_eq!(tokenizer.tokenize("the borrow"), vec!["the", "borrow"]);
    }

    #[test]
    fn test_unicode_letters() {
        let tokenizer = Tokenizer::default();

        assert_eq!(tokenizer.tokenize("Ñandú ÜBER straße"), vec!["ñandú", "über", "straße"]);
    }

    #[test]
    fn test_cjk_bigrams() {
        let tokenizer = Tokenizer::default();

        assert_eq!(tokenizer.tokenize("所有権システム"), vec![
            "所有", "有権", "権シ", "シス", "ステ", "テム"
        ]);
        assert_eq!(tokenizer.tokenize("Rustは安全"), vec!["rust", "は安", "安全"]);
        assert_eq!(tokenizer.tokenize("型。"), vec!["型"]);
    }

    #[test]
    fn test_cjk_runs_kept_whole_when_disabled() {
        let tokenizer = Tokenizer::new(TokenizerConfig {
            cjk_bigrams: false,
            ..TokenizerConfig::default()
        });

        assert_eq!(tokenizer.tokenize("所有権システム。"), vec!["所有権システム"]);
    }

    #[test]
    fn test_degenerate_input() {
        let tokenizer = Tokenizer::default();

        assert!(tokenizer.tokenize("").is_empty());
        assert!(tokenizer.tokenize("   \t\n").is_empty());
        assert!(tokenizer.tokenize("--- *** ///").is_empty());
        assert_eq!(tokenizer.tokenize("\u{FFFD}rust\u{0000}"), vec!["rust"]);
    }

    #[test]
    fn test_min_token_chars() {
        let tokenizer = Tokenizer::new(TokenizerConfig {
            min_token_chars: 3,
            ..TokenizerConfig::default()
        });

        assert_eq!(tokenizer.tokenize("c go rust"), vec!["rust"]);
    }

    #[test]
    fn test_deterministic_normalize() {
        let tokenizer = Tokenizer::default();

        assert_eq!(tokenizer.normalize("Rust  rust OWNERSHIP"), "ownership rust");
        assert_eq!(tokenizer.normalize("ownership, Rust"), tokenizer.normalize("rust ownership"));
        assert_eq!(tokenizer.normalize("   "), "");
    }
}
