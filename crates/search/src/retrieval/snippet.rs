//! Snippet extraction around a matching line

use axiotome_common::models::BookDocument;

/// Snippet shaping parameters
#[derive(Debug, Clone, Copy)]
pub struct SnippetOptions {
    /// Adjacent lines on each side of the match
    pub radius: usize,
    /// Character ceiling (0 = unlimited)
    pub max_chars: usize,
}

impl Default for SnippetOptions {
    fn default() -> Self {
        Self {
            radius: 1,
            max_chars: 400,
        }
    }
}

/// Matched line plus its neighbours, joined with `\n` and trimmed around
/// the earliest query term on the matched line when longer than `max_chars`
pub fn extract_snippet(
    document: &BookDocument,
    line_number: usize,
    terms: &[String],
    options: SnippetOptions,
) -> String {
    let lines = document.lines();
    if line_number >= lines.len() {
        return String::new();
    }

    let first = line_number.saturating_sub(options.radius);
    let last = line_number.saturating_add(options.radius).min(lines.len() - 1);

    let mut snippet = String::new();
    let mut match_start = 0;
    let mut focus = 0;
    let mut total_chars = 0;

    for line in &lines[first..=last] {
        if line.line_number > first {
            snippet.push('\n');
            total_chars += 1;
        }
        let chars = line.text.chars().count();
        if line.line_number == line_number {
            match_start = total_chars;
            focus = match first_term(&line.text, terms) {
                Some((offset, len)) => (offset + len / 2).min(chars),
                None => chars / 2,
            };
        }
        snippet.push_str(&line.text);
        total_chars += chars;
    }

    if options.max_chars == 0 || total_chars <= options.max_chars {
        return snippet;
    }

    let center = match_start + focus;
    let start = center
        .saturating_sub(options.max_chars / 2)
        .min(total_chars - options.max_chars);

    snippet.chars().skip(start).take(options.max_chars).collect()
}

/// Char offset and length of the earliest query term in `text`
fn first_term(text: &str, terms: &[String]) -> Option<(usize, usize)> {
    let lowered = text.to_lowercase();
    terms
        .iter()
        .filter(|term| !term.is_empty())
        .filter_map(|term| {
            let byte = lowered.find(term.as_str())?;
            Some((lowered[..byte].chars().count(), term.chars().count()))
        })
        .min()
}
