//! Lexical fallback search over cached document previews.
//!
//! Runs only when the vector index returns nothing for a question. It
//! extracts keywords from the question, pulls short windows around their
//! occurrences in each document's preview, and ranks the surviving
//! documents by total snippet length. Explicitly approximate — a
//! degraded-mode fallback, not a primary ranking method.

use crate::chunk::floor_char_boundary;
use crate::models::ContextPassage;

/// Question words carrying no retrieval signal.
const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "of", "to", "in", "for", "on", "with", "at", "by", "from",
    "as", "is", "are", "was", "were", "be", "been", "it", "this", "that", "these", "those", "i",
    "you", "we", "they", "he", "she",
];

/// Occurrences extracted per keyword per document, at most.
const MAX_HITS_PER_KEYWORD: usize = 2;
/// Characters kept on each side of a keyword hit.
const SNIPPET_SPAN: usize = 160;
/// Candidate documents returned, at most.
const MAX_CANDIDATES: usize = 5;
/// Snippets joined into one candidate's text, at most.
const MAX_SNIPPETS_PER_DOC: usize = 3;

/// A document preview the fallback can scan.
#[derive(Debug, Clone)]
pub struct PreviewEntry {
    pub doc_id: String,
    /// Display name of the parent document (its id when unresolvable).
    pub name: String,
    pub preview: String,
}

/// Extract lowercase keywords from a question: runs of `[a-z0-9+/.-]` of
/// length ≥ 3, minus the stop-word set.
pub fn keywordize(question: &str) -> Vec<String> {
    let lower = question.to_lowercase();
    let mut tokens = Vec::new();
    let mut current = String::new();

    let mut push = |token: &mut String| {
        if token.len() >= 3 && !STOP_WORDS.contains(&token.as_str()) {
            tokens.push(std::mem::take(token));
        } else {
            token.clear();
        }
    };

    for ch in lower.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '+' | '/' | '.' | '-') {
            current.push(ch);
        } else if !current.is_empty() {
            push(&mut current);
        }
    }
    if !current.is_empty() {
        push(&mut current);
    }
    tokens
}

/// Locate up to [`MAX_HITS_PER_KEYWORD`] case-insensitive occurrences of
/// `keyword` in `text` and cut a fixed-radius window around each, clipped
/// to the text bounds.
///
/// Matching runs over a lowercase copy; case folding can shift byte
/// offsets for non-ASCII text, so the window edges are snapped back to
/// char boundaries of the original.
fn extract_snippets(text: &str, keyword: &str) -> Vec<String> {
    let haystack = text.to_lowercase();
    let mut out = Vec::new();
    let mut from = 0usize;

    while out.len() < MAX_HITS_PER_KEYWORD {
        let Some(pos) = haystack.get(from..).and_then(|rest| rest.find(keyword)) else {
            break;
        };
        let hit = from + pos;
        let start = floor_char_boundary(text, hit.saturating_sub(SNIPPET_SPAN));
        let end = floor_char_boundary(text, (hit + keyword.len() + SNIPPET_SPAN).min(text.len()));
        if start < end && end <= text.len() {
            out.push(text[start..end].to_string());
        }
        from = hit + keyword.len().max(1);
    }
    out
}

/// Rank preview candidates for a question when vector search found
/// nothing. Returns up to [`MAX_CANDIDATES`] passages with synthetic ids
/// (`lex-0`, `lex-1`, …) and a 0-based `order`, shaped like vector
/// results for downstream uniformity.
///
/// Ranking is by concatenated-snippet length descending, with no
/// normalization by document size or keyword frequency.
pub fn lexical_fallback(question: &str, previews: &[PreviewEntry]) -> Vec<ContextPassage> {
    let keywords = keywordize(question);
    if keywords.is_empty() {
        return Vec::new();
    }

    struct Candidate {
        doc_id: String,
        name: String,
        text: String,
    }

    let mut candidates: Vec<Candidate> = Vec::new();
    for entry in previews {
        let mut snippets: Vec<String> = Vec::new();
        let mut hits = 0usize;
        for keyword in &keywords {
            for snippet in extract_snippets(&entry.preview, keyword) {
                hits += 1;
                if !snippets.contains(&snippet) {
                    snippets.push(snippet);
                }
            }
        }
        if hits == 0 {
            continue;
        }
        snippets.truncate(MAX_SNIPPETS_PER_DOC);
        candidates.push(Candidate {
            doc_id: entry.doc_id.clone(),
            name: entry.name.clone(),
            text: snippets.join("\n"),
        });
    }

    candidates.sort_by(|a, b| b.text.len().cmp(&a.text.len()));
    candidates.truncate(MAX_CANDIDATES);

    candidates
        .into_iter()
        .enumerate()
        .map(|(i, c)| ContextPassage {
            id: format!("lex-{i}"),
            doc_id: c.doc_id,
            doc_name: c.name,
            order: i as u32,
            text: c.text,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(doc_id: &str, preview: &str) -> PreviewEntry {
        PreviewEntry {
            doc_id: doc_id.to_string(),
            name: format!("{doc_id}.txt"),
            preview: preview.to_string(),
        }
    }

    #[test]
    fn keywordize_drops_stop_words_and_short_tokens() {
        let keywords = keywordize("What is the capital of France?");
        assert_eq!(keywords, vec!["what", "capital", "france"]);
    }

    #[test]
    fn keywordize_keeps_symbol_tokens() {
        let keywords = keywordize("explain c++ and tcp/ip v1.2");
        assert!(keywords.contains(&"c++".to_string()));
        assert!(keywords.contains(&"tcp/ip".to_string()));
        assert!(keywords.contains(&"v1.2".to_string()));
    }

    #[test]
    fn at_most_two_occurrences_per_keyword() {
        // three occurrences of "zebra", spaced beyond the snippet radius
        let filler = "x".repeat(400);
        let preview = format!("zebra {filler} zebra {filler} zebra");
        let snippets = extract_snippets(&preview, "zebra");
        assert_eq!(snippets.len(), 2);
    }

    #[test]
    fn snippet_window_is_clipped_to_bounds() {
        let snippets = extract_snippets("zebra at the start", "zebra");
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0], "zebra at the start");
    }

    #[test]
    fn matching_is_case_insensitive() {
        let snippets = extract_snippets("The Zebra stands.", "zebra");
        assert_eq!(snippets.len(), 1);
        assert!(snippets[0].contains("Zebra"));
    }

    #[test]
    fn documents_without_hits_are_excluded() {
        let previews = vec![
            entry("d1", "all about zebras and savannas"),
            entry("d2", "nothing relevant here"),
        ];
        let results = lexical_fallback("tell me about zebras", &previews);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].doc_id, "d1");
    }

    #[test]
    fn top_five_by_snippet_length_with_synthetic_ids() {
        let previews: Vec<PreviewEntry> = (0..7)
            .map(|i| {
                let body = "zebra ".repeat(i + 1);
                entry(&format!("d{i}"), &body)
            })
            .collect();
        let results = lexical_fallback("zebra", &previews);
        assert_eq!(results.len(), 5);
        for (i, passage) in results.iter().enumerate() {
            assert_eq!(passage.id, format!("lex-{i}"));
            assert_eq!(passage.order, i as u32);
        }
        // longest concatenated snippets first
        assert_eq!(results[0].doc_id, "d6");
    }

    #[test]
    fn no_keywords_means_no_candidates() {
        let previews = vec![entry("d1", "it is in the of")];
        assert!(lexical_fallback("is it in?", &previews).is_empty());
    }
}
