//! Turns document text into the term -> frequency map a memtable insert
//! needs (spec §4.5). The host format this was distilled from tokenizes
//! via a Postgres text-search configuration; this crate takes a
//! `Tokenizer` implementation instead so it has no dependency on a
//! specific host.

use std::collections::HashMap;

/// Tokenizes a document's text into term occurrences.
pub trait Tokenizer: Send + Sync {
    /// Returns each term and how many times it occurs, plus the total
    /// token count (which may exceed the sum of frequencies if the
    /// tokenizer drops stopwords but still counts them toward length).
    fn tokenize(&self, text: &str) -> (HashMap<String, u16>, u32);
}

/// Splits on Unicode whitespace and lowercases; no stemming or stopword
/// removal. Adequate for tests and as the CLI's default.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> (HashMap<String, u16>, u32) {
        let mut freqs: HashMap<String, u16> = HashMap::new();
        let mut total = 0u32;
        for word in text.split_whitespace() {
            let term: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(|c| c.to_lowercase())
                .collect();
            if term.is_empty() {
                continue;
            }
            total += 1;
            let count = freqs.entry(term).or_insert(0);
            *count = count.saturating_add(1);
        }
        (freqs, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_repeated_terms() {
        let (freqs, total) = WhitespaceTokenizer.tokenize("the Cat sat on the cat mat");
        assert_eq!(total, 7);
        assert_eq!(freqs["the"], 2);
        assert_eq!(freqs["cat"], 2);
        assert_eq!(freqs["mat"], 1);
    }

    #[test]
    fn strips_punctuation() {
        let (freqs, _) = WhitespaceTokenizer.tokenize("hello, world!");
        assert!(freqs.contains_key("hello"));
        assert!(freqs.contains_key("world"));
    }

    #[test]
    fn empty_text_yields_no_terms() {
        let (freqs, total) = WhitespaceTokenizer.tokenize("   ");
        assert!(freqs.is_empty());
        assert_eq!(total, 0);
    }
}
