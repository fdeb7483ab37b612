//! Small text utilities shared by the indexing and tagging paths

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-zA-Z][a-zA-Z\-]{2,}").unwrap());

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["the", "and", "with", "from", "into", "that", "this", "have", "will", "been"]
        .into_iter()
        .collect()
});

/// Collapse all whitespace runs to single spaces and trim
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercased word tokens of length >= 3, stopwords removed
pub fn content_words(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|w| !STOPWORDS.contains(w.as_str()))
        .collect()
}

/// Cosine similarity in [-1, 1]; zero for mismatched or empty vectors
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|y| y * y).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}

/// Similarity ratio in [0, 1]: 2*M/T where M is the total length of the
/// longest common blocks and T the combined length. Matches the classic
/// sequence-matcher ratio used for fuzzy tag mapping.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = matching_chars(&a, &b);
    2.0 * matched as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    // Longest common contiguous block, then recurse on both sides
    let (mut best_len, mut best_a, mut best_b) = (0usize, 0usize, 0usize);
    for i in 0..a.len() {
        for j in 0..b.len() {
            let mut k = 0;
            while i + k < a.len() && j + k < b.len() && a[i + k] == b[j + k] {
                k += 1;
            }
            if k > best_len {
                best_len = k;
                best_a = i;
                best_b = j;
            }
        }
    }
    if best_len == 0 {
        return 0;
    }
    best_len
        + matching_chars(&a[..best_a], &b[..best_b])
        + matching_chars(&a[best_a + best_len..], &b[best_b + best_len..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  a\tb\n\nc  "), "a b c");
    }

    #[test]
    fn cosine_of_identical_unit_vectors_is_one() {
        let v = vec![0.6, 0.8];
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-6);
        assert_eq!(cosine(&v, &[1.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn similarity_ratio_matches_known_values() {
        assert_eq!(similarity_ratio("work", "work"), 1.0);
        // "worke" vs "work": M=4, T=9 -> 8/9
        let r = similarity_ratio("worke", "work");
        assert!((r - 8.0 / 9.0).abs() < 1e-9);
        assert_eq!(similarity_ratio("", ""), 1.0);
        assert_eq!(similarity_ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn content_words_drop_stopwords_and_short_tokens() {
        let words = content_words("Ran to the gym and did a workout");
        assert!(words.contains(&"gym".to_string()));
        assert!(words.contains(&"workout".to_string()));
        assert!(!words.contains(&"the".to_string()));
        assert!(!words.contains(&"to".to_string()));
    }
}
