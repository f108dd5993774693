//! Query and description tokenization for trigger matching.

use unicode_normalization::UnicodeNormalization;

/// Words too common to carry matching signal.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "for", "how", "in", "is", "of", "on", "or", "the", "to", "use",
    "when", "with",
];

/// Lowercase, NFKC-normalize, and split into alphanumeric tokens.
/// Single-character tokens and stopwords are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized: String = text.nfkc().collect::<String>().to_lowercase();
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2 && !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Token stream joined back into a canonical phrase, the unit of exact
/// phrase matching.
pub fn phrase(text: &str) -> String {
    tokenize(text).join(" ")
}

/// Light suffix stripping so "patterns" meets "pattern" and "testing"
/// meets "tests". Not a real stemmer; deterministic by construction.
pub fn stem(token: &str) -> String {
    for suffix in ["ing", "ed", "es", "s"] {
        if let Some(stripped) = token.strip_suffix(suffix) {
            if stripped.len() >= 3 {
                return stripped.to_string();
            }
        }
    }
    token.to_string()
}

/// Tokenize and stem in one pass.
pub fn stems(text: &str) -> Vec<String> {
    tokenize(text).iter().map(|t| stem(t)).collect()
}
