//! Small stop-word list for Historian keyword extraction (spec.md §4.8:
//! "lowercased tokens ≥ 4 characters, stop words removed"). Deliberately
//! short — this is query-keyword filtering, not general NLP.

const STOPWORDS: &[&str] = &[
    "what", "when", "where", "which", "that", "this", "those", "these", "does", "have", "with",
    "from", "about", "into", "their", "there", "would", "could", "should", "been", "were",
];

#[must_use]
pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}
