//! Approximate retrieval over a single conversation thread.
//!
//! - `levenshtein`: full and bounded edit distance over Unicode scalar values
//! - `RetrievalEngine`: fuzzy search that renders prompt-ready snippets

pub mod engine;
pub mod levenshtein;

pub use engine::{RetrievalEngine, filter_within_distance, sanitize_query};
pub use levenshtein::{levenshtein, levenshtein_within};
