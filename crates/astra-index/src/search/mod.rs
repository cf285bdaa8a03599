//! Lexical search structures: TF-IDF term postings and trigram postings.

pub mod tfidf;
pub mod trigram;

pub use tfidf::TfIdfIndex;
pub use trigram::{trigrams, TrigramIndex, TrigramPosting};
