//! TF-IDF term index over whole files.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Inverted term index with a document-frequency vocabulary.
///
/// Call [`TfIdfIndex::finalize`] once after the last document is added;
/// `idf` values are computed there and cached.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TfIdfIndex {
    /// term -> (document -> term frequency)
    postings: HashMap<String, BTreeMap<String, usize>>,
    /// term -> inverse document frequency
    idf: HashMap<String, f64>,
    /// document -> length in tokens
    doc_lengths: BTreeMap<String, usize>,
    /// Cached document count
    num_docs: usize,
}

impl TfIdfIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenize text into terms
    pub fn tokenize(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|s| s.chars().count() > 1)
            .map(String::from)
            .collect()
    }

    /// Add a document. Re-adding an id replaces its postings.
    pub fn add_document(&mut self, id: &str, text: &str) {
        if self.doc_lengths.contains_key(id) {
            self.remove_document(id);
        }

        let tokens = Self::tokenize(text);
        self.doc_lengths.insert(id.to_string(), tokens.len());
        for token in tokens {
            *self
                .postings
                .entry(token)
                .or_default()
                .entry(id.to_string())
                .or_insert(0) += 1;
        }
    }

    /// Remove a document from the index
    pub fn remove_document(&mut self, id: &str) -> bool {
        if self.doc_lengths.remove(id).is_none() {
            return false;
        }
        self.postings.retain(|_, docs| {
            docs.remove(id);
            !docs.is_empty()
        });
        true
    }

    /// Compute `idf = ln((N + 1) / (df + 1)) + 1` for every term.
    pub fn finalize(&mut self) {
        self.num_docs = self.doc_lengths.len();
        let n = self.num_docs as f64;
        self.idf = self
            .postings
            .iter()
            .map(|(term, docs)| {
                let df = docs.len() as f64;
                (term.clone(), ((n + 1.0) / (df + 1.0)).ln() + 1.0)
            })
            .collect();
    }

    /// Cached inverse document frequency of a term (0 if unknown).
    pub fn idf(&self, term: &str) -> f64 {
        self.idf.get(&term.to_lowercase()).copied().unwrap_or(0.0)
    }

    /// Number of documents containing `term`.
    pub fn document_frequency(&self, term: &str) -> usize {
        self.postings
            .get(&term.to_lowercase())
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    /// Search the index and return ranked `(document, score)` pairs.
    ///
    /// Score is the sum of `tf * idf` over query terms. Equal scores are
    /// ordered by document id.
    pub fn search(&self, query: &str, limit: usize) -> Vec<(String, f64)> {
        let query_terms = Self::tokenize(query);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let mut scores: BTreeMap<&str, f64> = BTreeMap::new();
        for term in &query_terms {
            let Some(docs) = self.postings.get(term) else {
                continue;
            };
            let idf = self.idf.get(term).copied().unwrap_or(0.0);
            for (doc, tf) in docs {
                *scores.entry(doc.as_str()).or_insert(0.0) += *tf as f64 * idf;
            }
        }

        let mut ranked: Vec<(String, f64)> = scores
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .map(|(doc, score)| (doc.to_string(), score))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked.truncate(limit);
        ranked
    }

    /// Cached document count (as of the last `finalize`).
    pub fn num_docs(&self) -> usize {
        self.num_docs
    }

    /// Number of distinct terms.
    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    pub fn len(&self) -> usize {
        self.doc_lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_lengths.is_empty()
    }

    /// Clear the entire index
    pub fn clear(&mut self) {
        self.postings.clear();
        self.idf.clear();
        self.doc_lengths.clear();
        self.num_docs = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(docs: &[(&str, &str)]) -> TfIdfIndex {
        let mut index = TfIdfIndex::new();
        for (id, text) in docs {
            index.add_document(id, text);
        }
        index.finalize();
        index
    }

    #[test]
    fn test_tokenize() {
        let tokens = TfIdfIndex::tokenize("Hello, World! This is a test_function.");
        assert!(tokens.contains(&"hello".to_string()));
        assert!(tokens.contains(&"world".to_string()));
        assert!(tokens.contains(&"test_function".to_string()));
        assert!(!tokens.contains(&"a".to_string()));
    }

    #[test]
    fn test_tokenize_code() {
        let tokens = TfIdfIndex::tokenize("fn main() { let x = 42; }");
        assert_eq!(tokens, vec!["fn", "main", "let", "42"]);
    }

    #[test]
    fn test_idf_formula() {
        let index = index_of(&[("a", "rust code"), ("b", "rust docs"), ("c", "python")]);
        assert_eq!(index.num_docs(), 3);
        // rust: df = 2, N = 3
        let expected = (4.0f64 / 3.0).ln() + 1.0;
        assert!((index.idf("rust") - expected).abs() < 1e-9);
        assert!((index.idf("RUST") - expected).abs() < 1e-9);
        assert!(index.idf("python") > index.idf("rust"));
        assert_eq!(index.idf("missing"), 0.0);
    }

    #[test]
    fn test_search_ranking() {
        let index = index_of(&[
            ("1", "rust programming language"),
            ("2", "rust rust rust"),
            ("3", "python programming"),
        ]);
        let results = index.search("rust", 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "2");
    }

    #[test]
    fn test_ties_ordered_by_id() {
        let index = index_of(&[("b.rs", "payment"), ("a.rs", "payment"), ("c.rs", "other")]);
        let results = index.search("payment", 10);
        let ids: Vec<_> = results.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["a.rs", "b.rs"]);
    }

    #[test]
    fn test_search_limit_and_empty_query() {
        let docs: Vec<(String, String)> = (0..20)
            .map(|i| (format!("doc{:02}", i), format!("document number {}", i)))
            .collect();
        let mut index = TfIdfIndex::new();
        for (id, text) in &docs {
            index.add_document(id, text);
        }
        index.finalize();

        assert_eq!(index.search("document", 5).len(), 5);
        assert!(index.search("", 5).is_empty());
        assert!(index.search("zzz", 5).is_empty());
    }

    #[test]
    fn test_remove_and_replace() {
        let mut index = index_of(&[("1", "unique term"), ("2", "different content")]);
        assert!(index.remove_document("1"));
        assert!(!index.remove_document("1"));
        index.finalize();
        assert!(index.search("unique", 10).is_empty());
        assert_eq!(index.document_frequency("unique"), 0);

        index.add_document("2", "replaced words");
        index.finalize();
        assert_eq!(index.len(), 1);
        assert!(index.search("content", 10).is_empty());
        assert_eq!(index.search("replaced", 10).len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut index = index_of(&[("1", "some text")]);
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.term_count(), 0);
        assert_eq!(index.num_docs(), 0);
    }
}
