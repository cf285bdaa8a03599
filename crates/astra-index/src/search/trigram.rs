//! Lower-cased character trigram postings.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// One occurrence of a trigram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrigramPosting {
    pub file: String,
    /// Character offset of the trigram's first character
    pub position: usize,
}

/// Trigram -> postings, used to pre-filter substring search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrigramIndex {
    postings: HashMap<String, Vec<TrigramPosting>>,
    files: BTreeSet<String>,
}

/// Lower-cased character trigrams of `text`, with their char offsets.
pub fn trigrams(text: &str) -> Vec<(String, usize)> {
    let chars: Vec<char> = text.to_lowercase().chars().collect();
    chars
        .windows(3)
        .enumerate()
        .map(|(pos, window)| (window.iter().collect(), pos))
        .collect()
}

impl TrigramIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every trigram of `content` under `file`.
    pub fn add_document(&mut self, file: &str, content: &str) {
        self.files.insert(file.to_string());
        for (gram, position) in trigrams(content) {
            self.postings.entry(gram).or_default().push(TrigramPosting {
                file: file.to_string(),
                position,
            });
        }
    }

    /// Postings of a single trigram.
    pub fn postings(&self, trigram: &str) -> &[TrigramPosting] {
        self.postings
            .get(&trigram.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Files containing every trigram of `query`, sorted.
    ///
    /// A query shorter than three characters cannot be filtered and yields
    /// every indexed file.
    pub fn candidates(&self, query: &str) -> BTreeSet<String> {
        let grams: BTreeSet<String> = trigrams(query).into_iter().map(|(g, _)| g).collect();
        if grams.is_empty() {
            return self.files.clone();
        }

        let mut result: Option<BTreeSet<String>> = None;
        for gram in &grams {
            let files: BTreeSet<String> = self
                .postings
                .get(gram)
                .map(|list| list.iter().map(|p| p.file.clone()).collect())
                .unwrap_or_default();
            let next = match result {
                Some(current) => current.intersection(&files).cloned().collect(),
                None => files,
            };
            if next.is_empty() {
                return BTreeSet::new();
            }
            result = Some(next);
        }
        result.unwrap_or_default()
    }

    /// Number of distinct trigrams.
    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigrams_are_lowercased() {
        let grams = trigrams("AbCd");
        assert_eq!(
            grams,
            vec![("abc".to_string(), 0), ("bcd".to_string(), 1)]
        );
        assert!(trigrams("ab").is_empty());
    }

    #[test]
    fn test_candidates_intersect() {
        let mut index = TrigramIndex::new();
        index.add_document("a.rs", "fn pay_order() {}");
        index.add_document("b.rs", "fn cancel_order() {}");
        index.add_document("c.rs", "nothing here");

        let both: Vec<_> = index.candidates("ORDER").into_iter().collect();
        assert_eq!(both, vec!["a.rs", "b.rs"]);

        let one: Vec<_> = index.candidates("pay_order").into_iter().collect();
        assert_eq!(one, vec!["a.rs"]);

        assert!(index.candidates("missing").is_empty());
        assert_eq!(index.candidates("fn").len(), 3);
    }

    #[test]
    fn test_postings_positions() {
        let mut index = TrigramIndex::new();
        index.add_document("a.txt", "abcabc");
        let positions: Vec<_> = index.postings("ABC").iter().map(|p| p.position).collect();
        assert_eq!(positions, vec![0, 3]);
        assert_eq!(index.term_count(), 3);
    }
}
