//! The corpus: every `(path, content, language)` record in a build.
//!
//! Enumerating and reading files is the caller's job; this module only
//! holds what was supplied. Iteration is ordered by path so repeated builds
//! of the same corpus see files in the same order.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Content and language of one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub content: String,
    pub language: String,
}

impl SourceFile {
    pub fn new(content: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            language: language.into(),
        }
    }

    /// Create a file whose language is inferred from `path`'s extension.
    pub fn for_path(path: &str, content: impl Into<String>) -> Self {
        Self::new(content, detect_language(path))
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Ordered mapping from path to source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpus {
    files: BTreeMap<String, SourceFile>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a file.
    pub fn insert(&mut self, path: impl Into<String>, file: SourceFile) -> Option<SourceFile> {
        self.files.insert(path.into(), file)
    }

    pub fn remove(&mut self, path: &str) -> Option<SourceFile> {
        self.files.remove(path)
    }

    pub fn get(&self, path: &str) -> Option<&SourceFile> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SourceFile)> {
        self.files.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.files.keys()
    }

    /// Copy of this corpus with `path` added or replaced.
    pub fn with_file(&self, path: impl Into<String>, file: SourceFile) -> Self {
        let mut next = self.clone();
        next.insert(path, file);
        next
    }

    /// Copy of this corpus without `path`.
    pub fn without_file(&self, path: &str) -> Self {
        let mut next = self.clone();
        next.remove(path);
        next
    }

    /// Files that pass the size limit and match no exclude pattern.
    pub fn eligible<'a>(
        &'a self,
        max_file_size: usize,
        excludes: &'a [Regex],
    ) -> impl Iterator<Item = (&'a String, &'a SourceFile)> + 'a {
        self.files
            .iter()
            .filter(move |(path, file)| is_eligible(path, file, max_file_size, excludes))
    }
}

impl FromIterator<(String, SourceFile)> for Corpus {
    fn from_iter<I: IntoIterator<Item = (String, SourceFile)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

/// Whether a file is indexed under the given limits.
pub fn is_eligible(path: &str, file: &SourceFile, max_file_size: usize, excludes: &[Regex]) -> bool {
    file.size() <= max_file_size && !excludes.iter().any(|re| re.is_match(path))
}

/// Split content into its line array (`content.split('\n')`).
pub fn split_lines(content: &str) -> Vec<String> {
    content.split('\n').map(String::from).collect()
}

/// 1-based line number of a byte offset.
pub fn line_of_offset(content: &str, offset: usize) -> usize {
    content.as_bytes()[..offset.min(content.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

/// 1-based character column of a byte offset within its line.
pub fn column_of_offset(content: &str, offset: usize) -> usize {
    let offset = offset.min(content.len());
    let line_start = content[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    content[line_start..offset].chars().count() + 1
}

/// Map an extension to a language tag.
pub fn detect_language(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "rs" => "rust",
        "py" => "python",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" | "hh" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "scala" => "scala",
        "tal" => "tal",
        "cbl" | "cob" | "cobol" | "cpy" | "pco" => "cobol",
        "pli" => "pli",
        "sql" => "sql",
        "json" | "yaml" | "yml" | "xml" | "toml" => "data",
        "md" | "txt" | "csv" => "text",
        _ => "unknown",
    }
}
