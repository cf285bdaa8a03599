//! Import extraction and resolution by file stem.

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

/// Extensions stripped from an import before resolution.
const SOURCE_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "jsx", "mjs", "ts", "tsx", "go", "java", "kt", "c", "h", "cpp", "cc", "hpp",
    "cs", "rb", "php", "tal", "cbl", "cob", "cpy",
];

/// Segments that never name a file on their own.
const PATH_NOISE: &[&str] = &["crate", "super", "self", "std", "core", "alloc", ".", ".."];

static IMPORT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // rust
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+([\w:]+)",
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?mod\s+(\w+)\s*;",
        // javascript / typescript
        r#"^\s*import\s+.*?\s+from\s+['"]([^'"]+)['"]"#,
        r#"^\s*import\s+['"]([^'"]+)['"]"#,
        r#"require\(\s*['"]([^'"]+)['"]\s*\)"#,
        // python
        r"^\s*from\s+([\w.]+)\s+import\b",
        r"^\s*import\s+([\w.]+)\s*$",
        // java / kotlin / scala
        r"^\s*import\s+(?:static\s+)?([\w.]+)(?:\.\*)?\s*;?\s*$",
        // c / c++
        r#"^\s*#\s*include\s+["<]([^">]+)[">]"#,
        // tal
        r"(?i)^\s*\?\s*source\s+([\w.$/\\-]+)",
        // cobol
        r"(?i)^\s*copy\s+([\w-]+)",
        // go
        r#"^\s*import\s+(?:\w+\s+)?"([^"]+)""#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static GO_BLOCK_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*(?:\w+\s+)?"([^"]+)"\s*$"#).unwrap());

/// Raw import strings of a file, in source order, without duplicates.
pub fn extract_imports(lines: &[String]) -> Vec<String> {
    let mut imports: Vec<String> = Vec::new();
    let mut in_go_block = false;

    for line in lines {
        let trimmed = line.trim();

        if in_go_block {
            if trimmed.starts_with(')') {
                in_go_block = false;
            } else if let Some(caps) = GO_BLOCK_ENTRY.captures(line) {
                push_unique(&mut imports, &caps[1]);
            }
            continue;
        }
        if trimmed == "import (" {
            in_go_block = true;
            continue;
        }

        for pattern in IMPORT_PATTERNS.iter() {
            if let Some(caps) = pattern.captures(line) {
                push_unique(&mut imports, &caps[1]);
                break;
            }
        }
    }

    imports
}

fn push_unique(imports: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() && !imports.iter().any(|i| i == value) {
        imports.push(value.to_string());
    }
}

/// Lower-cased file stem of a path.
pub fn file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_ascii_lowercase()
}

/// Resolves raw import strings to indexed files by stem.
#[derive(Debug, Default)]
pub struct StemResolver {
    /// lower-cased stem -> paths with that stem, sorted
    by_stem: HashMap<String, Vec<String>>,
}

impl StemResolver {
    pub fn new<'a>(paths: impl IntoIterator<Item = &'a String>) -> Self {
        let mut by_stem: HashMap<String, Vec<String>> = HashMap::new();
        for path in paths {
            by_stem.entry(file_stem(path)).or_default().push(path.clone());
        }
        for candidates in by_stem.values_mut() {
            candidates.sort();
        }
        Self { by_stem }
    }

    /// The indexed file `import` refers to, excluding `importer` itself.
    pub fn resolve(&self, importer: &str, import: &str) -> Option<&str> {
        let stripped = strip_source_extension(import);
        let segments: Vec<&str> = stripped
            .split(|c| matches!(c, '/' | '\\' | '.' | ':'))
            .filter(|s| !s.is_empty())
            .collect();

        segments.iter().rev().find_map(|segment| {
            let key = segment.to_ascii_lowercase();
            if PATH_NOISE.contains(&key.as_str()) {
                return None;
            }
            self.by_stem
                .get(&key)?
                .iter()
                .find(|candidate| candidate.as_str() != importer)
                .map(String::as_str)
        })
    }
}

fn strip_source_extension(import: &str) -> &str {
    if let Some((base, ext)) = import.rsplit_once('.') {
        if SOURCE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
            return base;
        }
    }
    import
}
