//! Call-site scanning.
//!
//! A call site is any identifier followed by `(`, optionally preceded by
//! `.`, `->`, or `::`. Control-flow keywords and literals are excluded so
//! `if (` or `while (` never register as calls.

use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::corpus::{column_of_offset, line_of_offset};

/// Shortest name recorded as a call.
pub const MIN_CALL_NAME_LEN: usize = 2;

/// How a call was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStyle {
    /// `name(`
    Bare,
    /// `.name(`
    Method,
    /// `->name(`
    Arrow,
    /// `::name(`
    Scoped,
}

static CALL_PATTERNS: Lazy<Vec<(CallStyle, Regex)>> = Lazy::new(|| {
    vec![
        (
            CallStyle::Bare,
            Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap(),
        ),
        (
            CallStyle::Method,
            Regex::new(r"\.([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap(),
        ),
        (
            CallStyle::Arrow,
            Regex::new(r"->([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap(),
        ),
        (
            CallStyle::Scoped,
            Regex::new(r"::([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap(),
        ),
    ]
});

/// Names never treated as calls (compared lower-cased).
static EXCLUDED_CALL_NAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // control flow
        "if", "else", "elif", "elsif", "for", "foreach", "while", "do", "switch", "case", "when",
        "return", "break", "continue", "goto", "try", "catch", "except", "finally", "throw",
        "throws", "raise", "yield", "await", "match", "loop", "unless", "until", "with",
        "assert",
        // declarations and operators
        "function", "func", "fn", "def", "class", "struct", "enum", "interface", "new",
        "delete", "typeof", "sizeof", "instanceof", "alignof", "decltype", "and", "or", "not",
        "in", "is", "lambda", "import", "from", "require", "var", "let", "const", "static",
        // literals
        "true", "false", "null", "nil", "none", "undefined", "nan", "void",
    ]
    .into_iter()
    .collect()
});

/// Whether `name` can never be recorded as a call.
pub fn is_excluded_call_name(name: &str) -> bool {
    name.chars().count() < MIN_CALL_NAME_LEN
        || EXCLUDED_CALL_NAMES.contains(name.to_ascii_lowercase().as_str())
}

/// Whether `name` is a language keyword or literal.
pub fn is_keyword(name: &str) -> bool {
    EXCLUDED_CALL_NAMES.contains(name.to_ascii_lowercase().as_str())
}

/// A textual location where a name appears in call position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSite {
    /// Called name
    pub function: String,
    /// File containing the call
    pub file: String,
    /// Line (1-indexed)
    pub line: usize,
    /// Column of the matched text (1-indexed, in characters)
    pub column: usize,
    /// Raw matched text, e.g. `.save(`
    pub matched: String,
    /// Trimmed source line
    pub context: String,
    /// How the call was written
    pub style: CallStyle,
}

/// Scan `content` for call sites, returned in source order.
///
/// Every pattern is applied; when several hit the same name, the most
/// specific style (`.`, `->`, `::`) replaces the bare match.
pub fn scan_call_sites(file: &str, content: &str) -> Vec<CallSite> {
    let mut found: BTreeMap<usize, CallSite> = BTreeMap::new();

    for (style, pattern) in CALL_PATTERNS.iter() {
        for caps in pattern.captures_iter(content) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if is_excluded_call_name(name.as_str()) {
                continue;
            }
            if *style == CallStyle::Bare && found.contains_key(&name.start()) {
                continue;
            }

            let offset = whole.start();
            found.insert(
                name.start(),
                CallSite {
                    function: name.as_str().to_string(),
                    file: file.to_string(),
                    line: line_of_offset(content, offset),
                    column: column_of_offset(content, offset),
                    matched: whole.as_str().to_string(),
                    context: line_text(content, offset).trim().to_string(),
                    style: *style,
                },
            );
        }
    }

    found.into_values().collect()
}

/// The full line containing byte `offset`.
fn line_text(content: &str, offset: usize) -> &str {
    let start = content[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = content[offset..]
        .find('\n')
        .map(|i| offset + i)
        .unwrap_or(content.len());
    &content[start..end]
}
