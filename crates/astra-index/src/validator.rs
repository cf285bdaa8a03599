//! Response validation: scores generated text for grounding and speculation.
//!
//! The validator knows the symbol, function, and file names of an index.
//! It counts hedging phrases (speculation) and citation phrases (grounding),
//! extracts the symbols and files a response refers to, and flags the ones
//! the index has never seen.

use std::collections::HashSet;
use std::path::Path;

use astra_config::ValidatorConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codebase::CodebaseIndex;
use crate::corpus::Corpus;
use crate::lexer::calls::is_keyword;

/// Unknown symbols above this count invalidate a response.
pub const MAX_UNKNOWN_SYMBOLS: usize = 5;
/// Unknown files above this count invalidate a response.
pub const MAX_UNKNOWN_FILES: usize = 2;
/// Responses at or below this confidence get a disclaimer.
pub const DISCLAIMER_THRESHOLD: f64 = 0.7;

static HEDGING_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\btypically\b",
        r"(?i)\busually\b",
        r"(?i)\bgenerally\b",
        r"(?i)\bI believe\b",
        r"(?i)\bI think\b",
        r"(?i)\bprobably\b",
        r"(?i)\blikely\b",
        r"(?i)\bmight be\b",
        r"(?i)\bcould be\b",
        r"(?i)\bstandard practice\b",
        r"(?i)\bcommon practice\b",
        r"(?i)\bin most (?:cases|systems|codebases|applications)\b",
        r"(?i)\bbased on (?:my )?(?:\w+\s+){0,3}?(?:knowledge|experience)\b",
        r"(?i)\bit is common\b",
        r"(?i)\bconventionally\b",
        r"(?i)\bpresumably\b",
        r"(?i)\bI assume\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static GROUNDING_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\blines\s+\d+\s*[-–]\s*\d+",
        r"(?i)\bline\s+\d+",
        r"(?i)\bfound in\b",
        r"(?i)\bdefined in\b",
        r"(?i)\bthe (?:function|method|procedure)\s+`[^`]+`\s+in\b",
        r"(?i)\bin file\b",
        r"(?i)\bas shown in\b",
        r"(?i)\bat\s+[\w./-]+:\d+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static SYMBOL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"`([A-Za-z_][A-Za-z0-9_]*)(?:\(\))?`",
        r"(?i)\b(?:function|method|procedure)\s+`?([A-Za-z_][A-Za-z0-9_]*)",
        r"(?i)\bcalls?\s+to\s+`?([A-Za-z_][A-Za-z0-9_]*)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static FILE_EXTENSION_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b([\w./-]*\w\.(?:rs|py|js|jsx|ts|tsx|go|java|kt|c|h|cpp|cc|hpp|cs|rb|php|swift|scala|tal|cbl|cob|cpy|sql))\b",
    )
    .unwrap()
});

static FILE_BACKTICK_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bin\s+`([^`\s]+)`").unwrap());

/// Words that show up after "function" or in backticks without naming code.
static FILLER_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "that", "which", "this", "these", "those", "is", "are", "was", "were",
        "be", "it", "its", "will", "would", "should", "can", "could", "may", "might", "must",
        "does", "did", "has", "have", "had", "returns", "takes", "calls", "called", "uses",
        "used", "handles", "to", "of", "on", "for", "by", "also", "then", "first", "here",
        "there", "above", "below", "named", "itself", "signature", "body", "definition",
        "defined", "implementation", "code", "you", "we", "i", "as", "at", "so", "int",
        "string", "char", "bool", "float", "double", "long", "str", "self",
    ]
    .into_iter()
    .collect()
});

/// Prose names that look like file references.
const NON_FILE_NAMES: &[&str] = &[
    "node.js", "vue.js", "next.js", "react.js", "express.js", "d3.js", "three.js", "chart.js",
    "nuxt.js", "ember.js",
];

/// Category of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    UnknownSymbols,
    UnknownFile,
    Speculation,
    LowCitations,
}

/// A problem found in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
}

/// What an unknown reference was taken to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Symbol,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownReference {
    pub name: String,
    pub kind: ReferenceKind,
}

/// Outcome of validating one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    /// 0.0 to 1.0
    pub confidence: f64,
    pub issues: Vec<ValidationIssue>,
    pub warnings: Vec<String>,
    /// Matched grounding phrases, in order of pattern then position
    pub citations: Vec<String>,
    pub unknown_references: Vec<UnknownReference>,
    /// Number of hedging phrase matches
    pub hallucination_score: usize,
    /// Number of grounding phrase matches
    pub grounding_score: usize,
}

impl ValidationResult {
    pub fn unknown_symbols(&self) -> impl Iterator<Item = &str> {
        self.unknown_references
            .iter()
            .filter(|r| r.kind == ReferenceKind::Symbol)
            .map(|r| r.name.as_str())
    }

    pub fn unknown_files(&self) -> impl Iterator<Item = &str> {
        self.unknown_references
            .iter()
            .filter(|r| r.kind == ReferenceKind::File)
            .map(|r| r.name.as_str())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// A line dropped by [`ResponseValidator::filter_response`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedLine {
    pub line: String,
    /// 1-indexed
    pub line_number: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteredResponse {
    pub text: String,
    pub removed: Vec<RemovedLine>,
}

/// Checks generated text against the names an index knows.
#[derive(Debug, Clone)]
pub struct ResponseValidator {
    /// Lower-cased names from the symbol and variable tables
    known_symbols: HashSet<String>,
    /// Lower-cased callable names
    known_functions: HashSet<String>,
    /// Lower-cased full paths, basenames, and stems
    known_files: HashSet<String>,
    config: ValidatorConfig,
}

fn hedge_count(text: &str) -> usize {
    HEDGING_PATTERNS
        .iter()
        .map(|re| re.find_iter(text).count())
        .sum()
}

fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        out.extend(c.to_lowercase());
    }
    out
}

fn is_whitelisted(name: &str) -> bool {
    let lower = name.to_lowercase();
    FILLER_WORDS.contains(lower.as_str()) || is_keyword(&lower)
}

impl ResponseValidator {
    pub fn new(index: &CodebaseIndex, corpus: &Corpus, config: ValidatorConfig) -> Self {
        let mut known_symbols = HashSet::new();
        let mut known_functions = HashSet::new();
        let mut known_files = HashSet::new();

        for symbol in index.symbols() {
            known_symbols.insert(symbol.name.to_lowercase());
            if symbol.kind.is_callable() {
                known_functions.insert(symbol.name.to_lowercase());
            }
        }
        for variable in index.variables() {
            known_symbols.insert(variable.name.to_lowercase());
        }

        let paths = corpus
            .paths()
            .map(String::as_str)
            .chain(index.files().map(|f| f.path.as_str()));
        for path in paths {
            known_files.insert(path.to_lowercase());
            let p = Path::new(path);
            if let Some(name) = p.file_name().and_then(|n| n.to_str()) {
                known_files.insert(name.to_lowercase());
            }
            if let Some(stem) = p.file_stem().and_then(|n| n.to_str()) {
                known_files.insert(stem.to_lowercase());
            }
        }

        debug!(
            "Validator knows {} symbols, {} functions, {} file names",
            known_symbols.len(),
            known_functions.len(),
            known_files.len()
        );
        Self {
            known_symbols,
            known_functions,
            known_files,
            config,
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Whether `name` (or a case/underscore variant) names an indexed symbol.
    pub fn is_known_symbol(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        let stripped = lower.replace('_', "");
        let snake = camel_to_snake(name);
        [lower, stripped, snake]
            .iter()
            .any(|variant| self.known_symbols.contains(variant))
    }

    pub fn is_known_function(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        let snake = camel_to_snake(name);
        self.known_functions.contains(&lower) || self.known_functions.contains(&snake)
    }

    /// Whether a file reference matches an indexed path, basename, or stem.
    pub fn is_known_file(&self, reference: &str) -> bool {
        let lower = reference.to_lowercase();
        let trimmed = lower.trim_start_matches("./");
        if self.known_files.contains(trimmed) {
            return true;
        }
        Path::new(trimmed)
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.known_files.contains(name))
    }

    /// Symbol names a response refers to, de-duplicated case-insensitively.
    pub fn extract_symbol_references(text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for pattern in SYMBOL_PATTERNS.iter() {
            for caps in pattern.captures_iter(text) {
                let name = &caps[1];
                if seen.insert(name.to_lowercase()) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }

    /// File names a response refers to.
    pub fn extract_file_references(text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();

        let by_extension = FILE_EXTENSION_REF
            .captures_iter(text)
            .map(|caps| caps[1].to_string());
        let by_backtick = FILE_BACKTICK_REF
            .captures_iter(text)
            .map(|caps| caps[1].to_string())
            .filter(|r| r.contains('.') || r.contains('/'));

        for reference in by_extension.chain(by_backtick) {
            let lower = reference.to_lowercase();
            if NON_FILE_NAMES.contains(&lower.as_str()) {
                continue;
            }
            if seen.insert(lower) {
                files.push(reference);
            }
        }
        files
    }

    /// Score a response.
    pub fn validate(&self, response: &str, query: &str) -> ValidationResult {
        debug!(
            "Validating {} byte response to {} byte query",
            response.len(),
            query.len()
        );

        let hallucination_score = hedge_count(response);

        let citations: Vec<String> = GROUNDING_PATTERNS
            .iter()
            .flat_map(|re| re.find_iter(response).map(|m| m.as_str().to_string()))
            .collect();
        let grounding_score = citations.len();

        let unknown_symbols: Vec<String> = Self::extract_symbol_references(response)
            .into_iter()
            .filter(|name| !is_whitelisted(name) && !self.is_known_symbol(name))
            .collect();
        let unknown_files: Vec<String> = Self::extract_file_references(response)
            .into_iter()
            .filter(|file| !self.is_known_file(file))
            .collect();

        let mut issues = Vec::new();
        let mut warnings = Vec::new();
        let mut is_valid = true;

        if !unknown_symbols.is_empty() {
            issues.push(ValidationIssue {
                kind: IssueKind::UnknownSymbols,
                message: format!(
                    "{} referenced symbol(s) not found in the index: {}",
                    unknown_symbols.len(),
                    unknown_symbols.join(", ")
                ),
                names: unknown_symbols.clone(),
            });
            if unknown_symbols.len() > MAX_UNKNOWN_SYMBOLS {
                is_valid = false;
            }
        }

        for file in &unknown_files {
            issues.push(ValidationIssue {
                kind: IssueKind::UnknownFile,
                message: format!("File '{}' is not in the index", file),
                names: vec![file.clone()],
            });
        }
        if unknown_files.len() > MAX_UNKNOWN_FILES {
            is_valid = false;
        }

        if hallucination_score > 0 {
            warnings.push(format!(
                "Response contains {} speculative phrase(s)",
                hallucination_score
            ));
        }
        if hallucination_score > self.config.max_hallucination_score && grounding_score == 0 {
            is_valid = false;
            issues.push(ValidationIssue {
                kind: IssueKind::Speculation,
                message: format!(
                    "{} speculative phrases and no references to the code",
                    hallucination_score
                ),
                names: Vec::new(),
            });
        }

        let content_lines = response.lines().filter(|l| !l.trim().is_empty()).count();
        let citation_ratio = if content_lines == 0 {
            0.0
        } else {
            grounding_score as f64 / content_lines as f64
        };
        let low_citations = citation_ratio < self.config.min_citation_ratio;

        if self.config.strict_mode {
            if !unknown_symbols.is_empty() || !unknown_files.is_empty() {
                is_valid = false;
            }
            if low_citations {
                is_valid = false;
                issues.push(ValidationIssue {
                    kind: IssueKind::LowCitations,
                    message: format!(
                        "Citation ratio {:.2} is below the required {:.2}",
                        citation_ratio, self.config.min_citation_ratio
                    ),
                    names: Vec::new(),
                });
            }
        } else if low_citations {
            warnings.push(format!(
                "Citation ratio {:.2} is below {:.2}",
                citation_ratio, self.config.min_citation_ratio
            ));
        }

        let confidence = (1.0 - 0.1 * hallucination_score as f64
            - 0.05 * unknown_symbols.len() as f64
            + (0.05 * grounding_score as f64).min(0.2)
            - 0.15 * unknown_files.len() as f64)
            .clamp(0.0, 1.0);

        let unknown_references = unknown_symbols
            .into_iter()
            .map(|name| UnknownReference {
                name,
                kind: ReferenceKind::Symbol,
            })
            .chain(unknown_files.into_iter().map(|name| UnknownReference {
                name,
                kind: ReferenceKind::File,
            }))
            .collect();

        ValidationResult {
            is_valid,
            confidence,
            issues,
            warnings,
            citations,
            unknown_references,
            hallucination_score,
            grounding_score,
        }
    }

    /// Validate a response delivered as a finite sequence of chunks.
    pub fn validate_stream<I, S>(&self, chunks: I, query: &str) -> ValidationResult
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let response: String = chunks.into_iter().fold(String::new(), |mut acc, chunk| {
            acc.push_str(chunk.as_ref());
            acc
        });
        self.validate(&response, query)
    }

    /// Drop lines that mention an unknown symbol or hedge twice or more.
    pub fn filter_response(&self, response: &str, result: &ValidationResult) -> FilteredResponse {
        let unknown: Vec<(&str, Regex)> = result
            .unknown_symbols()
            .filter_map(|name| {
                Regex::new(&format!(r"\b{}\b", regex::escape(name)))
                    .ok()
                    .map(|re| (name, re))
            })
            .collect();
        let mut kept = Vec::new();
        let mut removed = Vec::new();

        for (idx, line) in response.split('\n').enumerate() {
            let mentioned = unknown.iter().find(|(_, re)| re.is_match(line));
            let reason = if let Some((name, _)) = mentioned {
                Some(format!("references unknown symbol `{}`", name))
            } else if hedge_count(line) >= 2 {
                Some("speculative".to_string())
            } else {
                None
            };

            match reason {
                Some(reason) => removed.push(RemovedLine {
                    line: line.to_string(),
                    line_number: idx + 1,
                    reason,
                }),
                None => kept.push(line),
            }
        }

        FilteredResponse {
            text: kept.join("\n"),
            removed,
        }
    }

    /// Append a warning when a response is invalid or low-confidence.
    pub fn append_disclaimer(&self, response: &str, result: &ValidationResult) -> String {
        if result.is_valid && result.confidence > DISCLAIMER_THRESHOLD {
            return response.to_string();
        }

        let mut disclaimer = format!(
            "\n\n> **Warning:** This response may contain unverified information (confidence: {:.0}%).",
            result.confidence * 100.0
        );
        let names: Vec<&str> = result
            .unknown_references
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        if !names.is_empty() {
            let shown: Vec<String> = names.iter().take(3).map(|n| format!("`{}`", n)).collect();
            disclaimer.push_str(&format!(" Unverified references: {}", shown.join(", ")));
            if names.len() > 3 {
                disclaimer.push_str(&format!(" and {} more", names.len() - 3));
            }
            disclaimer.push('.');
        }

        format!("{}{}", response, disclaimer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::SourceFile;
    use crate::progress::NullObserver;
    use astra_config::IndexConfig;

    const ORDERS: &str = "\
def pay_order(order):
    validate_order(order)
    return charge(order.total)

def validate_order(order):
    return order.total > 0
";

    fn validator_with(config: ValidatorConfig) -> ResponseValidator {
        let corpus: Corpus = vec![(
            "app/orders.py".to_string(),
            SourceFile::for_path("app/orders.py", ORDERS),
        )]
        .into_iter()
        .collect();
        let (index, _) = tokio_test::block_on(CodebaseIndex::build(
            &corpus,
            &IndexConfig::default(),
            &mut NullObserver,
        ))
        .unwrap();
        ResponseValidator::new(&index, &corpus, config)
    }

    fn validator() -> ResponseValidator {
        validator_with(ValidatorConfig::default())
    }

    #[test]
    fn test_known_name_variants() {
        let v = validator();
        assert!(v.is_known_symbol("pay_order"));
        assert!(v.is_known_symbol("PAY_ORDER"));
        assert!(v.is_known_symbol("payOrder"));
        assert!(!v.is_known_symbol("refund"));
        // called but never defined
        assert!(!v.is_known_symbol("charge"));
        // a file stem is not a symbol
        assert!(!v.is_known_symbol("orders"));
        assert!(v.is_known_function("validateOrder"));
        assert!(!v.is_known_function("order"));
    }

    #[test]
    fn test_known_files() {
        let v = validator();
        assert!(v.is_known_file("app/orders.py"));
        assert!(v.is_known_file("orders.py"));
        assert!(v.is_known_file("./app/orders.py"));
        assert!(!v.is_known_file("billing.py"));
    }

    #[test]
    fn test_camel_to_snake() {
        assert_eq!(camel_to_snake("payOrder"), "pay_order");
        assert_eq!(camel_to_snake("HTTPServer"), "httpserver");
        assert_eq!(camel_to_snake("parseV2Config"), "parse_v2_config");
    }

    #[test]
    fn test_extract_symbol_references() {
        let refs = ResponseValidator::extract_symbol_references(
            "The function pay_order makes calls to `charge` and `Charge()`; see `validate_order`.",
        );
        assert_eq!(refs, vec!["charge", "validate_order", "pay_order"]);
    }

    #[test]
    fn test_extract_file_references() {
        let files = ResponseValidator::extract_file_references(
            "See app/orders.py and orders.py, defined in `lib/util` built with Node.js",
        );
        assert_eq!(files, vec!["app/orders.py", "orders.py", "lib/util"]);
    }

    #[test]
    fn test_grounded_response_is_valid() {
        let v = validator();
        let result = v.validate(
            "`pay_order` is defined in app/orders.py at line 1 and calls `validate_order`.",
            "what does pay_order do?",
        );
        assert!(result.is_valid);
        assert!(result.confidence > 0.8);
        assert_eq!(result.grounding_score, 2);
        assert_eq!(result.citations, vec!["line 1", "defined in"]);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_unknown_symbol_lowers_confidence() {
        let v = validator();
        let known = v.validate("This probably calls `pay_order` at line 3.", "");
        let unknown = v.validate("This probably calls `fooBarBaz123` at line 3.", "");

        let issues: Vec<_> = unknown
            .issues
            .iter()
            .filter(|i| i.kind == IssueKind::UnknownSymbols)
            .collect();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].names, vec!["fooBarBaz123"]);
        assert!(unknown.confidence < known.confidence);
        assert!(unknown.is_valid);
    }

    #[test]
    fn test_too_many_unknown_symbols_is_invalid() {
        let v = validator();
        let result = v.validate("`aa1` `bb2` `cc3` `dd4` `ee5` `ff6`", "");
        assert_eq!(result.unknown_symbols().count(), 6);
        assert!(!result.is_valid);
    }

    #[test]
    fn test_speculation_without_grounding_is_invalid() {
        let v = validator();
        let result = v.validate(
            "It typically retries. It usually logs. It probably caches. I think it is fine.",
            "",
        );
        assert_eq!(result.hallucination_score, 4);
        assert_eq!(result.grounding_score, 0);
        assert!(!result.is_valid);
        assert!(result.issues.iter().any(|i| i.kind == IssueKind::Speculation));
        assert!((result.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_files() {
        let v = validator();
        let result = v.validate("Look at a.py, b.py and c.py.", "");
        assert_eq!(
            result
                .issues
                .iter()
                .filter(|i| i.kind == IssueKind::UnknownFile)
                .count(),
            3
        );
        assert!(!result.is_valid);
        assert!((result.confidence - 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_strict_mode() {
        let strict = validator_with(ValidatorConfig {
            strict_mode: true,
            min_citation_ratio: 0.5,
            ..Default::default()
        });
        let result = strict.validate("`refund` handles it.", "");
        assert!(!result.is_valid);
        assert!(result.issues.iter().any(|i| i.kind == IssueKind::LowCitations));

        let lenient = validator_with(ValidatorConfig {
            min_citation_ratio: 0.5,
            ..Default::default()
        });
        let result = lenient.validate("Nothing cited here.", "");
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_filter_response() {
        let v = validator();
        let response = "`pay_order` charges at line 2.\n`ghost_fn` does magic.\nIt probably, likely caches.";
        let result = v.validate(response, "");
        let filtered = v.filter_response(response, &result);

        assert_eq!(filtered.text, "`pay_order` charges at line 2.");
        assert_eq!(filtered.removed.len(), 2);
        assert_eq!(filtered.removed[0].line_number, 2);
        assert!(filtered.removed[0].reason.contains("ghost_fn"));
        assert_eq!(filtered.removed[1].reason, "speculative");
    }

    #[test]
    fn test_filter_matches_whole_names() {
        let v = validator();
        let response = "See `aa1` here.\nOnly `aa12` is mentioned.";
        let result = v.validate("`aa1`", "");
        let filtered = v.filter_response(response, &result);

        assert_eq!(filtered.text, "Only `aa12` is mentioned.");
        assert_eq!(filtered.removed.len(), 1);
        assert_eq!(filtered.removed[0].line_number, 1);
    }

    #[test]
    fn test_hedging_allows_words_before_knowledge() {
        assert_eq!(hedge_count("Based on my programming knowledge, it retries."), 1);
        assert_eq!(hedge_count("based on general experience"), 1);
        assert_eq!(hedge_count("based on my knowledge"), 1);
        assert_eq!(hedge_count("based on the code at line 3"), 0);
    }

    #[test]
    fn test_append_disclaimer() {
        let v = validator();
        let good = v.validate("`pay_order` is at line 1.", "");
        assert_eq!(v.append_disclaimer("ok", &good), "ok");

        let bad = v.validate("`aa1` `bb2` `cc3` `dd4` `ee5` `ff6`", "");
        let text = v.append_disclaimer("answer", &bad);
        assert!(text.starts_with("answer\n\n> **Warning:**"));
        assert!(text.contains("`aa1`, `bb2`, `cc3` and 3 more."));
    }

    #[test]
    fn test_validate_stream_matches_validate() {
        let v = validator();
        let whole = v.validate("`pay_order` is at line 1.", "q");
        let streamed = v.validate_stream(vec!["`pay_", "order` is at ", "line 1."], "q");
        assert_eq!(whole, streamed);
    }

    #[test]
    fn test_result_json() {
        let v = validator();
        let json = v.validate("`ghost` at line 1", "").to_json().unwrap();
        assert!(json.contains("\"isValid\""));
        assert!(json.contains("\"unknown_symbols\""));
        assert!(json.contains("\"hallucinationScore\""));
    }
}
