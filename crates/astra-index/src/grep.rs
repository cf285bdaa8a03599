//! Grep and call-site search.
//!
//! [`GrepIndex`] keeps the content and line array of every eligible file and,
//! optionally, a name -> call-site index built with the shared scanner. All
//! searches report malformed patterns as data on [`SearchOutcome`] rather
//! than as errors, so a bad query from a chat layer never aborts anything.

use std::collections::{BTreeMap, HashMap, HashSet};

use astra_config::IndexConfig;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::corpus::{is_eligible, split_lines, Corpus};
use crate::error::{IndexError, Result};
use crate::lexer::{function_header_name, is_definition_line, scan_call_sites, CallSite};

/// Build and query defaults for a [`GrepIndex`].
#[derive(Debug, Clone, PartialEq)]
pub struct GrepOptions {
    pub max_file_size: usize,
    /// Regexes matched against paths; a match excludes the file
    pub exclude_patterns: Vec<String>,
    pub build_call_index: bool,
    pub context_lines: usize,
    /// Default cap on results when a query does not set one
    pub max_results: usize,
    /// Lines scanned (including the hit line) when looking for an enclosing function
    pub enclosing_window: usize,
}

impl Default for GrepOptions {
    fn default() -> Self {
        Self::from(&IndexConfig::default())
    }
}

impl From<&IndexConfig> for GrepOptions {
    fn from(config: &IndexConfig) -> Self {
        Self {
            max_file_size: config.max_file_size,
            exclude_patterns: config.exclude_patterns.clone(),
            build_call_index: config.build_call_index,
            context_lines: config.context_lines,
            max_results: config.max_results,
            enclosing_window: config.enclosing_window,
        }
    }
}

/// What produced a search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Literal,
    Regex,
    FunctionCall,
}

/// How a symbol is used at a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageKind {
    Call,
    Reference,
}

/// Function that textually encloses a hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnclosingFunction {
    pub name: String,
    /// 1-indexed
    pub line: usize,
    /// Trimmed header line
    pub signature: String,
}

/// A single search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub file: String,
    /// 1-indexed
    pub line: usize,
    /// 1-indexed, in characters
    pub column: usize,
    /// Full text of the matched line
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_before: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_after: Vec<String>,
    pub kind: MatchKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enclosing_function: Option<EnclosingFunction>,
}

/// Results of a search, or the reason it could not run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub total: usize,
    /// Whether more matches existed beyond the result cap
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchOutcome {
    fn found(results: Vec<SearchResult>, truncated: bool) -> Self {
        Self {
            total: results.len(),
            results,
            truncated,
            error: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Options for [`GrepIndex::search_literal`].
#[derive(Debug, Clone, Default)]
pub struct LiteralOptions {
    pub case_sensitive: bool,
    pub whole_word: bool,
    pub max_results: Option<usize>,
    /// Regex applied to the path
    pub file_pattern: Option<String>,
    pub include_context: bool,
}

/// Options for [`GrepIndex::search_regex`].
#[derive(Debug, Clone, Default)]
pub struct RegexOptions {
    /// Any of `i`, `m`, `s`, `x`; other letters are ignored
    pub flags: String,
    pub max_results: Option<usize>,
    pub file_pattern: Option<String>,
    pub include_context: bool,
}

/// Options for [`GrepIndex::search_function_calls`].
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub include_definitions: bool,
    pub max_results: Option<usize>,
    pub file_pattern: Option<String>,
    pub include_context: bool,
}

/// Options for [`GrepIndex::search_symbol_usages`].
#[derive(Debug, Clone, Default)]
pub struct UsageOptions {
    pub max_results: Option<usize>,
    pub file_pattern: Option<String>,
    pub include_context: bool,
}

/// Options for [`GrepIndex::search_with_function_context`].
#[derive(Debug, Clone, Default)]
pub struct ContextSearchOptions {
    /// Treat the pattern as a regex instead of a literal
    pub regex: bool,
    pub case_sensitive: bool,
    pub whole_word: bool,
    /// Regex flags, used when `regex` is set
    pub flags: String,
    pub max_results: Option<usize>,
    pub file_pattern: Option<String>,
    pub include_context: bool,
}

/// A name and how often it is called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallCount {
    pub name: String,
    pub call_count: usize,
}

/// Size of a grep index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrepStats {
    pub files: usize,
    pub total_bytes: usize,
    pub total_lines: usize,
    pub call_sites: usize,
    pub unique_functions: usize,
    pub call_index_built: bool,
}

#[derive(Debug, Clone)]
struct GrepFile {
    content: String,
    lines: Vec<String>,
    /// Byte offset where each line starts
    line_starts: Vec<usize>,
}

impl GrepFile {
    fn new(content: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            content: content.to_string(),
            lines: split_lines(content),
            line_starts,
        }
    }

    /// 0-based line index containing byte `offset`.
    fn line_index(&self, offset: usize) -> usize {
        self.line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1)
    }

    fn column(&self, line_idx: usize, offset: usize) -> usize {
        let start = self.line_starts[line_idx];
        self.content[start..offset].chars().count() + 1
    }

    fn line_text(&self, line_idx: usize) -> &str {
        self.lines.get(line_idx).map(String::as_str).unwrap_or("")
    }
}

/// Text and call-site index for grep-style queries.
#[derive(Debug, Clone, Default)]
pub struct GrepIndex {
    files: BTreeMap<String, GrepFile>,
    /// name -> call sites in path, then offset order
    call_index: HashMap<String, Vec<CallSite>>,
    /// Names in the order they were first seen
    call_order: Vec<String>,
    total_bytes: usize,
    total_lines: usize,
    call_index_built: bool,
    options: GrepOptions,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn at_word_boundary(content: &str, start: usize, end: usize) -> bool {
    let before = content[..start].chars().next_back();
    let after = content[end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

fn compile_file_pattern(pattern: Option<&str>) -> std::result::Result<Option<Regex>, String> {
    match pattern {
        Some(p) => Regex::new(p)
            .map(Some)
            .map_err(|e| format!("Invalid file pattern '{}': {}", p, e)),
        None => Ok(None),
    }
}

/// Parameters shared by literal and regex scans.
struct Scan<'a> {
    pattern: &'a Regex,
    kind: MatchKind,
    max_results: usize,
    file_filter: Option<&'a Regex>,
    include_context: bool,
    whole_word: bool,
}

impl GrepIndex {
    /// Index every eligible file of `corpus`.
    pub fn build(corpus: &Corpus, options: &GrepOptions) -> Result<Self> {
        let excludes = options
            .exclude_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    IndexError::Config(format!("Invalid exclude pattern '{}': {}", p, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut index = GrepIndex {
            options: options.clone(),
            call_index_built: options.build_call_index,
            ..Default::default()
        };

        for (path, source) in corpus.iter() {
            if !is_eligible(path, source, options.max_file_size, &excludes) {
                debug!("Grep index skipping {}", path);
                continue;
            }
            let file = GrepFile::new(&source.content);
            index.total_bytes += source.content.len();
            index.total_lines += file.lines.len();

            if options.build_call_index {
                for site in scan_call_sites(path, &source.content) {
                    let sites = index.call_index.entry(site.function.clone()).or_default();
                    if sites.is_empty() {
                        index.call_order.push(site.function.clone());
                    }
                    sites.push(site);
                }
            }
            index.files.insert(path.clone(), file);
        }

        info!(
            "Grep index built: {} files, {} lines, {} called names",
            index.files.len(),
            index.total_lines,
            index.call_order.len()
        );
        Ok(index)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn stats(&self) -> GrepStats {
        GrepStats {
            files: self.files.len(),
            total_bytes: self.total_bytes,
            total_lines: self.total_lines,
            call_sites: self.call_index.values().map(Vec::len).sum(),
            unique_functions: self.call_index.len(),
            call_index_built: self.call_index_built,
        }
    }

    /// Indexed call sites of `name` (empty when the call index is disabled).
    pub fn call_sites(&self, name: &str) -> &[CallSite] {
        self.call_index
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Search for a literal string.
    pub fn search_literal(&self, pattern: &str, options: &LiteralOptions) -> SearchOutcome {
        if pattern.is_empty() {
            return SearchOutcome::default();
        }
        let file_filter = match compile_file_pattern(options.file_pattern.as_deref()) {
            Ok(filter) => filter,
            Err(message) => return SearchOutcome::failed(message),
        };
        let re = match RegexBuilder::new(&regex::escape(pattern))
            .case_insensitive(!options.case_sensitive)
            .build()
        {
            Ok(re) => re,
            Err(e) => return SearchOutcome::failed(format!("Invalid pattern: {}", e)),
        };

        self.scan(&Scan {
            pattern: &re,
            kind: MatchKind::Literal,
            max_results: options.max_results.unwrap_or(self.options.max_results),
            file_filter: file_filter.as_ref(),
            include_context: options.include_context,
            whole_word: options.whole_word,
        })
    }

    /// Search with a regular expression.
    pub fn search_regex(&self, pattern: &str, options: &RegexOptions) -> SearchOutcome {
        let file_filter = match compile_file_pattern(options.file_pattern.as_deref()) {
            Ok(filter) => filter,
            Err(message) => return SearchOutcome::failed(message),
        };

        let mut builder = RegexBuilder::new(pattern);
        for flag in options.flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'x' => builder.ignore_whitespace(true),
                _ => &mut builder,
            };
        }
        let re = match builder.build() {
            Ok(re) => re,
            Err(e) => return SearchOutcome::failed(format!("Invalid regex: {}", e)),
        };

        self.scan(&Scan {
            pattern: &re,
            kind: MatchKind::Regex,
            max_results: options.max_results.unwrap_or(self.options.max_results),
            file_filter: file_filter.as_ref(),
            include_context: options.include_context,
            whole_word: false,
        })
    }

    fn scan(&self, scan: &Scan<'_>) -> SearchOutcome {
        let mut results = Vec::new();

        for (path, file) in &self.files {
            if scan.file_filter.is_some_and(|f| !f.is_match(path)) {
                continue;
            }

            let content = file.content.as_str();
            let mut at = 0;
            while at <= content.len() {
                let Some(m) = scan.pattern.find_at(content, at) else {
                    break;
                };

                if !scan.whole_word || at_word_boundary(content, m.start(), m.end()) {
                    if results.len() >= scan.max_results {
                        return SearchOutcome::found(results, true);
                    }
                    let line_idx = file.line_index(m.start());
                    results.push(self.result_at(
                        path,
                        file,
                        line_idx,
                        file.column(line_idx, m.start()),
                        scan.kind,
                        scan.include_context,
                    ));
                }

                at = if m.end() > m.start() {
                    m.end()
                } else {
                    match content[m.end()..].chars().next() {
                        Some(c) => m.end() + c.len_utf8(),
                        None => break,
                    }
                };
            }
        }

        SearchOutcome::found(results, false)
    }

    fn result_at(
        &self,
        path: &str,
        file: &GrepFile,
        line_idx: usize,
        column: usize,
        kind: MatchKind,
        include_context: bool,
    ) -> SearchResult {
        let (context_before, context_after) = if include_context {
            let n = self.options.context_lines;
            let before_start = line_idx.saturating_sub(n);
            let after_end = (line_idx + 1 + n).min(file.lines.len());
            (
                file.lines[before_start..line_idx].to_vec(),
                file.lines[(line_idx + 1).min(after_end)..after_end].to_vec(),
            )
        } else {
            (Vec::new(), Vec::new())
        };

        SearchResult {
            file: path.to_string(),
            line: line_idx + 1,
            column,
            text: file.line_text(line_idx).to_string(),
            context_before,
            context_after,
            kind,
            usage: None,
            enclosing_function: None,
        }
    }

    /// Call sites of `name`, scanning files directly when no call index exists.
    fn sites_for(&self, name: &str) -> Vec<CallSite> {
        if self.call_index_built {
            return self.call_sites(name).to_vec();
        }
        self.files
            .iter()
            .flat_map(|(path, file)| scan_call_sites(path, &file.content))
            .filter(|site| site.function == name)
            .collect()
    }

    /// Find places where `name` is called.
    ///
    /// Lines that define `name` are dropped unless `include_definitions` is set.
    pub fn search_function_calls(&self, name: &str, options: &CallOptions) -> SearchOutcome {
        let file_filter = match compile_file_pattern(options.file_pattern.as_deref()) {
            Ok(filter) => filter,
            Err(message) => return SearchOutcome::failed(message),
        };
        let max_results = options.max_results.unwrap_or(self.options.max_results);
        let mut results = Vec::new();

        for site in self.sites_for(name) {
            if file_filter.as_ref().is_some_and(|f| !f.is_match(&site.file)) {
                continue;
            }
            let Some(file) = self.files.get(&site.file) else {
                continue;
            };
            let line_idx = site.line - 1;
            if !options.include_definitions && is_definition_line(file.line_text(line_idx), name) {
                continue;
            }
            if results.len() >= max_results {
                return SearchOutcome::found(results, true);
            }
            results.push(self.result_at(
                &site.file,
                file,
                line_idx,
                site.column,
                MatchKind::FunctionCall,
                options.include_context,
            ));
        }

        SearchOutcome::found(results, false)
    }

    /// Calls of `name` (tagged `call`) plus other whole-word mentions
    /// (tagged `reference`). A line holding both is reported once, as a call.
    pub fn search_symbol_usages(&self, name: &str, options: &UsageOptions) -> SearchOutcome {
        let calls = self.search_function_calls(
            name,
            &CallOptions {
                include_definitions: false,
                max_results: Some(usize::MAX),
                file_pattern: options.file_pattern.clone(),
                include_context: options.include_context,
            },
        );
        if calls.is_error() {
            return calls;
        }
        let references = self.search_literal(
            name,
            &LiteralOptions {
                case_sensitive: true,
                whole_word: true,
                max_results: Some(usize::MAX),
                file_pattern: options.file_pattern.clone(),
                include_context: options.include_context,
            },
        );

        let mut seen: HashSet<(String, usize)> = HashSet::new();
        let mut merged = Vec::new();
        let tagged = calls
            .results
            .into_iter()
            .map(|r| (r, UsageKind::Call))
            .chain(references.results.into_iter().map(|r| (r, UsageKind::Reference)));
        for (mut result, usage) in tagged {
            if seen.insert((result.file.clone(), result.line)) {
                result.usage = Some(usage);
                merged.push(result);
            }
        }
        merged.sort_by(|a, b| a.file.cmp(&b.file).then(a.line.cmp(&b.line)));

        let max_results = options.max_results.unwrap_or(self.options.max_results);
        let truncated = merged.len() > max_results;
        merged.truncate(max_results);
        SearchOutcome::found(merged, truncated)
    }

    /// Search, then attach the nearest enclosing function to every hit.
    pub fn search_with_function_context(
        &self,
        pattern: &str,
        options: &ContextSearchOptions,
    ) -> SearchOutcome {
        let mut outcome = if options.regex {
            self.search_regex(
                pattern,
                &RegexOptions {
                    flags: options.flags.clone(),
                    max_results: options.max_results,
                    file_pattern: options.file_pattern.clone(),
                    include_context: options.include_context,
                },
            )
        } else {
            self.search_literal(
                pattern,
                &LiteralOptions {
                    case_sensitive: options.case_sensitive,
                    whole_word: options.whole_word,
                    max_results: options.max_results,
                    file_pattern: options.file_pattern.clone(),
                    include_context: options.include_context,
                },
            )
        };

        for result in &mut outcome.results {
            result.enclosing_function = self.enclosing_function(&result.file, result.line);
        }
        outcome
    }

    /// Nearest definition-shaped line at or above `line`, within the window.
    pub fn enclosing_function(&self, path: &str, line: usize) -> Option<EnclosingFunction> {
        let file = self.files.get(path)?;
        let hit = line.checked_sub(1)?;
        if hit >= file.lines.len() {
            return None;
        }
        let lowest = (hit + 1).saturating_sub(self.options.enclosing_window);

        (lowest..=hit).rev().find_map(|idx| {
            let text = &file.lines[idx];
            function_header_name(text).map(|name| EnclosingFunction {
                name,
                line: idx + 1,
                signature: text.trim().to_string(),
            })
        })
    }

    /// The `limit` most-called names, by count, ties in first-seen order.
    pub fn most_called_functions(&self, limit: usize) -> Vec<CallCount> {
        let mut counts: Vec<CallCount> = self
            .call_order
            .iter()
            .map(|name| CallCount {
                name: name.clone(),
                call_count: self.call_sites(name).len(),
            })
            .collect();
        counts.sort_by(|a, b| b.call_count.cmp(&a.call_count));
        counts.truncate(limit);
        counts
    }
}
