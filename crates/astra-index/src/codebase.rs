//! The multi-index Codebase Index and its phased builder.
//!
//! A build runs four phases over the eligible files of a corpus:
//!
//! 1. `parsing`: line arrays, symbols, variables, imports, summaries
//! 2. `callgraph`: call sites attributed to the nearest enclosing callable
//! 3. `trigrams`: lower-cased character trigram postings
//! 4. `inverted`: term postings and the TF-IDF vocabulary
//!
//! The builder always produces a fresh value. Nothing here mutates an index
//! that readers may already hold.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Instant;

use astra_config::IndexConfig;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::corpus::{split_lines, Corpus};
use crate::error::{IndexError, Result};
use crate::graph::{CallGraph, DependencyGraph, Symbol};
use crate::lexer::{extract_imports, extract_symbols, file_summary, scan_call_sites, StemResolver};
use crate::progress::{BuildObserver, BuildPhase, ProgressStats};
use crate::search::{TfIdfIndex, TrigramIndex};

/// A file admitted to the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedFile {
    pub path: String,
    pub content: String,
    pub language: String,
    /// `content.split('\n')`
    pub lines: Vec<String>,
}

impl IndexedFile {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// A file that could not be indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    pub file: String,
    pub message: String,
}

/// Counters describing a finished build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStats {
    /// Files indexed
    pub files: usize,
    /// Sum of line-array lengths over indexed files
    pub total_lines: usize,
    /// Non-variable symbols
    pub symbols: usize,
    /// Callable symbols (functions, methods, procedures, paragraphs, sections)
    pub functions: usize,
    /// Symbols carrying a summary
    pub summaries: usize,
    pub call_graph_edges: usize,
    pub variables: usize,
    pub trigram_terms: usize,
    pub inverted_terms: usize,
    /// Resolved file-to-file dependency edges
    pub dependencies: usize,
    pub build_time_ms: u64,
    /// Corpus files not indexed (ineligible or failed)
    pub skipped_files: usize,
    pub errors: Vec<FileError>,
}

/// A case-insensitive substring hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstringMatch {
    pub file: String,
    /// 1-indexed
    pub line: usize,
    /// 1-indexed, in characters
    pub column: usize,
    pub text: String,
}

/// Read-only multi-index over a corpus.
#[derive(Debug, Clone, Default)]
pub struct CodebaseIndex {
    files: BTreeMap<String, IndexedFile>,
    /// Definitions in path, then line order
    symbols: Vec<Symbol>,
    symbols_by_name: HashMap<String, Vec<usize>>,
    symbols_by_file: BTreeMap<String, Vec<usize>>,
    variables: BTreeMap<String, Vec<Symbol>>,
    call_graph: CallGraph,
    dependencies: DependencyGraph,
    trigrams: TrigramIndex,
    terms: TfIdfIndex,
    file_summaries: BTreeMap<String, String>,
    stats: BuildStats,
}

/// Builder state threaded through the phases.
struct BuildRun<'a> {
    observer: &'a mut (dyn BuildObserver + Send),
    cancel: CancellationToken,
    progress: ProgressStats,
}

impl BuildRun<'_> {
    fn enter(&mut self, phase: BuildPhase) {
        self.progress.phase = phase;
        debug!("Entering phase {}", phase);
        let (start, _) = phase.band();
        self.observer
            .on_progress(start, &format!("Starting {}", phase), Some(&self.progress));
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(IndexError::Cancelled(self.progress.phase));
        }
        Ok(())
    }

    fn report(&mut self, done: usize, total: usize, message: &str) {
        let percent = self.progress.phase.percent(done, total);
        self.observer
            .on_progress(percent, message, Some(&self.progress));
    }
}

impl CodebaseIndex {
    /// Build an index over `corpus`.
    pub async fn build(
        corpus: &Corpus,
        config: &IndexConfig,
        observer: &mut (dyn BuildObserver + Send),
    ) -> Result<(CodebaseIndex, BuildStats)> {
        Self::build_cancellable(corpus, config, observer, &CancellationToken::new()).await
    }

    /// Build an index, giving up with [`IndexError::Cancelled`] once `cancel`
    /// fires. The token is checked at every file boundary.
    pub async fn build_cancellable(
        corpus: &Corpus,
        config: &IndexConfig,
        observer: &mut (dyn BuildObserver + Send),
        cancel: &CancellationToken,
    ) -> Result<(CodebaseIndex, BuildStats)> {
        let start = Instant::now();
        let excludes = config.compiled_excludes()?;
        info!("Starting codebase index build over {} files", corpus.len());

        let mut run = BuildRun {
            observer,
            cancel: cancel.clone(),
            progress: ProgressStats::default(),
        };
        let mut index = CodebaseIndex::default();

        index.parse_files(corpus, config.max_file_size, &excludes, &mut run)?;
        tokio::task::yield_now().await;

        index.build_call_graph(&mut run)?;
        tokio::task::yield_now().await;

        index.build_trigrams(&mut run)?;
        tokio::task::yield_now().await;

        index.build_inverted(&mut run)?;
        tokio::task::yield_now().await;

        index.stats.skipped_files = corpus.len() - index.files.len();
        index.stats.build_time_ms = start.elapsed().as_millis() as u64;

        run.progress.phase = BuildPhase::Complete;
        run.observer
            .on_progress(100, "Index complete", Some(&run.progress));
        info!(
            "Index complete: {} files, {} lines, {} symbols, {} call edges in {}ms",
            index.stats.files,
            index.stats.total_lines,
            index.stats.symbols,
            index.stats.call_graph_edges,
            index.stats.build_time_ms
        );

        let stats = index.stats.clone();
        Ok((index, stats))
    }

    fn parse_files(
        &mut self,
        corpus: &Corpus,
        max_file_size: usize,
        excludes: &[regex::Regex],
        run: &mut BuildRun<'_>,
    ) -> Result<()> {
        run.enter(BuildPhase::Parsing);
        let eligible: Vec<_> = corpus.eligible(max_file_size, excludes).collect();
        let total = eligible.len();
        debug!("{} of {} files eligible", total, corpus.len());

        for (done, (path, source)) in eligible.into_iter().enumerate() {
            run.check_cancelled()?;

            if source.content.contains('\0') {
                warn!("Skipping {}: binary content", path);
                self.stats.errors.push(FileError {
                    file: path.clone(),
                    message: "binary content".to_string(),
                });
                run.report(done + 1, total, &format!("Skipped {}", path));
                continue;
            }

            let lines = split_lines(&source.content);
            let expected = source.content.split('\n').count();
            if lines.len() != expected {
                return Err(IndexError::Invariant {
                    phase: BuildPhase::Parsing,
                    message: format!(
                        "{} has {} lines, expected {}",
                        path,
                        lines.len(),
                        expected
                    ),
                });
            }

            let extraction = extract_symbols(path, &source.language, &lines);
            for symbol in extraction.symbols {
                if symbol.kind.is_callable() {
                    self.stats.functions += 1;
                    run.progress.functions_found += 1;
                }
                if symbol.summary.is_some() {
                    self.stats.summaries += 1;
                    run.progress.summaries_found += 1;
                }
                run.progress.symbols_found += 1;
                self.push_symbol(symbol);
            }
            for variable in extraction.variables {
                self.stats.variables += 1;
                self.variables
                    .entry(variable.name.clone())
                    .or_default()
                    .push(variable);
            }

            self.dependencies.set_imports(path, extract_imports(&lines));
            if let Some(summary) = file_summary(&lines) {
                self.file_summaries.insert(path.clone(), summary);
            }

            self.stats.total_lines += lines.len();
            self.files.insert(
                path.clone(),
                IndexedFile {
                    path: path.clone(),
                    content: source.content.clone(),
                    language: source.language.clone(),
                    lines,
                },
            );
            run.progress.files_indexed += 1;
            run.report(done + 1, total, &format!("Parsed {}", path));
        }

        let resolver = StemResolver::new(self.files.keys());
        let mut edges = Vec::new();
        for (file, imports) in self.dependencies.iter_imports() {
            for import in imports {
                if let Some(target) = resolver.resolve(file, import) {
                    edges.push((file.clone(), target.to_string()));
                }
            }
        }
        for (file, target) in edges {
            self.dependencies.add_dependency(&file, &target);
        }

        self.stats.files = self.files.len();
        self.stats.symbols = self.symbols.len();
        self.stats.dependencies = self.dependencies.edge_count();
        Ok(())
    }

    fn push_symbol(&mut self, symbol: Symbol) {
        let idx = self.symbols.len();
        self.symbols_by_name
            .entry(symbol.name.clone())
            .or_default()
            .push(idx);
        self.symbols_by_file
            .entry(symbol.file.clone())
            .or_default()
            .push(idx);
        self.symbols.push(symbol);
    }

    fn build_call_graph(&mut self, run: &mut BuildRun<'_>) -> Result<()> {
        run.enter(BuildPhase::CallGraph);
        let total = self.files.len();

        for (done, file) in self.files.values().enumerate() {
            run.check_cancelled()?;

            let callables: Vec<&Symbol> = self
                .symbols_by_file
                .get(&file.path)
                .map(|ids| {
                    ids.iter()
                        .map(|&i| &self.symbols[i])
                        .filter(|s| s.kind.is_callable())
                        .collect()
                })
                .unwrap_or_default();

            if !callables.is_empty() {
                for site in scan_call_sites(&file.path, &file.content) {
                    let nearest = callables.partition_point(|s| s.line <= site.line);
                    let Some(caller) = nearest.checked_sub(1).map(|i| callables[i]) else {
                        continue;
                    };
                    if caller.line == site.line && caller.name == site.function {
                        continue;
                    }
                    self.call_graph.add_edge(&caller.name, &site.function);
                }
            }
            run.report(done + 1, total, &format!("Call graph: {}", file.path));
        }

        self.stats.call_graph_edges = self.call_graph.edge_count();
        Ok(())
    }

    fn build_trigrams(&mut self, run: &mut BuildRun<'_>) -> Result<()> {
        run.enter(BuildPhase::Trigrams);
        let total = self.files.len();

        for (done, file) in self.files.values().enumerate() {
            run.check_cancelled()?;
            self.trigrams.add_document(&file.path, &file.content);
            run.report(done + 1, total, &format!("Trigrams: {}", file.path));
        }

        self.stats.trigram_terms = self.trigrams.term_count();
        Ok(())
    }

    fn build_inverted(&mut self, run: &mut BuildRun<'_>) -> Result<()> {
        run.enter(BuildPhase::Inverted);
        let total = self.files.len();

        for (done, file) in self.files.values().enumerate() {
            run.check_cancelled()?;
            self.terms.add_document(&file.path, &file.content);
            run.report(done + 1, total, &format!("Terms: {}", file.path));
        }
        self.terms.finalize();

        self.stats.inverted_terms = self.terms.term_count();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Files and lines
    // -----------------------------------------------------------------------

    pub fn file(&self, path: &str) -> Option<&IndexedFile> {
        self.files.get(path)
    }

    /// Indexed files in path order.
    pub fn files(&self) -> impl Iterator<Item = &IndexedFile> {
        self.files.values()
    }

    pub fn lines(&self, path: &str) -> Option<&[String]> {
        self.files.get(path).map(|f| f.lines.as_slice())
    }

    /// Line `n` (1-indexed) of a file.
    pub fn line(&self, path: &str, n: usize) -> Option<&str> {
        let lines = self.lines(path)?;
        n.checked_sub(1)
            .and_then(|i| lines.get(i))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    // -----------------------------------------------------------------------
    // Symbols and variables
    // -----------------------------------------------------------------------

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Symbols named exactly `name`, across all files.
    pub fn find_symbols(&self, name: &str) -> Vec<&Symbol> {
        self.symbols_by_name
            .get(name)
            .map(|ids| ids.iter().map(|&i| &self.symbols[i]).collect())
            .unwrap_or_default()
    }

    /// Symbols defined in `path`, in line order.
    pub fn symbols_in_file(&self, path: &str) -> Vec<&Symbol> {
        self.symbols_by_file
            .get(path)
            .map(|ids| ids.iter().map(|&i| &self.symbols[i]).collect())
            .unwrap_or_default()
    }

    /// Callable symbols.
    pub fn functions(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|s| s.kind.is_callable())
    }

    /// Nearest callable defined at or before `line` in `path`.
    pub fn enclosing_symbol(&self, path: &str, line: usize) -> Option<&Symbol> {
        self.symbols_in_file(path)
            .into_iter()
            .filter(|s| s.kind.is_callable() && s.line <= line)
            .last()
    }

    pub fn find_variables(&self, name: &str) -> &[Symbol] {
        self.variables
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All variable-table entries, ordered by name.
    pub fn variables(&self) -> impl Iterator<Item = &Symbol> {
        self.variables.values().flatten()
    }

    // -----------------------------------------------------------------------
    // Graphs
    // -----------------------------------------------------------------------

    pub fn call_graph(&self) -> &CallGraph {
        &self.call_graph
    }

    pub fn callers_of(&self, name: &str) -> Vec<&str> {
        self.call_graph.callers_of(name)
    }

    pub fn callees_of(&self, name: &str) -> Vec<&str> {
        self.call_graph.callees_of(name)
    }

    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.dependencies
    }

    pub fn dependencies_of(&self, path: &str) -> Vec<&str> {
        self.dependencies.dependencies_of(path)
    }

    pub fn dependents_of(&self, path: &str) -> Vec<&str> {
        self.dependencies.dependents_of(path)
    }

    pub fn imports_of(&self, path: &str) -> &[String] {
        self.dependencies.imports_of(path)
    }

    // -----------------------------------------------------------------------
    // Summaries
    // -----------------------------------------------------------------------

    /// Summary of the first symbol named `name` in `path` that has one.
    pub fn summary(&self, path: &str, name: &str) -> Option<&str> {
        self.symbols_in_file(path)
            .into_iter()
            .filter(|s| s.name == name)
            .find_map(|s| s.summary.as_deref())
    }

    pub fn file_summary(&self, path: &str) -> Option<&str> {
        self.file_summaries.get(path).map(String::as_str)
    }

    /// Attach a summary to every symbol named `name` in `path`.
    ///
    /// Returns false when no such symbol exists.
    pub fn set_summary(&mut self, path: &str, name: &str, summary: &str) -> bool {
        let Some(ids) = self.symbols_by_file.get(path) else {
            return false;
        };
        let mut updated = false;
        for &i in ids {
            if self.symbols[i].name == name {
                self.symbols[i].summary = Some(summary.to_string());
                updated = true;
            }
        }
        updated
    }

    /// Replace the summary of an indexed file. Returns false for unknown paths.
    pub fn set_file_summary(&mut self, path: &str, summary: &str) -> bool {
        if !self.files.contains_key(path) {
            return false;
        }
        self.file_summaries
            .insert(path.to_string(), summary.to_string());
        true
    }

    // -----------------------------------------------------------------------
    // Lexical search
    // -----------------------------------------------------------------------

    /// Files containing every trigram of `query`.
    pub fn trigram_candidates(&self, query: &str) -> BTreeSet<String> {
        self.trigrams.candidates(query)
    }

    /// Case-insensitive substring search, pre-filtered by trigrams.
    pub fn search_substring(&self, query: &str, limit: usize) -> Vec<SubstringMatch> {
        let mut matches = Vec::new();
        if query.is_empty() || limit == 0 {
            return matches;
        }
        let needle = query.to_lowercase();

        for path in self.trigram_candidates(query) {
            let Some(file) = self.files.get(&path) else {
                continue;
            };
            for (idx, line) in file.lines.iter().enumerate() {
                let haystack = line.to_lowercase();
                let mut from = 0;
                while let Some(pos) = haystack[from..].find(&needle) {
                    let at = from + pos;
                    matches.push(SubstringMatch {
                        file: path.clone(),
                        line: idx + 1,
                        column: haystack[..at].chars().count() + 1,
                        text: line.clone(),
                    });
                    if matches.len() >= limit {
                        return matches;
                    }
                    from = at + needle.len();
                }
            }
        }
        matches
    }

    /// Files ranked by TF-IDF score for `query`, ties by path.
    pub fn search_terms(&self, query: &str, limit: usize) -> Vec<(String, f64)> {
        self.terms.search(query, limit)
    }

    pub fn num_docs(&self) -> usize {
        self.terms.num_docs()
    }

    pub fn idf(&self, term: &str) -> f64 {
        self.terms.idf(term)
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }
}
