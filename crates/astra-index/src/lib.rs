//! In-memory code indexing for Astra.
//!
//! This crate provides:
//! - Line-oriented lexical extraction of definitions, imports, and call sites
//!   across mainstream languages plus TAL and COBOL
//! - A codebase index with symbol/variable tables, call and dependency
//!   graphs, trigram postings, and a TF-IDF vocabulary
//! - Grep-style search: literal, regex, function-call, symbol-usage, and
//!   enclosing-function lookup
//! - A build orchestrator that publishes immutable snapshots
//! - A validator that scores generated answers against the index
//!
//! The call graph is lexical: an edge means a name appears in call position
//! inside a function's textual extent, not that the call is proven.

pub mod codebase;
pub mod corpus;
pub mod error;
pub mod graph;
pub mod grep;
pub mod lexer;
pub mod orchestrator;
pub mod progress;
pub mod search;
pub mod validator;

// Re-exports
pub use codebase::{BuildStats, CodebaseIndex, FileError, IndexedFile, SubstringMatch};
pub use corpus::{detect_language, Corpus, SourceFile};
pub use error::{IndexError, Result};
pub use graph::{CallGraph, DependencyGraph, Symbol, SymbolKind};
pub use grep::{
    CallCount, CallOptions, ContextSearchOptions, EnclosingFunction, GrepIndex, GrepOptions,
    GrepStats, LiteralOptions, MatchKind, RegexOptions, SearchOutcome, SearchResult, UsageKind,
    UsageOptions,
};
pub use lexer::{CallSite, CallStyle};
pub use orchestrator::{BuildError, IndexOrchestrator, Snapshot};
pub use progress::{
    BuildObserver, BuildPhase, ChannelObserver, NullObserver, ProgressEvent, ProgressStats,
};
pub use search::{TfIdfIndex, TrigramIndex};
pub use validator::{
    FilteredResponse, IssueKind, ReferenceKind, RemovedLine, ResponseValidator, UnknownReference,
    ValidationIssue, ValidationResult,
};
