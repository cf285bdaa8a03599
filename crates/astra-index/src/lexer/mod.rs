//! Line-oriented lexical analysis: definitions, imports, and call sites.
//!
//! Nothing here builds an AST. Every extractor works on regular expressions
//! over single lines (call sites over whole content), which keeps unusual
//! languages like TAL and COBOL on the same footing as mainstream ones.

pub mod calls;
pub mod definitions;
pub mod imports;

pub use calls::{is_excluded_call_name, scan_call_sites, CallSite, CallStyle};
pub use definitions::{extract_symbols, file_summary, function_header_name, is_definition_line, Extraction};
pub use imports::{extract_imports, file_stem, StemResolver};
