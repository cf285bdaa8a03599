//! Symbols, the lexical call graph, and the file dependency graph.
//!
//! Both graphs are built from textual patterns, not from an AST. A call edge
//! `a -> b` means the name `b` appears in call position inside the textual
//! extent of `a`; it does not prove `a` invokes `b`.
//!
//! # Example
//!
//! ```
//! use astra_index::graph::{CallGraph, Symbol, SymbolKind};
//!
//! let symbol = Symbol::new("pay_order", SymbolKind::Function, "src/orders.py", 10);
//! assert_eq!(symbol.id(), "src/orders.py::pay_order@10");
//!
//! let mut graph = CallGraph::new();
//! graph.add_edge("checkout", "pay_order");
//! assert_eq!(graph.callers_of("pay_order"), vec!["checkout"]);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Type of code symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Method,
    Procedure,
    Class,
    Struct,
    Enum,
    Trait,
    Interface,
    Paragraph,
    Section,
    Variable,
    Parameter,
    Field,
    Constant,
    Other,
}

impl SymbolKind {
    /// Display label for symbol kind.
    pub fn label(&self) -> &'static str {
        match self {
            SymbolKind::Function => "fn",
            SymbolKind::Method => "method",
            SymbolKind::Procedure => "proc",
            SymbolKind::Class => "class",
            SymbolKind::Struct => "struct",
            SymbolKind::Enum => "enum",
            SymbolKind::Trait => "trait",
            SymbolKind::Interface => "interface",
            SymbolKind::Paragraph => "paragraph",
            SymbolKind::Section => "section",
            SymbolKind::Variable => "var",
            SymbolKind::Parameter => "param",
            SymbolKind::Field => "field",
            SymbolKind::Constant => "const",
            SymbolKind::Other => "symbol",
        }
    }

    /// Kinds that own a body other code can call into.
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            SymbolKind::Function
                | SymbolKind::Method
                | SymbolKind::Procedure
                | SymbolKind::Paragraph
                | SymbolKind::Section
        )
    }

    /// Function, method, or procedure.
    pub fn is_function(&self) -> bool {
        matches!(
            self,
            SymbolKind::Function | SymbolKind::Method | SymbolKind::Procedure
        )
    }

    /// Kinds kept in the variable table.
    pub fn is_variable(&self) -> bool {
        matches!(
            self,
            SymbolKind::Variable | SymbolKind::Parameter | SymbolKind::Field | SymbolKind::Constant
        )
    }
}

/// A named definition in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    /// Symbol name
    pub name: String,
    /// Type of symbol
    pub kind: SymbolKind,
    /// File where the symbol is defined
    pub file: String,
    /// Definition line (1-indexed)
    pub line: usize,
    /// Trimmed definition line
    pub signature: Option<String>,
    /// Natural-language summary (doc comment or externally supplied)
    pub summary: Option<String>,
}

impl Symbol {
    /// Create a new symbol.
    pub fn new(
        name: impl Into<String>,
        kind: SymbolKind,
        file: impl Into<String>,
        line: usize,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            file: file.into(),
            line,
            signature: None,
            summary: None,
        }
    }

    /// Key of the form `file::name@line`.
    pub fn id(&self) -> String {
        format!("{}::{}@{}", self.file, self.name, self.line)
    }

    /// Set signature.
    pub fn with_signature(mut self, sig: impl Into<String>) -> Self {
        self.signature = Some(sig.into());
        self
    }

    /// Set summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// Name-keyed call graph with forward and reverse maps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallGraph {
    /// caller -> callees
    forward: BTreeMap<String, BTreeSet<String>>,
    /// callee -> callers
    reverse: BTreeMap<String, BTreeSet<String>>,
}

impl CallGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `caller -> callee`. Returns false if the edge already existed.
    pub fn add_edge(&mut self, caller: &str, callee: &str) -> bool {
        let inserted = self
            .forward
            .entry(caller.to_string())
            .or_default()
            .insert(callee.to_string());
        if inserted {
            self.reverse
                .entry(callee.to_string())
                .or_default()
                .insert(caller.to_string());
        }
        inserted
    }

    /// Names that call `name`, sorted.
    pub fn callers_of(&self, name: &str) -> Vec<&str> {
        self.reverse
            .get(name)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Names called by `name`, sorted.
    pub fn callees_of(&self, name: &str) -> Vec<&str> {
        self.forward
            .get(name)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Every name that appears as a caller or a callee.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.forward
            .keys()
            .chain(self.reverse.keys())
            .map(String::as_str)
    }

    /// Number of distinct `caller -> callee` edges.
    pub fn edge_count(&self) -> usize {
        self.forward.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
    }
}

/// File-level import graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    /// file -> raw import strings, in source order
    imports: BTreeMap<String, Vec<String>>,
    /// file -> indexed files it imports
    resolved: BTreeMap<String, BTreeSet<String>>,
    /// file -> indexed files that import it
    dependents: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the raw import strings of a file.
    pub fn set_imports(&mut self, file: &str, imports: Vec<String>) {
        if !imports.is_empty() {
            self.imports.insert(file.to_string(), imports);
        }
    }

    /// Record that `file` depends on the indexed file `target`.
    pub fn add_dependency(&mut self, file: &str, target: &str) {
        if file == target {
            return;
        }
        self.resolved
            .entry(file.to_string())
            .or_default()
            .insert(target.to_string());
        self.dependents
            .entry(target.to_string())
            .or_default()
            .insert(file.to_string());
    }

    /// Raw import strings of a file.
    pub fn imports_of(&self, file: &str) -> &[String] {
        self.imports.get(file).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Indexed files that `file` imports.
    pub fn dependencies_of(&self, file: &str) -> Vec<&str> {
        self.resolved
            .get(file)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Indexed files that import `file`.
    pub fn dependents_of(&self, file: &str) -> Vec<&str> {
        self.dependents
            .get(file)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Iterate over `(file, raw imports)`.
    pub fn iter_imports(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.imports.iter()
    }

    /// Number of resolved file-to-file edges.
    pub fn edge_count(&self) -> usize {
        self.resolved.values().map(BTreeSet::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_creation() {
        let symbol = Symbol::new("pay_order", SymbolKind::Function, "src/orders.py", 10)
            .with_signature("def pay_order(order):")
            .with_summary("Charge the customer");

        assert_eq!(symbol.name, "pay_order");
        assert_eq!(symbol.kind, SymbolKind::Function);
        assert_eq!(symbol.line, 10);
        assert_eq!(symbol.id(), "src/orders.py::pay_order@10");
        assert!(symbol.signature.is_some());
        assert_eq!(symbol.summary.as_deref(), Some("Charge the customer"));
    }

    #[test]
    fn test_symbol_kind_labels() {
        assert_eq!(SymbolKind::Function.label(), "fn");
        assert_eq!(SymbolKind::Procedure.label(), "proc");
        assert_eq!(SymbolKind::Paragraph.label(), "paragraph");
        assert_eq!(SymbolKind::Other.label(), "symbol");
    }

    #[test]
    fn test_symbol_kind_classes() {
        assert!(SymbolKind::Paragraph.is_callable());
        assert!(!SymbolKind::Paragraph.is_function());
        assert!(SymbolKind::Procedure.is_function());
        assert!(SymbolKind::Parameter.is_variable());
        assert!(!SymbolKind::Class.is_variable());
    }

    #[test]
    fn test_call_graph_edges() {
        let mut graph = CallGraph::new();
        assert!(graph.add_edge("main", "helper"));
        assert!(graph.add_edge("main", "log"));
        assert!(graph.add_edge("worker", "helper"));
        assert!(!graph.add_edge("main", "helper"));

        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.callees_of("main"), vec!["helper", "log"]);
        assert_eq!(graph.callers_of("helper"), vec!["main", "worker"]);
        assert!(graph.callers_of("missing").is_empty());

        let names: std::collections::BTreeSet<_> = graph.names().collect();
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn test_call_graph_clear() {
        let mut graph = CallGraph::new();
        graph.add_edge("a", "b");
        graph.clear();
        assert!(graph.is_empty());
        assert!(graph.callers_of("b").is_empty());
    }

    #[test]
    fn test_dependency_graph() {
        let mut deps = DependencyGraph::new();
        deps.set_imports("app.js", vec!["./utils".to_string(), "react".to_string()]);
        deps.add_dependency("app.js", "utils.js");
        deps.add_dependency("app.js", "app.js");

        assert_eq!(deps.imports_of("app.js").len(), 2);
        assert_eq!(deps.dependencies_of("app.js"), vec!["utils.js"]);
        assert_eq!(deps.dependents_of("utils.js"), vec!["app.js"]);
        assert_eq!(deps.edge_count(), 1);
        assert!(deps.imports_of("utils.js").is_empty());
    }
}
