//! Regex-based definition, variable, and summary extraction.
//!
//! Each language family has an ordered list of definition rules and an
//! ordered list of variable rules. The first definition rule that matches a
//! line wins; variable rules only run on lines that defined nothing.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::graph::{Symbol, SymbolKind};
use crate::lexer::calls::is_keyword;

/// Longest summary kept, in characters.
pub const MAX_SUMMARY_CHARS: usize = 300;

/// Words that, directly before a name and `(`, mean the line is a call.
const NON_TYPE_WORDS: &[&str] = &[
    "return", "else", "new", "await", "throw", "yield", "case", "goto", "delete", "typeof", "not",
    "and", "or", "in", "echo", "print", "puts", "raise", "assert", "when", "then", "do", "if",
    "elif", "while", "unless", "until", "for", "switch", "match", "sizeof", "with",
];

struct Rule {
    pattern: Regex,
    kind: SymbolKind,
    /// Kind used when the definition is indented (e.g. a `def` inside a class)
    nested_kind: Option<SymbolKind>,
}

impl Rule {
    fn new(pattern: &str, kind: SymbolKind) -> Self {
        Self {
            pattern: Regex::new(pattern).unwrap(),
            kind,
            nested_kind: None,
        }
    }

    fn nested(mut self, kind: SymbolKind) -> Self {
        self.nested_kind = Some(kind);
        self
    }

    fn kind_for(&self, caps: &Captures<'_>) -> SymbolKind {
        let indented = caps.name("indent").is_some_and(|m| !m.as_str().is_empty());
        match (indented, self.nested_kind) {
            (true, Some(nested)) => nested,
            _ => self.kind,
        }
    }
}

struct RuleSet {
    definitions: Vec<Rule>,
    variables: Vec<Rule>,
}

static TAL_RULES: Lazy<RuleSet> = Lazy::new(|| RuleSet {
    definitions: vec![Rule::new(
        r"(?i)^\s*(?:(?:int|string|fixed|real|unsigned)(?:\(\d+\))?\s+)?(?:sub)?proc\s+(?P<name>[A-Za-z_^][\w^]*)",
        SymbolKind::Procedure,
    )],
    variables: vec![Rule::new(
        r"(?i)^\s*(?:int|string|fixed|real|unsigned)(?:\(\d+\))?\s+\.?(?P<name>[A-Za-z_^][\w^]*)\s*[;:=\[,(]",
        SymbolKind::Variable,
    )],
});

static COBOL_RULES: Lazy<RuleSet> = Lazy::new(|| RuleSet {
    definitions: vec![
        Rule::new(
            r"(?i)^\s{7}(?P<name>\w[\w-]*)\s+SECTION\s*\.",
            SymbolKind::Section,
        ),
        Rule::new(r"^\s{7}(?P<name>\w[\w-]*)\s*\.", SymbolKind::Paragraph),
    ],
    variables: vec![
        Rule::new(
            r"(?i)^\s*(?:01|77)\s+(?P<name>[A-Za-z][\w-]*)",
            SymbolKind::Variable,
        ),
        Rule::new(
            r"(?i)^\s*\d{2}\s+(?P<name>[A-Za-z][\w-]*)",
            SymbolKind::Field,
        ),
    ],
});

static JVM_RULES: Lazy<RuleSet> = Lazy::new(|| {
    let modifiers = r"(?:(?:public|private|protected|internal|abstract|final|static|sealed|data|open|partial)\s+)*";
    RuleSet {
        definitions: vec![
            Rule::new(
                &format!(r"^\s*{modifiers}(?:class|record|object)\s+(?P<name>\w+)"),
                SymbolKind::Class,
            ),
            Rule::new(
                &format!(r"^\s*{modifiers}interface\s+(?P<name>\w+)"),
                SymbolKind::Interface,
            ),
            Rule::new(
                &format!(r"^\s*{modifiers}enum\s+(?:class\s+)?(?P<name>\w+)"),
                SymbolKind::Enum,
            ),
            Rule::new(
                r"^\s*(?:(?:public|private|protected|static|final|abstract|synchronized|native|override|internal|virtual|async|open|suspend)\s+)*(?P<ret>[\w<>\[\],.?]+)\s+(?P<name>\w+)\s*\(",
                SymbolKind::Method,
            ),
        ],
        variables: vec![Rule::new(
            r"^\s*(?:(?:public|private|protected|static|final|readonly|const|volatile|transient|internal)\s+)+[\w<>\[\],.?]+\s+(?P<name>\w+)\s*[=;]",
            SymbolKind::Field,
        )],
    }
});

static PYTHON_RULES: Lazy<RuleSet> = Lazy::new(|| RuleSet {
    definitions: vec![
        Rule::new(
            r"^(?P<indent>\s*)(?:async\s+)?def\s+(?P<name>\w+)\s*\(",
            SymbolKind::Function,
        )
        .nested(SymbolKind::Method),
        Rule::new(r"^\s*class\s+(?P<name>\w+)", SymbolKind::Class),
    ],
    variables: vec![
        Rule::new(
            r"^(?P<name>[A-Za-z_]\w*)\s*(?::[^=]+)?=[^=]",
            SymbolKind::Variable,
        ),
        Rule::new(
            r"^\s+self\.(?P<name>\w+)\s*(?::[^=]+)?=[^=]",
            SymbolKind::Field,
        ),
    ],
});

static JS_RULES: Lazy<RuleSet> = Lazy::new(|| RuleSet {
    definitions: vec![
        Rule::new(
            r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(?P<name>[\w$]+)",
            SymbolKind::Function,
        ),
        Rule::new(
            r"^\s*(?:export\s+)?(?:const|let|var)\s+(?P<name>[\w$]+)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*(?::[^=]+)?=>|[\w$]+\s*=>)",
            SymbolKind::Function,
        ),
        Rule::new(
            r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+(?P<name>[\w$]+)",
            SymbolKind::Class,
        ),
        Rule::new(
            r"^\s*(?:export\s+)?interface\s+(?P<name>\w+)",
            SymbolKind::Interface,
        ),
        Rule::new(
            r"^\s*(?:export\s+)?(?:const\s+)?enum\s+(?P<name>\w+)",
            SymbolKind::Enum,
        ),
        Rule::new(
            r"^\s+(?:(?:public|private|protected|static|async|readonly|override|get|set)\s+)*(?P<name>[\w$]+)\s*\([^)]*\)\s*(?::\s*[^={]+)?\{",
            SymbolKind::Method,
        ),
    ],
    variables: vec![Rule::new(
        r"^\s*(?:export\s+)?(?:const|let|var)\s+(?P<name>[\w$]+)",
        SymbolKind::Variable,
    )],
});

static RUST_RULES: Lazy<RuleSet> = Lazy::new(|| {
    let vis = r"(?:pub(?:\([^)]*\))?\s+)?";
    RuleSet {
        definitions: vec![
            Rule::new(
                &format!(
                    r#"^(?P<indent>\s*){vis}(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+"[^"]*"\s+)?fn\s+(?P<name>\w+)"#
                ),
                SymbolKind::Function,
            )
            .nested(SymbolKind::Method),
            Rule::new(&format!(r"^\s*{vis}struct\s+(?P<name>\w+)"), SymbolKind::Struct),
            Rule::new(&format!(r"^\s*{vis}enum\s+(?P<name>\w+)"), SymbolKind::Enum),
            Rule::new(&format!(r"^\s*{vis}trait\s+(?P<name>\w+)"), SymbolKind::Trait),
        ],
        variables: vec![
            Rule::new(
                &format!(r"^\s*{vis}(?:const|static)\s+(?:mut\s+)?(?P<name>\w+)\s*:"),
                SymbolKind::Constant,
            ),
            Rule::new(
                r"^\s*let\s+(?:mut\s+)?(?P<name>[A-Za-z_]\w*)",
                SymbolKind::Variable,
            ),
        ],
    }
});

static GO_RULES: Lazy<RuleSet> = Lazy::new(|| RuleSet {
    definitions: vec![
        Rule::new(
            r"^func\s+\([^)]*\)\s*(?P<name>\w+)\s*[(\[]",
            SymbolKind::Method,
        ),
        Rule::new(r"^func\s+(?P<name>\w+)\s*[(\[]", SymbolKind::Function),
        Rule::new(r"^type\s+(?P<name>\w+)\s+struct\b", SymbolKind::Struct),
        Rule::new(
            r"^type\s+(?P<name>\w+)\s+interface\b",
            SymbolKind::Interface,
        ),
    ],
    variables: vec![
        Rule::new(r"^\s*const\s+(?P<name>\w+)", SymbolKind::Constant),
        Rule::new(r"^\s*var\s+(?P<name>\w+)", SymbolKind::Variable),
        Rule::new(r"^\s*(?P<name>[A-Za-z_]\w*)\s*:=", SymbolKind::Variable),
    ],
});

static C_RULES: Lazy<RuleSet> = Lazy::new(|| RuleSet {
    definitions: vec![
        Rule::new(
            r"^\s*(?:typedef\s+)?struct\s+(?P<name>\w+)\s*(?:\{|$)",
            SymbolKind::Struct,
        ),
        Rule::new(
            r"^\s*class\s+(?P<name>\w+)\s*(?:\{|:|$)",
            SymbolKind::Class,
        ),
        Rule::new(
            r"^\s*(?:typedef\s+)?enum\s+(?:class\s+)?(?P<name>\w+)\s*(?:\{|:|$)",
            SymbolKind::Enum,
        ),
        Rule::new(
            r"^(?P<indent>\s*)(?:(?:static|inline|extern|virtual|constexpr|const|unsigned|signed|struct|enum)\s+)*(?P<ret>[A-Za-z_][\w:<>]*)[\s\*&]+(?P<name>[A-Za-z_~][\w:~]*)\s*\((?:[^)]*\)\s*(?:const\s*)?(?:\{.*)?|[^)]*)$",
            SymbolKind::Function,
        )
        .nested(SymbolKind::Method),
    ],
    variables: vec![
        Rule::new(
            r"^\s*#\s*define\s+(?P<name>[A-Za-z_]\w*)",
            SymbolKind::Constant,
        ),
        Rule::new(
            r"^\s*(?:(?:static|const|unsigned|signed|extern|volatile|register)\s+)*(?:int|char|long|short|float|double|bool|size_t|u?int\d+_t|auto|std::string|string)\s*[\*&]?\s*(?P<name>[A-Za-z_]\w*)\s*(?:=|;|\[|,)",
            SymbolKind::Variable,
        ),
    ],
});

static RUBY_RULES: Lazy<RuleSet> = Lazy::new(|| RuleSet {
    definitions: vec![
        Rule::new(
            r"^(?P<indent>\s*)def\s+(?:self\.)?(?P<name>\w+[?!]?)",
            SymbolKind::Function,
        )
        .nested(SymbolKind::Method),
        Rule::new(r"^\s*(?:class|module)\s+(?P<name>\w+)", SymbolKind::Class),
    ],
    variables: vec![Rule::new(
        r"^\s*(?P<name>[A-Z][A-Z0-9_]*)\s*=[^=]",
        SymbolKind::Constant,
    )],
});

static PHP_RULES: Lazy<RuleSet> = Lazy::new(|| RuleSet {
    definitions: vec![
        Rule::new(
            r"^(?P<indent>\s*)(?:(?:public|private|protected|static|abstract|final)\s+)*function\s+(?P<name>\w+)",
            SymbolKind::Function,
        )
        .nested(SymbolKind::Method),
        Rule::new(
            r"^\s*(?:(?:abstract|final)\s+)?class\s+(?P<name>\w+)",
            SymbolKind::Class,
        ),
    ],
    variables: vec![Rule::new(
        r"^\s*\$(?P<name>\w+)\s*=[^=]",
        SymbolKind::Variable,
    )],
});

static SQL_RULES: Lazy<RuleSet> = Lazy::new(|| RuleSet {
    definitions: vec![Rule::new(
        r"(?i)^\s*create\s+(?:or\s+replace\s+)?(?:function|procedure)\s+(?P<name>[\w.]+)",
        SymbolKind::Procedure,
    )],
    variables: vec![],
});

static GENERIC_RULES: Lazy<RuleSet> = Lazy::new(|| RuleSet {
    definitions: vec![
        Rule::new(
            r"^\s*(?:async\s+)?(?:def|function|fn|func|sub)\s+(?P<name>\w+)",
            SymbolKind::Function,
        ),
        Rule::new(
            r"(?i)^\s*(?:sub)?proc\s+(?P<name>\w+)",
            SymbolKind::Procedure,
        ),
    ],
    variables: vec![],
});

static EMPTY_RULES: Lazy<RuleSet> = Lazy::new(|| RuleSet {
    definitions: vec![],
    variables: vec![],
});

fn rules_for(language: &str) -> &'static RuleSet {
    match language {
        "tal" => &TAL_RULES,
        "cobol" => &COBOL_RULES,
        "java" | "kotlin" | "csharp" | "scala" | "swift" => &JVM_RULES,
        "python" => &PYTHON_RULES,
        "javascript" | "typescript" => &JS_RULES,
        "rust" => &RUST_RULES,
        "go" => &GO_RULES,
        "c" | "cpp" => &C_RULES,
        "ruby" => &RUBY_RULES,
        "php" => &PHP_RULES,
        "sql" => &SQL_RULES,
        "data" | "text" => &EMPTY_RULES,
        _ => &GENERIC_RULES,
    }
}

/// Definitions and variables found in one file.
#[derive(Debug, Default)]
pub struct Extraction {
    /// Everything except variables, in line order
    pub symbols: Vec<Symbol>,
    /// Variables, parameters, fields, and constants, in line order
    pub variables: Vec<Symbol>,
}

/// Extract symbols from a file's line array.
pub fn extract_symbols(file: &str, language: &str, lines: &[String]) -> Extraction {
    let rules = rules_for(language);
    let mut extraction = Extraction::default();

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;

        if let Some((caps, rule)) = match_definition(&rules.definitions, line) {
            let Some(name_match) = caps.name("name") else {
                continue;
            };
            let name = short_name(name_match.as_str());
            let kind = rule.kind_for(&caps);

            let mut symbol =
                Symbol::new(name, kind, file, line_no).with_signature(line.trim());
            if let Some(summary) = leading_comment(lines, idx)
                .or_else(|| (language == "python").then(|| docstring_after(lines, idx)).flatten())
            {
                symbol = symbol.with_summary(summary);
            }
            extraction.symbols.push(symbol);

            if kind.is_function() {
                for param in parameter_names(&line[name_match.end()..]) {
                    extraction
                        .variables
                        .push(Symbol::new(param, SymbolKind::Parameter, file, line_no));
                }
            }
            continue;
        }

        if let Some((caps, rule)) = match_definition(&rules.variables, line) {
            if let Some(name) = caps.name("name").map(|m| m.as_str()) {
                if name.eq_ignore_ascii_case("filler") {
                    continue;
                }
                let kind = if rule.kind == SymbolKind::Variable && is_constant_name(name) {
                    SymbolKind::Constant
                } else {
                    rule.kind
                };
                extraction
                    .variables
                    .push(Symbol::new(name, kind, file, line_no).with_signature(line.trim()));
            }
        }
    }

    extraction
}

fn match_definition<'r, 'l>(rules: &'r [Rule], line: &'l str) -> Option<(Captures<'l>, &'r Rule)> {
    rules.iter().find_map(|rule| {
        let caps = rule.pattern.captures(line)?;
        let name = caps.name("name")?.as_str();
        if is_keyword(short_name(name)) {
            return None;
        }
        if let Some(ret) = caps.name("ret") {
            if is_non_type_word(ret.as_str()) {
                return None;
            }
        }
        Some((caps, rule))
    })
}

fn is_non_type_word(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    NON_TYPE_WORDS.contains(&lower.as_str())
}

/// Last segment of a qualified name (`Widget::draw` -> `draw`).
fn short_name(name: &str) -> &str {
    name.rsplit("::").next().unwrap_or(name)
}

fn is_constant_name(name: &str) -> bool {
    name.len() > 1
        && name.chars().any(|c| c.is_ascii_alphabetic())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Parameter names from the text following a definition's name.
fn parameter_names(rest: &str) -> Vec<String> {
    let Some(open) = rest.find('(') else {
        return Vec::new();
    };
    let inner = &rest[open + 1..];
    let inner = match inner.find(')') {
        Some(close) => &inner[..close],
        None => inner,
    };

    inner
        .split(',')
        .filter_map(|raw| {
            let part = raw.split('=').next().unwrap_or("").trim();
            let part = if part.contains(':') && !part.contains("::") {
                part.split(':').next().unwrap_or("")
            } else {
                part
            };
            let ident = part
                .trim()
                .trim_end_matches(|c: char| c == '[' || c == ']' || c.is_whitespace())
                .rsplit(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
                .next()
                .unwrap_or("");
            let ident = ident.trim_start_matches('$');
            let skip = ident.is_empty()
                || ident.chars().next().is_some_and(|c| c.is_ascii_digit())
                || matches!(ident, "self" | "this" | "cls" | "void" | "mut");
            (!skip).then(|| ident.to_string())
        })
        .collect()
}

fn is_comment_line(trimmed: &str) -> bool {
    if trimmed.starts_with("#include")
        || trimmed.starts_with("#define")
        || trimmed.starts_with("#[")
        || trimmed.starts_with("#!")
    {
        return false;
    }
    trimmed.starts_with("//")
        || trimmed.starts_with('#')
        || trimmed.starts_with("/*")
        || trimmed.starts_with('*')
        || trimmed.starts_with("--")
        || trimmed.starts_with('!')
}

fn is_annotation_line(trimmed: &str) -> bool {
    trimmed.starts_with('@') || trimmed.starts_with("#[")
}

fn strip_comment_markers(trimmed: &str) -> &str {
    trimmed
        .trim_start_matches(|c: char| matches!(c, '/' | '*' | '#' | '!' | '-'))
        .trim_end_matches("*/")
        .trim()
}

fn clamp_summary(text: String) -> Option<String> {
    let text = text.trim().to_string();
    if text.is_empty() {
        return None;
    }
    if text.chars().count() <= MAX_SUMMARY_CHARS {
        return Some(text);
    }
    Some(text.chars().take(MAX_SUMMARY_CHARS).collect())
}

/// Comment block directly above line `idx`, skipping annotations.
pub fn leading_comment(lines: &[String], idx: usize) -> Option<String> {
    let mut collected: Vec<&str> = Vec::new();
    let mut cursor = idx;

    while cursor > 0 {
        cursor -= 1;
        let trimmed = lines[cursor].trim();
        if is_annotation_line(trimmed) && collected.is_empty() {
            continue;
        }
        if !is_comment_line(trimmed) {
            break;
        }
        collected.push(strip_comment_markers(trimmed));
    }

    collected.reverse();
    let text = collected
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    clamp_summary(text)
}

/// Python docstring starting on the line after `idx`.
pub fn docstring_after(lines: &[String], idx: usize) -> Option<String> {
    let first = lines.get(idx + 1)?.trim();
    let quote = ["\"\"\"", "'''"].into_iter().find(|q| first.starts_with(q))?;
    read_docstring(lines, idx + 1, quote)
}

fn read_docstring(lines: &[String], start: usize, quote: &str) -> Option<String> {
    let first = lines.get(start)?.trim();
    let body = &first[quote.len()..];
    if let Some(end) = body.find(quote) {
        return clamp_summary(body[..end].to_string());
    }

    let mut parts = vec![body.trim().to_string()];
    for line in lines.iter().skip(start + 1) {
        let trimmed = line.trim();
        if let Some(end) = trimmed.find(quote) {
            parts.push(trimmed[..end].to_string());
            break;
        }
        parts.push(trimmed.to_string());
    }
    let text = parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    clamp_summary(text)
}

/// Leading comment block or module docstring of a file.
pub fn file_summary(lines: &[String]) -> Option<String> {
    let start = lines
        .iter()
        .position(|l| {
            let t = l.trim();
            !t.is_empty() && !t.starts_with("#!")
        })?;
    let first = lines[start].trim();

    if let Some(quote) = ["\"\"\"", "'''"].into_iter().find(|q| first.starts_with(q)) {
        return read_docstring(lines, start, quote);
    }

    let text = lines[start..]
        .iter()
        .map(|l| l.trim())
        .take_while(|t| is_comment_line(t))
        .map(strip_comment_markers)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    clamp_summary(text)
}

// ---------------------------------------------------------------------------
// Shape checks used by the grep engine
// ---------------------------------------------------------------------------

static ENCLOSING_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^\s*(?:async\s+)?def\s+(?P<name>\w+)",
        r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(?P<name>[\w$]+)",
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?fn\s+(?P<name>\w+)",
        r"^func\s+(?:\([^)]*\)\s*)?(?P<name>\w+)\s*\(",
        r"(?i)^\s*(?:\w+(?:\(\d+\))?\s+)?(?:sub)?proc\s+(?P<name>[A-Za-z_^][\w^]*)",
        r"^\s*(?:public|private|protected)\s+(?:(?:static|final|abstract|synchronized|async|override|virtual)\s+)*(?:[\w<>\[\],.?]+\s+)?(?P<name>\w+)\s*\(",
        r"^\s*(?:(?:static|inline|extern|virtual|constexpr|const|unsigned|signed|struct|enum)\s+)*(?P<ret>[A-Za-z_][\w:<>]*)[\s\*&]+(?P<name>[A-Za-z_~][\w:~]*)\s*\([^;]*$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Name of the function a line defines, if it has a definition shape.
pub fn function_header_name(line: &str) -> Option<String> {
    ENCLOSING_PATTERNS.iter().find_map(|pattern| {
        let caps = pattern.captures(line)?;
        let name = short_name(caps.name("name")?.as_str());
        if is_keyword(name) {
            return None;
        }
        if caps.name("ret").is_some_and(|ret| is_non_type_word(ret.as_str())) {
            return None;
        }
        Some(name.to_string())
    })
}

/// A word that can stand before a function name in a typed definition.
/// Operators (`<<`, `*`), labels (`x:`), and control-flow words are not.
fn is_type_token(token: &str) -> bool {
    token.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
        && !(token.ends_with(':') && !token.ends_with("::"))
        && !is_non_type_word(token)
}

/// Whether `line` looks like the definition (or prototype) of `name`.
pub fn is_definition_line(line: &str, name: &str) -> bool {
    let escaped = regex::escape(name);
    let typed = format!(r"^\s*(?P<types>(?:[\w:<>\[\]\*&,]+\s+)+)[\*&]*{escaped}\s*\(");
    let receiver = format!(r"^\s*func\s*\([^)]*\)\s*{escaped}\s*\(");
    let assigned = format!(
        r"^\s*(?:(?:export|const|let|var|static|public|private)\s+)*{escaped}\s*[:=]\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*=>)"
    );
    let proc = format!(r"(?i)^\s*(?:\w+\s+)?(?:sub)?proc\s+{escaped}\b");

    if let Ok(re) = Regex::new(&typed) {
        if let Some(caps) = re.captures(line) {
            let all_types = caps
                .name("types")
                .is_some_and(|t| t.as_str().split_whitespace().all(is_type_token));
            if all_types {
                return true;
            }
        }
    }

    [receiver, assigned, proc]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .any(|re| re.is_match(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::split_lines;

    fn extract(language: &str, source: &str) -> Extraction {
        extract_symbols("file", language, &split_lines(source))
    }

    fn names(symbols: &[Symbol]) -> Vec<(&str, SymbolKind)> {
        symbols.iter().map(|s| (s.name.as_str(), s.kind)).collect()
    }

    #[test]
    fn test_python_definitions() {
        let source = r#"
MAX_RETRIES = 3

class OrderService:
    def pay_order(self, order, amount=0):
        """Charge the customer for an order."""
        self.total = amount

def helper(x):
    return x
"#;
        let found = extract("python", source);
        assert_eq!(
            names(&found.symbols),
            vec![
                ("OrderService", SymbolKind::Class),
                ("pay_order", SymbolKind::Method),
                ("helper", SymbolKind::Function),
            ]
        );
        assert_eq!(
            found.symbols[1].summary.as_deref(),
            Some("Charge the customer for an order.")
        );

        let vars = names(&found.variables);
        assert!(vars.contains(&("MAX_RETRIES", SymbolKind::Constant)));
        assert!(vars.contains(&("order", SymbolKind::Parameter)));
        assert!(vars.contains(&("amount", SymbolKind::Parameter)));
        assert!(vars.contains(&("total", SymbolKind::Field)));
        assert!(!vars.iter().any(|(n, _)| *n == "self"));
    }

    #[test]
    fn test_tal_procedures() {
        let source = "INT PROC compute^total(a, b);\nSUBPROC log^line;\nINT counter := 0;";
        let found = extract("tal", source);
        assert_eq!(
            names(&found.symbols),
            vec![
                ("compute^total", SymbolKind::Procedure),
                ("log^line", SymbolKind::Procedure),
            ]
        );
        assert_eq!(names(&found.variables)[2], ("counter", SymbolKind::Variable));
    }

    #[test]
    fn test_cobol_paragraphs() {
        let source = "       PROCEDURE DIVISION.\n       MAIN-LOGIC SECTION.\n       PROCESS-RECORD.\n           PERFORM READ-FILE.\n       01 WS-TOTAL PIC 9(5).\n          05 WS-COUNT PIC 9.";
        let found = extract("cobol", source);
        assert_eq!(
            names(&found.symbols),
            vec![
                ("MAIN-LOGIC", SymbolKind::Section),
                ("PROCESS-RECORD", SymbolKind::Paragraph),
            ]
        );
        assert_eq!(
            names(&found.variables),
            vec![
                ("WS-TOTAL", SymbolKind::Variable),
                ("WS-COUNT", SymbolKind::Field),
            ]
        );
    }

    #[test]
    fn test_javascript_definitions() {
        let source = "export async function loadUser(id) {}\nconst format = (value) => value;\nconst LIMIT = 10;\nclass Cart {\n  addItem(item) {\n    if (item) {\n    }\n  }\n}";
        let found = extract("javascript", source);
        assert_eq!(
            names(&found.symbols),
            vec![
                ("loadUser", SymbolKind::Function),
                ("format", SymbolKind::Function),
                ("Cart", SymbolKind::Class),
                ("addItem", SymbolKind::Method),
            ]
        );
        assert!(names(&found.variables).contains(&("LIMIT", SymbolKind::Constant)));
    }

    #[test]
    fn test_rust_definitions_with_doc_comment() {
        let source = "/// Adds two numbers.\n#[inline]\npub fn add(a: i32, b: i32) -> i32 { a + b }\n\npub struct Cart;\nimpl Cart {\n    pub fn total(&self) -> u32 { let sum = 0; sum }\n}";
        let found = extract("rust", source);
        assert_eq!(
            names(&found.symbols),
            vec![
                ("add", SymbolKind::Function),
                ("Cart", SymbolKind::Struct),
                ("total", SymbolKind::Method),
            ]
        );
        assert_eq!(found.symbols[0].summary.as_deref(), Some("Adds two numbers."));
        let params = names(&found.variables);
        assert!(params.contains(&("a", SymbolKind::Parameter)));
        assert!(params.contains(&("b", SymbolKind::Parameter)));
    }

    #[test]
    fn test_c_definitions_skip_calls() {
        let source = "int helper(int x) { return x * 2; }\nint main(void) {\n    int result = helper(5);\n    return helper(result);\n}";
        let found = extract("c", source);
        assert_eq!(
            names(&found.symbols),
            vec![("helper", SymbolKind::Function), ("main", SymbolKind::Function)]
        );
        assert!(names(&found.variables).contains(&("result", SymbolKind::Variable)));
    }

    #[test]
    fn test_go_receiver_method() {
        let found = extract("go", "func (s *Server) Start() error {\n\taddr := s.addr\n}\nfunc main() {}");
        assert_eq!(
            names(&found.symbols),
            vec![("Start", SymbolKind::Method), ("main", SymbolKind::Function)]
        );
        assert!(names(&found.variables).contains(&("addr", SymbolKind::Variable)));
    }

    #[test]
    fn test_file_summary() {
        let lines = split_lines("//! Order processing.\n//! Handles payments.\n\nfn main() {}");
        assert_eq!(
            file_summary(&lines).as_deref(),
            Some("Order processing. Handles payments.")
        );

        let py = split_lines("#!/usr/bin/env python\n\"\"\"Billing helpers.\"\"\"\nimport os");
        assert_eq!(file_summary(&py).as_deref(), Some("Billing helpers."));

        assert!(file_summary(&split_lines("fn main() {}")).is_none());
    }

    #[test]
    fn test_summary_is_clamped() {
        let long = format!("// {}\nfn f() {{}}", "x".repeat(500));
        let found = extract("rust", &long);
        assert_eq!(
            found.symbols[0].summary.as_ref().unwrap().chars().count(),
            MAX_SUMMARY_CHARS
        );
    }

    #[test]
    fn test_is_definition_line() {
        assert!(is_definition_line("int helper(int x) {", "helper"));
        assert!(is_definition_line("static void helper(void);", "helper"));
        assert!(is_definition_line("def helper(x):", "helper"));
        assert!(is_definition_line("export function helper() {", "helper"));
        assert!(is_definition_line("const helper = (a) => a;", "helper"));
        assert!(is_definition_line("func (s *S) helper() {", "helper"));
        assert!(is_definition_line("PROC helper;", "helper"));

        assert!(!is_definition_line("    result = helper(5);", "helper"));
        assert!(!is_definition_line("    return helper(5);", "helper"));
        assert!(!is_definition_line("helper(5);", "helper"));
        assert!(!is_definition_line("} else helper(1);", "helper"));
        assert!(!is_definition_line("    if validate(o):", "validate"));
        assert!(!is_definition_line("    while (helper(x)) {", "helper"));
        assert!(!is_definition_line("    std::cout << helper(5);", "helper"));
        assert!(!is_definition_line("    a << helper(1);", "helper"));
        assert!(!is_definition_line("    x: helper(1)", "helper"));
        assert!(is_definition_line("std::vector<int> helper(int n) {", "helper"));
    }

    #[test]
    fn test_function_header_name() {
        assert_eq!(function_header_name("def process(x):").as_deref(), Some("process"));
        assert_eq!(
            function_header_name("  async function load() {").as_deref(),
            Some("load")
        );
        assert_eq!(
            function_header_name("public static int compute(int a) {").as_deref(),
            Some("compute")
        );
        assert_eq!(
            function_header_name("int Widget::draw(int x) {").as_deref(),
            Some("draw")
        );
        assert_eq!(function_header_name("pub fn run() {").as_deref(), Some("run"));
        assert!(function_header_name("    return compute(a);").is_none());
        assert!(function_header_name("    } else if (x) {").is_none());
        assert!(function_header_name("    total = total + 1;").is_none());
    }
}
