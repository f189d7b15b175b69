//! Per-language boundary detectors.
//!
//! Every detector is a pure function of `(lines, index, language)` so each one
//! can be tested on its own.

use super::BracketTracker;
use crate::language::{BlockStyle, Language};
use once_cell::sync::Lazy;
use regex::Regex;

static CLOSING_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\}\)\]]+[\)\]\}]*\s*[;,]?\s*$").expect("valid regex"));

static RUST_FN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^\s*(pub(\([^)]*\))?\s+)?(default\s+)?(const\s+)?(async\s+)?(unsafe\s+)?(extern\s+"[^"]*"\s+)?fn\s+\w+"#,
    )
    .expect("valid regex")
});

static JS_FN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(export\s+)?(default\s+)?(async\s+)?function\b|^\s*(export\s+)?(const|let|var)\s+\w+\s*(:[^=]+)?=\s*(async\s+)?(function\b|(\([^)]*\)|\w+)\s*(:\s*[^=]+)?=>)",
    )
    .expect("valid regex")
});

static JS_METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s+((public|private|protected|static|async|readonly|override|get|set)\s+)*#?\w+\s*(<[^>]*>)?\s*\([^;]*\)\s*(:\s*[^{;]+)?\{\s*$",
    )
    .expect("valid regex")
});

static PY_FN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(async\s+)?def\s+\w+").expect("valid regex"));

static RUBY_FN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*def\s+").expect("valid regex"));

static GO_FN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*func\s+").expect("valid regex"));

static KEYWORD_FN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*((public|private|internal|open|override|static|suspend|inline)\s+)*(fun|func|function)\s+\w+",
    )
    .expect("valid regex")
});

static C_LIKE_FN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*([\w<>\[\]\*&:,?]+\s+)+[\*&]*~?\w+\s*\([^;]*\)\s*(const\s*)?(throws\s+[\w.,\s]+)?(override\s*)?\{?\s*$",
    )
    .expect("valid regex")
});

static CLASS_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(export\s+)?(default\s+)?(pub(\([^)]*\))?\s+)?((public|private|protected|internal|abstract|final|sealed|data|static|partial|open|unsafe)\s+)*(class|struct|interface|trait|enum|impl|object|module|namespace|record)\b",
    )
    .expect("valid regex")
});

static VARIABLE_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*((export\s+)?(const|let|var|val|static)\s+\w+|[A-Za-z_][\w.]*\s*(:\s*[\w\[\], ]+)?\s*=[^=])",
    )
    .expect("valid regex")
});

static CLASS_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:class|struct|interface|trait|enum|impl|object|module|namespace|record)(?:\s*<[^>]*>\s*|\s+)([A-Za-z_]\w*)",
    )
    .expect("valid regex")
});

static DECLARED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:\bfn|\bdef|\bfunction|\bfunc|\bfun)\s+(?:\([^)]*\)\s*)?(\w+)|(?:\bconst|\blet|\bvar)\s+(\w+)\s*(?::[^=]+)?=|(\w+)\s*(?:<[^>]*>)?\s*\(",
    )
    .expect("valid regex")
});

static KEYWORD_OPENER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(def|class|module|if|unless|while|until|case|begin|for)\b|\bdo(\s*\|[^|]*\|)?\s*$",
    )
    .expect("valid regex")
});

/// Lines scanned for the `{` of a multi-line header
const HEADER_LOOKAHEAD: usize = 8;

static SEPARATOR_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(//|#|/\*|\*)\s*([-=*#~_]{3,})").expect("valid regex"));

const CONTROL_KEYWORDS: [&str; 11] = [
    "if", "else", "for", "while", "switch", "catch", "return", "match", "do", "new", "throw",
];

/// Indentation width with tabs counted as four columns
#[must_use]
pub fn indent_of(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

#[must_use]
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

pub fn prev_non_empty(lines: &[&str], index: usize) -> Option<usize> {
    (0..index.min(lines.len())).rev().find(|&i| !is_blank(lines[i]))
}

pub fn next_non_empty(lines: &[&str], index: usize) -> Option<usize> {
    (index + 1..lines.len()).find(|&i| !is_blank(lines[i]))
}

/// Line made only of closing punctuation (`}`, `});`, `]`, ...)
#[must_use]
pub fn is_closing_line(line: &str) -> bool {
    CLOSING_LINE.is_match(line.trim())
}

fn starts_with_control_keyword(line: &str) -> bool {
    let first = line
        .trim_start()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .next()
        .unwrap_or("");
    CONTROL_KEYWORDS.contains(&first)
}

/// Function, method or lambda signature
#[must_use]
pub fn is_function_signature(line: &str, language: Language) -> bool {
    if is_blank(line) || starts_with_control_keyword(line) {
        return false;
    }
    match language {
        Language::Rust => RUST_FN.is_match(line),
        Language::Python => PY_FN.is_match(line),
        Language::Ruby => RUBY_FN.is_match(line),
        Language::Go => GO_FN.is_match(line),
        Language::JavaScript | Language::TypeScript => {
            JS_FN.is_match(line) || JS_METHOD.is_match(line)
        }
        Language::Kotlin | Language::Swift | Language::Php => {
            KEYWORD_FN.is_match(line) || C_LIKE_FN.is_match(line)
        }
        Language::Java | Language::C | Language::Cpp | Language::CSharp => {
            C_LIKE_FN.is_match(line) && !line.trim_end().ends_with(';')
        }
        Language::Unknown => {
            JS_FN.is_match(line)
                || KEYWORD_FN.is_match(line)
                || PY_FN.is_match(line)
                || RUST_FN.is_match(line)
        }
    }
}

/// Method signature: an indented function signature
#[must_use]
pub fn is_method_signature(line: &str, language: Language) -> bool {
    indent_of(line) > 0 && is_function_signature(line, language)
}

/// Class, struct, trait, interface, enum or impl header
#[must_use]
pub fn is_class_header(line: &str) -> bool {
    CLASS_HEADER.is_match(line)
}

#[must_use]
pub fn is_variable_declaration(line: &str) -> bool {
    !starts_with_control_keyword(line) && VARIABLE_DECL.is_match(line)
}

#[must_use]
pub fn is_comment_line(line: &str, language: Language) -> bool {
    let trimmed = line.trim_start();
    language
        .line_comment_prefixes()
        .iter()
        .any(|p| trimmed.starts_with(p))
        || trimmed.starts_with("/*")
        || trimmed.starts_with('*')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Construct {
    Function,
    Method,
    Class,
}

/// Line that opened the block closed at `index`, for brace and keyword languages
fn block_opener(lines: &[&str], index: usize) -> Option<usize> {
    let indent = indent_of(lines[index]);
    let mut i = index;
    while i > 0 {
        i -= 1;
        let line = lines[i];
        if is_blank(line) || indent_of(line) != indent {
            continue;
        }
        let trimmed = line.trim();
        if trimmed == "{" {
            return prev_non_empty(lines, i);
        }
        if is_closing_line(trimmed) || trimmed == "end" || trimmed.starts_with('}') {
            // sibling block ended here, its opener is further up
            continue;
        }
        return Some(i);
    }
    None
}

fn classify_header(line: &str, language: Language) -> Option<Construct> {
    if is_class_header(line) {
        Some(Construct::Class)
    } else if is_function_signature(line, language) {
        if indent_of(line) > 0 {
            Some(Construct::Method)
        } else {
            Some(Construct::Function)
        }
    } else {
        None
    }
}

/// Constructs whose block ends on `index`
fn closed_constructs(lines: &[&str], index: usize, language: Language) -> Vec<Construct> {
    let Some(line) = lines.get(index) else {
        return Vec::new();
    };

    match language.block_style() {
        BlockStyle::Braces => {
            let trimmed = line.trim();
            if !(is_closing_line(trimmed) && trimmed.starts_with('}')) {
                return Vec::new();
            }
            block_opener(lines, index)
                .and_then(|opener| classify_header(lines[opener], language))
                .into_iter()
                .collect()
        }
        BlockStyle::Keyword => {
            if line.trim() != "end" {
                return Vec::new();
            }
            block_opener(lines, index)
                .and_then(|opener| classify_header(lines[opener], language))
                .into_iter()
                .collect()
        }
        BlockStyle::Indentation => indentation_closed(lines, index, language),
    }
}

/// Headers enclosing `index` whose body ends on it (the next code line dedents past them)
fn indentation_closed(lines: &[&str], index: usize, language: Language) -> Vec<Construct> {
    let line = lines[index];
    if is_blank(line) {
        return Vec::new();
    }
    let next_indent = next_non_empty(lines, index).map_or(0, |n| indent_of(lines[n]));

    let mut closed = Vec::new();
    let mut current_indent = indent_of(line);
    let mut i = index;
    while i > 0 && current_indent > 0 {
        i -= 1;
        let candidate = lines[i];
        if is_blank(candidate) {
            continue;
        }
        let indent = indent_of(candidate);
        if indent >= current_indent {
            continue;
        }
        current_indent = indent;
        if next_indent > indent {
            // the next code line is still inside this header's body
            continue;
        }
        if let Some(construct) = classify_header(candidate, language) {
            closed.push(construct);
        }
    }
    closed
}

/// Line ends a top-level function
#[must_use]
pub fn is_function_end(lines: &[&str], index: usize, language: Language) -> bool {
    closed_constructs(lines, index, language).contains(&Construct::Function)
}

/// Line ends a method (an indented function)
#[must_use]
pub fn is_method_end(lines: &[&str], index: usize, language: Language) -> bool {
    closed_constructs(lines, index, language).contains(&Construct::Method)
}

/// Line ends a class-like declaration
#[must_use]
pub fn is_class_end(lines: &[&str], index: usize, language: Language) -> bool {
    closed_constructs(lines, index, language).contains(&Construct::Class)
}

/// Line ends any function, method or class
#[must_use]
pub fn is_declaration_end(lines: &[&str], index: usize, language: Language) -> bool {
    !closed_constructs(lines, index, language).is_empty()
}

/// Last line of a run of imports
#[must_use]
pub fn is_import_end(lines: &[&str], index: usize, language: Language) -> bool {
    let Some(line) = lines.get(index) else {
        return false;
    };
    if !language.is_import_line(line) {
        return false;
    }
    next_non_empty(lines, index).map_or(true, |n| !language.is_import_line(lines[n]))
}

/// Blank line marking a transition between logical groups
#[must_use]
pub fn is_logical_group_break(lines: &[&str], index: usize, language: Language) -> bool {
    let Some(line) = lines.get(index) else {
        return false;
    };
    if !is_blank(line) {
        return false;
    }

    let prev = prev_non_empty(lines, index);
    let next = next_non_empty(lines, index);

    if let Some(p) = prev {
        if is_declaration_end(lines, p, language) || is_import_end(lines, p, language) {
            return true;
        }
    }
    if let Some(n) = next {
        if is_function_signature(lines[n], language) || is_class_header(lines[n]) {
            return prev.is_some();
        }
    }

    // same-kind neighbours directly around the blank line
    if index == 0 || index + 1 >= lines.len() {
        return false;
    }
    let (before, after) = (lines[index - 1], lines[index + 1]);
    if is_blank(before) || is_blank(after) {
        return false;
    }
    (is_variable_declaration(before) && is_variable_declaration(after))
        || (language.is_import_line(before) && language.is_import_line(after))
        || (is_comment_line(before, language) && is_comment_line(after, language))
}

/// Line closes a block comment or docstring
#[must_use]
pub fn closes_block_comment(line: &str, language: Language) -> bool {
    let trimmed = line.trim();
    match language {
        Language::Python => trimmed.ends_with("\"\"\"") || trimmed.ends_with("'''"),
        Language::Ruby => trimmed == "=end",
        _ => trimmed.ends_with("*/"),
    }
}

/// Separator comment such as `// ------` or `# =====`
#[must_use]
pub fn is_separator_comment(line: &str) -> bool {
    SEPARATOR_COMMENT.is_match(line)
}

/// Recognized good place for an overlap window to end
#[must_use]
pub fn is_good_overlap_end(line: &str, language: Language) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || is_closing_line(trimmed) || is_separator_comment(line) {
        return true;
    }
    if ["return", "break", "continue", "throw", "raise"].iter().any(|kw| {
        trimmed == *kw
            || trimmed.starts_with(&format!("{kw} "))
            || trimmed.starts_with(&format!("{kw};"))
    }) {
        return true;
    }
    if !language.uses_braces() && (trimmed == "end" || trimmed == "pass") {
        return true;
    }
    is_comment_line(line, language)
}

/// Name introduced by a function or class header
#[must_use]
pub fn declared_name(line: &str) -> Option<&str> {
    let caps = CLASS_NAME.captures(line).or_else(|| DECLARED_NAME.captures(line))?;
    (1..caps.len()).find_map(|i| caps.get(i)).map(|m| m.as_str())
}

/// Last line (0-based) of the declaration whose header is `lines[index]`
#[must_use]
pub fn block_end(lines: &[&str], index: usize, language: Language) -> usize {
    let last = lines.len().saturating_sub(1);
    if index >= lines.len() {
        return last;
    }

    match language.block_style() {
        BlockStyle::Braces => {
            let mut tracker = BracketTracker::new();
            let mut opened = false;
            for (j, line) in lines.iter().enumerate().skip(index) {
                let before = tracker.brace;
                tracker.advance(line, language);
                if tracker.brace > 0 {
                    opened = true;
                }
                if opened && tracker.brace <= 0 {
                    return j;
                }
                if !opened {
                    let inline_block = line.contains('{') && tracker.brace <= before;
                    if inline_block || line.trim_end().ends_with(';') {
                        return j;
                    }
                    if j >= index + HEADER_LOOKAHEAD {
                        return index;
                    }
                }
            }
            last
        }
        BlockStyle::Keyword => {
            let mut depth = 0i32;
            for (j, line) in lines.iter().enumerate().skip(index) {
                let trimmed = line.trim();
                if KEYWORD_OPENER.is_match(trimmed) {
                    depth += 1;
                }
                if trimmed == "end" || trimmed.ends_with(" end") || trimmed.ends_with(";end") {
                    depth -= 1;
                }
                if depth <= 0 {
                    return j;
                }
            }
            last
        }
        BlockStyle::Indentation => {
            let indent = indent_of(lines[index]);
            let mut end = index;
            for (j, line) in lines.iter().enumerate().skip(index + 1) {
                if is_blank(line) {
                    continue;
                }
                if indent_of(line) <= indent {
                    break;
                }
                end = j;
            }
            end
        }
    }
}
