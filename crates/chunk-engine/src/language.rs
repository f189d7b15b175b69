use crate::error::{ChunkerError, Result};
use std::fmt;
use std::path::Path;

/// Language tag of a document being chunked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Java,
    C,
    Cpp,
    CSharp,
    Ruby,
    Swift,
    Kotlin,
    Php,
    Unknown,
}

/// How a language delimits blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStyle {
    /// `{ ... }` blocks
    Braces,
    /// Significant indentation
    Indentation,
    /// `... end` keyword blocks
    Keyword,
}

impl Language {
    /// Parse a language tag such as `"typescript"` or `"ts"`
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "rust" | "rs" => Self::Rust,
            "python" | "py" => Self::Python,
            "javascript" | "js" | "jsx" => Self::JavaScript,
            "typescript" | "ts" | "tsx" => Self::TypeScript,
            "go" | "golang" => Self::Go,
            "java" => Self::Java,
            "c" => Self::C,
            "cpp" | "c++" | "cxx" => Self::Cpp,
            "csharp" | "c#" | "cs" => Self::CSharp,
            "ruby" | "rb" => Self::Ruby,
            "swift" => Self::Swift,
            "kotlin" | "kt" => Self::Kotlin,
            "php" => Self::Php,
            _ => Self::Unknown,
        }
    }

    /// Detect language from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "rs" => Self::Rust,
            "py" | "pyw" => Self::Python,
            "js" | "mjs" | "cjs" | "jsx" => Self::JavaScript,
            "ts" | "tsx" => Self::TypeScript,
            "go" => Self::Go,
            "java" => Self::Java,
            "c" | "h" => Self::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Self::Cpp,
            "cs" => Self::CSharp,
            "rb" => Self::Ruby,
            "swift" => Self::Swift,
            "kt" | "kts" => Self::Kotlin,
            "php" => Self::Php,
            _ => Self::Unknown,
        }
    }

    /// Detect language from file path
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(Self::Unknown, Self::from_extension)
    }

    /// Get language name as string
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Go => "go",
            Self::Java => "java",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::CSharp => "csharp",
            Self::Ruby => "ruby",
            Self::Swift => "swift",
            Self::Kotlin => "kotlin",
            Self::Php => "php",
            Self::Unknown => "unknown",
        }
    }

    /// Block delimiting style; unknown languages are treated as brace-based
    pub const fn block_style(self) -> BlockStyle {
        match self {
            Self::Python => BlockStyle::Indentation,
            Self::Ruby => BlockStyle::Keyword,
            _ => BlockStyle::Braces,
        }
    }

    pub const fn uses_braces(self) -> bool {
        matches!(self.block_style(), BlockStyle::Braces)
    }

    /// Check if this language is supported for AST parsing
    pub const fn supports_ast(self) -> bool {
        matches!(
            self,
            Self::Rust | Self::Python | Self::JavaScript | Self::TypeScript
        )
    }

    /// Get Tree-sitter language instance
    pub fn tree_sitter_language(self) -> Result<tree_sitter::Language> {
        match self {
            Self::Rust => Ok(tree_sitter_rust::LANGUAGE.into()),
            Self::Python => Ok(tree_sitter_python::LANGUAGE.into()),
            Self::JavaScript => Ok(tree_sitter_javascript::LANGUAGE.into()),
            Self::TypeScript => Ok(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            _ => Err(ChunkerError::unsupported_language(self.as_str())),
        }
    }

    /// Get line comment prefixes for this language
    pub fn line_comment_prefixes(self) -> &'static [&'static str] {
        match self {
            Self::Python | Self::Ruby => &["#"],
            Self::Php => &["//", "#"],
            Self::Unknown => &["//", "#"],
            _ => &["//"],
        }
    }

    /// Get import/use statement patterns for this language
    pub fn import_patterns(self) -> &'static [&'static str] {
        match self {
            Self::Rust => &["use ", "pub use ", "extern crate ", "mod "],
            Self::Python => &["import ", "from "],
            Self::JavaScript | Self::TypeScript => &["import ", "export * from", "export {"],
            Self::Go | Self::Java | Self::Swift | Self::Kotlin => &["import ", "package "],
            Self::CSharp => &["using "],
            Self::Ruby => &["require ", "require_relative ", "include "],
            Self::C | Self::Cpp => &["#include ", "#import ", "using namespace "],
            Self::Php => &["use ", "require ", "require_once ", "include "],
            Self::Unknown => &["import ", "#include ", "use ", "require "],
        }
    }

    /// Check whether a line is an import statement in this language
    pub fn is_import_line(self, line: &str) -> bool {
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            return false;
        }
        if matches!(self, Self::Rust) && trimmed.starts_with("mod ") {
            // `mod foo;` declares a file module, `mod foo {` opens an inline one
            return trimmed.trim_end().ends_with(';');
        }
        if matches!(self, Self::JavaScript | Self::TypeScript)
            && trimmed.contains("require(")
            && (trimmed.starts_with("const ")
                || trimmed.starts_with("let ")
                || trimmed.starts_with("var "))
        {
            return true;
        }
        self.import_patterns()
            .iter()
            .any(|pattern| trimmed.starts_with(pattern))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
