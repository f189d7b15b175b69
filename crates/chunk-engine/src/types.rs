use serde::{Deserialize, Serialize};
use std::fmt;

/// A bounded slice of source text handed to the embedding stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeChunk {
    /// The actual code content
    pub content: String,

    /// Location and classification of this chunk
    pub metadata: ChunkMetadata,
}

impl CodeChunk {
    /// Create a new code chunk
    #[must_use]
    pub const fn new(content: String, metadata: ChunkMetadata) -> Self {
        Self { content, metadata }
    }

    /// Start line (1-indexed)
    #[must_use]
    pub const fn start_line(&self) -> usize {
        self.metadata.start_line
    }

    /// End line (1-indexed, inclusive)
    #[must_use]
    pub const fn end_line(&self) -> usize {
        self.metadata.end_line
    }

    /// Get the number of lines in this chunk
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.metadata.end_line.saturating_sub(self.metadata.start_line) + 1
    }

    /// Check if chunk contains a specific line
    #[must_use]
    pub const fn contains_line(&self, line: usize) -> bool {
        line >= self.metadata.start_line && line <= self.metadata.end_line
    }

    /// Check whether the line ranges of two chunks intersect
    #[must_use]
    pub const fn overlaps_range(&self, other: &Self) -> bool {
        self.metadata.start_line <= other.metadata.end_line
            && other.metadata.start_line <= self.metadata.end_line
    }

    /// Check whether `other` starts on the line right after this chunk ends
    #[must_use]
    pub const fn is_adjacent_to(&self, other: &Self) -> bool {
        other.metadata.start_line == self.metadata.end_line + 1
    }

    /// Check whether both chunks come from the same file
    #[must_use]
    pub fn same_file(&self, other: &Self) -> bool {
        self.metadata.file_path == other.metadata.file_path
    }
}

/// Metadata about a code chunk
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    /// Start line (1-indexed)
    pub start_line: usize,

    /// End line (1-indexed, inclusive)
    pub end_line: usize,

    /// Language tag of the source document
    pub language: String,

    /// Source file path
    pub file_path: Option<String>,

    /// Chunk type (function, class, import, ...)
    pub chunk_type: ChunkType,

    /// Rough structural complexity of the chunk
    pub complexity: Option<f32>,

    /// Synthetic node ids covered by this chunk
    #[serde(default)]
    pub node_ids: Vec<String>,

    /// Symbol name (function name, class name, etc.)
    pub symbol_name: Option<String>,

    /// Name of the strategy that produced the chunk
    pub strategy: Option<String>,
}

impl ChunkMetadata {
    /// Create metadata for a line range
    pub fn new(start_line: usize, end_line: usize, language: impl Into<String>) -> Self {
        Self {
            start_line,
            end_line,
            language: language.into(),
            ..Default::default()
        }
    }

    /// Builder: set chunk type
    #[must_use]
    pub const fn chunk_type(mut self, chunk_type: ChunkType) -> Self {
        self.chunk_type = chunk_type;
        self
    }

    /// Builder: set file path
    #[must_use]
    pub fn file_path(mut self, path: Option<&str>) -> Self {
        self.file_path = path.map(str::to_string);
        self
    }

    /// Builder: set symbol name
    #[must_use]
    pub fn symbol_name(mut self, name: impl Into<String>) -> Self {
        self.symbol_name = Some(name.into());
        self
    }

    /// Builder: set producing strategy
    #[must_use]
    pub fn strategy(mut self, name: impl Into<String>) -> Self {
        self.strategy = Some(name.into());
        self
    }

    /// Builder: set complexity
    #[must_use]
    pub const fn complexity(mut self, complexity: f32) -> Self {
        self.complexity = Some(complexity);
        self
    }

    /// Estimate complexity from branching keywords and nesting
    #[must_use]
    pub fn estimate_complexity(content: &str) -> f32 {
        const BRANCHES: [&str; 8] = [
            "if ", "else", "for ", "while ", "match ", "switch", "case ", "catch",
        ];
        let branches = content
            .lines()
            .map(str::trim_start)
            .filter(|line| {
                BRANCHES
                    .iter()
                    .any(|kw| line.starts_with(kw) || line.contains(&format!(" {kw}")))
            })
            .count();
        let depth = content
            .lines()
            .map(|line| line.len() - line.trim_start().len())
            .max()
            .unwrap_or(0);
        1.0 + branches as f32 + (depth / 4) as f32 * 0.5
    }
}

/// Type of code chunk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    /// Import/use statements
    Import,
    /// Standalone function
    Function,
    /// Method inside a class
    Method,
    /// Class, struct, trait or interface definition
    Class,
    /// Module-level code
    Module,
    /// Declaration found by the syntax-aware strategy
    Generic,
    /// Trailing context between two chunks
    Overlap,
    /// Result of folding similar chunks together
    Merged,
    /// Plain line-based chunk
    #[default]
    Chunk,
}

impl ChunkType {
    /// Get human-readable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Module => "module",
            Self::Generic => "generic",
            Self::Overlap => "overlap",
            Self::Merged => "merged",
            Self::Chunk => "chunk",
        }
    }

    /// Check if this is a declaration type
    #[must_use]
    pub const fn is_declaration(self) -> bool {
        matches!(self, Self::Function | Self::Method | Self::Class)
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which heuristics contributed to a boundary score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryComponents {
    pub syntactic: bool,
    pub semantic: bool,
    pub logical: bool,
    pub comment: bool,
}

/// Fitness of a line as a split point
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundaryScore {
    /// Weighted score clamped to `[0, 1]`
    pub score: f64,
    pub components: BoundaryComponents,
}

/// Strategy that produced an overlap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapStrategyKind {
    SmartDeduplication,
    NodeAware,
    AstBoundary,
    Semantic,
    Syntactic,
    SizeBased,
    Hybrid,
}

impl OverlapStrategyKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SmartDeduplication => "smart-deduplication",
            Self::NodeAware => "node-aware",
            Self::AstBoundary => "ast-boundary",
            Self::Semantic => "semantic",
            Self::Syntactic => "syntactic",
            Self::SizeBased => "size-based",
            Self::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for OverlapStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trailing context computed between two adjacent chunks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapResult {
    pub content: String,
    pub lines: usize,
    pub strategy: OverlapStrategyKind,
    /// Quality score in `[0, 1]`
    pub quality: f64,
    pub ast_nodes_used: Vec<String>,
    pub overlap_ratio: f64,
    /// First source line of the overlap (0 when empty)
    pub start_line: usize,
    /// Last source line of the overlap (0 when empty)
    pub end_line: usize,
}

impl OverlapResult {
    /// An overlap that attaches nothing
    #[must_use]
    pub const fn empty(strategy: OverlapStrategyKind) -> Self {
        Self {
            content: String::new(),
            lines: 0,
            strategy,
            quality: 0.0,
            ast_nodes_used: Vec::new(),
            overlap_ratio: 0.0,
            start_line: 0,
            end_line: 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Relationship between two adjacent chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    SequentialFunctions,
    ClassMethods,
    RelatedImports,
    FunctionCalls,
    None,
}

/// Classified adjacency between two chunks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRelationship {
    pub relationship: RelationshipType,
    pub similarity: f64,
    /// Short description of what links the chunks (e.g. the called name)
    pub context: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(start: usize, end: usize) -> CodeChunk {
        CodeChunk::new("code".to_string(), ChunkMetadata::new(start, end, "rust"))
    }

    #[test]
    fn test_chunk_line_count() {
        assert_eq!(chunk(10, 15).line_count(), 6);
    }

    #[test]
    fn test_chunk_contains_line() {
        let chunk = chunk(10, 15);
        assert!(chunk.contains_line(10));
        assert!(chunk.contains_line(12));
        assert!(chunk.contains_line(15));
        assert!(!chunk.contains_line(9));
        assert!(!chunk.contains_line(16));
    }

    #[test]
    fn test_range_relations() {
        assert!(chunk(1, 10).overlaps_range(&chunk(8, 15)));
        assert!(!chunk(1, 10).overlaps_range(&chunk(11, 15)));
        assert!(chunk(1, 10).is_adjacent_to(&chunk(11, 15)));
        assert!(!chunk(1, 10).is_adjacent_to(&chunk(12, 15)));
    }

    #[test]
    fn test_metadata_builder() {
        let metadata = ChunkMetadata::new(3, 7, "python")
            .chunk_type(ChunkType::Function)
            .file_path(Some("src/app.py"))
            .symbol_name("handler")
            .strategy("function");

        assert_eq!(metadata.chunk_type, ChunkType::Function);
        assert_eq!(metadata.file_path.as_deref(), Some("src/app.py"));
        assert_eq!(metadata.symbol_name.as_deref(), Some("handler"));
        assert_eq!(metadata.strategy.as_deref(), Some("function"));
    }

    #[test]
    fn test_complexity_grows_with_branches() {
        let flat = ChunkMetadata::estimate_complexity("let a = 1;\nlet b = 2;");
        let branchy = ChunkMetadata::estimate_complexity(
            "if a {\n    for x in y {\n        if z {\n        }\n    }\n} else {\n}",
        );
        assert!(branchy > flat);
    }

    #[test]
    fn test_overlap_strategy_names() {
        assert_eq!(OverlapStrategyKind::SmartDeduplication.to_string(), "smart-deduplication");
        assert_eq!(OverlapStrategyKind::SizeBased.as_str(), "size-based");
        assert!(OverlapResult::empty(OverlapStrategyKind::Hybrid).is_empty());
    }
}
