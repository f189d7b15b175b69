//! Chunk extraction strategies.
//!
//! Strategies run in ascending [`SplitStrategy::priority`]. Each one sees the
//! conflict tracker as it stands after the earlier strategies, so it can skip
//! ranges that are already claimed; the coordinator still rejects any chunk
//! that conflicts.

mod classes;
mod fallback;
mod functions;
mod imports;
mod intelligent;
mod syntax_aware;

pub use classes::ClassStrategy;
pub use fallback::SemanticFallbackStrategy;
pub use functions::FunctionStrategy;
pub use imports::ImportStrategy;
pub use intelligent::IntelligentStrategy;
pub use syntax_aware::SyntaxAwareStrategy;

use crate::boundary::rules;
use crate::config::ChunkingOptions;
use crate::error::Result;
use crate::language::Language;
use crate::syntax::SyntaxTree;
use crate::tracker::NodeConflictTracker;
use crate::types::{ChunkMetadata, ChunkType, CodeChunk};

/// One extraction category
pub trait SplitStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lower runs first
    fn priority(&self) -> u32;

    fn supports_language(&self, language: Language) -> bool;

    fn split(&self, ctx: &SplitContext<'_>) -> Result<Vec<CodeChunk>>;
}

/// Everything a strategy may look at during one coordination call
#[derive(Debug, Clone)]
pub struct SplitContext<'a> {
    pub content: &'a str,
    pub lines: Vec<&'a str>,
    pub language: Language,
    /// Language tag as given by the caller, copied into chunk metadata
    pub language_tag: &'a str,
    pub file_path: Option<&'a str>,
    pub options: &'a ChunkingOptions,
    pub tracker: &'a NodeConflictTracker,
    pub tree: Option<&'a SyntaxTree>,
}

impl<'a> SplitContext<'a> {
    pub fn new(
        content: &'a str,
        language_tag: &'a str,
        file_path: Option<&'a str>,
        options: &'a ChunkingOptions,
        tracker: &'a NodeConflictTracker,
        tree: Option<&'a SyntaxTree>,
    ) -> Self {
        Self {
            content,
            lines: content.lines().collect(),
            language: Language::from_name(language_tag),
            language_tag,
            file_path,
            options,
            tracker,
            tree,
        }
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Lines `start..=end` (1-based) joined with `\n`
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> String {
        let from = start.saturating_sub(1).min(self.lines.len());
        let to = end.min(self.lines.len()).max(from);
        self.lines[from..to].join("\n")
    }

    /// No earlier strategy claimed any line of `start..=end`
    #[must_use]
    pub fn is_free(&self, start: usize, end: usize) -> bool {
        !self.tracker.overlaps_range(start, end)
    }

    /// Build a chunk for `start..=end`, or `None` when its size is out of bounds
    #[must_use]
    pub fn chunk(
        &self,
        start: usize,
        end: usize,
        chunk_type: ChunkType,
        strategy: &str,
    ) -> Option<CodeChunk> {
        let content = self.slice(start, end);
        if !self.options.accepts_size(content.len()) {
            log::debug!(
                "{strategy}: dropping {chunk_type} {start}-{end} ({} chars outside {}..={})",
                content.len(),
                self.options.min_chunk_size,
                self.options.max_chunk_size
            );
            return None;
        }

        let metadata = ChunkMetadata::new(start, end, self.language_tag)
            .chunk_type(chunk_type)
            .file_path(self.file_path)
            .strategy(strategy)
            .complexity(ChunkMetadata::estimate_complexity(&content));
        Some(CodeChunk::new(content, metadata))
    }
}

/// Header-driven extraction shared by the class and function strategies.
///
/// Scans for lines accepted by `is_header`, extends each to its block end and
/// emits it when free. An emitted declaration is skipped over; a rejected one
/// is scanned into, so nested declarations of an oversized parent still surface.
pub(crate) fn split_declarations(
    ctx: &SplitContext<'_>,
    strategy: &str,
    is_header: impl Fn(&str) -> bool,
    chunk_type_of: impl Fn(&str) -> ChunkType,
) -> Vec<CodeChunk> {
    let mut chunks = Vec::new();
    let mut index = 0;

    while index < ctx.lines.len() {
        let line = ctx.lines[index];
        if !is_header(line) {
            index += 1;
            continue;
        }

        let first = leading_attributes(&ctx.lines, index);
        let last = rules::block_end(&ctx.lines, index, ctx.language);
        let (start, end) = (first + 1, last + 1);

        let chunk = ctx
            .is_free(start, end)
            .then(|| ctx.chunk(start, end, chunk_type_of(line), strategy))
            .flatten();
        match chunk {
            Some(mut chunk) => {
                if let Some(name) = rules::declared_name(line) {
                    chunk.metadata.symbol_name = Some(name.to_string());
                }
                chunks.push(chunk);
                index = last + 1;
            }
            None => index += 1,
        }
    }

    chunks
}

/// First line of the decorators/annotations stacked directly above `index`
fn leading_attributes(lines: &[&str], index: usize) -> usize {
    let indent = rules::indent_of(lines[index]);
    let mut first = index;
    while first > 0 {
        let above = lines[first - 1];
        let trimmed = above.trim_start();
        let is_attribute = trimmed.starts_with('@') || trimmed.starts_with("#[");
        if !is_attribute || rules::indent_of(above) != indent {
            break;
        }
        first -= 1;
    }
    first
}

/// The built-in strategies, sorted by priority
#[must_use]
pub fn default_strategies() -> Vec<Box<dyn SplitStrategy>> {
    vec![
        Box::new(ImportStrategy),
        Box::new(ClassStrategy),
        Box::new(FunctionStrategy),
        Box::new(SyntaxAwareStrategy),
        Box::new(IntelligentStrategy::new()),
        Box::new(SemanticFallbackStrategy),
    ]
}
