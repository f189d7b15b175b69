use super::{SplitContext, SplitStrategy};
use crate::error::Result;
use crate::language::Language;
use crate::types::{ChunkType, CodeChunk};

/// Rough average line width used to size windows
const AVERAGE_LINE_CHARS: usize = 40;

/// Fixed line windows over whatever is still unclaimed.
///
/// Runs last and for every language; the coordinator also runs it alone when
/// an interceptor refuses the normal pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemanticFallbackStrategy;

impl SemanticFallbackStrategy {
    fn target_lines(max_chunk_size: usize) -> usize {
        (max_chunk_size / AVERAGE_LINE_CHARS).max(1)
    }
}

impl SplitStrategy for SemanticFallbackStrategy {
    fn name(&self) -> &'static str {
        "semantic-fallback"
    }

    fn priority(&self) -> u32 {
        60
    }

    fn supports_language(&self, _language: Language) -> bool {
        true
    }

    fn split(&self, ctx: &SplitContext<'_>) -> Result<Vec<CodeChunk>> {
        let max_chars = ctx.options.max_chunk_size;
        let target_lines = Self::target_lines(max_chars);
        let mut chunks = Vec::new();

        for (run_start, run_end) in ctx.tracker.unclaimed_runs(ctx.line_count()) {
            let mut start = run_start;
            while start <= run_end {
                let mut end = (start + target_lines - 1).min(run_end);
                while end > start && ctx.slice(start, end).len() > max_chars {
                    end -= 1;
                }
                if !ctx.slice(start, end).trim().is_empty() {
                    chunks.extend(ctx.chunk(start, end, ChunkType::Chunk, self.name()));
                }
                start = end + 1;
            }
        }

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkingOptions;
    use crate::tracker::{NodeConflictTracker, SyntheticNode};
    use pretty_assertions::assert_eq;

    fn create_test_content(lines: usize) -> String {
        (1..=lines).map(|i| format!("value_{i:03} = {i}")).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn test_windows_cover_unclaimed_lines() {
        let options = ChunkingOptions {
            max_chunk_size: 200,
            ..ChunkingOptions::default()
        };
        let content = create_test_content(12);
        let tracker = NodeConflictTracker::new();
        let ctx = SplitContext::new(&content, "python", None, &options, &tracker, None);

        let chunks = SemanticFallbackStrategy.split(&ctx).unwrap();
        let ranges: Vec<(usize, usize)> = chunks
            .iter()
            .map(|c| (c.start_line(), c.end_line()))
            .collect();
        assert_eq!(ranges, vec![(1, 5), (6, 10), (11, 12)]);
        assert!(chunks.iter().all(|c| c.metadata.chunk_type == ChunkType::Chunk));
    }

    #[test]
    fn test_window_shrinks_to_fit() {
        let options = ChunkingOptions {
            max_chunk_size: 80,
            ..ChunkingOptions::default()
        };
        let content = (1..=4)
            .map(|i| format!("let value_{i} = \"{}\";", "a".repeat(35)))
            .collect::<Vec<_>>()
            .join("\n");
        let tracker = NodeConflictTracker::new();
        let ctx = SplitContext::new(&content, "javascript", None, &options, &tracker, None);

        let chunks = SemanticFallbackStrategy.split(&ctx).unwrap();
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.content.len() <= 80 && c.start_line() == c.end_line()));
    }

    #[test]
    fn test_claimed_lines_are_skipped() {
        let options = ChunkingOptions::default();
        let content = create_test_content(6);
        let mut tracker = NodeConflictTracker::new();
        tracker.mark_used(&SyntheticNode::new("chunk", 1, 4, ""));
        let ctx = SplitContext::new(&content, "python", None, &options, &tracker, None);

        let chunks = SemanticFallbackStrategy.split(&ctx).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!((chunks[0].start_line(), chunks[0].end_line()), (5, 6));
    }
}
