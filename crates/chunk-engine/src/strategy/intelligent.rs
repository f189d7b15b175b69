use super::{SplitContext, SplitStrategy};
use crate::boundary::{rules, BoundaryAnalyzer};
use crate::error::Result;
use crate::language::Language;
use crate::types::{BoundaryScore, ChunkType, CodeChunk};

/// Cuts unclaimed code at the best-scoring boundaries so every piece fits
/// `max_chunk_size`
#[derive(Debug, Clone, Default)]
pub struct IntelligentStrategy {
    analyzer: BoundaryAnalyzer,
}

impl IntelligentStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_analyzer(analyzer: BoundaryAnalyzer) -> Self {
        Self { analyzer }
    }
}

impl SplitStrategy for IntelligentStrategy {
    fn name(&self) -> &'static str {
        "intelligent"
    }

    fn priority(&self) -> u32 {
        50
    }

    fn supports_language(&self, _language: Language) -> bool {
        true
    }

    fn split(&self, ctx: &SplitContext<'_>) -> Result<Vec<CodeChunk>> {
        let scores = self.analyzer.score_lines(&ctx.lines, ctx.language);
        let max_chars = ctx.options.max_chunk_size;
        let mut chunks = Vec::new();

        for (run_start, run_end) in ctx.tracker.unclaimed_runs(ctx.line_count()) {
            let mut start = run_start;
            while start <= run_end {
                let Some(first) = (start..=run_end).find(|&l| !is_blank_line(ctx, l)) else {
                    break;
                };
                let limit = farthest_fit(ctx, first, run_end, max_chars);
                let cut = if limit == run_end {
                    run_end
                } else {
                    best_cut(&scores, first + (limit - first) / 2, limit)
                };

                let mut last = cut;
                while last > first && is_blank_line(ctx, last) {
                    last -= 1;
                }
                chunks.extend(ctx.chunk(first, last, ChunkType::Module, self.name()));
                start = cut + 1;
            }
        }

        Ok(chunks)
    }
}

fn is_blank_line(ctx: &SplitContext<'_>, line_no: usize) -> bool {
    ctx.lines.get(line_no - 1).map_or(true, |line| rules::is_blank(line))
}

/// Last line `e` in `start..=end` with `slice(start, e)` within `max_chars`;
/// `start` itself when even one line is too long
fn farthest_fit(ctx: &SplitContext<'_>, start: usize, end: usize, max_chars: usize) -> usize {
    let line_len = |l: usize| ctx.lines.get(l - 1).map_or(0, |line| line.len());
    let mut chars = line_len(start);
    let mut last = start;
    while last < end && chars + 1 + line_len(last + 1) <= max_chars {
        last += 1;
        chars += 1 + line_len(last);
    }
    last
}

/// Highest-scoring line in `from..=to` (1-based); later lines win ties
fn best_cut(scores: &[BoundaryScore], from: usize, to: usize) -> usize {
    let score = |l: usize| scores.get(l - 1).map_or(0.0, |s| s.score);
    (from..=to).fold(from, |best, line_no| {
        if score(line_no) >= score(best) {
            line_no
        } else {
            best
        }
    })
}
