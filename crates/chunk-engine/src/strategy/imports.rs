use super::{SplitContext, SplitStrategy};
use crate::boundary::{rules, BracketTracker};
use crate::error::Result;
use crate::language::Language;
use crate::types::{ChunkType, CodeChunk};

/// Groups runs of import statements into one chunk per run
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportStrategy;

impl SplitStrategy for ImportStrategy {
    fn name(&self) -> &'static str {
        "import"
    }

    fn priority(&self) -> u32 {
        10
    }

    fn supports_language(&self, _language: Language) -> bool {
        true
    }

    fn split(&self, ctx: &SplitContext<'_>) -> Result<Vec<CodeChunk>> {
        let mut chunks = Vec::new();
        let mut index = 0;

        while index < ctx.lines.len() {
            if !ctx.language.is_import_line(ctx.lines[index]) {
                index += 1;
                continue;
            }

            let first = index;
            let mut last = import_end(&ctx.lines, index, ctx.language);
            let mut cursor = last + 1;
            while cursor < ctx.lines.len() {
                let line = ctx.lines[cursor];
                if rules::is_blank(line) {
                    cursor += 1;
                } else if ctx.language.is_import_line(line) {
                    last = import_end(&ctx.lines, cursor, ctx.language);
                    cursor = last + 1;
                } else {
                    break;
                }
            }

            let (start, end) = (first + 1, last + 1);
            if ctx.is_free(start, end) {
                chunks.extend(ctx.chunk(start, end, ChunkType::Import, self.name()));
            }
            index = last + 1;
        }

        Ok(chunks)
    }
}

/// Last line of the (possibly multi-line) import starting at `index`
fn import_end(lines: &[&str], index: usize, language: Language) -> usize {
    let mut tracker = BracketTracker::new();
    for (j, line) in lines.iter().enumerate().skip(index) {
        tracker.advance(line, language);
        if tracker.is_balanced() {
            return j;
        }
    }
    lines.len().saturating_sub(1)
}
