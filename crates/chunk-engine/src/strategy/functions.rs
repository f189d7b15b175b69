use super::{split_declarations, SplitContext, SplitStrategy};
use crate::boundary::rules;
use crate::error::Result;
use crate::language::Language;
use crate::types::{ChunkType, CodeChunk};

/// Function, method and lambda declarations outside already claimed ranges
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionStrategy;

impl SplitStrategy for FunctionStrategy {
    fn name(&self) -> &'static str {
        "function"
    }

    fn priority(&self) -> u32 {
        30
    }

    fn supports_language(&self, _language: Language) -> bool {
        true
    }

    fn split(&self, ctx: &SplitContext<'_>) -> Result<Vec<CodeChunk>> {
        let language = ctx.language;
        Ok(split_declarations(
            ctx,
            self.name(),
            |line| rules::is_function_signature(line, language),
            |line| {
                if rules::indent_of(line) > 0 {
                    ChunkType::Method
                } else {
                    ChunkType::Function
                }
            },
        ))
    }
}
