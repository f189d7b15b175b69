use super::{split_declarations, SplitContext, SplitStrategy};
use crate::boundary::rules;
use crate::error::Result;
use crate::language::Language;
use crate::types::{ChunkType, CodeChunk};

/// Class, struct, interface, trait, enum and impl declarations
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassStrategy;

impl SplitStrategy for ClassStrategy {
    fn name(&self) -> &'static str {
        "class"
    }

    fn priority(&self) -> u32 {
        20
    }

    fn supports_language(&self, language: Language) -> bool {
        !matches!(language, Language::C | Language::Unknown)
    }

    fn split(&self, ctx: &SplitContext<'_>) -> Result<Vec<CodeChunk>> {
        Ok(split_declarations(ctx, self.name(), rules::is_class_header, |_| {
            ChunkType::Class
        }))
    }
}
