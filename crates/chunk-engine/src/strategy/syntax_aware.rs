use super::{SplitContext, SplitStrategy};
use crate::error::Result;
use crate::language::Language;
use crate::syntax::{NodeId, SyntaxTree};
use crate::types::{ChunkType, CodeChunk};
use std::borrow::Cow;

/// Emits every top-level declaration of the syntax tree.
///
/// Uses the caller's tree when one is supplied, otherwise parses the content
/// with tree-sitter.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntaxAwareStrategy;

impl SplitStrategy for SyntaxAwareStrategy {
    fn name(&self) -> &'static str {
        "syntax-aware"
    }

    fn priority(&self) -> u32 {
        40
    }

    fn supports_language(&self, language: Language) -> bool {
        language.supports_ast()
    }

    fn split(&self, ctx: &SplitContext<'_>) -> Result<Vec<CodeChunk>> {
        let tree: Cow<'_, SyntaxTree> = match ctx.tree {
            Some(tree) => Cow::Borrowed(tree),
            None => Cow::Owned(SyntaxTree::parse(ctx.content, ctx.language)?),
        };

        let declarations: Vec<(NodeId, usize, usize, ChunkType)> = tree
            .top_level()
            .filter_map(|(id, node)| {
                declaration_type(&node.kind)
                    .map(|chunk_type| (id, node.start_line, node.end_line, chunk_type))
            })
            .collect();

        let mut chunks = Vec::new();
        for (id, start, end, chunk_type) in declarations {
            if !ctx.is_free(start, end) {
                continue;
            }
            if let Some(mut chunk) = ctx.chunk(start, end, chunk_type, self.name()) {
                chunk.metadata.symbol_name = tree.symbol_name(id).map(str::to_string);
                chunks.push(chunk);
            }
        }

        Ok(chunks)
    }
}

/// Chunk type of a top-level node kind, `None` for non-declarations
fn declaration_type(kind: &str) -> Option<ChunkType> {
    if kind.contains("import") || kind == "use_declaration" || kind == "comment" {
        return None;
    }
    let declaration = kind.ends_with("_declaration")
        || kind.ends_with("_definition")
        || kind.ends_with("_item")
        || matches!(kind, "export_statement" | "decorated_definition");
    if !declaration {
        return None;
    }

    let chunk_type = if ["class", "struct", "enum", "trait", "interface", "impl"]
        .iter()
        .any(|k| kind.contains(k))
    {
        ChunkType::Class
    } else if kind.contains("function") || kind.contains("method") {
        ChunkType::Function
    } else if kind.contains("mod") || kind.contains("namespace") {
        ChunkType::Module
    } else {
        ChunkType::Generic
    };
    Some(chunk_type)
}
