use crate::boundary::rules;
use crate::language::Language;
use crate::similarity::line_jaccard;
use crate::types::{ChunkRelationship, CodeChunk, OverlapResult, RelationshipType};
use once_cell::sync::Lazy;
use regex::Regex;

static TYPE_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(export\s+)?(pub(\([^)]*\))?\s+)?(type|typedef|interface|struct|enum)\b")
        .expect("valid regex")
});

static FIELD_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s+((public|private|protected|static|readonly|final|pub)\s+)*[\w$]+\s*[?!]?\s*:\s*[^=(]+[;,]?\s*$",
    )
    .expect("valid regex")
});

/// Classifies adjacent chunks and narrows an overlap to what links them
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextRelationshipOptimizer;

impl ContextRelationshipOptimizer {
    pub fn new() -> Self {
        Self
    }

    /// Classify the relationship between two adjacent chunks
    #[must_use]
    pub fn classify(
        &self,
        current: &CodeChunk,
        next: &CodeChunk,
        language: Language,
    ) -> ChunkRelationship {
        let similarity = line_jaccard(&current.content, &next.content);
        let relationship = |relationship, context: String| ChunkRelationship {
            relationship,
            similarity,
            context,
        };

        let next_first = next
            .content
            .lines()
            .find(|line| !rules::is_blank(line))
            .unwrap_or("");
        let current_last = current
            .content
            .lines()
            .rev()
            .find(|line| !rules::is_blank(line))
            .unwrap_or("");

        if rules::is_method_signature(next_first, language)
            && has_class_context(&current.content, language)
        {
            return relationship(RelationshipType::ClassMethods, next_first.trim().to_string());
        }

        let current_closes = if language.uses_braces() {
            current_last.trim_start().starts_with('}')
        } else {
            current.content.lines().any(|line| rules::is_function_signature(line, language))
        };
        if current_closes && rules::is_function_signature(next_first, language) {
            return relationship(
                RelationshipType::SequentialFunctions,
                next_first.trim().to_string(),
            );
        }

        let has_imports = |chunk: &CodeChunk| {
            chunk
                .content
                .lines()
                .any(|line| language.is_import_line(line))
        };
        if has_imports(current) && has_imports(next) {
            return relationship(RelationshipType::RelatedImports, String::new());
        }

        let called: Vec<String> = defined_function_names(&current.content, language)
            .into_iter()
            .filter(|name| is_called_in(&next.content, name))
            .collect();
        if !called.is_empty() {
            return relationship(RelationshipType::FunctionCalls, called.join(","));
        }

        relationship(RelationshipType::None, String::new())
    }

    /// Keep only the overlap lines relevant to the chunks' relationship
    #[must_use]
    pub fn optimize_overlap_for_context(
        &self,
        overlap: OverlapResult,
        current: &CodeChunk,
        next: &CodeChunk,
        language: Language,
    ) -> OverlapResult {
        if overlap.is_empty() {
            return overlap;
        }

        let relation = self.classify(current, next, language);
        let (keep, boost): (Box<dyn Fn(&str) -> bool>, f64) = match relation.relationship {
            RelationshipType::SequentialFunctions => (
                Box::new(|line: &str| {
                    rules::is_function_signature(line, language)
                        || language.is_import_line(line)
                        || TYPE_DECLARATION.is_match(line)
                        || rules::is_class_header(line)
                }),
                0.05,
            ),
            RelationshipType::ClassMethods => (
                Box::new(|line: &str| {
                    rules::is_class_header(line)
                        || rules::is_method_signature(line, language)
                        || FIELD_DECLARATION.is_match(line)
                }),
                0.15,
            ),
            RelationshipType::RelatedImports => {
                (Box::new(|line: &str| language.is_import_line(line)), 0.15)
            }
            RelationshipType::FunctionCalls => {
                let names: Vec<String> = relation.context.split(',').map(str::to_string).collect();
                (
                    Box::new(move |line: &str| {
                        rules::is_function_signature(line, language)
                            || names.iter().any(|name| is_called_in(line, name))
                    }),
                    0.10,
                )
            }
            RelationshipType::None => return overlap,
        };

        let kept: Vec<&str> = overlap.content.split('\n').filter(|line| keep(line)).collect();
        if kept.is_empty() {
            return overlap;
        }

        let content = kept.join("\n");
        let scale = content.len() as f64 / overlap.content.len().max(1) as f64;
        OverlapResult {
            lines: kept.len(),
            overlap_ratio: overlap.overlap_ratio * scale,
            quality: (overlap.quality + boost).min(1.0),
            content,
            ..overlap
        }
    }
}

fn has_class_context(content: &str, language: Language) -> bool {
    content
        .lines()
        .any(|line| rules::is_class_header(line) || rules::is_method_signature(line, language))
}

/// Names of functions declared in `content`
fn defined_function_names(content: &str, language: Language) -> Vec<String> {
    let mut names: Vec<String> = content
        .lines()
        .filter(|line| rules::is_function_signature(line, language))
        .filter_map(|line| rules::declared_name(line).map(str::to_string))
        .collect();
    names.sort();
    names.dedup();
    names
}

/// `name(` appears as a call (not as part of a longer identifier)
fn is_called_in(text: &str, name: &str) -> bool {
    let needle = format!("{name}(");
    text.match_indices(&needle).any(|(idx, _)| {
        text[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_'))
    })
}
