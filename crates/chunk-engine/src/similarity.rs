//! Chunk similarity.
//!
//! Two metrics, each owning specific decisions:
//!
//! * [`line_jaccard`]: `|common| / |union|` over the sets of non-empty trimmed
//!   lines. Linear in the number of lines. Used for dedup filtering, merge
//!   gating and the smart-deduplication trigger.
//! * [`edit_similarity`]: character diff ratio (Myers diff via `similar`),
//!   O((N+M)·D) on inputs capped at [`EDIT_SIMILARITY_CAP`] chars. Used only to
//!   reject overlap text that duplicates existing content.
//!
//! The two do not agree near thresholds and are never compared to each other.

use crate::types::CodeChunk;
use similar::TextDiff;
use std::collections::HashSet;

/// Inputs longer than this are truncated before diffing
pub const EDIT_SIMILARITY_CAP: usize = 1024;

/// Set of non-empty trimmed lines
fn line_set(content: &str) -> HashSet<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Jaccard ratio over non-empty trimmed lines; two empty texts are identical
#[must_use]
pub fn line_jaccard(a: &str, b: &str) -> f64 {
    let left = line_set(a);
    let right = line_set(b);
    if left.is_empty() && right.is_empty() {
        return 1.0;
    }
    let common = left.intersection(&right).count();
    let union = left.len() + right.len() - common;
    common as f64 / union as f64
}

fn truncate_chars(text: &str, cap: usize) -> &str {
    match text.char_indices().nth(cap) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Character-level diff ratio in `[0, 1]`
#[must_use]
pub fn edit_similarity(a: &str, b: &str) -> f64 {
    let a = truncate_chars(a, EDIT_SIMILARITY_CAP);
    let b = truncate_chars(b, EDIT_SIMILARITY_CAP);
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    f64::from(TextDiff::from_chars(a, b).ratio())
}

/// Dedup and merge decisions between chunks
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityJudge;

impl SimilarityJudge {
    pub fn new() -> Self {
        Self
    }

    /// Content similarity of two chunks
    #[must_use]
    pub fn similarity(&self, a: &CodeChunk, b: &CodeChunk) -> f64 {
        line_jaccard(&a.content, &b.content)
    }

    /// Keep the first chunk of every group whose similarity reaches `threshold`
    #[must_use]
    pub fn filter_similar_chunks(&self, chunks: Vec<CodeChunk>, threshold: f64) -> Vec<CodeChunk> {
        let mut kept: Vec<CodeChunk> = Vec::with_capacity(chunks.len());
        let mut kept_sets: Vec<HashSet<String>> = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            let set: HashSet<String> = line_set(&chunk.content)
                .into_iter()
                .map(str::to_string)
                .collect();
            let duplicate = kept_sets.iter().zip(&kept).position(|(other, kept_chunk)| {
                kept_chunk.same_file(&chunk) && set_jaccard(&set, other) >= threshold
            });

            match duplicate {
                Some(index) => {
                    log::debug!(
                        "Dropping chunk {}-{}: near-duplicate of {}-{}",
                        chunk.start_line(),
                        chunk.end_line(),
                        kept[index].start_line(),
                        kept[index].end_line()
                    );
                }
                None => {
                    kept_sets.push(set);
                    kept.push(chunk);
                }
            }
        }

        kept
    }

    /// Whether two chunks are similar enough and positioned to be merged
    #[must_use]
    pub fn can_merge_chunks(&self, a: &CodeChunk, b: &CodeChunk, threshold: f64) -> bool {
        let positioned = a.overlaps_range(b) || a.is_adjacent_to(b) || b.is_adjacent_to(a);
        a.same_file(b) && positioned && self.similarity(a, b) >= threshold
    }
}

fn set_jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let common = a.intersection(b).count();
    common as f64 / (a.len() + b.len() - common) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkMetadata;

    fn chunk(start: usize, end: usize, content: &str) -> CodeChunk {
        CodeChunk::new(content.to_string(), ChunkMetadata::new(start, end, "typescript"))
    }

    #[test]
    fn test_line_jaccard() {
        assert_eq!(line_jaccard("a\nb", "a\nb"), 1.0);
        assert_eq!(line_jaccard("a\nb", "c\nd"), 0.0);
        assert!((line_jaccard("a\nb\nc", "a\nb\nd") - 0.5).abs() < 1e-9);
        assert_eq!(line_jaccard("  a  \n\n b", "a\nb"), 1.0);
        assert_eq!(line_jaccard("", "\n  \n"), 1.0);
    }

    #[test]
    fn test_edit_similarity() {
        assert_eq!(edit_similarity("return x;", "return x;"), 1.0);
        assert!(edit_similarity("return x;", "return y;") > 0.8);
        assert!(edit_similarity("abc", "xyz") < 0.1);
    }

    #[test]
    fn test_trailing_whitespace_duplicates_collapse() {
        let judge = SimilarityJudge::new();
        let a = chunk(1, 3, "function f(){\n  return 1;\n}");
        let b = chunk(20, 22, "function f(){   \n  return 1;  \n}\t");
        let out = judge.filter_similar_chunks(vec![a.clone(), b], 0.8);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0], a);
    }

    #[test]
    fn test_dissimilar_chunks_survive() {
        let judge = SimilarityJudge::new();
        let a = chunk(1, 3, "function f(){\n  return 1;\n}");
        let b = chunk(5, 7, "function g(){\n  return 2;\n}");
        assert_eq!(judge.filter_similar_chunks(vec![a, b], 0.8).len(), 2);
    }

    #[test]
    fn test_can_merge_requires_position_and_similarity() {
        let judge = SimilarityJudge::new();
        let a = chunk(1, 3, "x\ny\nz");
        let adjacent = chunk(4, 6, "x\ny\nz");
        let far = chunk(10, 12, "x\ny\nz");
        let different = chunk(4, 6, "p\nq\nr");

        assert!(judge.can_merge_chunks(&a, &adjacent, 0.8));
        assert!(!judge.can_merge_chunks(&a, &far, 0.8));
        assert!(!judge.can_merge_chunks(&a, &different, 0.8));
    }
}
