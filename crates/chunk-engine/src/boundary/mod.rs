//! Split-point scoring.
//!
//! A line's score is a weighted sum of four heuristics, clamped to `[0, 1]`:
//!
//! ```text
//! 0.3 × syntactic  (bracket balance after the line)
//! 0.4 × semantic   (strongest of function/class/method/import end)
//! 0.5 × logical    (blank line at a group transition)
//! 0.1 × comment    (line closes a block comment)
//! ```
//!
//! Each term is further scaled by the per-language [`BoundaryWeights`].

mod brackets;
pub mod rules;

pub use brackets::BracketTracker;

use crate::language::Language;
use crate::types::{BoundaryComponents, BoundaryScore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const SYNTACTIC_FACTOR: f64 = 0.3;
const SEMANTIC_FACTOR: f64 = 0.4;
const LOGICAL_FACTOR: f64 = 0.5;
const COMMENT_FACTOR: f64 = 0.1;

/// Per-language multipliers for each heuristic
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryWeights {
    pub syntactic: f64,
    pub function_end: f64,
    pub class_end: f64,
    pub method_end: f64,
    pub import_end: f64,
    pub logical_grouping: f64,
    pub comment: f64,
}

impl BoundaryWeights {
    /// Table used for languages without a dedicated one
    pub const GENERIC: Self = Self {
        syntactic: 0.8,
        function_end: 0.8,
        class_end: 0.8,
        method_end: 0.7,
        import_end: 0.6,
        logical_grouping: 0.8,
        comment: 0.5,
    };

    pub const BRACES: Self = Self {
        syntactic: 1.0,
        function_end: 1.0,
        class_end: 1.0,
        method_end: 0.9,
        import_end: 0.8,
        logical_grouping: 0.8,
        comment: 0.7,
    };

    pub const PYTHON: Self = Self {
        syntactic: 0.6,
        function_end: 1.0,
        class_end: 1.0,
        method_end: 0.9,
        import_end: 0.9,
        logical_grouping: 1.0,
        comment: 0.8,
    };

    pub const RUBY: Self = Self {
        syntactic: 0.6,
        function_end: 1.0,
        class_end: 1.0,
        method_end: 0.9,
        import_end: 0.7,
        logical_grouping: 0.9,
        comment: 0.6,
    };

    /// Built-in table for a language
    #[must_use]
    pub const fn builtin(language: Language) -> Self {
        match language {
            Language::Python => Self::PYTHON,
            Language::Ruby => Self::RUBY,
            Language::Unknown => Self::GENERIC,
            _ => Self::BRACES,
        }
    }
}

impl Default for BoundaryWeights {
    fn default() -> Self {
        Self::GENERIC
    }
}

/// Scores candidate split lines
#[derive(Debug, Clone, Default)]
pub struct BoundaryAnalyzer {
    custom: HashMap<Language, BoundaryWeights>,
}

impl BoundaryAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the weight table of one language
    pub fn set_custom_weights(&mut self, language: Language, weights: BoundaryWeights) {
        self.custom.insert(language, weights);
    }

    /// Drop every override
    pub fn clear_custom_weights(&mut self) {
        self.custom.clear();
    }

    #[must_use]
    pub fn weights_for(&self, language: Language) -> BoundaryWeights {
        self.custom
            .get(&language)
            .copied()
            .unwrap_or_else(|| BoundaryWeights::builtin(language))
    }

    /// Score `lines[index]` as a split point, using the rest of `lines` as context
    #[must_use]
    pub fn calculate_boundary_score(
        &self,
        lines: &[&str],
        index: usize,
        language: Language,
    ) -> BoundaryScore {
        if index >= lines.len() {
            return BoundaryScore::default();
        }
        let before = BracketTracker::over(&lines[..index], language);
        self.score_from(lines, index, language, before)
    }

    /// Score every line of `lines`, advancing the bracket state incrementally
    #[must_use]
    pub fn score_lines(&self, lines: &[&str], language: Language) -> Vec<BoundaryScore> {
        let mut state = BracketTracker::new();
        let mut scores = Vec::with_capacity(lines.len());
        for (index, line) in lines.iter().enumerate() {
            scores.push(self.score_from(lines, index, language, state));
            state.advance(line, language);
        }
        scores
    }

    /// Highest-scoring line index in `[from, to]`; later lines win ties
    #[must_use]
    pub fn find_best_boundary(
        &self,
        lines: &[&str],
        from: usize,
        to: usize,
        language: Language,
    ) -> Option<(usize, BoundaryScore)> {
        if from > to || to >= lines.len() {
            return None;
        }
        let scores = self.score_lines(&lines[..=to], language);
        (from..=to)
            .map(|i| (i, scores[i]))
            .fold(None, |best: Option<(usize, BoundaryScore)>, (i, score)| match best {
                Some((_, b)) if b.score > score.score => best,
                _ => Some((i, score)),
            })
    }

    fn score_from(
        &self,
        lines: &[&str],
        index: usize,
        language: Language,
        before: BracketTracker,
    ) -> BoundaryScore {
        let weights = self.weights_for(language);
        let line = lines[index];

        let mut after = before;
        after.advance(line, language);
        let syntactic =
            rules::is_blank(line) || rules::is_closing_line(line) || after.is_balanced();

        let mut semantic_weight: f64 = 0.0;
        if rules::is_function_end(lines, index, language) {
            semantic_weight = semantic_weight.max(weights.function_end);
        }
        if rules::is_class_end(lines, index, language) {
            semantic_weight = semantic_weight.max(weights.class_end);
        }
        if rules::is_method_end(lines, index, language) {
            semantic_weight = semantic_weight.max(weights.method_end);
        }
        if rules::is_import_end(lines, index, language) {
            semantic_weight = semantic_weight.max(weights.import_end);
        }
        let semantic = semantic_weight > 0.0;

        let logical = rules::is_logical_group_break(lines, index, language);
        let comment = rules::closes_block_comment(line, language);

        let mut score = 0.0;
        if syntactic {
            score += SYNTACTIC_FACTOR * weights.syntactic;
        }
        score += SEMANTIC_FACTOR * semantic_weight;
        if logical {
            score += LOGICAL_FACTOR * weights.logical_grouping;
        }
        if comment {
            score += COMMENT_FACTOR * weights.comment;
        }

        BoundaryScore {
            score: score.clamp(0.0, 1.0),
            components: BoundaryComponents {
                syntactic,
                semantic,
                logical,
                comment,
            },
        }
    }
}
