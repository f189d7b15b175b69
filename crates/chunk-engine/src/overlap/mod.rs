//! Trailing context between adjacent chunks.
//!
//! The overlap window of a pair `(current, next)` always ends on the line
//! right before `next` starts and grows backward, never past the first line
//! of `current`. Every result honours three budgets at once:
//!
//! ```text
//! chars  <= min(overlap_size, min(len(current), len(next)) × max_overlap_ratio)
//! lines  <= max_overlap_lines
//! ```
//!
//! [`OverlapCalculator::add_overlap`] prepends the overlap to `next`. Its start
//! line only moves back when the overlap is the exact source slice right before
//! it, so a chunk's range never claims lines missing from its content.

mod history;

pub use history::{OverlapHistory, HISTORY_KEYS, HISTORY_PER_KEY};

use crate::boundary::{rules, BoundaryAnalyzer, BracketTracker};
use crate::config::ChunkingOptions;
use crate::language::Language;
use crate::relationship::ContextRelationshipOptimizer;
use crate::similarity::{edit_similarity, line_jaccard, SimilarityJudge};
use crate::syntax::{SyntaxNode, SyntaxTree};
use crate::tracker::{content_fingerprint, NodeConflictTracker};
use crate::types::{BoundaryScore, ChunkType, CodeChunk, OverlapResult, OverlapStrategyKind};
use std::collections::HashSet;
use std::time::Instant;

const SEMANTIC_KEEP_SCORE: f64 = 0.6;
const SHIFT_LINES: usize = 2;
const BOUNDARY_SEARCH_LINES: usize = 12;
const LEGACY_SEARCH_LINES: usize = 5;

const CONTROL_KEYWORDS: &[&str] = &[
    "return", "break", "continue", "throw", "raise", "pass", "if", "else", "for", "while", "match",
    "switch", "yield",
];

/// The document a set of chunks was cut from
#[derive(Debug, Clone)]
pub struct SourceDocument<'a> {
    pub content: &'a str,
    pub lines: Vec<&'a str>,
    pub language: Language,
    pub tree: Option<&'a SyntaxTree>,
    pub tracker: Option<&'a NodeConflictTracker>,
    scores: Vec<BoundaryScore>,
}

impl<'a> SourceDocument<'a> {
    pub fn new(content: &'a str, language: Language, analyzer: &BoundaryAnalyzer) -> Self {
        let lines: Vec<&str> = content.lines().collect();
        let scores = analyzer.score_lines(&lines, language);
        Self {
            content,
            lines,
            language,
            tree: None,
            tracker: None,
            scores,
        }
    }

    #[must_use]
    pub fn with_tree(mut self, tree: Option<&'a SyntaxTree>) -> Self {
        self.tree = tree;
        self
    }

    #[must_use]
    pub fn with_tracker(mut self, tracker: &'a NodeConflictTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Text of a 1-based line
    #[must_use]
    pub fn line(&self, line_no: usize) -> Option<&'a str> {
        self.lines.get(line_no.checked_sub(1)?).copied()
    }

    /// Boundary score of a 1-based line, 0 outside the document
    #[must_use]
    pub fn boundary_score(&self, line_no: usize) -> f64 {
        line_no
            .checked_sub(1)
            .and_then(|i| self.scores.get(i))
            .map_or(0.0, |score| score.score)
    }

    fn is_claimed(&self, line_no: usize) -> bool {
        self.tracker.is_some_and(|tracker| tracker.is_line_claimed(line_no))
    }

    fn is_node_unclaimed(&self, node: &SyntaxNode) -> bool {
        self.tracker
            .map_or(true, |tracker| !tracker.overlaps_range(node.start_line, node.end_line))
    }

    fn join(&self, selected: &[usize]) -> String {
        selected
            .iter()
            .filter_map(|&line_no| self.line(line_no))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Lines `[floor, end]` the overlap may be taken from
#[derive(Debug, Clone, Copy)]
struct Window {
    floor: usize,
    end: usize,
}

#[derive(Debug, Clone, Copy)]
struct Budget {
    max_chars: usize,
    max_lines: usize,
    base_len: usize,
}

impl Budget {
    const fn fits(&self, lines: usize, chars: usize) -> bool {
        lines <= self.max_lines && chars <= self.max_chars
    }

    fn ratio(&self, chars: usize) -> f64 {
        chars as f64 / self.base_len.max(1) as f64
    }

    fn with_max_chars(self, max_chars: usize) -> Self {
        Self {
            max_chars: self.max_chars.min(max_chars),
            ..self
        }
    }
}

fn joined_len(lines: &[&str]) -> usize {
    lines.iter().map(|line| line.len()).sum::<usize>() + lines.len().saturating_sub(1)
}

/// Computes, attaches and merges overlap between adjacent chunks
#[derive(Debug, Clone)]
pub struct OverlapCalculator {
    options: ChunkingOptions,
    analyzer: BoundaryAnalyzer,
    judge: SimilarityJudge,
    optimizer: ContextRelationshipOptimizer,
    history: OverlapHistory,
}

impl OverlapCalculator {
    pub fn new(options: ChunkingOptions) -> Self {
        Self {
            options,
            analyzer: BoundaryAnalyzer::new(),
            judge: SimilarityJudge::new(),
            optimizer: ContextRelationshipOptimizer::new(),
            history: OverlapHistory::new(),
        }
    }

    #[must_use]
    pub fn with_analyzer(mut self, analyzer: BoundaryAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    #[must_use]
    pub const fn options(&self) -> &ChunkingOptions {
        &self.options
    }

    pub fn analyzer_mut(&mut self) -> &mut BoundaryAnalyzer {
        &mut self.analyzer
    }

    #[must_use]
    pub const fn history(&self) -> &OverlapHistory {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Prepare a document for overlap queries, scoring its lines once
    #[must_use]
    pub fn document<'a>(&self, content: &'a str, language: Language) -> SourceDocument<'a> {
        SourceDocument::new(content, language, &self.analyzer)
    }

    /// Overlap for one pair, using the first matching strategy
    pub fn calculate_optimal_overlap(
        &mut self,
        current: &CodeChunk,
        next: &CodeChunk,
        doc: &SourceDocument<'_>,
    ) -> OverlapResult {
        self.overlap_between(current, next, doc, &[])
    }

    /// Overlap for one pair with a forced strategy
    pub fn calculate_with_strategy(
        &mut self,
        kind: OverlapStrategyKind,
        current: &CodeChunk,
        next: &CodeChunk,
        doc: &SourceDocument<'_>,
    ) -> OverlapResult {
        self.run_strategy(kind, current, next, doc, &[])
    }

    /// Strategy the calculator would pick for a pair
    #[must_use]
    pub fn select_strategy(
        &self,
        current: &CodeChunk,
        next: &CodeChunk,
        doc: &SourceDocument<'_>,
    ) -> OverlapStrategyKind {
        let options = &self.options;

        if options.enable_chunk_deduplication {
            let similar =
                line_jaccard(&current.content, &next.content) > options.deduplication_threshold;
            let seen = self
                .history
                .has_key(&OverlapHistory::key(current.end_line(), next.start_line()));
            let min_len = current.content.len().min(next.content.len());
            let over_budget =
                options.overlap_size as f64 > min_len as f64 * options.max_overlap_ratio;
            if similar || seen || over_budget {
                return OverlapStrategyKind::SmartDeduplication;
            }
        }

        if options.ast_node_tracking {
            let has_gap = next.start_line() > current.end_line() + 1;
            let semantic_boundary =
                doc.boundary_score(current.end_line()) >= options.boundary_threshold;
            if has_gap || semantic_boundary {
                return OverlapStrategyKind::NodeAware;
            }
        }

        if options.enable_ast_boundary_detection && doc.tree.is_some() {
            return OverlapStrategyKind::AstBoundary;
        }

        OverlapStrategyKind::Hybrid
    }

    /// Prepend overlap to every chunk that follows a chunk of the same file
    pub fn add_overlap(
        &mut self,
        chunks: Vec<CodeChunk>,
        doc: &SourceDocument<'_>,
    ) -> Vec<CodeChunk> {
        if chunks.len() < 2 {
            return chunks;
        }
        let started = Instant::now();
        let originals = chunks.clone();
        let mut out = chunks;
        let mut attached = 0;

        for i in 1..originals.len() {
            let (current, next) = (&originals[i - 1], &originals[i]);
            if !current.same_file(next) {
                continue;
            }
            let neighbours = &originals[i.saturating_sub(2)..(i + 2).min(originals.len())];
            let overlap = self.overlap_between(current, next, doc, neighbours);
            if overlap.is_empty() {
                continue;
            }
            log::debug!(
                "Attaching {} overlap lines ({}) to chunk {}-{}",
                overlap.lines,
                overlap.strategy,
                next.start_line(),
                next.end_line()
            );
            let target = &mut out[i];
            target.content = format!("{}\n{}", overlap.content, target.content);
            // Detached or filtered overlap is context only; the range keeps
            // covering source lines actually present in the content.
            if reaches_chunk(&overlap, next, doc) {
                target.metadata.start_line = target.metadata.start_line.min(overlap.start_line);
            }
            attached += 1;
        }

        if self.options.enable_performance_monitoring {
            log::debug!(
                "Overlap pass attached {attached}/{} overlaps in {:?}",
                out.len() - 1,
                started.elapsed()
            );
        }
        out
    }

    /// Fold similar adjacent or overlapping chunks together in one forward pass
    #[must_use]
    pub fn merge_similar_chunks(&self, chunks: Vec<CodeChunk>) -> Vec<CodeChunk> {
        let threshold = self.options.merge_threshold();
        let mut consumed = vec![false; chunks.len()];
        let mut merged = Vec::with_capacity(chunks.len());

        for i in 0..chunks.len() {
            if consumed[i] {
                continue;
            }
            consumed[i] = true;
            let mut running = chunks[i].clone();

            for j in (i + 1)..chunks.len() {
                if consumed[j] || !self.judge.can_merge_chunks(&running, &chunks[j], threshold) {
                    continue;
                }
                log::debug!(
                    "Merging chunk {}-{} into {}-{}",
                    chunks[j].start_line(),
                    chunks[j].end_line(),
                    running.start_line(),
                    running.end_line()
                );
                running = splice_chunks(&running, &chunks[j]);
                consumed[j] = true;
            }
            merged.push(running);
        }

        merged
    }

    /// Quality of an overlap relative to the chunk it accompanies, in `[0, 1]`
    #[must_use]
    pub fn evaluate_overlap_quality(
        &self,
        content: &str,
        chunk_len: usize,
        language: Language,
    ) -> f64 {
        if content.trim().is_empty() {
            return 0.0;
        }
        let ratio = content.len() as f64 / chunk_len.max(1) as f64;
        let mut quality: f64 = 0.5;

        if (0.1..=0.3).contains(&ratio) {
            quality += 0.2;
        } else if ratio > 0.3 {
            quality -= 0.1;
        } else {
            quality -= 0.05;
        }

        let lines: Vec<&str> = content.lines().collect();
        if lines.iter().any(|line| is_complete_statement(line)) {
            quality += 0.2;
        }

        let brackets = BracketTracker::over(&lines, language);
        if brackets.is_balanced() && brackets.depth() == 0 {
            quality += 0.1;
        }

        if lines
            .last()
            .is_some_and(|line| rules::is_good_overlap_end(line, language))
        {
            quality += 0.1;
        }

        quality.clamp(0.0, 1.0)
    }

    fn overlap_between(
        &mut self,
        current: &CodeChunk,
        next: &CodeChunk,
        doc: &SourceDocument<'_>,
        existing: &[CodeChunk],
    ) -> OverlapResult {
        let kind = self.select_strategy(current, next, doc);
        self.run_strategy(kind, current, next, doc, existing)
    }

    fn plan(
        &self,
        current: &CodeChunk,
        next: &CodeChunk,
        doc: &SourceDocument<'_>,
    ) -> Option<(Window, Budget)> {
        if !current.same_file(next) || next.start_line() <= current.start_line() {
            return None;
        }
        let end = (next.start_line() - 1).min(doc.line_count());
        let floor = current.start_line().max(1);
        if end < floor {
            return None;
        }

        let base_len = current.content.len().min(next.content.len());
        if base_len == 0 {
            return None;
        }
        let ratio_chars = (base_len as f64 * self.options.max_overlap_ratio).floor() as usize;
        let budget = Budget {
            max_chars: self.options.overlap_size.min(ratio_chars),
            max_lines: self.options.max_overlap_lines,
            base_len,
        };
        Some((Window { floor, end }, budget))
    }

    fn run_strategy(
        &mut self,
        kind: OverlapStrategyKind,
        current: &CodeChunk,
        next: &CodeChunk,
        doc: &SourceDocument<'_>,
        existing: &[CodeChunk],
    ) -> OverlapResult {
        let Some((window, budget)) = self.plan(current, next, doc) else {
            return OverlapResult::empty(kind);
        };

        let result = match kind {
            OverlapStrategyKind::SmartDeduplication => {
                self.smart_deduplication(current, next, doc, existing, window, budget)
            }
            OverlapStrategyKind::NodeAware => self.node_aware(current, doc, window, budget),
            OverlapStrategyKind::AstBoundary => self.ast_boundary(doc, window, budget),
            OverlapStrategyKind::Semantic => self.semantic(doc, window, budget),
            OverlapStrategyKind::Syntactic => self.syntactic(doc, window, budget),
            OverlapStrategyKind::SizeBased => self.size_based(doc, window, budget),
            OverlapStrategyKind::Hybrid => self.hybrid(current, next, doc, window, budget),
        };
        self.clamp(result, budget)
    }

    fn smart_deduplication(
        &mut self,
        current: &CodeChunk,
        next: &CodeChunk,
        doc: &SourceDocument<'_>,
        existing: &[CodeChunk],
        window: Window,
        budget: Budget,
    ) -> OverlapResult {
        let kind = OverlapStrategyKind::SmartDeduplication;
        let min_len = current.content.len().min(next.content.len());
        let optimal = (min_len as f64
            * self.options.max_overlap_ratio
            * self.options.overlap_scale()) as usize;
        let budget = budget.with_max_chars(optimal);
        let key = OverlapHistory::key(current.end_line(), next.start_line());

        let primary = tail_ending_at(doc, window.end, window.floor, budget);
        let shrunk = primary.and_then(|(start, end)| {
            let len = end - start + 1;
            (len >= 2).then(|| (end + 1 - len / 2, end))
        });
        let shifted = primary.and_then(|(start, end)| {
            let start = start.checked_sub(SHIFT_LINES).filter(|&s| s >= window.floor)?;
            let end = end - SHIFT_LINES;
            let texts: Vec<&str> = (start..=end).filter_map(|l| doc.line(l)).collect();
            budget.fits(texts.len(), joined_len(&texts)).then_some((start, end))
        });
        let boundary = search_back(window, BOUNDARY_SEARCH_LINES, |line_no| {
            doc.line(line_no)
                .is_some_and(|line| rules::is_good_overlap_end(line, doc.language))
        })
        .and_then(|end| tail_ending_at(doc, end, window.floor, budget));
        let legacy = search_back(window, LEGACY_SEARCH_LINES, |line_no| {
            doc.line(line_no)
                .is_some_and(|line| rules::is_blank(line) || rules::is_closing_line(line))
        })
        .and_then(|end| tail_ending_at(doc, end, window.floor, budget));

        let attempts = [
            ("primary", primary),
            ("shrink", shrunk),
            ("shift", shifted),
            ("boundary", boundary),
            ("legacy", legacy),
        ];
        for (label, range) in attempts {
            let Some((start, end)) = range else {
                continue;
            };
            let selected: Vec<usize> = (start..=end).collect();
            let result = self.build(kind, &selected, doc, budget);
            if result.is_empty() {
                continue;
            }
            if self.too_similar(&result.content, &key, next, existing) {
                log::debug!("Overlap candidate {label} for {key} duplicates existing content");
                continue;
            }
            self.history.record(&key, content_fingerprint(&result.content));
            return result;
        }

        log::debug!("No non-duplicating overlap for {key}; attaching none");
        OverlapResult::empty(kind)
    }

    fn too_similar(
        &self,
        content: &str,
        key: &str,
        next: &CodeChunk,
        existing: &[CodeChunk],
    ) -> bool {
        let threshold = self.options.deduplication_threshold;
        if self.history.contains(key, &content_fingerprint(content)) {
            return true;
        }
        let head = next
            .content
            .lines()
            .take(content.lines().count())
            .collect::<Vec<_>>()
            .join("\n");
        if edit_similarity(content, &head) >= threshold {
            return true;
        }
        existing
            .iter()
            .filter(|chunk| chunk.same_file(next))
            .any(|chunk| edit_similarity(content, &chunk.content) >= threshold)
    }

    fn node_aware(
        &self,
        current: &CodeChunk,
        doc: &SourceDocument<'_>,
        window: Window,
        budget: Budget,
    ) -> OverlapResult {
        let kind = OverlapStrategyKind::NodeAware;
        let gap = Window {
            floor: window.floor.max(current.end_line() + 1),
            end: window.end,
        };
        let selected = if gap.floor <= gap.end {
            grow_back(doc, gap, budget, |line_no| !doc.is_claimed(line_no))
        } else {
            Vec::new()
        };

        if selected.is_empty() {
            return OverlapResult {
                strategy: kind,
                ..self.semantic(doc, window, budget)
            };
        }
        self.build(kind, &selected, doc, budget)
    }

    fn ast_boundary(
        &self,
        doc: &SourceDocument<'_>,
        window: Window,
        budget: Budget,
    ) -> OverlapResult {
        let kind = OverlapStrategyKind::AstBoundary;
        let Some(tree) = doc.tree else {
            return OverlapResult::empty(kind);
        };

        let node_starts: HashSet<usize> = tree
            .iter()
            .filter(|(_, node)| doc.is_node_unclaimed(node))
            .map(|(_, node)| node.start_line)
            .collect();
        let span = grow_back(doc, window, budget, |_| true);
        let cut = span.iter().position(|&line_no| {
            node_starts.contains(&line_no)
                || (line_no > 1
                    && doc.boundary_score(line_no - 1) > self.options.boundary_threshold)
        });
        let selected = match cut {
            Some(index) => &span[index..],
            None => &span[span.len().saturating_sub(self.options.min_overlap_lines)..],
        };
        self.build(kind, selected, doc, budget)
    }

    fn semantic(&self, doc: &SourceDocument<'_>, window: Window, budget: Budget) -> OverlapResult {
        let lowest = window
            .end
            .saturating_sub(budget.max_lines.saturating_sub(1))
            .max(window.floor);
        let mut selected = Vec::new();
        let mut chars = 0;

        for line_no in (lowest..=window.end).rev() {
            let text = doc.line(line_no).unwrap_or("");
            let keep = doc.boundary_score(line_no) > SEMANTIC_KEEP_SCORE
                || selected.len() < self.options.min_overlap_lines
                || rules::is_function_signature(text, doc.language);
            if !keep {
                continue;
            }
            let grown = if selected.is_empty() { text.len() } else { chars + 1 + text.len() };
            if !budget.fits(selected.len() + 1, grown) {
                break;
            }
            selected.push(line_no);
            chars = grown;
        }

        selected.reverse();
        self.build(OverlapStrategyKind::Semantic, &selected, doc, budget)
    }

    fn syntactic(&self, doc: &SourceDocument<'_>, window: Window, budget: Budget) -> OverlapResult {
        let span = grow_back(doc, window, budget, |_| true);
        let texts: Vec<&str> = span.iter().filter_map(|&line_no| doc.line(line_no)).collect();
        let balanced_from = (0..texts.len()).find(|&i| {
            let tracker = BracketTracker::over(&texts[i..], doc.language);
            tracker.is_balanced() && tracker.depth() == 0
        });
        let selected = &span[balanced_from.unwrap_or(0)..];
        self.build(OverlapStrategyKind::Syntactic, selected, doc, budget)
    }

    fn size_based(
        &self,
        doc: &SourceDocument<'_>,
        window: Window,
        budget: Budget,
    ) -> OverlapResult {
        let selected = grow_back(doc, window, budget, |_| true);
        self.build(OverlapStrategyKind::SizeBased, &selected, doc, budget)
    }

    fn hybrid(
        &self,
        current: &CodeChunk,
        next: &CodeChunk,
        doc: &SourceDocument<'_>,
        window: Window,
        budget: Budget,
    ) -> OverlapResult {
        let candidates = [
            self.semantic(doc, window, budget),
            self.syntactic(doc, window, budget),
            self.size_based(doc, window, budget),
        ];
        let best = candidates
            .into_iter()
            .filter(|candidate| !candidate.is_empty())
            .fold(None, |best: Option<OverlapResult>, candidate| match best {
                Some(b) if b.quality >= candidate.quality => Some(b),
                _ => Some(candidate),
            });

        let Some(best) = best else {
            return OverlapResult::empty(OverlapStrategyKind::Hybrid);
        };
        log::debug!("Hybrid overlap picked {} (quality {:.2})", best.strategy, best.quality);
        let optimized = self
            .optimizer
            .optimize_overlap_for_context(best, current, next, doc.language);
        OverlapResult {
            strategy: OverlapStrategyKind::Hybrid,
            ..optimized
        }
    }

    fn build(
        &self,
        kind: OverlapStrategyKind,
        selected: &[usize],
        doc: &SourceDocument<'_>,
        budget: Budget,
    ) -> OverlapResult {
        let (Some(&start_line), Some(&end_line)) = (selected.first(), selected.last()) else {
            return OverlapResult::empty(kind);
        };
        let content = doc.join(selected);
        if content.trim().is_empty() {
            return OverlapResult::empty(kind);
        }

        let ast_nodes_used = doc
            .tree
            .map(|tree| {
                tree.nodes_within(start_line, end_line)
                    .map(SyntaxNode::synthetic_id)
                    .collect()
            })
            .unwrap_or_default();

        OverlapResult {
            lines: selected.len(),
            strategy: kind,
            quality: self.evaluate_overlap_quality(&content, budget.base_len, doc.language),
            ast_nodes_used,
            overlap_ratio: budget.ratio(content.len()),
            start_line,
            end_line,
            content,
        }
    }

    /// Drop leading lines until every budget holds
    fn clamp(&self, result: OverlapResult, budget: Budget) -> OverlapResult {
        if result.is_empty() {
            return result;
        }
        let lines: Vec<&str> = result.content.split('\n').collect();
        let mut dropped = 0;
        while dropped < lines.len()
            && !budget.fits(lines.len() - dropped, joined_len(&lines[dropped..]))
        {
            dropped += 1;
        }
        if dropped == 0 {
            return result;
        }
        if dropped == lines.len() {
            return OverlapResult::empty(result.strategy);
        }

        let kept = lines.len() - dropped;
        let content = lines[dropped..].join("\n");
        OverlapResult {
            lines: kept,
            overlap_ratio: budget.ratio(content.len()),
            start_line: (result.start_line + dropped).min(result.end_line),
            content,
            ..result
        }
    }
}

/// Largest contiguous run ending at `window.end` that fits `budget`
fn grow_back(
    doc: &SourceDocument<'_>,
    window: Window,
    budget: Budget,
    accept: impl Fn(usize) -> bool,
) -> Vec<usize> {
    let mut selected = Vec::new();
    let mut chars = 0;
    let mut line_no = window.end;

    while line_no >= window.floor && line_no >= 1 {
        if !accept(line_no) {
            break;
        }
        let len = doc.line(line_no).map_or(0, str::len);
        let grown = if selected.is_empty() { len } else { chars + 1 + len };
        if !budget.fits(selected.len() + 1, grown) {
            break;
        }
        selected.push(line_no);
        chars = grown;
        line_no -= 1;
    }

    selected.reverse();
    selected
}

/// The overlap is the exact source slice ending on the line before `next`
fn reaches_chunk(overlap: &OverlapResult, next: &CodeChunk, doc: &SourceDocument<'_>) -> bool {
    if overlap.start_line == 0 || overlap.end_line + 1 != next.start_line() {
        return false;
    }
    let span: Vec<usize> = (overlap.start_line..=overlap.end_line).collect();
    span.len() == overlap.lines && doc.join(&span) == overlap.content
}

fn tail_ending_at(
    doc: &SourceDocument<'_>,
    end: usize,
    floor: usize,
    budget: Budget,
) -> Option<(usize, usize)> {
    let selected = grow_back(doc, Window { floor, end }, budget, |_| true);
    Some((*selected.first()?, *selected.last()?))
}

/// Nearest line before `window.end`, at most `distance` lines back, matching `pred`
fn search_back(window: Window, distance: usize, pred: impl Fn(usize) -> bool) -> Option<usize> {
    let lowest = window.end.saturating_sub(distance).max(window.floor);
    (lowest..window.end).rev().find(|&line_no| pred(line_no))
}

fn is_complete_statement(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.ends_with(';') || trimmed.ends_with('{') || trimmed.ends_with('}') {
        return true;
    }
    let first_word = trimmed
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .next()
        .unwrap_or("");
    CONTROL_KEYWORDS.contains(&first_word)
}

/// Join two chunks, writing their shared lines once
fn splice_chunks(a: &CodeChunk, b: &CodeChunk) -> CodeChunk {
    let (first, second) = if b.start_line() < a.start_line() { (b, a) } else { (a, b) };
    let head = first.content.trim_end_matches('\n');

    let content = if second.end_line() <= first.end_line() {
        first.content.clone()
    } else if second.start_line() > first.end_line() {
        format!("{head}\n{}", second.content)
    } else {
        let shared = first.end_line() - second.start_line() + 1;
        let tail: Vec<&str> = second.content.lines().skip(shared).collect();
        if tail.is_empty() {
            first.content.clone()
        } else {
            format!("{head}\n{}", tail.join("\n"))
        }
    };

    let mut metadata = first.metadata.clone();
    metadata.end_line = first.end_line().max(second.end_line());
    metadata.chunk_type = ChunkType::Merged;
    for id in &second.metadata.node_ids {
        if !metadata.node_ids.contains(id) {
            metadata.node_ids.push(id.clone());
        }
    }
    metadata.complexity = match (first.metadata.complexity, second.metadata.complexity) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, y) => x.or(y),
    };
    if metadata.symbol_name.is_none() {
        metadata.symbol_name.clone_from(&second.metadata.symbol_name);
    }

    CodeChunk::new(content, metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkMetadata;
    use pretty_assertions::assert_eq;

    fn chunk_of(lines: &[&str], start: usize, end: usize) -> CodeChunk {
        CodeChunk::new(
            lines[start - 1..end].join("\n"),
            ChunkMetadata::new(start, end, "typescript"),
        )
    }

    const GAP_DOC: &[&str] = &[
        "function alpha() {",
        "  let x = 1;",
        "  let y = 2;",
        "  let z = 3;",
        "  x += y;",
        "  y += z;",
        "  z += x;",
        "  console.log(x);",
        "  return x + y + z;",
        "}",
        "const a1 = 11111111;",
        "const a2 = 22222222;",
        "const a3 = 33333333;",
        "const a4 = 44444444;",
        "function beta() {",
        "  const total = 42;",
        "  console.log(total);",
        "  const more = total * 2;",
        "  return more;",
        "}",
    ];

    fn gap_options() -> ChunkingOptions {
        ChunkingOptions {
            enable_chunk_deduplication: false,
            max_overlap_ratio: 1.0,
            overlap_size: 200,
            max_overlap_lines: 50,
            ..ChunkingOptions::default()
        }
    }

    #[test]
    fn test_gap_lines_fully_captured() {
        let content = GAP_DOC.join("\n");
        let mut calculator = OverlapCalculator::new(gap_options());
        let doc = calculator.document(&content, Language::TypeScript);
        let a = chunk_of(GAP_DOC, 1, 10);
        let b = chunk_of(GAP_DOC, 15, 20);

        assert_eq!(calculator.select_strategy(&a, &b, &doc), OverlapStrategyKind::NodeAware);
        let overlap = calculator.calculate_optimal_overlap(&a, &b, &doc);
        assert_eq!(overlap.content, GAP_DOC[10..14].join("\n"));
        assert_eq!(overlap.lines, 4);
        assert_eq!((overlap.start_line, overlap.end_line), (11, 14));
        assert_eq!(overlap.strategy, OverlapStrategyKind::NodeAware);
    }

    #[test]
    fn test_claimed_gap_lines_are_skipped() {
        let content = GAP_DOC.join("\n");
        let mut tracker = NodeConflictTracker::new();
        tracker.mark_used(&crate::tracker::SyntheticNode::new("chunk", 11, 12, "claimed"));
        let mut calculator = OverlapCalculator::new(gap_options());
        let doc = calculator
            .document(&content, Language::TypeScript)
            .with_tracker(&tracker);

        let overlap = calculator.calculate_optimal_overlap(
            &chunk_of(GAP_DOC, 1, 10),
            &chunk_of(GAP_DOC, 15, 20),
            &doc,
        );
        assert_eq!((overlap.start_line, overlap.end_line), (13, 14));
    }

    fn dedup_doc() -> Vec<String> {
        let mut lines: Vec<String> = (1..=20)
            .map(|i| format!("  total_{i:02} = compute_{i:02}(alpha);"))
            .collect();
        lines.extend((21..=40).map(|i| format!("  emit(\"{i}\", beta);")));
        lines
    }

    #[test]
    fn test_smart_dedup_walks_fallbacks_then_gives_up() {
        let owned = dedup_doc();
        let lines: Vec<&str> = owned.iter().map(String::as_str).collect();
        let content = lines.join("\n");
        let mut calculator = OverlapCalculator::new(ChunkingOptions::default());
        let doc = calculator.document(&content, Language::TypeScript);
        let current = chunk_of(&lines, 1, 20);
        let next = chunk_of(&lines, 21, 40);

        assert_eq!(
            calculator.select_strategy(&current, &next, &doc),
            OverlapStrategyKind::SmartDeduplication
        );

        let results: Vec<OverlapResult> = (0..5)
            .map(|_| calculator.calculate_optimal_overlap(&current, &next, &doc))
            .collect();

        // primary, shrunk, shifted
        assert_eq!((results[0].start_line, results[0].end_line), (19, 20));
        assert_eq!((results[1].start_line, results[1].end_line), (20, 20));
        assert_eq!((results[2].start_line, results[2].end_line), (17, 18));
        assert!(results[3].is_empty());
        assert_eq!(results[3].strategy, OverlapStrategyKind::SmartDeduplication);
        assert_eq!(results[3].lines, 0);
        assert!(results[4].is_empty());
        assert_eq!(calculator.history().entries(&OverlapHistory::key(20, 21)).count(), 3);

        calculator.clear_history();
        let fresh = calculator.calculate_optimal_overlap(&current, &next, &doc);
        assert_eq!(fresh.content, results[0].content);
    }

    #[test]
    fn test_overlap_bounds_hold_for_every_strategy() {
        let content = GAP_DOC.join("\n");
        let tree = SyntaxTree::parse(&content, Language::TypeScript).unwrap();
        let options = ChunkingOptions {
            max_overlap_lines: 3,
            ..ChunkingOptions::default()
        };
        let mut calculator = OverlapCalculator::new(options.clone());
        let doc = calculator
            .document(&content, Language::TypeScript)
            .with_tree(Some(&tree));
        let pairs = [(1, 10, 11, 20), (1, 10, 15, 20), (1, 14, 15, 20)];
        let kinds = [
            OverlapStrategyKind::SmartDeduplication,
            OverlapStrategyKind::NodeAware,
            OverlapStrategyKind::AstBoundary,
            OverlapStrategyKind::Semantic,
            OverlapStrategyKind::Syntactic,
            OverlapStrategyKind::SizeBased,
            OverlapStrategyKind::Hybrid,
        ];

        for (s1, e1, s2, e2) in pairs {
            let current = chunk_of(GAP_DOC, s1, e1);
            let next = chunk_of(GAP_DOC, s2, e2);
            let base = current.content.len().min(next.content.len());
            for kind in kinds {
                let overlap = calculator.calculate_with_strategy(kind, &current, &next, &doc);
                assert!(overlap.lines <= options.max_overlap_lines, "{kind}: {overlap:?}");
                assert!(overlap.content.len() <= options.overlap_size, "{kind}");
                assert!(
                    overlap.content.len() as f64 / base as f64 <= options.max_overlap_ratio + 1e-9,
                    "{kind}: {overlap:?}"
                );
                assert!(overlap.overlap_ratio <= options.max_overlap_ratio + 1e-9);
                assert!((0.0..=1.0).contains(&overlap.quality));
                if !overlap.is_empty() {
                    assert!(
                        overlap.start_line >= s1 && overlap.end_line < s2,
                        "{kind}: {overlap:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_strategy_selection_order() {
        let content = GAP_DOC.join("\n");
        let tree = SyntaxTree::parse(&content, Language::TypeScript).unwrap();
        let a = chunk_of(GAP_DOC, 1, 9);
        let b = chunk_of(GAP_DOC, 10, 20);

        let plain = ChunkingOptions {
            enable_chunk_deduplication: false,
            ast_node_tracking: false,
            ..ChunkingOptions::default()
        };
        let calculator = OverlapCalculator::new(plain.clone());
        let doc = calculator.document(&content, Language::TypeScript);
        assert_eq!(calculator.select_strategy(&a, &b, &doc), OverlapStrategyKind::Hybrid);
        let with_tree = calculator
            .document(&content, Language::TypeScript)
            .with_tree(Some(&tree));
        assert_eq!(
            calculator.select_strategy(&a, &b, &with_tree),
            OverlapStrategyKind::AstBoundary
        );

        let no_ast = OverlapCalculator::new(ChunkingOptions {
            enable_ast_boundary_detection: false,
            ..plain
        });
        assert_eq!(no_ast.select_strategy(&a, &b, &with_tree), OverlapStrategyKind::Hybrid);

        let dedup = OverlapCalculator::new(ChunkingOptions::default());
        assert_eq!(
            dedup.select_strategy(&a, &b, &doc),
            OverlapStrategyKind::SmartDeduplication
        );
    }

    #[test]
    fn test_hybrid_runs_through_relationship_optimizer() {
        let lines = [
            "function f(){",
            "  let value = compute();",
            "  return value;",
            "}",
            "function g(){",
            "  let other = compute();",
            "  return other;",
            "}",
        ];
        let content = lines.join("\n");
        let mut calculator = OverlapCalculator::new(ChunkingOptions {
            enable_chunk_deduplication: false,
            ast_node_tracking: false,
            max_overlap_ratio: 1.0,
            ..ChunkingOptions::default()
        });
        let doc = calculator.document(&content, Language::TypeScript);
        let overlap = calculator.calculate_optimal_overlap(
            &chunk_of(&lines, 1, 4),
            &chunk_of(&lines, 5, 8),
            &doc,
        );

        assert_eq!(overlap.strategy, OverlapStrategyKind::Hybrid);
        assert!(!overlap.is_empty());
        assert!(overlap
            .content
            .lines()
            .all(|line| rules::is_function_signature(line, Language::TypeScript)));

        // filtered lines are not a contiguous slice, so the range stays put
        let out =
            calculator.add_overlap(vec![chunk_of(&lines, 1, 4), chunk_of(&lines, 5, 8)], &doc);
        assert_eq!((out[1].start_line(), out[1].end_line()), (5, 8));
        assert_eq!(out[1].content, format!("{}\n{}", overlap.content, lines[4..8].join("\n")));
    }

    #[test]
    fn test_add_overlap_prepends_to_next_chunk() {
        let content = GAP_DOC.join("\n");
        let mut calculator = OverlapCalculator::new(gap_options());
        let doc = calculator.document(&content, Language::TypeScript);
        let chunks = vec![chunk_of(GAP_DOC, 1, 10), chunk_of(GAP_DOC, 15, 20)];

        let out = calculator.add_overlap(chunks.clone(), &doc);
        assert_eq!(out[0], chunks[0]);
        assert_eq!(out[1].start_line(), 11);
        assert_eq!(out[1].end_line(), 20);
        assert_eq!(out[1].content, GAP_DOC[10..20].join("\n"));
    }

    #[test]
    fn test_detached_overlap_keeps_chunk_range() {
        let owned = dedup_doc();
        let lines: Vec<&str> = owned.iter().map(String::as_str).collect();
        let content = lines.join("\n");
        let mut calculator = OverlapCalculator::new(ChunkingOptions::default());
        let doc = calculator.document(&content, Language::TypeScript);
        let chunks = vec![chunk_of(&lines, 1, 20), chunk_of(&lines, 21, 40)];

        // primary, shrunk, then the shifted window that stops short of line 21
        let passes: Vec<CodeChunk> = (0..3)
            .map(|_| calculator.add_overlap(chunks.clone(), &doc).remove(1))
            .collect();

        assert_eq!(passes[0].start_line(), 19);
        assert_eq!(passes[1].start_line(), 20);
        for chunk in &passes[..2] {
            assert_eq!(chunk.content, lines[chunk.start_line() - 1..40].join("\n"));
        }

        let detached = &passes[2];
        assert_eq!((detached.start_line(), detached.end_line()), (21, 40));
        assert_eq!(
            detached.content,
            format!("{}\n{}", lines[16..18].join("\n"), chunks[1].content)
        );
    }

    #[test]
    fn test_overlap_ignores_distant_duplicates() {
        let mut owned: Vec<String> = (1..=10)
            .map(|i| format!("let alpha_{i:02} = seed({i:02});"))
            .collect();
        owned.extend((11..=20).map(|i| format!("  emit_beta({i}, &rows);")));
        owned.extend((21..=30).map(|i| format!("  render_gamma({i});")));
        let copied = owned[8..10].to_vec();
        owned.extend(copied);
        let lines: Vec<&str> = owned.iter().map(String::as_str).collect();
        let content = lines.join("\n");

        let mut calculator = OverlapCalculator::new(ChunkingOptions::default());
        let doc = calculator.document(&content, Language::TypeScript);
        let chunks = vec![
            chunk_of(&lines, 1, 10),
            chunk_of(&lines, 11, 20),
            chunk_of(&lines, 21, 30),
            chunk_of(&lines, 31, 32),
        ];

        // lines 31-32 repeat the tail of the first chunk but are not its neighbours
        let out = calculator.add_overlap(chunks, &doc);
        assert_eq!(out[1].start_line(), 9);
        assert_eq!(out[1].content, lines[8..20].join("\n"));
    }

    #[test]
    fn test_add_overlap_skips_other_files() {
        let content = GAP_DOC.join("\n");
        let mut calculator = OverlapCalculator::new(gap_options());
        let doc = calculator.document(&content, Language::TypeScript);
        let mut other = chunk_of(GAP_DOC, 15, 20);
        other.metadata.file_path = Some("other.ts".to_string());
        let chunks = vec![chunk_of(GAP_DOC, 1, 10), other];

        assert_eq!(calculator.add_overlap(chunks.clone(), &doc), chunks);
    }

    #[test]
    fn test_merge_writes_shared_lines_once() {
        let owned: Vec<String> = (1..=15).map(|i| format!("line {i}")).collect();
        let lines: Vec<&str> = owned.iter().map(String::as_str).collect();
        let calculator = OverlapCalculator::new(ChunkingOptions {
            deduplication_threshold: 0.15,
            ..ChunkingOptions::default()
        });

        let merged =
            calculator.merge_similar_chunks(vec![chunk_of(&lines, 1, 10), chunk_of(&lines, 8, 15)]);
        assert_eq!(merged.len(), 1);
        assert_eq!((merged[0].start_line(), merged[0].end_line()), (1, 15));
        assert_eq!(merged[0].content, lines.join("\n"));
        assert_eq!(merged[0].metadata.chunk_type, ChunkType::Merged);
    }

    #[test]
    fn test_merge_leaves_dissimilar_chunks() {
        let calculator = OverlapCalculator::new(ChunkingOptions::default());
        let lines = ["a", "b", "c", "d"];
        let chunks = vec![chunk_of(&lines, 1, 2), chunk_of(&lines, 3, 4)];
        assert_eq!(calculator.merge_similar_chunks(chunks.clone()), chunks);
    }

    #[test]
    fn test_quality_scoring() {
        let calculator = OverlapCalculator::new(ChunkingOptions::default());
        let ts = Language::TypeScript;

        // in-range ratio, complete statement, good end, unbalanced
        assert!((calculator.evaluate_overlap_quality("  return x;\n}", 60, ts) - 1.0).abs() < 1e-9);
        // ratio too high, complete, balanced, no good end
        assert!((calculator.evaluate_overlap_quality("let a = f(1);", 20, ts) - 0.7).abs() < 1e-9);
        // ratio too low, incomplete, balanced
        assert!((calculator.evaluate_overlap_quality("a + b", 1000, ts) - 0.55).abs() < 1e-9);
        assert_eq!(calculator.evaluate_overlap_quality("   ", 10, ts), 0.0);
    }
}
