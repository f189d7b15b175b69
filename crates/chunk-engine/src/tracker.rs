//! Claimed-range bookkeeping for one coordination call.

use crate::types::CodeChunk;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};

/// Short content fingerprint: first 8 bytes of SHA-256, hex encoded
#[must_use]
pub fn content_fingerprint(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

/// Line-range stand-in for a syntax node, built from a chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticNode {
    pub id: String,
    pub node_type: String,
    pub start_line: usize,
    pub end_line: usize,
    pub text: String,
    pub content_hash: String,
}

impl SyntheticNode {
    pub fn new(
        node_type: impl Into<String>,
        start_line: usize,
        end_line: usize,
        text: impl Into<String>,
    ) -> Self {
        let node_type = node_type.into();
        let text = text.into();
        Self {
            id: format!("{node_type}:{start_line}:{end_line}"),
            content_hash: content_fingerprint(&text),
            node_type,
            start_line,
            end_line: end_line.max(start_line),
            text,
        }
    }

    /// Build the node claimed by a chunk
    #[must_use]
    pub fn from_chunk(chunk: &CodeChunk) -> Self {
        Self::new(
            chunk.metadata.chunk_type.as_str(),
            chunk.start_line(),
            chunk.end_line(),
            chunk.content.as_str(),
        )
    }

    #[must_use]
    pub const fn intersects(&self, start: usize, end: usize) -> bool {
        self.start_line <= end && start <= self.end_line
    }
}

/// Counters reported by [`NodeConflictTracker::stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerStats {
    pub total_nodes: usize,
    pub used_nodes: usize,
    pub similarity_hits: usize,
    pub content_hash_collisions: usize,
}

/// Records which line ranges have been claimed by accepted chunks.
///
/// Exact lookups go through a map keyed by synthetic id; range queries use a
/// start-line ordered index together with the longest claimed span, so a query
/// only visits entries whose start lies in `[start - max_span, end]`.
#[derive(Debug, Default)]
pub struct NodeConflictTracker {
    by_id: HashMap<String, SyntheticNode>,
    by_start: BTreeMap<usize, Vec<(usize, String)>>,
    hashes: HashMap<String, (usize, usize)>,
    max_span: usize,
    stats: TrackerStats,
}

impl NodeConflictTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every claim and reset statistics
    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_start.clear();
        self.hashes.clear();
        self.max_span = 0;
        self.stats = TrackerStats::default();
    }

    /// Claim the node's range
    pub fn mark_used(&mut self, node: &SyntheticNode) {
        if self.by_id.contains_key(&node.id) {
            return;
        }

        self.note_hash(node);
        self.max_span = self.max_span.max(node.end_line.saturating_sub(node.start_line));
        self.by_start
            .entry(node.start_line)
            .or_default()
            .push((node.end_line, node.id.clone()));
        self.hashes
            .entry(node.content_hash.clone())
            .or_insert((node.start_line, node.end_line));
        self.by_id.insert(node.id.clone(), node.clone());
        self.stats.used_nodes += 1;
    }

    /// Exact id match against a claimed node
    #[must_use]
    pub fn is_used(&self, node: &SyntheticNode) -> bool {
        self.by_id.contains_key(&node.id)
    }

    /// Whether any claimed node intersects the node's line range
    #[must_use]
    pub fn has_overlap(&self, node: &SyntheticNode) -> bool {
        self.overlaps_range(node.start_line, node.end_line)
    }

    /// Whether any claimed node intersects `[start, end]`
    #[must_use]
    pub fn overlaps_range(&self, start: usize, end: usize) -> bool {
        let lower = start.saturating_sub(self.max_span);
        self.by_start
            .range(lower..=end)
            .any(|(_, entries)| entries.iter().any(|(claimed_end, _)| *claimed_end >= start))
    }

    /// Whether `line` lies inside any claimed range
    #[must_use]
    pub fn is_line_claimed(&self, line: usize) -> bool {
        self.overlaps_range(line, line)
    }

    /// Check a candidate against the claims, updating the statistics.
    ///
    /// Returns `true` when the candidate conflicts and must be rejected.
    pub fn check(&mut self, node: &SyntheticNode) -> bool {
        self.stats.total_nodes += 1;
        let conflict = self.is_used(node) || self.has_overlap(node);
        if conflict {
            self.stats.similarity_hits += 1;
            self.note_hash(node);
        }
        conflict
    }

    fn note_hash(&mut self, node: &SyntheticNode) {
        if let Some(&(start, end)) = self.hashes.get(&node.content_hash) {
            if (start, end) != (node.start_line, node.end_line) {
                self.stats.content_hash_collisions += 1;
            }
        }
    }

    /// Claimed ranges sorted by start, with touching or intersecting ranges merged
    #[must_use]
    pub fn used_ranges(&self) -> Vec<(usize, usize)> {
        let mut ranges: Vec<(usize, usize)> = Vec::new();
        for (&start, entries) in &self.by_start {
            let end = entries.iter().map(|(end, _)| *end).max().unwrap_or(start);
            match ranges.last_mut() {
                Some(last) if start <= last.1 + 1 => last.1 = last.1.max(end),
                _ => ranges.push((start, end)),
            }
        }
        ranges
    }

    /// Maximal runs of lines in `1..=total_lines` not covered by any claim
    #[must_use]
    pub fn unclaimed_runs(&self, total_lines: usize) -> Vec<(usize, usize)> {
        let mut runs = Vec::new();
        let mut next = 1;
        for (start, end) in self.used_ranges() {
            if start > next {
                runs.push((next, (start - 1).min(total_lines)));
            }
            next = next.max(end + 1);
            if next > total_lines {
                break;
            }
        }
        if next <= total_lines {
            runs.push((next, total_lines));
        }
        runs.retain(|(start, end)| start <= end);
        runs
    }

    /// Claimed node by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SyntheticNode> {
        self.by_id.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    #[must_use]
    pub const fn stats(&self) -> TrackerStats {
        self.stats
    }
}
