use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};

/// Options recognized by the coordinator, the strategies and the overlap engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingOptions {
    /// Maximum overlap size in characters
    pub overlap_size: usize,

    /// Maximum overlap length relative to the smaller of the two chunks
    pub max_overlap_ratio: f64,

    /// Maximum number of lines in an overlap
    pub max_overlap_lines: usize,

    /// Minimum number of lines kept when walking an overlap window
    pub min_overlap_lines: usize,

    /// Attach overlap between adjacent chunks after merging
    pub enable_overlap: bool,

    /// Drop near-duplicate chunks and merge similar neighbours
    pub enable_chunk_deduplication: bool,

    /// Similarity at or above which two chunks count as duplicates
    pub deduplication_threshold: f64,

    /// Favor smaller overlaps and fewer merges, or the opposite
    pub chunk_merge_strategy: MergeStrategy,

    /// Use syntax-tree boundaries when computing overlap
    pub enable_ast_boundary_detection: bool,

    /// Consult claimed syntax-tree nodes when computing overlap
    pub ast_node_tracking: bool,

    /// Log a timing summary for every coordination call
    pub enable_performance_monitoring: bool,

    /// Minimum chunk content length in characters
    pub min_chunk_size: usize,

    /// Maximum chunk content length in characters
    pub max_chunk_size: usize,

    /// Boundary score a line needs to be kept by boundary-driven walks
    pub boundary_threshold: f64,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            overlap_size: 200,
            max_overlap_ratio: 0.3,
            max_overlap_lines: 50,
            min_overlap_lines: 1,
            enable_overlap: false,
            enable_chunk_deduplication: true,
            deduplication_threshold: 0.8,
            chunk_merge_strategy: MergeStrategy::Conservative,
            enable_ast_boundary_detection: true,
            ast_node_tracking: true,
            enable_performance_monitoring: false,
            min_chunk_size: 10,
            max_chunk_size: 2000,
            boundary_threshold: 0.5,
        }
    }
}

impl ChunkingOptions {
    /// Options tuned for embedding models (smaller chunks, overlap attached)
    pub fn for_embeddings() -> Self {
        Self {
            max_chunk_size: 1500,
            overlap_size: 150,
            enable_overlap: true,
            ..Default::default()
        }
    }

    /// Options favoring larger overlaps and more merges
    pub fn aggressive() -> Self {
        Self {
            chunk_merge_strategy: MergeStrategy::Aggressive,
            deduplication_threshold: 0.7,
            enable_overlap: true,
            ..Default::default()
        }
    }

    /// Options with every optional pass disabled
    pub fn minimal() -> Self {
        Self {
            enable_overlap: false,
            enable_chunk_deduplication: false,
            enable_ast_boundary_detection: false,
            ast_node_tracking: false,
            ..Default::default()
        }
    }

    /// Decode options from a TOML document and validate them
    pub fn from_toml_str(document: &str) -> Result<Self> {
        let options: Self = toml::from_str(document)?;
        options.validate()?;
        Ok(options)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.max_overlap_ratio > 0.0 && self.max_overlap_ratio <= 1.0) {
            return Err(ChunkerError::invalid_config(format!(
                "max_overlap_ratio ({}) must be within (0, 1]",
                self.max_overlap_ratio
            )));
        }

        if !(0.0..=1.0).contains(&self.deduplication_threshold) {
            return Err(ChunkerError::invalid_config(format!(
                "deduplication_threshold ({}) must be within [0, 1]",
                self.deduplication_threshold
            )));
        }

        if self.max_chunk_size == 0 {
            return Err(ChunkerError::invalid_config("max_chunk_size must be > 0"));
        }

        if self.min_chunk_size > self.max_chunk_size {
            return Err(ChunkerError::invalid_config(format!(
                "min_chunk_size ({}) cannot exceed max_chunk_size ({})",
                self.min_chunk_size, self.max_chunk_size
            )));
        }

        if self.min_overlap_lines > self.max_overlap_lines {
            return Err(ChunkerError::invalid_config(format!(
                "min_overlap_lines ({}) cannot exceed max_overlap_lines ({})",
                self.min_overlap_lines, self.max_overlap_lines
            )));
        }

        Ok(())
    }

    /// Threshold used by the merge pass
    #[must_use]
    pub fn merge_threshold(&self) -> f64 {
        match self.chunk_merge_strategy {
            MergeStrategy::Conservative => self.deduplication_threshold,
            MergeStrategy::Aggressive => self.deduplication_threshold * 0.85,
        }
    }

    /// Scale applied to the smart-deduplication overlap size
    #[must_use]
    pub const fn overlap_scale(&self) -> f64 {
        match self.chunk_merge_strategy {
            MergeStrategy::Conservative => 0.7,
            MergeStrategy::Aggressive => 1.0,
        }
    }

    /// Check whether a content length survives strategy-level filtering
    #[must_use]
    pub const fn accepts_size(&self, len: usize) -> bool {
        len >= self.min_chunk_size && len <= self.max_chunk_size
    }
}

/// How eagerly similar chunks are merged and overlaps grown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Smaller overlaps, fewer merges
    #[default]
    Conservative,

    /// Larger overlaps, more merges
    Aggressive,
}
