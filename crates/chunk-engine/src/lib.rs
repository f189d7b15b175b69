//! # Context Chunk Engine
//!
//! Coordinates several chunk extraction strategies over one source document
//! and post-processes their output into bounded, lightly overlapping chunks
//! for embedding-based code search.
//!
//! ## Architecture
//!
//! ```text
//! content, language, file path, syntax tree?
//!     │
//!     ├──> Protection gate ("chunk_text"), refusal → line-based fallback only
//!     │
//!     ├──> Strategies in priority order
//!     │    import → class → function → syntax-aware → intelligent → fallback
//!     │    each chunk is checked against NodeConflictTracker claims
//!     │
//!     ├──> SimilarityJudge filter → OverlapCalculator merge
//!     │
//!     └──> OverlapCalculator overlap (optional) → final filter → CodeChunk[]
//! ```
//!
//! ## Example
//!
//! ```rust
//! use context_chunk_engine::{ChunkingCoordinator, ChunkingOptions};
//!
//! let code = "import a from 'x';\n\nfunction f() {\n  return 1;\n}\n";
//!
//! let mut coordinator = ChunkingCoordinator::with_default_strategies(ChunkingOptions::default());
//! let chunks = coordinator.coordinate(code, "typescript", Some("a.ts"), None);
//! for chunk in &chunks {
//!     let (start, end) = (chunk.start_line(), chunk.end_line());
//!     println!("{} at lines {start}-{end}", chunk.metadata.chunk_type);
//! }
//! ```

pub mod boundary;
mod config;
mod coordinator;
mod error;
mod language;
pub mod overlap;
pub mod protection;
mod relationship;
mod similarity;
pub mod strategy;
mod syntax;
mod tracker;
mod types;

pub use boundary::{BoundaryAnalyzer, BoundaryWeights, BracketTracker};
pub use config::{ChunkingOptions, MergeStrategy};
pub use coordinator::{ChunkingCoordinator, CoordinationStats};
pub use error::{ChunkerError, Result};
pub use language::{BlockStyle, Language};
pub use overlap::{OverlapCalculator, OverlapHistory, SourceDocument};
pub use protection::{InterceptContext, InterceptDecision, InterceptorChain, ProtectionChain};
pub use relationship::ContextRelationshipOptimizer;
pub use similarity::{edit_similarity, line_jaccard, SimilarityJudge};
pub use strategy::{default_strategies, SplitContext, SplitStrategy};
pub use syntax::{NodeId, SyntaxNode, SyntaxTree};
pub use tracker::{content_fingerprint, NodeConflictTracker, SyntheticNode, TrackerStats};
pub use types::{
    BoundaryComponents, BoundaryScore, ChunkMetadata, ChunkRelationship, ChunkType, CodeChunk,
    OverlapResult, OverlapStrategyKind, RelationshipType,
};
