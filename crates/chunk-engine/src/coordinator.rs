use crate::boundary::BoundaryAnalyzer;
use crate::config::ChunkingOptions;
use crate::language::Language;
use crate::overlap::OverlapCalculator;
use crate::protection::{InterceptContext, ProtectionChain, CHUNK_TEXT};
use crate::similarity::SimilarityJudge;
use crate::strategy::{default_strategies, SemanticFallbackStrategy, SplitContext, SplitStrategy};
use crate::syntax::SyntaxTree;
use crate::tracker::{NodeConflictTracker, SyntheticNode};
use crate::types::CodeChunk;
use std::time::{Duration, Instant};

/// Runs split strategies in priority order and post-processes their output
pub struct ChunkingCoordinator {
    options: ChunkingOptions,
    strategies: Vec<Box<dyn SplitStrategy>>,
    analyzer: BoundaryAnalyzer,
    judge: SimilarityJudge,
    protection: Option<Box<dyn ProtectionChain>>,
    last_stats: Option<CoordinationStats>,
}

impl ChunkingCoordinator {
    /// Coordinator without any registered strategy
    pub fn new(options: ChunkingOptions) -> Self {
        Self {
            options,
            strategies: Vec::new(),
            analyzer: BoundaryAnalyzer::new(),
            judge: SimilarityJudge::new(),
            protection: None,
            last_stats: None,
        }
    }

    /// Coordinator with the built-in strategies registered
    pub fn with_default_strategies(options: ChunkingOptions) -> Self {
        let mut coordinator = Self::new(options);
        for strategy in default_strategies() {
            coordinator.register_strategy(strategy);
        }
        coordinator
    }

    /// Add a strategy, keeping the list ordered by priority
    pub fn register_strategy(&mut self, strategy: Box<dyn SplitStrategy>) {
        let at = self
            .strategies
            .partition_point(|s| s.priority() <= strategy.priority());
        self.strategies.insert(at, strategy);
    }

    #[must_use]
    pub fn with_protection(mut self, protection: impl ProtectionChain + 'static) -> Self {
        self.protection = Some(Box::new(protection));
        self
    }

    pub fn set_protection(&mut self, protection: Option<Box<dyn ProtectionChain>>) {
        self.protection = protection;
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

    /// Registered strategy names in execution order
    #[must_use]
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Statistics of the most recent [`coordinate`](Self::coordinate) call
    #[must_use]
    pub const fn last_stats(&self) -> Option<&CoordinationStats> {
        self.last_stats.as_ref()
    }

    /// Chunk one document.
    ///
    /// Never fails: strategy errors are logged and skipped, interceptor errors
    /// fail open, and an empty result is a valid outcome.
    pub fn coordinate(
        &mut self,
        content: &str,
        language: &str,
        file_path: Option<&str>,
        ast: Option<&SyntaxTree>,
    ) -> Vec<CodeChunk> {
        let started = Instant::now();
        let lang = Language::from_name(language);
        let mut stats = CoordinationStats::default();

        let fallback = SemanticFallbackStrategy;
        let proceed = self.should_proceed(content, language, file_path);
        let pipeline: Vec<&dyn SplitStrategy> = if proceed {
            self.strategies.iter().map(|s| &**s).collect()
        } else {
            vec![&fallback as &dyn SplitStrategy]
        };

        let mut tracker = NodeConflictTracker::new();
        let mut chunks: Vec<CodeChunk> = Vec::new();

        for strategy in pipeline {
            if !strategy.supports_language(lang) {
                log::debug!("Skipping strategy '{}' for {language}", strategy.name());
                continue;
            }

            stats.strategies_run += 1;
            let produced = {
                let ctx =
                    SplitContext::new(content, language, file_path, &self.options, &tracker, ast);
                strategy.split(&ctx)
            };
            let produced = match produced {
                Ok(produced) => produced,
                Err(err) => {
                    stats.strategies_failed += 1;
                    log::warn!("Strategy '{}' failed: {err}", strategy.name());
                    continue;
                }
            };

            for mut chunk in produced {
                let node = SyntheticNode::from_chunk(&chunk);
                if tracker.check(&node) {
                    log::debug!(
                        "Rejecting {} chunk {}-{} from '{}': range already claimed",
                        chunk.metadata.chunk_type,
                        chunk.start_line(),
                        chunk.end_line(),
                        strategy.name()
                    );
                    continue;
                }
                tracker.mark_used(&node);
                chunk.metadata.node_ids.push(node.id);
                chunks.push(chunk);
            }
        }

        chunks.sort_by_key(|c| (c.start_line(), c.end_line()));
        let mut calculator =
            OverlapCalculator::new(self.options.clone()).with_analyzer(self.analyzer.clone());
        let dedup = self.options.enable_chunk_deduplication;

        if dedup && chunks.len() >= 2 {
            chunks = self
                .judge
                .filter_similar_chunks(chunks, self.options.deduplication_threshold);
            chunks = calculator.merge_similar_chunks(chunks);
        }

        if self.options.enable_overlap && chunks.len() >= 2 {
            let doc = calculator
                .document(content, lang)
                .with_tree(ast)
                .with_tracker(&tracker);
            chunks = calculator.add_overlap(chunks, &doc);
            if dedup {
                chunks = self
                    .judge
                    .filter_similar_chunks(chunks, self.options.deduplication_threshold);
            }
        }

        chunks.sort_by_key(|c| (c.start_line(), c.end_line()));

        let tracked = tracker.stats();
        stats.claimed_nodes = tracked.used_nodes;
        stats.total_nodes = tracked.total_nodes;
        stats.similarity_hits = tracked.similarity_hits;
        stats.content_hash_collisions = tracked.content_hash_collisions;
        stats.chunks_emitted = chunks.len();
        stats.duration = started.elapsed();
        log::info!("{}: {stats}", file_path.unwrap_or("<memory>"));
        self.last_stats = Some(stats);

        chunks
    }

    fn should_proceed(&self, content: &str, language: &str, file_path: Option<&str>) -> bool {
        let Some(protection) = &self.protection else {
            return true;
        };
        let context = InterceptContext::new(CHUNK_TEXT)
            .file_path(file_path)
            .content(content)
            .language(language);

        match protection.intercept(&context) {
            Ok(decision) if decision.should_proceed => true,
            Ok(decision) => {
                log::warn!(
                    "Chunking refused ({}), using {}",
                    decision.reason.as_deref().unwrap_or("no reason given"),
                    decision.alternative_action.as_deref().unwrap_or("line-based fallback")
                );
                false
            }
            Err(err) => {
                log::warn!("Protection check failed, proceeding: {err}");
                true
            }
        }
    }
}

impl Default for ChunkingCoordinator {
    fn default() -> Self {
        Self::with_default_strategies(ChunkingOptions::default())
    }
}

/// Summary of one coordination call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinationStats {
    pub claimed_nodes: usize,
    pub total_nodes: usize,
    pub similarity_hits: usize,
    pub content_hash_collisions: usize,
    pub strategies_run: usize,
    pub strategies_failed: usize,
    pub chunks_emitted: usize,
    pub duration: Duration,
}

impl std::fmt::Display for CoordinationStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Claimed: {}/{} | Conflicts: {} | Hash collisions: {} | \
             Strategies: {} ({} failed) | Chunks: {} | {:?}",
            self.claimed_nodes,
            self.total_nodes,
            self.similarity_hits,
            self.content_hash_collisions,
            self.strategies_run,
            self.strategies_failed,
            self.chunks_emitted,
            self.duration
        )
    }
}
