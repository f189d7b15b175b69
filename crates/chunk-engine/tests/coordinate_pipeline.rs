use context_chunk_engine::protection::{ContentSizeGuard, LINE_BASED};
use context_chunk_engine::{
    ChunkType, ChunkerError, ChunkingCoordinator, ChunkingOptions, CodeChunk, InterceptContext,
    InterceptDecision, Language, ProtectionChain, SplitContext, SplitStrategy,
};
use pretty_assertions::assert_eq;

const SCENARIO_ONE: &str = "import a from 'x';\nimport b from 'y';\n\n\
                            function f(){\n  return 1;\n}\n\n\
                            function g(){\n  return 2;\n}\n";

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn ranges(chunks: &[CodeChunk]) -> Vec<(usize, usize)> {
    chunks.iter().map(|c| (c.start_line(), c.end_line())).collect()
}

fn default_coordinator() -> ChunkingCoordinator {
    ChunkingCoordinator::with_default_strategies(ChunkingOptions::default())
}

struct Exploding;

impl SplitStrategy for Exploding {
    fn name(&self) -> &'static str {
        "exploding"
    }

    fn priority(&self) -> u32 {
        0
    }

    fn supports_language(&self, _language: Language) -> bool {
        true
    }

    fn split(&self, _ctx: &SplitContext<'_>) -> context_chunk_engine::Result<Vec<CodeChunk>> {
        Err(ChunkerError::strategy("exploding", "grammar crashed"))
    }
}

struct BrokenInterceptor;

impl ProtectionChain for BrokenInterceptor {
    fn intercept(
        &self,
        _context: &InterceptContext<'_>,
    ) -> context_chunk_engine::Result<InterceptDecision> {
        Err(ChunkerError::interceptor("memory backend unavailable"))
    }
}

#[test]
fn imports_and_functions_are_claimed_once() {
    init_logger();
    let mut coordinator = default_coordinator();
    let chunks = coordinator.coordinate(SCENARIO_ONE, "typescript", Some("a.ts"), None);

    assert_eq!(ranges(&chunks), vec![(1, 2), (4, 6), (8, 10)]);
    let kinds: Vec<ChunkType> = chunks.iter().map(|c| c.metadata.chunk_type).collect();
    assert_eq!(kinds, vec![ChunkType::Import, ChunkType::Function, ChunkType::Function]);
    let strategies: Vec<Option<&str>> = chunks
        .iter()
        .map(|c| c.metadata.strategy.as_deref())
        .collect();
    assert_eq!(strategies, vec![Some("import"), Some("function"), Some("function")]);
    assert!(chunks
        .iter()
        .all(|c| c.metadata.file_path.as_deref() == Some("a.ts")));
}

#[test]
fn interceptor_error_fails_open() {
    init_logger();
    let mut coordinator = default_coordinator().with_protection(BrokenInterceptor);
    let chunks = coordinator.coordinate(SCENARIO_ONE, "typescript", Some("a.ts"), None);
    assert_eq!(ranges(&chunks), vec![(1, 2), (4, 6), (8, 10)]);
}

#[test]
fn oversized_document_goes_to_line_windows() {
    init_logger();
    let guard = ContentSizeGuard::new(32);
    let decision = guard
        .intercept(&InterceptContext::new("chunk_text").content(SCENARIO_ONE))
        .unwrap();
    assert_eq!(decision.alternative_action.as_deref(), Some(LINE_BASED));

    let mut coordinator = default_coordinator().with_protection(guard);
    let chunks = coordinator.coordinate(SCENARIO_ONE, "typescript", Some("a.ts"), None);

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].metadata.chunk_type, ChunkType::Chunk);
    assert_eq!(chunks[0].metadata.strategy.as_deref(), Some("semantic-fallback"));
}

#[test]
fn failing_strategy_is_skipped() {
    init_logger();
    let mut coordinator = default_coordinator();
    coordinator.register_strategy(Box::new(Exploding));
    assert_eq!(coordinator.strategy_names()[0], "exploding");

    let chunks = coordinator.coordinate(SCENARIO_ONE, "typescript", None, None);
    assert_eq!(ranges(&chunks), vec![(1, 2), (4, 6), (8, 10)]);

    let stats = coordinator.last_stats().unwrap();
    assert_eq!(stats.strategies_failed, 1);
    assert_eq!(stats.strategies_run, 7);
    assert_eq!(stats.chunks_emitted, 3);
}

#[test]
fn accepted_ranges_never_overlap() {
    init_logger();
    let code = include_str!("../src/tracker.rs");
    let options = ChunkingOptions::minimal();
    let mut coordinator = ChunkingCoordinator::with_default_strategies(options.clone());
    let chunks = coordinator.coordinate(code, "rust", Some("src/tracker.rs"), None);

    assert!(!chunks.is_empty());
    for (i, a) in chunks.iter().enumerate() {
        assert!(options.accepts_size(a.content.len()));
        assert_eq!(a.metadata.node_ids.len(), 1);
        for b in &chunks[i + 1..] {
            assert!(
                a.end_line() < b.start_line() || b.end_line() < a.start_line(),
                "{}-{} overlaps {}-{}",
                a.start_line(),
                a.end_line(),
                b.start_line(),
                b.end_line()
            );
        }
    }

    let named = |kind: ChunkType, name: &str| {
        chunks.iter().any(|c| {
            c.metadata.chunk_type == kind && c.metadata.symbol_name.as_deref() == Some(name)
        })
    };
    assert!(
        named(ChunkType::Class, "NodeConflictTracker"),
        "struct NodeConflictTracker should be a class chunk"
    );
    assert!(
        named(ChunkType::Method, "check"),
        "methods of an oversized impl should surface individually"
    );

    let stats = coordinator.last_stats().unwrap();
    assert_eq!(stats.claimed_nodes, chunks.len());
    assert!(stats.total_nodes >= stats.claimed_nodes);
}

#[test]
fn unknown_language_runs_agnostic_strategies_only() {
    init_logger();
    let code = "IDENTIFICATION DIVISION.\nPROGRAM-ID. HELLO.\nPROCEDURE DIVISION.\n\
                \x20   DISPLAY 'HELLO'.\n    STOP RUN.\n";
    let mut coordinator = default_coordinator();
    let chunks = coordinator.coordinate(code, "cobol", None, None);

    assert_eq!(coordinator.last_stats().unwrap().strategies_run, 4);
    assert_eq!(ranges(&chunks), vec![(1, 5)]);
    assert_eq!(chunks[0].metadata.language, "cobol");
}

#[test]
fn near_duplicates_collapse_to_one() {
    init_logger();
    let code = "function twin(a) {\n  return a + 1;\n}\n\n\
                function twin(a) {   \n  return a + 1;  \n}\n\n\
                function other(b) {\n  return b * 2;\n}\n";
    let chunks = default_coordinator().coordinate(code, "javascript", None, None);
    assert_eq!(ranges(&chunks), vec![(1, 3), (9, 11)]);

    let mut keep_all = ChunkingCoordinator::with_default_strategies(ChunkingOptions {
        enable_chunk_deduplication: false,
        ..ChunkingOptions::default()
    });
    let chunks = keep_all.coordinate(code, "javascript", None, None);
    assert_eq!(ranges(&chunks), vec![(1, 3), (5, 7), (9, 11)]);
}

#[test]
fn overlap_is_prepended_within_budget() {
    init_logger();
    let code = "import { a } from './a';\nimport { b } from './b';\n\n\
// adds things\n\
function add(x: number, y: number): number {\n  const total = x + y;\n  return total;\n}\n\n\
// scales things\n\
function scale(x: number): number {\n  const factor = 2;\n  return x * factor;\n}\n";

    let base = ChunkingOptions {
        enable_chunk_deduplication: false,
        max_overlap_lines: 3,
        min_chunk_size: 20,
        ..ChunkingOptions::default()
    };
    let plain = ChunkingCoordinator::with_default_strategies(base.clone())
        .coordinate(code, "typescript", None, None);
    let overlapped = ChunkingCoordinator::with_default_strategies(ChunkingOptions {
        enable_overlap: true,
        ..base.clone()
    })
    .coordinate(code, "typescript", None, None);

    assert_eq!(plain.len(), overlapped.len());
    assert_eq!(overlapped[0], plain[0]);
    let mut attached = 0;
    for i in 1..plain.len() {
        let (before, after) = (&plain[i], &overlapped[i]);
        assert!(after.content.ends_with(&before.content));
        assert_eq!(after.end_line(), before.end_line());
        if after.content.len() == before.content.len() {
            continue;
        }

        attached += 1;
        let overlap = &after.content[..after.content.len() - before.content.len() - 1];
        let base_len = plain[i - 1].content.len().min(before.content.len());
        let budget = base_len as f64 * base.max_overlap_ratio;
        assert!(overlap.len() as f64 <= budget + 1e-9);
        assert!(overlap.len() <= base.overlap_size);
        assert!(overlap.lines().count() <= base.max_overlap_lines);
        assert!(after.start_line() < before.start_line());
        assert!(after.start_line() >= plain[i - 1].start_line());
    }
    assert!(attached > 0, "expected at least one overlap in {overlapped:#?}");
}

#[test]
fn overlapped_chunks_match_their_source_lines() {
    init_logger();
    let code = include_str!("../src/overlap/mod.rs");
    let path = Some("src/overlap/mod.rs");
    let lines: Vec<&str> = code.lines().collect();
    let options = ChunkingOptions {
        enable_overlap: true,
        ..ChunkingOptions::default()
    };
    let plain = default_coordinator().coordinate(code, "rust", path, None);
    let overlapped =
        ChunkingCoordinator::with_default_strategies(options).coordinate(code, "rust", path, None);
    assert!(overlapped.iter().any(|c| !plain.contains(c)), "no overlap was attached");

    for chunk in &overlapped {
        let (start, end) = (chunk.start_line(), chunk.end_line());
        let own = lines[start - 1..end].join("\n");
        let moved = !plain
            .iter()
            .any(|p| p.start_line() == start && p.end_line() == end);
        if moved {
            assert_eq!(chunk.content, own, "chunk {start}-{end}");
        } else {
            assert!(chunk.content.ends_with(&own), "chunk {start}-{end}");
        }
    }
}

#[test]
fn aggressive_mode_merges_adjacent_lookalikes() {
    init_logger();
    let body = "  open(config);\n  read(config);\n  parse(config);\n\
                \x20 check(config);\n  close(config);\n  log(config);\n";
    let code = format!(
        "function first(config) {{\n{body}  return 1;\n}}\n\
         function second(config) {{\n{body}  return 2;\n}}\n"
    );

    let chunks = default_coordinator().coordinate(&code, "javascript", None, None);
    assert_eq!(ranges(&chunks), vec![(1, 9), (10, 18)]);

    let options = ChunkingOptions::aggressive();
    let chunks = ChunkingCoordinator::with_default_strategies(options)
        .coordinate(&code, "javascript", None, None);
    assert_eq!(ranges(&chunks), vec![(1, 18)]);
    assert_eq!(chunks[0].metadata.chunk_type, ChunkType::Merged);
    assert_eq!(chunks[0].content, code.trim_end());
    assert_eq!(chunks[0].metadata.node_ids.len(), 2);
}

#[test]
fn chunks_serialize_for_the_index() {
    let chunks = default_coordinator().coordinate(SCENARIO_ONE, "typescript", Some("a.ts"), None);
    let json = serde_json::to_value(&chunks[1]).unwrap();

    assert_eq!(json["metadata"]["chunk_type"], "function");
    assert_eq!(json["metadata"]["start_line"], 4);
    assert_eq!(json["metadata"]["end_line"], 6);
    assert_eq!(json["metadata"]["symbol_name"], "f");

    let back: CodeChunk = serde_json::from_value(json).unwrap();
    assert_eq!(back, chunks[1]);
}
