//! Gate consulted before expensive operations.
//!
//! Interceptors can refuse an operation and name an alternative. The
//! coordinator treats an interceptor error as permission to proceed.

use crate::error::Result;

/// Operation name the coordinator asks about before running strategies
pub const CHUNK_TEXT: &str = "chunk_text";

/// Alternative action that routes a document to line-based chunking
pub const LINE_BASED: &str = "line_based";

/// What is about to happen
#[derive(Debug, Clone, Copy)]
pub struct InterceptContext<'a> {
    pub operation: &'a str,
    pub file_path: Option<&'a str>,
    pub content: Option<&'a str>,
    pub language: Option<&'a str>,
}

impl<'a> InterceptContext<'a> {
    pub const fn new(operation: &'a str) -> Self {
        Self {
            operation,
            file_path: None,
            content: None,
            language: None,
        }
    }

    #[must_use]
    pub const fn file_path(mut self, path: Option<&'a str>) -> Self {
        self.file_path = path;
        self
    }

    #[must_use]
    pub const fn content(mut self, content: &'a str) -> Self {
        self.content = Some(content);
        self
    }

    #[must_use]
    pub const fn language(mut self, language: &'a str) -> Self {
        self.language = Some(language);
        self
    }
}

/// Verdict of an interceptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptDecision {
    pub should_proceed: bool,
    pub reason: Option<String>,
    pub alternative_action: Option<String>,
}

impl InterceptDecision {
    #[must_use]
    pub const fn proceed() -> Self {
        Self {
            should_proceed: true,
            reason: None,
            alternative_action: None,
        }
    }

    pub fn refuse(reason: impl Into<String>) -> Self {
        Self {
            should_proceed: false,
            reason: Some(reason.into()),
            alternative_action: None,
        }
    }

    #[must_use]
    pub fn with_alternative(mut self, action: impl Into<String>) -> Self {
        self.alternative_action = Some(action.into());
        self
    }
}

impl Default for InterceptDecision {
    fn default() -> Self {
        Self::proceed()
    }
}

/// Protection interceptor
pub trait ProtectionChain: Send + Sync {
    fn intercept(&self, context: &InterceptContext<'_>) -> Result<InterceptDecision>;
}

/// Runs interceptors in order; the first refusal wins.
///
/// An interceptor that errors is skipped with a warning.
#[derive(Default)]
pub struct InterceptorChain {
    interceptors: Vec<Box<dyn ProtectionChain>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, interceptor: impl ProtectionChain + 'static) -> Self {
        self.interceptors.push(Box::new(interceptor));
        self
    }

    pub fn push(&mut self, interceptor: Box<dyn ProtectionChain>) {
        self.interceptors.push(interceptor);
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

impl ProtectionChain for InterceptorChain {
    fn intercept(&self, context: &InterceptContext<'_>) -> Result<InterceptDecision> {
        for interceptor in &self.interceptors {
            match interceptor.intercept(context) {
                Ok(decision) if !decision.should_proceed => return Ok(decision),
                Ok(_) => {}
                Err(err) => log::warn!("Interceptor failed on '{}': {err}", context.operation),
            }
        }
        Ok(InterceptDecision::proceed())
    }
}

/// Refuses `chunk_text` for documents larger than a byte limit, suggesting
/// line-based chunking instead
#[derive(Debug, Clone, Copy)]
pub struct ContentSizeGuard {
    max_bytes: usize,
}

impl ContentSizeGuard {
    pub const fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl ProtectionChain for ContentSizeGuard {
    fn intercept(&self, context: &InterceptContext<'_>) -> Result<InterceptDecision> {
        let size = context.content.map_or(0, str::len);
        if context.operation == CHUNK_TEXT && size > self.max_bytes {
            return Ok(InterceptDecision::refuse(format!(
                "content is {size} bytes, limit is {}",
                self.max_bytes
            ))
            .with_alternative(LINE_BASED));
        }
        Ok(InterceptDecision::proceed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChunkerError;
    use pretty_assertions::assert_eq;

    struct Failing;

    impl ProtectionChain for Failing {
        fn intercept(&self, _context: &InterceptContext<'_>) -> Result<InterceptDecision> {
            Err(ChunkerError::interceptor("memory backend unavailable"))
        }
    }

    #[test]
    fn test_size_guard() {
        let guard = ContentSizeGuard::new(8);
        let small = InterceptContext::new(CHUNK_TEXT).content("let a;");
        assert!(guard.intercept(&small).unwrap().should_proceed);

        let large = InterceptContext::new(CHUNK_TEXT).content("let a = 1; let b = 2;");
        let decision = guard.intercept(&large).unwrap();
        assert!(!decision.should_proceed);
        assert_eq!(decision.alternative_action.as_deref(), Some(LINE_BASED));

        let other = InterceptContext::new("embed").content("let a = 1; let b = 2;");
        assert!(guard.intercept(&other).unwrap().should_proceed);
    }

    #[test]
    fn test_chain_skips_failures_and_stops_at_refusal() {
        let chain = InterceptorChain::new().with(Failing).with(ContentSizeGuard::new(1));
        assert_eq!(chain.len(), 2);
        let decision = chain
            .intercept(&InterceptContext::new(CHUNK_TEXT).content("abc"))
            .unwrap();
        assert!(!decision.should_proceed);

        let only_failing = InterceptorChain::new().with(Failing);
        let decision = only_failing.intercept(&InterceptContext::new(CHUNK_TEXT)).unwrap();
        assert_eq!(decision, InterceptDecision::proceed());
    }
}
