use thiserror::Error;

/// Result type for chunking operations
pub type Result<T> = std::result::Result<T, ChunkerError>;

/// Errors that can occur while coordinating chunk extraction
#[derive(Error, Debug)]
pub enum ChunkerError {
    /// A split strategy failed on a document
    #[error("Strategy '{strategy}' failed: {message}")]
    StrategyFailed { strategy: String, message: String },

    /// Failed to parse the source code
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Unsupported language
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration document could not be decoded
    #[error("Configuration decode error: {0}")]
    ConfigDecode(#[from] toml::de::Error),

    /// Protection interceptor failed
    #[error("Interceptor error: {0}")]
    Interceptor(String),

    /// Tree-sitter error
    #[error("Tree-sitter error: {0}")]
    TreeSitterError(String),
}

impl ChunkerError {
    /// Create a strategy failure
    pub fn strategy(strategy: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StrategyFailed {
            strategy: strategy.into(),
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create an unsupported language error
    pub fn unsupported_language(lang: impl Into<String>) -> Self {
        Self::UnsupportedLanguage(lang.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an interceptor error
    pub fn interceptor(msg: impl Into<String>) -> Self {
        Self::Interceptor(msg.into())
    }

    /// Create a tree-sitter error
    pub fn tree_sitter(msg: impl Into<String>) -> Self {
        Self::TreeSitterError(msg.into())
    }
}
