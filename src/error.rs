//! Error types for tldw.

use thiserror::Error;

/// Library-level error type for tldw operations.
#[derive(Error, Debug)]
pub enum TldwError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Link already exists in the example store: {0}")]
    DuplicateLink(String),

    #[error("Video source error: {0}")]
    VideoSource(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Prompt exceeds the model's context window: {0}")]
    ContextLengthExceeded(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Coarse classification of an error, used to pick exit messages and HTTP statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing credential, store file, external tool or bad config.
    Configuration,
    /// A remote collaborator (YouTube, embeddings, completions) failed.
    Upstream,
    /// The caller supplied something we cannot use.
    InputValidation,
    /// Local IO or serialization failure.
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "configuration"),
            ErrorKind::Upstream => write!(f, "upstream"),
            ErrorKind::InputValidation => write!(f, "input_validation"),
            ErrorKind::Internal => write!(f, "internal"),
        }
    }
}

impl TldwError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TldwError::Config(_)
            | TldwError::MissingApiKey(_)
            | TldwError::NotFound(_)
            | TldwError::ToolNotFound(_)
            | TldwError::TomlParse(_) => ErrorKind::Configuration,
            TldwError::VideoSource(_)
            | TldwError::Embedding(_)
            | TldwError::Authentication(_)
            | TldwError::RateLimit(_)
            | TldwError::ContextLengthExceeded(_)
            | TldwError::Upstream(_)
            | TldwError::Http(_) => ErrorKind::Upstream,
            TldwError::InvalidInput(_) | TldwError::DuplicateLink(_) => ErrorKind::InputValidation,
            TldwError::Io(_) | TldwError::Json(_) => ErrorKind::Internal,
        }
    }
}

/// Result type alias for tldw operations.
pub type Result<T> = std::result::Result<T, TldwError>;
