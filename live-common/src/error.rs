//! Error types for the live proxy.

use thiserror::Error;

/// Result type alias using the live proxy error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for live proxy components.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (missing credentials, project id, bad values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Resource already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// A session event that is not valid in the current turn phase
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// External service error (text generation, HTTP backends)
    #[error("External service error: {0}")]
    External(String),

    /// Sending to the live generation session failed
    #[error("Live session error: {0}")]
    LiveSession(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Other error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an error with additional context.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Check if this is a configuration error, looking through context wrappers.
    pub fn is_config(&self) -> bool {
        match self {
            Self::Config(_) => true,
            Self::WithContext { source, .. } => source.is_config(),
            _ => false,
        }
    }

    /// Check if this error came from the live session channel.
    pub fn is_live_session(&self) -> bool {
        match self {
            Self::LiveSession(_) => true,
            Self::WithContext { source, .. } => source.is_live_session(),
            _ => false,
        }
    }
}

/// Extension trait for adding context to any error type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }
}
