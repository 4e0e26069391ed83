//! Error types and handling
//!
//! This module provides the error types used throughout the transit engine.
//! All errors implement the `EngineErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! Errors raised inside the query pipeline never reach the caller of
//! `answer`; they are recorded as tool outcomes or trigger a fallback path.
//! The variants below exist so collaborators can report *why* they failed.
//!
//! # Examples
//!
//! ```
//! use sdk::errors::{EngineError, EngineErrorExt};
//!
//! let error = EngineError::NotFound("bus B9".to_string());
//! println!("Hint: {}", error.user_hint());
//! assert!(error.is_recoverable());
//!
//! let fatal_error = EngineError::Config("top_k must be positive".to_string());
//! assert!(!fatal_error.is_recoverable());
//! ```

use thiserror::Error;

/// Trait for engine error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information.
pub trait EngineErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors degrade to a fallback path. Non-recoverable
    /// errors require fixing configuration before the engine can start.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Database**: SQLite cache store failures
/// - **LLM Provider**: Reasoning service failures
/// - **Network**: Fleet or weather collaborator transport failures
/// - **Not found**: Referenced bus, route or stop does not exist
/// - **Timeout**: A bounded external call exceeded its budget
/// - **Parse**: Malformed collaborator response
/// - **Cache**: Key-value store unavailable
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    // Reasoning service errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    // Collaborator transport errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{operation} timed out after {millis}ms")]
    Timeout { operation: String, millis: u64 },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Cache unavailable: {0}")]
    Cache(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Build a timeout error for the named operation
    pub fn timeout(operation: impl Into<String>, limit: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            millis: limit.as_millis() as u64,
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

impl EngineErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::Database(_) => "Cache database operation failed. Answers are still computed",
            Self::LLMProvider(_) => "Reasoning service unavailable. Rule-based answers are used",
            Self::Network(_) => "A fleet or weather service could not be reached",
            Self::NotFound(_) => "The referenced bus, route or stop is unknown",
            Self::Timeout { .. } => "An external service took too long to respond",
            Self::Parse(_) => "An external service returned malformed data",
            Self::Cache(_) => "Cache store unavailable. Every query is computed fresh",
            Self::InvalidInput(_) => "Please provide a question",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}
