//! Error types for Review Outreach.

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Review source error: {0}")]
    Source(#[from] SourceError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Messaging transport errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send message on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Invalid response from channel {name}: {reason}")]
    InvalidResponse { name: String, reason: String },
}

/// Review source errors (fetching reviews, posting replies, OAuth).
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Authentication with {provider} failed: {reason}")]
    AuthFailed { provider: String, reason: String },

    #[error("Request to {provider} failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("{provider} returned status {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Review {0} not found")]
    ReviewNotFound(String),
}

/// Summarizer / draft generation errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Errors surfaced by a single workflow transition.
///
/// None of these escape the command boundary; the engine turns each one into
/// an operator notification.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Review number {number} is outside 1..={len}")]
    IndexOutOfRange { number: usize, len: usize },

    #[error("Confirmation {code} not found")]
    ConfirmationNotFound { code: String },

    #[error("No unused confirmation code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: usize },

    #[error("Collaborator {operation} failed: {reason}")]
    Collaborator { operation: String, reason: String },
}

impl WorkflowError {
    /// Wrap a collaborator failure, keeping the original error text for logs.
    pub fn collaborator(operation: &str, err: impl std::fmt::Display) -> Self {
        Self::Collaborator {
            operation: operation.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
