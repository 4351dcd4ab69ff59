//! Error types for the debate system.

use thiserror::Error;

/// Errors surfaced by the orchestration layer.
#[derive(Error, Debug)]
pub enum DebateError {
    #[error("Invalid debate configuration: {0}")]
    InvalidConfig(String),

    /// A turn arrived with the wrong index. Indicates a broken invariant
    /// (more than one writer, or a reordered buffer) and is always fatal
    /// to the debate instance.
    #[error("Turn out of order: expected index {expected}, got {actual}")]
    OutOfOrder { expected: usize, actual: usize },

    /// The next turn has not finished generating. A normal control signal,
    /// not a failure.
    #[error("Next turn is not ready yet")]
    NotReady,

    /// The debate already has all of its turns. A normal control signal.
    #[error("Debate is already complete")]
    AlreadyComplete,

    #[error("No debate has been started")]
    NotStarted,

    #[error("Internal consistency fault: {0}")]
    Internal(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Failures from the remote text/speech generation service.
///
/// These are absorbed inside the background generator (retried, then
/// degraded to a placeholder turn) so a bad API call never halts a debate.
#[derive(Error, Debug, Clone)]
pub enum RemoteError {
    #[error("Authentication with the generation service failed: {0}")]
    Auth(String),

    #[error("Generation service rate limit reached: {0}")]
    RateLimited(String),

    #[error("Could not reach the generation service: {0}")]
    Connection(String),
}

impl RemoteError {
    /// Categorize an OpenAI client error into our taxonomy.
    pub fn from_openai(err: &async_openai::error::OpenAIError) -> Self {
        let text = err.to_string();
        let lowered = text.to_lowercase();

        if lowered.contains("api key")
            || lowered.contains("auth")
            || lowered.contains("unauthorized")
            || lowered.contains("401")
        {
            RemoteError::Auth(text)
        } else if lowered.contains("rate") || lowered.contains("quota") || lowered.contains("429") {
            RemoteError::RateLimited(text)
        } else {
            RemoteError::Connection(text)
        }
    }
}
