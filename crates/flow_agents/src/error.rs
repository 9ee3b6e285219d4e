//! Error types for agent services.

use thiserror::Error;

/// Result type alias for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors raised by agent services.
///
/// Provider and parse failures are absorbed into fallback content, so these
/// only cover bad input and broken configuration.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Agent not found: {0}")]
    NotFound(String),

    #[error("Invalid roster: {0}")]
    Roster(#[from] serde_yaml::Error),

    #[error("Roster is empty")]
    EmptyRoster,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
