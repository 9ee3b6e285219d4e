//! Error types for the core module.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur during core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid playback state: {0}")]
    InvalidState(String),

    #[error("Playback session has stopped")]
    PlaybackClosed,

    #[error("Unknown pacing profile: {0}")]
    UnknownProfile(String),

    #[error("Failed to persist simulation state: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
