//! Server and API error types.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;
use tracing::error;

use flow_agents::AgentError;
use flow_core::CoreError;
use flow_store::StoreError;

/// Result type alias for server setup.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors raised while configuring or starting the server.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Agent setup failed: {0}")]
    Agent(#[from] AgentError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by request handlers, rendered as `{"error": ...}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Required session data is missing; the client should navigate to
    /// `redirect`.
    #[error("{message}")]
    Redirect { message: String, redirect: String },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn redirect(message: impl Into<String>, redirect: impl Into<String>) -> Self {
        Self::Redirect {
            message: message.into(),
            redirect: redirect.into(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Redirect { .. } => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::Redirect { message, redirect } => serde_json::json!({
                "error": message,
                "redirect": redirect,
            }),
            other => serde_json::json!({ "error": other.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SessionNotFound(id) => Self::NotFound(format!("Session not found: {}", id)),
            StoreError::InvalidSessionId(_) => Self::BadRequest(err.to_string()),
            other => {
                error!("Session store failure: {}", other);
                Self::Internal(format!("Storage error: {}", other))
            }
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::InvalidInput(message) => Self::BadRequest(message),
            AgentError::NotFound(what) => Self::NotFound(format!("Not found: {}", what)),
            other => {
                error!("Agent failure: {}", other);
                Self::Internal(other.to_string())
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidState(message) => Self::BadRequest(message),
            CoreError::UnknownProfile(name) => Self::BadRequest(format!("Unknown pacing profile: {}", name)),
            other => {
                error!("Playback failure: {}", other);
                Self::Internal(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn test_redirect_body() {
        let err = ApiError::redirect("No wireframes to review", "/workflow");
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "No wireframes to review");
        assert_eq!(json["redirect"], "/workflow");
    }

    #[test]
    fn test_store_error_mapping() {
        let err: ApiError = StoreError::SessionNotFound("abc".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        let err: ApiError = StoreError::InvalidSessionId("../x".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
