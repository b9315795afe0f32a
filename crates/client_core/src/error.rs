use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

/// Failure of a collection request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
}

impl FetchError {
    /// Text shown in the page-level error banner.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Network(detail) => format!("Unable to reach the server: {detail}"),
            FetchError::Server { message, .. } => message.clone(),
        }
    }

    pub fn from_api_error(status: u16, error: ApiError) -> Self {
        FetchError::Server {
            status,
            message: error.message,
        }
    }
}

/// Failure of a single-entity write (cancel, remove, add).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error("{0}")]
    Rejected(String),
    #[error("{message}")]
    Api { code: ErrorCode, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("action not allowed: {0}")]
    NotAllowed(String),
}

impl MutationError {
    pub fn user_message(&self) -> String {
        match self {
            MutationError::Network(detail) => format!("Unable to reach the server: {detail}"),
            other => other.to_string(),
        }
    }
}

impl From<ApiError> for MutationError {
    fn from(value: ApiError) -> Self {
        MutationError::Api {
            code: value.code.unwrap_or(ErrorCode::Internal),
            message: value.message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MountError {
    #[error("authentication required; redirect to {login_path}")]
    Unauthenticated { login_path: String },
}
