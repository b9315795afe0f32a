use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    RateLimited,
    Internal,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            400 | 409 | 422 => ErrorCode::Validation,
            429 => ErrorCode::RateLimited,
            _ => ErrorCode::Internal,
        }
    }
}

/// Error body returned by the marketplace API, e.g. `{"status":"fail","message":"..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    /// Decodes an error body, falling back to the raw text when it is not JSON.
    pub fn from_body(status: u16, body: &str) -> Self {
        let code = ErrorCode::from_status(status);
        match serde_json::from_str::<ApiError>(body) {
            Ok(mut parsed) if !parsed.message.trim().is_empty() => {
                parsed.code.get_or_insert(code);
                parsed
            }
            _ if body.trim().is_empty() => {
                Self::new(code, format!("request failed with status {status}"))
            }
            _ => Self::new(code, body.trim()),
        }
    }
}
