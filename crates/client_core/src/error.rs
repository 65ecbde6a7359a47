use shared::{
    domain::Todo,
    error::{ApiError, ErrorCode},
};
use thiserror::Error;

/// Failure of a gateway call, as seen by the UI components.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("todo not found")]
    NotFound,
    /// Storage holds a newer version; `current` is that record when known.
    #[error("superseded by a newer update: {message}")]
    Stale {
        message: String,
        current: Option<Box<Todo>>,
    },
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<ApiError> for GatewayError {
    fn from(value: ApiError) -> Self {
        match value.code {
            ErrorCode::Validation => Self::Validation(value.message),
            ErrorCode::NotFound => Self::NotFound,
            ErrorCode::Conflict => Self::Stale {
                message: value.message,
                current: value.current,
            },
            ErrorCode::Internal => Self::Storage(value.message),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}
