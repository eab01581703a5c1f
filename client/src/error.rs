use serde::Deserialize;
use thiserror::Error;

/// Machine-readable tag sent by the server in every error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    NoActiveSession,
    ActiveSessionExists,
    NotFound,
    Validation,
    Unauthorized,
    RateLimited,
    Internal,
}

/// A structured error response from the server.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

/// Error types for the fieldreport client.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] ureq::Error),
    #[error("Failed to read response: {0}")]
    Io(#[from] std::io::Error),
    #[error("{}", .0.message)]
    Api(ApiError),
    #[error("Report has no items")]
    EmptyReport,
    #[error("Invalid email address")]
    InvalidEmail,
}

impl ClientError {
    /// The server-side error kind, when this is an API error.
    pub fn api_kind(&self) -> Option<ApiErrorKind> {
        match self {
            Self::Api(e) => Some(e.kind),
            _ => None,
        }
    }
}
