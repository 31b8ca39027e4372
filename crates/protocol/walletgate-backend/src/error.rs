//! Backend client errors.

use thiserror::Error;
use walletgate_types::ErrorCode;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors returned by a [`WalletBackend`](crate::WalletBackend).
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {body}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body, as sent
        body: String,
    },

    /// The request never got an answer (connect, timeout, TLS).
    #[error("backend request failed: {0}")]
    Transport(String),

    /// The backend answered with something we could not decode.
    #[error("invalid backend response: {0}")]
    Decode(String),

    /// The client was configured with an unusable base URL.
    #[error("invalid backend url: {0}")]
    InvalidUrl(String),
}

impl BackendError {
    /// HTTP status, if the backend answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the backend said the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Gateway error code for this failure.
    pub fn error_code(&self) -> ErrorCode {
        ErrorCode::BackendFailure
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

impl From<url::ParseError> for BackendError {
    fn from(e: url::ParseError) -> Self {
        Self::InvalidUrl(e.to_string())
    }
}
