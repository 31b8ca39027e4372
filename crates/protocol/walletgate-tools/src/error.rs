//! Error types for the tool registry and tool handlers.

use thiserror::Error;
use walletgate_backend::BackendError;
use walletgate_types::ErrorCode;

use crate::schema::FieldError;

/// Errors from registering or looking up tools.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A tool with this name is already registered.
    #[error("tool already registered: {name}")]
    DuplicateName { name: String },

    /// No tool with this name.
    #[error("unknown tool: {name}")]
    NotFound { name: String },
}

impl RegistryError {
    /// Gateway error code for this failure.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::DuplicateName { .. } => ErrorCode::InternalError,
            Self::NotFound { .. } => ErrorCode::NotFound,
        }
    }
}

/// Errors from running a tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments did not match the tool's declared parameters.
    #[error("invalid arguments: {}", join_fields(.0))]
    InvalidArguments(Vec<FieldError>),

    /// The wallet backend failed. The backend's message is kept as-is.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The handler failed for a reason of its own.
    #[error("{0}")]
    Internal(String),
}

impl ToolError {
    /// Gateway error code for this failure.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidArguments(_) => ErrorCode::InvalidArguments,
            Self::Backend(_) => ErrorCode::BackendFailure,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Field-level detail, for argument failures.
    pub fn fields(&self) -> Option<&[FieldError]> {
        match self {
            Self::InvalidArguments(fields) => Some(fields),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(format!("failed to encode result: {}", e))
    }
}

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
