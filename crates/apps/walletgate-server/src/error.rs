//! Server error types.

use std::path::PathBuf;

use thiserror::Error;
use walletgate_backend::BackendError;
use walletgate_tools::RegistryError;
use walletgate_types::ErrorCode;
use walletgate_x402::X402Error;

/// Server result type.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors surfaced by the `walletgate` binary.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Config file already present.
    #[error("Config file already exists: {}. Pass --force to overwrite.", .0.display())]
    ConfigExists(PathBuf),

    /// Could not bind the listen address.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Backend client construction failed.
    #[error("{0}")]
    Backend(#[from] BackendError),

    /// Payment layer construction failed.
    #[error("{0}")]
    X402(#[from] X402Error),

    /// Tool registration failed.
    #[error("{0}")]
    Registry(#[from] RegistryError),

    /// IO error.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ServerError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigExists(_) => 1,
            Self::Config(_) | Self::Toml(_) => 3,
            Self::Bind { .. } => 5,
            Self::Backend(_) => 6,
            Self::X402(_) => 7,
            Self::Registry(_) => 8,
            Self::Io(_) => 9,
            Self::Json(_) => 10,
        }
    }

    /// Get the protocol error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Backend(e) => e.error_code(),
            Self::X402(e) => e.error_code(),
            Self::Registry(e) => e.error_code(),
            Self::Config(_) | Self::ConfigExists(_) | Self::Toml(_) => ErrorCode::InvalidArguments,
            Self::Bind { .. } | Self::Io(_) | Self::Json(_) => ErrorCode::InternalError,
        }
    }
}
