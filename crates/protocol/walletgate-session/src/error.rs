//! Per-call failures reported as `tool_error`.

use serde_json::Value;
use thiserror::Error;
use walletgate_tools::{RegistryError, ToolError};
use walletgate_types::ErrorCode;

use crate::broker::ConfirmationOutcome;
use crate::protocol::ServerMessage;

/// Why a `call_tool` did not produce a result.
///
/// None of these end the session.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Unknown tool name.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Argument validation or the handler itself failed.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// The caller cancelled, or never answered, the confirmation.
    #[error("payment {outcome} for confirmation {confirmation_id}")]
    PaymentRejected {
        confirmation_id: String,
        outcome: ConfirmationOutcome,
    },

    /// The handler task died.
    #[error("tool execution failed: {0}")]
    Internal(String),
}

impl DispatchError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Registry(e) => e.error_code(),
            Self::Tool(e) => e.error_code(),
            Self::PaymentRejected { .. } => ErrorCode::PaymentRejected,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// The `tool_error` reply for this failure.
    pub fn into_message(self, tool: &str, id: Option<Value>) -> ServerMessage {
        let fields = match &self {
            Self::Tool(e) => e.fields(),
            _ => None,
        };
        ServerMessage::tool_error(tool, id, self.error_code(), self.to_string(), fields)
    }
}
