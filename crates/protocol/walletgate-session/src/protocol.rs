//! Session message envelopes.
//!
//! Inbound messages are JSON objects discriminated by `type`:
//! `call_tool`, `confirm`, `cancel`, `list_tools`. Outbound replies use the
//! same convention: `tool_result`, `tool_error`, `payment_required`,
//! `tools_list`, `error`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use walletgate_tools::{FieldError, ToolListing};
use walletgate_types::{now_rfc3339, ErrorCode};
use walletgate_x402::{PaymentReceipt, PaymentRequirement};

/// Reply text for input that is not a message at all.
pub const PARSE_ERROR: &str = "Failed to parse message";

/// `call_tool` payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CallTool {
    pub tool: String,

    #[serde(default)]
    pub args: Option<Map<String, Value>>,

    /// Correlation id, echoed on every reply to this call.
    #[serde(default)]
    pub id: Option<Value>,

    /// Base64 x402 payment payload.
    #[serde(default)]
    pub payment: Option<String>,
}

/// A recognized inbound message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    CallTool(CallTool),
    Confirm {
        #[serde(rename = "confirmationId")]
        confirmation_id: String,
    },
    Cancel {
        #[serde(rename = "confirmationId")]
        confirmation_id: String,
    },
    ListTools,
}

impl ClientMessage {
    pub const TYPES: [&'static str; 4] = ["call_tool", "confirm", "cancel", "list_tools"];
}

/// What an inbound frame turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Message(ClientMessage),
    /// Valid JSON object with a `type` we do not handle (or none at all).
    Unrecognized(Option<String>),
    /// Not JSON, not an object, or a known type with the wrong shape.
    Malformed,
}

/// Classify one inbound text frame.
pub fn parse_inbound(text: &str) -> Inbound {
    let value: Value = match serde_json::from_str(text) {
        Ok(value @ Value::Object(_)) => value,
        _ => return Inbound::Malformed,
    };

    let kind = value.get("type").and_then(Value::as_str).map(str::to_string);
    match kind {
        Some(kind) if ClientMessage::TYPES.contains(&kind.as_str()) => {
            match serde_json::from_value(value) {
                Ok(message) => Inbound::Message(message),
                Err(_) => Inbound::Malformed,
            }
        }
        other => Inbound::Unrecognized(other),
    }
}

/// Outbound reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ToolResult {
        tool: String,
        result: Value,
        timestamp: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        payment: Option<PaymentReceipt>,
    },
    ToolError {
        tool: String,
        result: Value,
        timestamp: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<Value>,
    },
    PaymentRequired {
        #[serde(rename = "confirmationId")]
        confirmation_id: String,
        requirements: Vec<PaymentRequirement>,
        timestamp: String,
        tool: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<Value>,
        /// Why an attached proof was refused.
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    ToolsList {
        tools: Vec<ToolListing>,
    },
    Error {
        error: String,
    },
}

impl ServerMessage {
    pub fn tool_result(
        tool: &str,
        result: Value,
        id: Option<Value>,
        payment: Option<PaymentReceipt>,
    ) -> Self {
        Self::ToolResult {
            tool: tool.to_string(),
            result,
            timestamp: now_rfc3339(),
            id,
            payment,
        }
    }

    /// `tool_error` whose `result` is the structured error payload.
    pub fn tool_error(
        tool: &str,
        id: Option<Value>,
        code: ErrorCode,
        message: String,
        fields: Option<&[FieldError]>,
    ) -> Self {
        Self::ToolError {
            tool: tool.to_string(),
            result: error_payload(code, message, fields),
            timestamp: now_rfc3339(),
            id,
        }
    }

    pub fn parse_error() -> Self {
        Self::Error {
            error: PARSE_ERROR.to_string(),
        }
    }

    /// The `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ToolResult { .. } => "tool_result",
            Self::ToolError { .. } => "tool_error",
            Self::PaymentRequired { .. } => "payment_required",
            Self::ToolsList { .. } => "tools_list",
            Self::Error { .. } => "error",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// `{error, code, message, suggestion, fields?}`
pub fn error_payload(code: ErrorCode, message: String, fields: Option<&[FieldError]>) -> Value {
    let mut payload = json!({
        "error": code.to_string(),
        "code": code.code(),
        "message": message,
        "suggestion": code.suggestion(),
    });
    if let Some(fields) = fields {
        payload["fields"] = json!(fields);
    }
    payload
}
