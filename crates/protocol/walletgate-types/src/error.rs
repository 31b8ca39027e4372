//! Gateway error codes.
//!
//! Every failure that reaches a caller is tagged with one of these codes,
//! regardless of which crate produced it. Codes are grouped by range:
//! dispatch errors, payment errors, backend errors and protocol errors.

use serde::{Deserialize, Serialize};

/// Error codes carried in `tool_error` and `error` envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u16)]
#[non_exhaustive]
pub enum ErrorCode {
    // =========================================================================
    // Dispatch Errors (0x0001 - 0x00FF)
    // =========================================================================
    /// No tool is registered under the requested name
    NotFound = 0x0001,
    /// Arguments failed schema validation
    InvalidArguments = 0x0002,

    // =========================================================================
    // Payment Errors (0x0100 - 0x01FF)
    // =========================================================================
    /// Payment is required before the tool runs (control outcome, not a fault)
    PaymentRequired = 0x0100,
    /// Payment confirmation was cancelled or timed out
    PaymentRejected = 0x0101,

    // =========================================================================
    // Backend Errors (0x0200 - 0x02FF)
    // =========================================================================
    /// The wallet backend failed or answered with a non-success status
    BackendFailure = 0x0200,

    // =========================================================================
    // Protocol Errors (0x0300 - 0x03FF)
    // =========================================================================
    /// Inbound message could not be parsed
    ProtocolError = 0x0300,

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal gateway error
    InternalError = 0xFFFF,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Returns true for payment-related codes (0x0100-0x01FF)
    pub fn is_payment_error(&self) -> bool {
        (0x0100..=0x01FF).contains(&self.code())
    }

    /// Get a user-friendly suggestion for recovering from this error.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NotFound => "Send a list_tools message to see the available tools.",
            Self::InvalidArguments => "Check the listed field errors against the tool's input schema.",
            Self::PaymentRequired => "Confirm the pending payment or retry with a payment proof.",
            Self::PaymentRejected => "The payment was cancelled or expired. Call the tool again to get a new confirmation.",
            Self::BackendFailure => "The wallet backend is unavailable or refused the request. Try again later.",
            Self::ProtocolError => "Send a JSON object with a recognized `type` field.",
            Self::InternalError => "An internal error occurred. Please report this issue.",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::NotFound => write!(f, "NOT_FOUND"),
            ErrorCode::InvalidArguments => write!(f, "INVALID_ARGUMENTS"),
            ErrorCode::PaymentRequired => write!(f, "PAYMENT_REQUIRED"),
            ErrorCode::PaymentRejected => write!(f, "PAYMENT_REJECTED"),
            ErrorCode::BackendFailure => write!(f, "BACKEND_FAILURE"),
            ErrorCode::ProtocolError => write!(f, "PROTOCOL_ERROR"),
            ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}
