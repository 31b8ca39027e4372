//! Error types for x402 payment integration.

use thiserror::Error;
use walletgate_types::ErrorCode;

/// Result type for x402 operations.
pub type X402Result<T> = Result<T, X402Error>;

/// Errors that can occur while checking a payment proof.
///
/// None of these reach the caller as a hard failure: the gate turns every
/// one of them into a `payment_required` outcome carrying the reason.
#[derive(Debug, Error)]
pub enum X402Error {
    /// Payment amount is below the tool price.
    #[error("insufficient payment: required {required} atomic units, received {received}")]
    InsufficientPayment {
        /// Amount required
        required: u64,
        /// Amount received
        received: u64,
    },

    /// Payment payload is malformed or missing required fields.
    #[error("malformed payment payload: {reason}")]
    MalformedPayload {
        /// Description of what's wrong
        reason: String,
    },

    /// The payment scheme is not supported.
    #[error("unsupported payment scheme: {scheme}")]
    UnsupportedScheme {
        /// The unsupported scheme name
        scheme: String,
    },

    /// The payment network is not the one the gateway accepts.
    #[error("unsupported network: {network}")]
    UnsupportedNetwork {
        /// The unsupported network identifier
        network: String,
    },

    /// The payment is addressed to someone else.
    #[error("wrong recipient: expected {expected}, got {actual}")]
    WrongRecipient {
        /// Configured recipient
        expected: String,
        /// Recipient named in the payload
        actual: String,
    },

    /// Payment has expired (validBefore exceeded).
    #[error("payment expired at {expired_at}")]
    PaymentExpired {
        /// When the payment expired (Unix timestamp)
        expired_at: u64,
    },

    /// Payment is not yet valid (validAfter not reached).
    #[error("payment not yet valid until {valid_after}")]
    PaymentNotYetValid {
        /// When the payment becomes valid (Unix timestamp)
        valid_after: u64,
    },

    /// Nonce has already been used (replay prevention).
    #[error("nonce already used: {nonce}")]
    NonceReused {
        /// The reused nonce
        nonce: String,
    },

    /// Facilitator rejected the payment.
    #[error("facilitator verification failed: {reason}")]
    VerificationFailed {
        /// Reason for failure
        reason: String,
    },

    /// Facilitator settlement failed.
    #[error("facilitator settlement failed: {reason}")]
    SettlementFailed {
        /// Reason for failure
        reason: String,
    },

    /// Network/HTTP error communicating with the facilitator.
    #[error("facilitator communication error: {0}")]
    FacilitatorNetwork(String),

    /// No facilitator is configured, so proofs cannot be checked.
    #[error("x402 payments not configured")]
    NotConfigured,

    /// Internal error.
    #[error("internal x402 error: {0}")]
    Internal(String),
}

impl X402Error {
    /// Returns true if this error is transient and the operation may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::FacilitatorNetwork(_) | Self::SettlementFailed { .. }
        )
    }

    /// Gateway error code for this failure.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Internal(_) => ErrorCode::InternalError,
            _ => ErrorCode::PaymentRequired,
        }
    }
}

impl From<reqwest::Error> for X402Error {
    fn from(e: reqwest::Error) -> Self {
        Self::FacilitatorNetwork(e.to_string())
    }
}
