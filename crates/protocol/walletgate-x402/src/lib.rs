//! x402 payment integration for Walletgate.
//!
//! Paid tools are protected by the [x402 payment protocol](https://www.x402.org/).
//! A caller that invokes a paid tool without a valid payment proof gets the
//! payment requirements back instead of a result. It can then either attach a
//! signed payment payload and retry, or confirm the payment through the
//! session's confirmation handshake.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   call_tool (no proof)   ┌──────────────┐
//! │  Agent      │ ───────────────────────→ │  Walletgate  │
//! │  (Caller)   │ ←─────────────────────── │  Session     │
//! │             │    payment_required      │              │
//! │             │                          │     ┌────────┤
//! │             │   call_tool + payment    │     │Payment │
//! │             │ ───────────────────────→ │     │Gate    │
//! │             │                          │     └───┬────┤
//! │             │                          │    ┌────▼───┐│
//! │             │                          │    │Facilit-││
//! │             │   tool_result            │    │ator    ││
//! │             │ ←─────────────────────── │    │(verify)││
//! └─────────────┘                          │    └────────┘│
//!                                          └──────────────┘
//! ```
//!
//! # Components
//!
//! - **[`types`]**: x402 message types (`PaymentRequirement`, `PaymentPayload`, etc.)
//! - **[`facilitator`]**: The [`PaymentVerifier`] oracle and its HTTP client
//! - **[`gate`]**: The payment gate deciding whether a tool may run
//! - **[`error`]**: Error types with recovery suggestions
//!
//! # Usage
//!
//! ```rust
//! use walletgate_types::Price;
//! use walletgate_x402::{GateOutcome, PaymentGate, X402Config};
//!
//! # async fn example() {
//! let gate = PaymentGate::unverified(X402Config::testnet("0x209693Bc6afc0C5328bA36FaF03C514EF312287C"));
//! let price = Price::from_cents(5);
//!
//! // No proof attached: the handler does not run.
//! let outcome = gate
//!     .invoke("send_transaction", "Send funds", price, None, || async { "sent" })
//!     .await;
//! assert!(matches!(outcome, GateOutcome::PaymentRequired { .. }));
//!
//! // Free tools always run.
//! let outcome = gate
//!     .invoke("check_wallet", "Check a wallet", None, None, || async { "ok" })
//!     .await;
//! assert!(matches!(outcome, GateOutcome::Executed { output: "ok", .. }));
//! # }
//! ```
//!
//! # Trust Boundary
//!
//! Payment proofs are verified by the facilitator before the handler runs.
//! Confirmations arriving over a session channel are *not* re-verified: the
//! session's confirmation channel is itself the authorization boundary. A
//! deployment that needs verified settlement for every call must check the
//! proof before sending `confirm`, not after.

pub mod error;
pub mod facilitator;
pub mod gate;
pub mod types;

// Re-export main types
pub use error::{X402Error, X402Result};
pub use facilitator::{FacilitatorClient, PaymentVerifier};
pub use gate::{Authorization, GateOutcome, PaymentGate, PaymentMethod, PaymentRecord, X402Status};
pub use types::{
    ExactAuthorization, ExactPayload, PaymentPayload, PaymentReceipt, PaymentRequirement,
    SettleResponse, SupportedResponse, VerifyResponse, X402Config, NETWORK_BASE,
    NETWORK_BASE_SEPOLIA, SCHEME_EXACT, X402_VERSION,
};
