//! Session layer for Walletgate.
//!
//! A session is one duplex connection. Text frames come in; replies and
//! `payment_required` events go out. Each session gets its own
//! [`SessionActor`], which owns a [`ConfirmationBroker`] for the payments it
//! is waiting on.
//!
//! # Call flow
//!
//! ```text
//! call_tool ──► lookup ──► validate ──► PaymentGate
//!                                          │
//!                 ┌──────── free / paid ◄──┤
//!                 ▼                        ▼ required
//!              handler             ConfirmationBroker ──► payment_required
//!                 │                        │
//!                 │        confirm ◄───────┤ cancel / 60 s timeout
//!                 ▼           │            ▼
//!            tool_result ◄── handler    tool_error (PAYMENT_REJECTED)
//! ```
//!
//! A confirmed call goes straight to the handler. The confirmation channel is
//! the authorization boundary; see the `walletgate-x402` crate docs.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use walletgate_session::{ServerMessage, SessionActor, SessionConfig};
//! use walletgate_tools::ToolRegistry;
//! use walletgate_x402::PaymentGate;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut session = SessionActor::spawn(
//!     Arc::new(ToolRegistry::new()),
//!     Arc::new(PaymentGate::disabled()),
//!     SessionConfig::default(),
//! );
//!
//! session.inbound.send("not json".to_string()).await.unwrap();
//! let reply = session.outbox.recv().await.unwrap();
//! assert_eq!(reply, ServerMessage::parse_error());
//! # }
//! ```

pub mod actor;
pub mod broker;
pub mod error;
pub mod protocol;

pub use actor::{SessionActor, SessionConfig, SessionHandle, INBOUND_BUFFER};
pub use broker::{ConfirmationBroker, ConfirmationOutcome, ConfirmationRequest, PendingConfirmation};
pub use error::DispatchError;
pub use protocol::{
    error_payload, parse_inbound, CallTool, ClientMessage, Inbound, ServerMessage, PARSE_ERROR,
};
