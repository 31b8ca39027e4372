//! Wallet backend client for Walletgate.
//!
//! The gateway does not talk to a blockchain itself. Every wallet operation
//! is forwarded to a backend service that exposes a small REST API; this
//! crate is the client side of that API.
//!
//! - **[`WalletBackend`]**: the six operations tools are built on
//! - **[`HttpWalletBackend`]**: the reqwest implementation
//! - **[`BackendError`]**: transport and HTTP failures, message preserved verbatim
//!
//! # Existence checks
//!
//! [`WalletBackend::check_wallet`] is lenient: any backend failure reads as
//! "does not exist". Callers that need to tell an outage from a missing
//! wallet use [`WalletBackend::probe_wallet`], which reports
//! [`WalletExistence::Unknown`] instead.

pub mod backend;
pub mod error;
pub mod http;
pub mod types;

pub use backend::WalletBackend;
pub use error::{BackendError, BackendResult};
pub use http::{HttpBackendConfig, HttpWalletBackend};
pub use types::{AnalyticsRecord, SendTransaction, TransactionRecord, WalletExistence, WalletInfo};
