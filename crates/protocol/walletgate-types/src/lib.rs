//! Shared types for the Walletgate gateway.
//!
//! This crate holds the vocabulary every other Walletgate crate speaks:
//! error codes, tool prices and a few protocol constants. It contains no
//! I/O and no async code.
//!
//! # Module Organization
//!
//! - [`constants`] - Protocol constants (timeouts, id lengths, currency)
//! - [`error`] - Error codes shared by every reply envelope
//! - [`price`] - Fixed-unit decimal prices for paid tools
//! - [`time`] - Timestamp helpers for envelopes and records
//!
//! # Example
//!
//! ```
//! use walletgate_types::{ErrorCode, Price};
//!
//! let price: Price = "$0.05".parse().unwrap();
//! assert_eq!(price.atomic_units(), 50_000);
//! assert_eq!(price.to_string(), "$0.05");
//!
//! assert_eq!(ErrorCode::PaymentRejected.to_string(), "PAYMENT_REJECTED");
//! ```

/// Gateway protocol version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod constants;
pub mod error;
pub mod price;
pub mod time;

pub use constants::*;
pub use error::ErrorCode;
pub use price::{Price, PriceError};
pub use time::{now_rfc3339, now_unix};
