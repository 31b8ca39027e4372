//! The `walletgate` gateway binary.
//!
//! Serves the wallet tool registry over WebSocket, one session actor per
//! connection, with paid tools gated by x402 proofs or explicit confirmation.
//!
//! # Quick Start
//!
//! ```bash
//! # Write walletgate.toml
//! walletgate init
//!
//! # Inspect tools and effective prices
//! walletgate tools
//!
//! # Run the gateway
//! walletgate serve --listen 127.0.0.1:8402
//! ```
//!
//! # Endpoints
//!
//! - `GET /ws?signer=<id>`: WebSocket session. `signer` is optional.
//! - `GET /tools`: discovery listing.
//! - `GET /health`: liveness.
//! - `GET /status`: payment gate statistics.
//!
//! # Configuration
//!
//! Configuration is loaded from `./walletgate.toml`. Override with `--config`
//! or `WALLETGATE_CONFIG`.

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod transport;

pub use config::GatewayConfig;
pub use context::GatewayContext;
pub use error::{ServerError, ServerResult};
