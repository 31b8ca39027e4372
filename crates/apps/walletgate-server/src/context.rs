//! Shared gateway state built once at startup.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use walletgate_backend::{HttpWalletBackend, WalletBackend};
use walletgate_session::{SessionActor, SessionConfig, SessionHandle};
use walletgate_tools::{wallet_registry, ToolRegistry};
use walletgate_x402::PaymentGate;

use crate::config::GatewayConfig;
use crate::error::ServerResult;

/// Everything a session needs, shared by every connection.
///
/// The registry and backend configuration are immutable. The payment gate
/// carries the replay-protection nonces and the payment totals, so every
/// session shares the one gate.
#[derive(Clone)]
pub struct GatewayContext {
    pub registry: Arc<ToolRegistry>,
    pub gate: Arc<PaymentGate>,
    pub confirmation_timeout: Duration,
}

impl GatewayContext {
    /// Build the gateway from parts.
    pub fn new(registry: ToolRegistry, gate: PaymentGate, confirmation_timeout: Duration) -> Self {
        Self {
            registry: Arc::new(registry),
            gate: Arc::new(gate),
            confirmation_timeout,
        }
    }

    /// Build the gateway from configuration, talking to the configured backend.
    pub fn from_config(config: &GatewayConfig) -> ServerResult<Self> {
        config.validate()?;
        let backend: Arc<dyn WalletBackend> =
            Arc::new(HttpWalletBackend::new(config.backend_config())?);
        Self::with_backend(config, backend)
    }

    /// The registry `config` describes, for listing only. Payment settings are
    /// not checked.
    pub fn registry_from_config(config: &GatewayConfig) -> ServerResult<ToolRegistry> {
        let backend: Arc<dyn WalletBackend> =
            Arc::new(HttpWalletBackend::new(config.backend_config())?);
        Ok(wallet_registry(backend, &config.price_overrides()?)?)
    }

    /// Build the gateway from configuration around an existing backend.
    pub fn with_backend(
        config: &GatewayConfig,
        backend: Arc<dyn WalletBackend>,
    ) -> ServerResult<Self> {
        let registry = wallet_registry(backend, &config.price_overrides()?)?;
        let gate = PaymentGate::new(config.x402.clone())?;

        info!(
            tools = registry.len(),
            x402_enabled = gate.is_enabled(),
            network = %config.x402.network,
            "Gateway ready"
        );

        Ok(Self::new(registry, gate, config.confirmation_timeout()))
    }

    /// Start a session actor for one connection.
    pub fn open_session(&self, signer: Option<String>) -> SessionHandle {
        SessionActor::spawn(
            self.registry.clone(),
            self.gate.clone(),
            SessionConfig {
                confirmation_timeout: self.confirmation_timeout,
                signer,
            },
        )
    }
}
