//! Run the gateway.

use tracing::{info, warn};
use walletgate_x402::{FacilitatorClient, X402Config};

use crate::config::GatewayConfig;
use crate::context::GatewayContext;
use crate::error::{ServerError, ServerResult};
use crate::transport;

/// Execute the serve command.
pub async fn serve(config: GatewayConfig, listen: Option<String>) -> ServerResult<()> {
    let ctx = GatewayContext::from_config(&config)?;
    if config.x402.enabled {
        check_facilitator(&config.x402).await?;
    }
    let listen = listen.unwrap_or_else(|| config.server.listen.clone());
    transport::serve(ctx, &listen).await
}

/// Ask the facilitator whether it handles the configured network.
///
/// A facilitator that answers without the network is a configuration error.
/// One that cannot be reached only warns: proofs fail until it comes back,
/// and confirmations keep working meanwhile.
pub async fn check_facilitator(config: &X402Config) -> ServerResult<()> {
    let client = FacilitatorClient::from_config(config)?;

    match client.supports_network(&config.network).await {
        Ok(true) => {
            info!(
                facilitator = %client.base_url(),
                network = %config.network,
                "Facilitator supports network"
            );
            Ok(())
        }
        Ok(false) => Err(ServerError::config(format!(
            "facilitator {} does not support network '{}'",
            client.base_url(),
            config.network
        ))),
        Err(e) if e.is_transient() => {
            warn!(
                facilitator = %client.base_url(),
                error = %e,
                "Facilitator unreachable, payment proofs will fail until it responds"
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
