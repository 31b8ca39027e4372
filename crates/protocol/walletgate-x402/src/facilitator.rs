//! Payment verification oracle.
//!
//! The gateway never checks signatures itself. A [`PaymentVerifier`] does,
//! and in production that is an x402 facilitator reached over HTTP:
//! - `/verify` checks the signature, amount and funds behind a payload
//! - `/settle` submits the authorization on-chain and returns the tx hash
//! - `/supported` lists the scheme/network pairs the facilitator handles

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::error::{X402Error, X402Result};
use crate::types::{
    PaymentRequirement, SettleRequest, SettleResponse, SupportedResponse, VerifyRequest,
    VerifyResponse, X402Config, X402_VERSION,
};

/// Default HTTP timeout for facilitator requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Something that can judge and settle x402 payment payloads.
#[async_trait]
pub trait PaymentVerifier: Send + Sync {
    /// Check a base64 payment header against a requirement.
    async fn verify(
        &self,
        payment_header: &str,
        requirement: &PaymentRequirement,
    ) -> X402Result<VerifyResponse>;

    /// Settle a previously verified payment.
    async fn settle(
        &self,
        payment_header: &str,
        requirement: &PaymentRequirement,
    ) -> X402Result<SettleResponse>;
}

/// Client for an x402 facilitator.
#[derive(Clone)]
pub struct FacilitatorClient {
    /// HTTP client
    client: Client,
    /// Base URL of the facilitator
    base_url: String,
}

impl FacilitatorClient {
    /// Create a new facilitator client.
    pub fn new(facilitator_url: &str) -> X402Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| {
                X402Error::FacilitatorNetwork(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: facilitator_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create from an x402 config.
    pub fn from_config(config: &X402Config) -> X402Result<Self> {
        Self::new(&config.facilitator_url)
    }

    /// Check which networks/schemes the facilitator supports.
    pub async fn get_supported(&self) -> X402Result<SupportedResponse> {
        let url = format!("{}/supported", self.base_url);
        debug!(url = %url, "Querying facilitator supported networks");

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(X402Error::FacilitatorNetwork(format!(
                "facilitator /supported returned {}: {}",
                status, body
            )));
        }

        let supported: SupportedResponse = response.json().await.map_err(|e| {
            X402Error::FacilitatorNetwork(format!("failed to parse supported response: {}", e))
        })?;

        debug!(kinds = supported.kinds.len(), "Facilitator capabilities fetched");
        Ok(supported)
    }

    /// Check if the facilitator supports a specific network.
    pub async fn supports_network(&self, network: &str) -> X402Result<bool> {
        let supported = self.get_supported().await?;
        Ok(supported.kinds.iter().any(|k| k.network == network))
    }

    /// Get the facilitator's base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PaymentVerifier for FacilitatorClient {
    async fn verify(
        &self,
        payment_header: &str,
        requirement: &PaymentRequirement,
    ) -> X402Result<VerifyResponse> {
        let url = format!("{}/verify", self.base_url);
        debug!(url = %url, resource = %requirement.resource, "Verifying payment with facilitator");

        let request = VerifyRequest {
            x402_version: X402_VERSION,
            payment_header: payment_header.to_string(),
            payment_requirements: requirement.clone(),
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(X402Error::VerificationFailed {
                reason: format!("facilitator returned {}: {}", status, body),
            });
        }

        let verify_response: VerifyResponse =
            response
                .json()
                .await
                .map_err(|e| X402Error::VerificationFailed {
                    reason: format!("failed to parse verify response: {}", e),
                })?;

        if verify_response.is_valid {
            debug!(payer = ?verify_response.payer, "Payment verified");
        } else {
            warn!(reason = ?verify_response.invalid_reason, "Payment verification failed");
        }

        Ok(verify_response)
    }

    async fn settle(
        &self,
        payment_header: &str,
        requirement: &PaymentRequirement,
    ) -> X402Result<SettleResponse> {
        let url = format!("{}/settle", self.base_url);
        debug!(url = %url, resource = %requirement.resource, "Settling payment with facilitator");

        let request = SettleRequest {
            x402_version: X402_VERSION,
            payment_header: payment_header.to_string(),
            payment_requirements: requirement.clone(),
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(X402Error::SettlementFailed {
                reason: format!("facilitator returned {}: {}", status, body),
            });
        }

        let settle_response: SettleResponse =
            response
                .json()
                .await
                .map_err(|e| X402Error::SettlementFailed {
                    reason: format!("failed to parse settle response: {}", e),
                })?;

        if settle_response.success {
            info!(
                tx_hash = ?settle_response.tx_hash,
                network = ?settle_response.network,
                "Payment settled"
            );
        } else {
            warn!(error = ?settle_response.error, "Payment settlement failed");
        }

        Ok(settle_response)
    }
}

impl std::fmt::Debug for FacilitatorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacilitatorClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
