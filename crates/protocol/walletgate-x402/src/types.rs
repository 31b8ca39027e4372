//! x402 protocol types.
//!
//! Implements the x402 types for the EVM `exact` scheme (EIP-3009
//! `transferWithAuthorization`), which is what USDC payments on Base use.
//! See: https://github.com/coinbase/x402/blob/main/specs/x402-specification.md

use serde::{Deserialize, Serialize};
use walletgate_types::Price;

/// x402 protocol version.
pub const X402_VERSION: u32 = 1;

/// Base network identifiers.
pub const NETWORK_BASE: &str = "base";
pub const NETWORK_BASE_SEPOLIA: &str = "base-sepolia";

/// USDC contract addresses.
pub const USDC_BASE: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";
pub const USDC_BASE_SEPOLIA: &str = "0x036CbD53842c5426634e7929541eC2318f3dCF7e";

/// The payment scheme accepted by the gateway.
pub const SCHEME_EXACT: &str = "exact";

/// Public x402 facilitator.
pub const DEFAULT_FACILITATOR_URL: &str = "https://x402.org/facilitator";

/// Default maximum timeout for payment validity (seconds).
pub const DEFAULT_MAX_TIMEOUT_SECONDS: u64 = 300; // 5 minutes

// =============================================================================
// Payment Requirements (payment_required outcome)
// =============================================================================

/// A single accepted way to pay for one tool invocation.
///
/// Produced per paid call from static configuration; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirement {
    /// Payment scheme (e.g., "exact").
    pub scheme: String,

    /// Network identifier (e.g., "base-sepolia").
    pub network: String,

    /// Required amount in the asset's atomic units.
    pub amount: String,

    /// Human-readable price (e.g., "$0.05").
    pub price: String,

    /// Asset contract address.
    pub asset: String,

    /// Address to pay to.
    pub pay_to: String,

    /// Tool being paid for.
    pub resource: String,

    /// Human-readable description of the tool.
    pub description: String,

    /// MIME type of the tool result.
    pub mime_type: String,

    /// Maximum time in seconds the payment is valid after creation.
    pub max_timeout_seconds: u64,

    /// Facilitator endpoint that verifies payments for this requirement.
    pub facilitator: String,
}

impl PaymentRequirement {
    /// Build the requirement for a priced tool.
    pub fn for_tool(tool: &str, description: &str, price: Price, config: &X402Config) -> Self {
        Self {
            scheme: SCHEME_EXACT.to_string(),
            network: config.network.clone(),
            amount: price.atomic_units().to_string(),
            price: price.to_string(),
            asset: config.asset.clone(),
            pay_to: config.pay_to.clone(),
            resource: tool.to_string(),
            description: description.to_string(),
            mime_type: "application/json".to_string(),
            max_timeout_seconds: config.max_timeout_seconds,
            facilitator: config.facilitator_url.clone(),
        }
    }

    /// Required amount parsed back into atomic units.
    pub fn amount_units(&self) -> Option<u64> {
        self.amount.parse().ok()
    }
}

// =============================================================================
// Payment Payload (Caller → Gateway)
// =============================================================================

/// Payment payload attached to a `call_tool` message (base64-encoded JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    /// x402 protocol version.
    pub x402_version: u32,

    /// The payment scheme used.
    pub scheme: String,

    /// Network the payment is for.
    pub network: String,

    /// Scheme-specific payment details.
    pub payload: ExactPayload,
}

/// `exact` scheme details: a signed EIP-3009 authorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactPayload {
    /// Signature over the authorization (hex-encoded).
    pub signature: String,

    /// The signed transfer authorization.
    pub authorization: ExactAuthorization,
}

/// EIP-3009 transfer authorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactAuthorization {
    /// Payer address.
    pub from: String,

    /// Recipient address.
    pub to: String,

    /// Amount in atomic units.
    pub value: String,

    /// Timestamp after which payment is valid (Unix seconds).
    pub valid_after: String,

    /// Timestamp before which payment is valid (Unix seconds).
    pub valid_before: String,

    /// Unique nonce to prevent replay attacks (hex-encoded 32 bytes).
    pub nonce: String,
}

impl PaymentPayload {
    /// Decode a payment payload from a base64-encoded header value.
    pub fn from_header(header_value: &str) -> Result<Self, String> {
        use base64::Engine as _;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(header_value.trim())
            .map_err(|e| format!("base64 decode error: {}", e))?;
        serde_json::from_slice(&decoded).map_err(|e| format!("JSON parse error: {}", e))
    }

    /// Encode this payment payload to a base64 string.
    pub fn to_header(&self) -> Result<String, String> {
        use base64::Engine as _;
        let json = serde_json::to_vec(self).map_err(|e| format!("JSON encode error: {}", e))?;
        Ok(base64::engine::general_purpose::STANDARD.encode(&json))
    }
}

// =============================================================================
// Facilitator API Types
// =============================================================================

/// Request to the facilitator's /verify endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// x402 protocol version.
    pub x402_version: u32,

    /// Base64-encoded payment payload from the caller.
    pub payment_header: String,

    /// The requirement the payment must satisfy.
    pub payment_requirements: PaymentRequirement,
}

/// Response from the facilitator's /verify endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    /// Whether the payment is valid.
    pub is_valid: bool,

    /// If invalid, the reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,

    /// Payer's address (for audit).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

impl VerifyResponse {
    /// Accepting verdict.
    pub fn valid(payer: Option<String>) -> Self {
        Self {
            is_valid: true,
            invalid_reason: None,
            payer,
        }
    }

    /// Rejecting verdict with a reason.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            invalid_reason: Some(reason.into()),
            payer: None,
        }
    }
}

/// Request to the facilitator's /settle endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleRequest {
    /// x402 protocol version.
    pub x402_version: u32,

    /// Base64-encoded payment payload.
    pub payment_header: String,

    /// The payment requirement.
    pub payment_requirements: PaymentRequirement,
}

/// Response from the facilitator's /settle endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    /// Whether settlement succeeded.
    pub success: bool,

    /// Transaction hash on-chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,

    /// Network the settlement occurred on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    /// If failed, the error reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response from the facilitator's /supported endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportedResponse {
    /// Supported payment schemes/networks.
    pub kinds: Vec<SupportedKind>,
}

/// A supported payment kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedKind {
    /// Payment scheme (e.g., "exact").
    pub scheme: String,
    /// Network identifier.
    pub network: String,
}

// =============================================================================
// Payment Receipt (Gateway → Caller, attached to tool_result)
// =============================================================================

/// Receipt attached to the `tool_result` of a paid call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    /// Amount charged in atomic units.
    pub amount: String,

    /// Network the payment is denominated on.
    pub network: String,

    /// Recipient address.
    pub pay_to: String,

    /// Payer identity, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,

    /// Settlement transaction hash (proof path with auto-settle).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,

    /// Confirmation that authorized the call (confirmation path).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_id: Option<String>,
}

impl PaymentReceipt {
    /// Receipt for a call authorized through the confirmation handshake.
    pub fn confirmed(
        requirement: &PaymentRequirement,
        confirmation_id: &str,
        payer: Option<String>,
    ) -> Self {
        Self {
            amount: requirement.amount.clone(),
            network: requirement.network.clone(),
            pay_to: requirement.pay_to.clone(),
            payer,
            tx_hash: None,
            confirmation_id: Some(confirmation_id.to_string()),
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// x402 configuration for the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct X402Config {
    /// Whether payment proofs are checked against the facilitator.
    /// When disabled, paid tools can only be unlocked by confirmation.
    pub enabled: bool,

    /// Network to accept payments on.
    pub network: String,

    /// Facilitator URL.
    pub facilitator_url: String,

    /// Address receiving payments.
    pub pay_to: String,

    /// Asset contract address.
    pub asset: String,

    /// Maximum payment timeout in seconds.
    pub max_timeout_seconds: u64,

    /// Whether verified proofs are settled before the tool runs.
    pub auto_settle: bool,
}

impl Default for X402Config {
    fn default() -> Self {
        Self {
            enabled: false,
            network: NETWORK_BASE_SEPOLIA.to_string(),
            facilitator_url: DEFAULT_FACILITATOR_URL.to_string(),
            pay_to: String::new(),
            asset: USDC_BASE_SEPOLIA.to_string(),
            max_timeout_seconds: DEFAULT_MAX_TIMEOUT_SECONDS,
            auto_settle: true,
        }
    }
}

impl X402Config {
    /// Create a Base Sepolia configuration.
    pub fn testnet(pay_to: &str) -> Self {
        Self {
            enabled: true,
            pay_to: pay_to.to_string(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAY_TO: &str = "0x209693Bc6afc0C5328bA36FaF03C514EF312287C";

    #[test]
    fn test_requirement_for_tool() {
        let config = X402Config::testnet(PAY_TO);
        let price = Price::from_cents(5).unwrap();
        let req = PaymentRequirement::for_tool("send_transaction", "Send funds", price, &config);

        assert_eq!(req.scheme, SCHEME_EXACT);
        assert_eq!(req.network, NETWORK_BASE_SEPOLIA);
        assert_eq!(req.amount, "50000");
        assert_eq!(req.amount_units(), Some(50_000));
        assert_eq!(req.price, "$0.05");
        assert_eq!(req.pay_to, PAY_TO);
        assert_eq!(req.resource, "send_transaction");
        assert_eq!(req.facilitator, DEFAULT_FACILITATOR_URL);
    }

    #[test]
    fn test_requirement_serializes_camel_case() {
        let config = X402Config::testnet(PAY_TO);
        let req = PaymentRequirement::for_tool(
            "get_analytics",
            "Analytics",
            Price::from_cents(1).unwrap(),
            &config,
        );
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["payTo"], PAY_TO);
        assert_eq!(json["maxTimeoutSeconds"], 300);
        assert_eq!(json["mimeType"], "application/json");
    }

    #[test]
    fn test_config_defaults() {
        let config = X402Config::default();
        assert!(!config.enabled);
        assert_eq!(config.network, NETWORK_BASE_SEPOLIA);
        assert_eq!(config.asset, USDC_BASE_SEPOLIA);
        assert_eq!(config.max_timeout_seconds, 300);
        assert!(config.auto_settle);
    }

    #[test]
    fn test_payment_payload_header_decoding() {
        let payload = PaymentPayload {
            x402_version: X402_VERSION,
            scheme: SCHEME_EXACT.to_string(),
            network: NETWORK_BASE_SEPOLIA.to_string(),
            payload: ExactPayload {
                signature: "0xcafebabe".to_string(),
                authorization: ExactAuthorization {
                    from: "0x1111111111111111111111111111111111111111".to_string(),
                    to: PAY_TO.to_string(),
                    value: "50000".to_string(),
                    valid_after: "1700000000".to_string(),
                    valid_before: "1700000300".to_string(),
                    nonce: "0x01".to_string(),
                },
            },
        };

        let encoded = payload.to_header().unwrap();
        let decoded = PaymentPayload::from_header(&encoded).unwrap();
        assert_eq!(decoded.payload.authorization.to, PAY_TO);
        assert_eq!(decoded.payload.authorization.value, "50000");

        assert!(PaymentPayload::from_header("not-valid-base64-!!!").is_err());
    }

    #[test]
    fn test_confirmed_receipt() {
        let config = X402Config::testnet(PAY_TO);
        let req = PaymentRequirement::for_tool(
            "get_analytics",
            "Analytics",
            Price::from_cents(1).unwrap(),
            &config,
        );
        let receipt = PaymentReceipt::confirmed(&req, "abc123", Some("0xpayer".into()));
        assert_eq!(receipt.amount, "10000");
        assert_eq!(receipt.confirmation_id.as_deref(), Some("abc123"));
        let json = serde_json::to_value(&receipt).unwrap();
        assert!(json.get("txHash").is_none());
        assert_eq!(json["payer"], "0xpayer");
    }
}
