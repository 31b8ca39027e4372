//! Helper functions for creating test fixtures.
//!
//! Provides a fixed recipient/payer pair, a matching x402 config, and
//! signed-looking payment headers that pass the gate's local checks.

use walletgate_types::now_unix;
use walletgate_x402::{
    ExactAuthorization, ExactPayload, PaymentPayload, X402Config, NETWORK_BASE_SEPOLIA,
    SCHEME_EXACT, X402_VERSION,
};

/// Recipient address used by [`test_x402_config`].
pub const TEST_PAY_TO: &str = "0x209693Bc6afc0C5328bA36FaF03C514EF312287C";

/// Payer address used in generated payment headers.
pub const TEST_PAYER: &str = "0x1111111111111111111111111111111111111111";

/// Testnet x402 config paying [`TEST_PAY_TO`].
pub fn test_x402_config() -> X402Config {
    X402Config::testnet(TEST_PAY_TO)
}

/// Payment payload for `value` atomic units to [`TEST_PAY_TO`], valid from
/// one minute ago to five minutes from now.
pub fn test_payment_payload(value: u64, nonce: &str) -> PaymentPayload {
    let now = now_unix();
    PaymentPayload {
        x402_version: X402_VERSION,
        scheme: SCHEME_EXACT.to_string(),
        network: NETWORK_BASE_SEPOLIA.to_string(),
        payload: ExactPayload {
            signature: format!("0x{}", "ab".repeat(65)),
            authorization: ExactAuthorization {
                from: TEST_PAYER.to_string(),
                to: TEST_PAY_TO.to_string(),
                value: value.to_string(),
                valid_after: now.saturating_sub(60).to_string(),
                valid_before: (now + 300).to_string(),
                nonce: nonce.to_string(),
            },
        },
    }
}

/// Base64 payment header for [`test_payment_payload`].
pub fn test_payment_header(value: u64, nonce: &str) -> String {
    // Encoding a fully-populated payload cannot fail.
    test_payment_payload(value, nonce)
        .to_header()
        .unwrap_or_default()
}
