//! Mock implementation of the `PaymentVerifier` trait for testing.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use walletgate_x402::{
    PaymentPayload, PaymentRequirement, PaymentVerifier, SettleResponse, VerifyResponse,
    X402Error, X402Result,
};

struct MockVerifierInner {
    /// Verdict returned by `verify`. `None` accepts with the payload's `from`.
    rejection: Option<String>,
    /// When set, `settle` reports failure with this reason.
    settle_failure: Option<String>,
    /// When true, `verify` fails as if the facilitator were unreachable.
    unreachable: bool,
    verify_calls: usize,
    settle_calls: usize,
}

/// A scripted payment oracle.
///
/// Accepts every payment by default. Clones share state.
#[derive(Clone)]
pub struct MockVerifier {
    inner: Arc<RwLock<MockVerifierInner>>,
}

impl Default for MockVerifier {
    fn default() -> Self {
        Self::accepting()
    }
}

impl MockVerifier {
    /// A verifier that accepts every payment.
    pub fn accepting() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MockVerifierInner {
                rejection: None,
                settle_failure: None,
                unreachable: false,
                verify_calls: 0,
                settle_calls: 0,
            })),
        }
    }

    /// A verifier that rejects every payment with `reason`.
    pub fn rejecting(reason: &str) -> Self {
        let mock = Self::accepting();
        mock.inner.write().unwrap().rejection = Some(reason.to_string());
        mock
    }

    /// Make settlement fail with `reason`.
    pub fn with_settle_failure(self, reason: &str) -> Self {
        self.inner.write().unwrap().settle_failure = Some(reason.to_string());
        self
    }

    /// Make every `verify` fail with a network error.
    pub fn unreachable() -> Self {
        let mock = Self::accepting();
        mock.inner.write().unwrap().unreachable = true;
        mock
    }

    /// Toggle the unreachable mode at runtime.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.inner.write().unwrap().unreachable = unreachable;
    }

    /// Number of `verify` calls.
    pub fn verify_count(&self) -> usize {
        self.inner.read().unwrap().verify_calls
    }

    /// Number of `settle` calls.
    pub fn settle_count(&self) -> usize {
        self.inner.read().unwrap().settle_calls
    }
}

#[async_trait]
impl PaymentVerifier for MockVerifier {
    async fn verify(
        &self,
        payment_header: &str,
        _requirement: &PaymentRequirement,
    ) -> X402Result<VerifyResponse> {
        let mut inner = self.inner.write().unwrap();
        inner.verify_calls += 1;

        if inner.unreachable {
            return Err(X402Error::FacilitatorNetwork(
                "mock: facilitator unreachable".to_string(),
            ));
        }
        if let Some(reason) = &inner.rejection {
            return Ok(VerifyResponse::invalid(reason.clone()));
        }

        let payer = PaymentPayload::from_header(payment_header)
            .ok()
            .map(|p| p.payload.authorization.from);
        Ok(VerifyResponse::valid(payer))
    }

    async fn settle(
        &self,
        _payment_header: &str,
        requirement: &PaymentRequirement,
    ) -> X402Result<SettleResponse> {
        let mut inner = self.inner.write().unwrap();
        inner.settle_calls += 1;

        Ok(match &inner.settle_failure {
            Some(reason) => SettleResponse {
                success: false,
                tx_hash: None,
                network: Some(requirement.network.clone()),
                error: Some(reason.clone()),
            },
            None => SettleResponse {
                success: true,
                tx_hash: Some(format!("0xsettled{:04}", inner.settle_calls)),
                network: Some(requirement.network.clone()),
                error: None,
            },
        })
    }
}
