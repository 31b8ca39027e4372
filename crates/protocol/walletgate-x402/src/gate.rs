//! Payment gate for priced tools.
//!
//! The `PaymentGate` is the decision point in front of every tool handler:
//! 1. Free tools run immediately
//! 2. Priced tools with no proof get their payment requirements back
//! 3. Proofs are validated locally, checked for replay, then verified
//! 4. Verified proofs are settled (if auto_settle is enabled)
//! 5. Accepted payments are counted for reporting
//!
//! The unpaid path has no side effects: asking twice yields the same
//! requirements twice and never touches the handler.
//!
//! The gate lives as long as the server, so nothing it keeps may grow with
//! traffic alone. Used nonces are held until their `validBefore` passes, and
//! only the most recent payment records are kept next to running totals.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use walletgate_types::{now_unix, Price};

use crate::error::{X402Error, X402Result};
use crate::facilitator::{FacilitatorClient, PaymentVerifier};
use crate::types::{PaymentPayload, PaymentReceipt, PaymentRequirement, X402Config, SCHEME_EXACT};

/// Tracked nonce count at which expired nonces are evicted.
const NONCE_PRUNE_THRESHOLD: usize = 100_000;

/// Payment records kept for inspection. Totals count every payment.
pub const MAX_RECENT_PAYMENTS: usize = 1_000;

/// How a payment was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// A signed payload verified by the facilitator.
    Proof,
    /// An explicit confirm over the session channel.
    Confirmation,
}

/// Accepted payment, kept for inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    /// Unix timestamp of acceptance.
    pub timestamp: u64,

    /// Tool that was paid for.
    pub resource: String,

    /// Payer address or signer identity, when known.
    pub payer: Option<String>,

    /// Amount in atomic units.
    pub amount: u64,

    /// Network the payment is denominated on.
    pub network: String,

    /// Settlement transaction hash, if settled.
    pub tx_hash: Option<String>,

    /// How the payment was accepted.
    pub method: PaymentMethod,
}

/// The gate's verdict for one invocation.
#[derive(Debug, Clone)]
pub enum Authorization {
    /// The tool has no price.
    Free,
    /// A proof was verified (and settled, with auto_settle).
    Paid(PaymentReceipt),
    /// The handler must not run yet.
    Required {
        /// What the caller has to pay.
        requirements: Vec<PaymentRequirement>,
        /// Why an attached proof was refused, if one was attached.
        reason: Option<String>,
    },
}

impl Authorization {
    /// Whether the handler may run.
    pub fn is_authorized(&self) -> bool {
        !matches!(self, Self::Required { .. })
    }
}

/// Result of running a handler through the gate.
#[derive(Debug)]
pub enum GateOutcome<T> {
    /// The handler ran.
    Executed {
        output: T,
        receipt: Option<PaymentReceipt>,
    },
    /// The handler did not run.
    PaymentRequired {
        requirements: Vec<PaymentRequirement>,
        reason: Option<String>,
    },
}

/// Payment gate shared by every session of a gateway.
pub struct PaymentGate {
    /// x402 configuration.
    config: X402Config,

    /// Oracle for payment proofs. `None` means proofs are never accepted.
    verifier: Option<Arc<dyn PaymentVerifier>>,

    /// Used nonce -> its `validBefore`, for replay prevention.
    used_nonces: Arc<RwLock<HashMap<String, u64>>>,

    /// Payment totals and recent records.
    ledger: Arc<RwLock<PaymentLedger>>,
}

/// Running payment totals plus a bounded window of recent records.
#[derive(Debug, Default)]
struct PaymentLedger {
    recent: VecDeque<PaymentRecord>,
    proof_payments: usize,
    confirmed_payments: usize,
    total_volume: u64,
}

impl PaymentLedger {
    fn push(&mut self, record: PaymentRecord) {
        match record.method {
            PaymentMethod::Proof => self.proof_payments += 1,
            PaymentMethod::Confirmation => self.confirmed_payments += 1,
        }
        self.total_volume = self.total_volume.saturating_add(record.amount);

        if self.recent.len() == MAX_RECENT_PAYMENTS {
            self.recent.pop_front();
        }
        self.recent.push_back(record);
    }

    fn total_payments(&self) -> usize {
        self.proof_payments + self.confirmed_payments
    }
}

impl PaymentGate {
    /// Create a gate from configuration, talking to the configured facilitator
    /// when x402 is enabled.
    pub fn new(config: X402Config) -> X402Result<Self> {
        let verifier: Option<Arc<dyn PaymentVerifier>> = if config.enabled {
            Some(Arc::new(FacilitatorClient::from_config(&config)?))
        } else {
            None
        };
        Ok(Self::build(config, verifier))
    }

    /// Create a gate with an explicit verifier.
    pub fn with_verifier(config: X402Config, verifier: Arc<dyn PaymentVerifier>) -> Self {
        Self::build(config, Some(verifier))
    }

    /// Create a gate that prices tools but cannot verify proofs. Paid tools
    /// can only be unlocked through confirmation.
    pub fn unverified(config: X402Config) -> Self {
        Self::build(config, None)
    }

    /// Create a gate with default (disabled) configuration.
    pub fn disabled() -> Self {
        Self::build(X402Config::default(), None)
    }

    fn build(config: X402Config, verifier: Option<Arc<dyn PaymentVerifier>>) -> Self {
        Self {
            config,
            verifier,
            used_nonces: Arc::new(RwLock::new(HashMap::new())),
            ledger: Arc::new(RwLock::new(PaymentLedger::default())),
        }
    }

    /// Check if proof verification is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled && self.verifier.is_some()
    }

    /// Get the current configuration.
    pub fn config(&self) -> &X402Config {
        &self.config
    }

    /// Payment requirements for one invocation of a priced tool.
    ///
    /// The amount is the declared price, exactly.
    pub fn requirements(
        &self,
        resource: &str,
        description: &str,
        price: Price,
    ) -> Vec<PaymentRequirement> {
        vec![PaymentRequirement::for_tool(
            resource,
            description,
            price,
            &self.config,
        )]
    }

    /// Decide whether a tool may run.
    pub async fn authorize(
        &self,
        resource: &str,
        description: &str,
        price: Option<Price>,
        proof: Option<&str>,
    ) -> Authorization {
        let Some(price) = price else {
            return Authorization::Free;
        };

        let requirements = self.requirements(resource, description, price);

        let Some(proof) = proof else {
            debug!(resource = %resource, price = %price, "No payment proof attached");
            return Authorization::Required {
                requirements,
                reason: None,
            };
        };

        match self.process_payment(proof, &requirements[0]).await {
            Ok(receipt) => Authorization::Paid(receipt),
            Err(e) => {
                warn!(resource = %resource, error = %e, "Payment proof refused");
                Authorization::Required {
                    requirements,
                    reason: Some(e.to_string()),
                }
            }
        }
    }

    /// Run `handler` if the gate allows it.
    pub async fn invoke<T, F, Fut>(
        &self,
        resource: &str,
        description: &str,
        price: Option<Price>,
        proof: Option<&str>,
        handler: F,
    ) -> GateOutcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        match self.authorize(resource, description, price, proof).await {
            Authorization::Free => GateOutcome::Executed {
                output: handler().await,
                receipt: None,
            },
            Authorization::Paid(receipt) => GateOutcome::Executed {
                output: handler().await,
                receipt: Some(receipt),
            },
            Authorization::Required {
                requirements,
                reason,
            } => GateOutcome::PaymentRequired {
                requirements,
                reason,
            },
        }
    }

    /// Check a payment proof against a requirement:
    /// 1. Decode the payment header
    /// 2. Validate the payment locally (scheme, network, amount, recipient, timing)
    /// 3. Reserve the nonce (replay prevention)
    /// 4. Verify via the facilitator
    /// 5. Settle via the facilitator (if auto_settle is enabled)
    /// 6. Record the payment
    ///
    /// A reserved nonce is released again if any later step fails.
    async fn process_payment(
        &self,
        payment_header: &str,
        requirement: &PaymentRequirement,
    ) -> X402Result<PaymentReceipt> {
        let verifier = self.verifier.as_ref().ok_or(X402Error::NotConfigured)?;

        let payload = PaymentPayload::from_header(payment_header)
            .map_err(|e| X402Error::MalformedPayload { reason: e })?;

        let valid_before = self.validate_payload(&payload, requirement)?;

        let nonce = payload.payload.authorization.nonce.clone();
        self.reserve_nonce(&nonce, valid_before).await?;

        match self
            .verify_and_settle(verifier.as_ref(), payment_header, requirement)
            .await
        {
            Ok((payer, tx_hash)) => {
                let payer = payer.or_else(|| Some(payload.payload.authorization.from.clone()));
                let amount = requirement.amount_units().unwrap_or_default();

                self.record(PaymentRecord {
                    timestamp: now_unix(),
                    resource: requirement.resource.clone(),
                    payer: payer.clone(),
                    amount,
                    network: requirement.network.clone(),
                    tx_hash: tx_hash.clone(),
                    method: PaymentMethod::Proof,
                })
                .await;

                info!(
                    resource = %requirement.resource,
                    amount = amount,
                    tx_hash = ?tx_hash,
                    "x402 payment accepted"
                );

                Ok(PaymentReceipt {
                    amount: requirement.amount.clone(),
                    network: requirement.network.clone(),
                    pay_to: requirement.pay_to.clone(),
                    payer,
                    tx_hash,
                    confirmation_id: None,
                })
            }
            Err(e) => {
                self.release_nonce(&nonce).await;
                Err(e)
            }
        }
    }

    async fn verify_and_settle(
        &self,
        verifier: &dyn PaymentVerifier,
        payment_header: &str,
        requirement: &PaymentRequirement,
    ) -> X402Result<(Option<String>, Option<String>)> {
        let verdict = verifier.verify(payment_header, requirement).await?;
        if !verdict.is_valid {
            return Err(X402Error::VerificationFailed {
                reason: verdict
                    .invalid_reason
                    .unwrap_or_else(|| "unknown verification failure".to_string()),
            });
        }

        if !self.config.auto_settle {
            return Ok((verdict.payer, None));
        }

        let settlement = verifier.settle(payment_header, requirement).await?;
        if !settlement.success {
            return Err(X402Error::SettlementFailed {
                reason: settlement
                    .error
                    .unwrap_or_else(|| "unknown settlement failure".to_string()),
            });
        }

        Ok((verdict.payer, settlement.tx_hash))
    }

    /// Validate a payment payload locally before sending it to the facilitator.
    /// Returns the payload's `validBefore`.
    fn validate_payload(
        &self,
        payload: &PaymentPayload,
        requirement: &PaymentRequirement,
    ) -> X402Result<u64> {
        if payload.scheme != SCHEME_EXACT {
            return Err(X402Error::UnsupportedScheme {
                scheme: payload.scheme.clone(),
            });
        }

        if payload.network != requirement.network {
            return Err(X402Error::UnsupportedNetwork {
                network: payload.network.clone(),
            });
        }

        let auth = &payload.payload.authorization;

        let value: u64 = auth.value.parse().map_err(|_| X402Error::MalformedPayload {
            reason: format!("invalid value: {}", auth.value),
        })?;
        let required = requirement
            .amount_units()
            .ok_or_else(|| X402Error::Internal(format!("bad amount {}", requirement.amount)))?;
        if value < required {
            return Err(X402Error::InsufficientPayment {
                required,
                received: value,
            });
        }

        // EVM addresses are case-insensitive (checksum casing is optional).
        if !auth.to.eq_ignore_ascii_case(&requirement.pay_to) {
            return Err(X402Error::WrongRecipient {
                expected: requirement.pay_to.clone(),
                actual: auth.to.clone(),
            });
        }

        let now = now_unix();

        let valid_after: u64 = auth.valid_after.parse().unwrap_or(0);
        if now < valid_after {
            return Err(X402Error::PaymentNotYetValid { valid_after });
        }

        let valid_before: u64 = auth.valid_before.parse().unwrap_or(u64::MAX);
        if now > valid_before {
            return Err(X402Error::PaymentExpired {
                expired_at: valid_before,
            });
        }

        Ok(valid_before)
    }

    /// Claim a nonce until `valid_before`, failing if it is already held.
    ///
    /// Past the prune threshold, nonces whose authorization has expired are
    /// dropped. A proof with such a nonce fails validation anyway, so only
    /// nonces that could still be replayed are kept.
    async fn reserve_nonce(&self, nonce: &str, valid_before: u64) -> X402Result<()> {
        let mut nonces = self.used_nonces.write().await;

        if nonces.contains_key(nonce) {
            return Err(X402Error::NonceReused {
                nonce: nonce.to_string(),
            });
        }

        if nonces.len() >= NONCE_PRUNE_THRESHOLD {
            let now = now_unix();
            let before = nonces.len();
            nonces.retain(|_, expires| *expires >= now);
            debug!(
                evicted = before - nonces.len(),
                tracked = nonces.len(),
                "Pruned expired nonces"
            );
        }

        nonces.insert(nonce.to_string(), valid_before);
        Ok(())
    }

    async fn release_nonce(&self, nonce: &str) {
        self.used_nonces.write().await.remove(nonce);
    }

    /// Record a payment accepted through the confirmation handshake.
    ///
    /// Nothing is verified here: the confirmation itself is the authorization.
    pub async fn record_confirmed(
        &self,
        requirement: &PaymentRequirement,
        confirmation_id: &str,
        payer: Option<String>,
    ) -> PaymentReceipt {
        let receipt = PaymentReceipt::confirmed(requirement, confirmation_id, payer.clone());

        self.record(PaymentRecord {
            timestamp: now_unix(),
            resource: requirement.resource.clone(),
            payer,
            amount: requirement.amount_units().unwrap_or_default(),
            network: requirement.network.clone(),
            tx_hash: None,
            method: PaymentMethod::Confirmation,
        })
        .await;

        info!(
            resource = %requirement.resource,
            confirmation_id = %confirmation_id,
            "Payment accepted by confirmation"
        );

        receipt
    }

    async fn record(&self, record: PaymentRecord) {
        self.ledger.write().await.push(record);
    }

    /// The most recent payments, oldest first. At most [`MAX_RECENT_PAYMENTS`].
    pub async fn recent_payments(&self) -> Vec<PaymentRecord> {
        self.ledger.read().await.recent.iter().cloned().collect()
    }

    /// Get total volume accepted, in atomic units.
    pub async fn total_volume(&self) -> u64 {
        self.ledger.read().await.total_volume
    }

    /// Get x402 status summary.
    pub async fn status(&self) -> X402Status {
        let ledger = self.ledger.read().await;

        X402Status {
            enabled: self.is_enabled(),
            network: self.config.network.clone(),
            pay_to: self.config.pay_to.clone(),
            facilitator_url: self.config.facilitator_url.clone(),
            total_payments: ledger.total_payments(),
            proof_payments: ledger.proof_payments,
            confirmed_payments: ledger.confirmed_payments,
            total_volume: ledger.total_volume,
        }
    }
}

impl std::fmt::Debug for PaymentGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentGate")
            .field("config", &self.config)
            .field("verifier", &self.verifier.is_some())
            .finish()
    }
}

/// x402 status summary for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct X402Status {
    pub enabled: bool,
    pub network: String,
    pub pay_to: String,
    pub facilitator_url: String,
    pub total_payments: usize,
    pub proof_payments: usize,
    pub confirmed_payments: usize,
    pub total_volume: u64,
}
