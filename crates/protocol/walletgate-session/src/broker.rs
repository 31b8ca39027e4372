//! Confirmation broker.
//!
//! Tracks the payment confirmations a session is waiting on. Each
//! confirmation moves from pending to exactly one of confirmed, cancelled or
//! timed out. The first resolution wins; later confirm/cancel messages for
//! the same id, and messages for ids that never existed, are ignored.
//!
//! The broker is owned by a single session actor and is never shared, so the
//! pending table is a plain map. Each pending entry owns its timer key; early
//! resolution removes the timer with it.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use futures::StreamExt;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::time::{delay_queue, DelayQueue};
use tracing::{debug, info, warn};
use walletgate_types::{now_rfc3339, CONFIRMATION_ID_LEN};
use walletgate_x402::PaymentRequirement;

use crate::protocol::ServerMessage;

/// How a confirmation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Confirmed,
    Cancelled,
    TimedOut,
}

impl ConfirmationOutcome {
    pub fn accepted(self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

impl fmt::Display for ConfirmationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::TimedOut => "timed out",
        })
    }
}

/// What the caller is being asked to pay for.
#[derive(Debug, Clone)]
pub struct ConfirmationRequest {
    pub tool: String,
    pub call_id: Option<Value>,
    pub requirements: Vec<PaymentRequirement>,
    /// Why an attached proof was refused, if any.
    pub reason: Option<String>,
}

/// Handle returned by [`ConfirmationBroker::request_confirmation`].
#[derive(Debug)]
pub struct PendingConfirmation {
    pub id: String,
    /// Fires once with the outcome. Errors if the broker is dropped first.
    pub outcome: oneshot::Receiver<ConfirmationOutcome>,
}

struct Pending {
    created_at: Instant,
    resolver: oneshot::Sender<ConfirmationOutcome>,
    timer: delay_queue::Key,
}

/// Per-session table of pending confirmations.
pub struct ConfirmationBroker {
    pending: HashMap<String, Pending>,
    timers: DelayQueue<String>,
    timeout: Duration,
    outbox: mpsc::UnboundedSender<ServerMessage>,
}

impl ConfirmationBroker {
    /// `payment_required` events go to `outbox`.
    pub fn new(timeout: Duration, outbox: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            pending: HashMap::new(),
            timers: DelayQueue::new(),
            timeout,
            outbox,
        }
    }

    /// Open a confirmation: store its resolver, announce it to the session
    /// and arm its timeout.
    pub fn request_confirmation(&mut self, request: ConfirmationRequest) -> PendingConfirmation {
        let id = self.fresh_id();
        let (resolver, outcome) = oneshot::channel();
        let timer = self.timers.insert(id.clone(), self.timeout);

        self.pending.insert(
            id.clone(),
            Pending {
                created_at: Instant::now(),
                resolver,
                timer,
            },
        );

        info!(
            confirmation_id = %id,
            tool = %request.tool,
            pending = self.pending.len(),
            "Awaiting payment confirmation"
        );

        let event = ServerMessage::PaymentRequired {
            confirmation_id: id.clone(),
            requirements: request.requirements,
            timestamp: now_rfc3339(),
            tool: request.tool,
            id: request.call_id,
            reason: request.reason,
        };
        if self.outbox.send(event).is_err() {
            debug!(confirmation_id = %id, "Session outbox closed");
        }

        PendingConfirmation { id, outcome }
    }

    /// Resolve a pending confirmation. Returns false (and does nothing) if the
    /// id is unknown or already resolved.
    pub fn resolve(&mut self, id: &str, accepted: bool) -> bool {
        let Some(pending) = self.pending.remove(id) else {
            debug!(confirmation_id = %id, "Ignoring resolution for unknown confirmation");
            return false;
        };

        self.timers.remove(&pending.timer);

        let outcome = if accepted {
            ConfirmationOutcome::Confirmed
        } else {
            ConfirmationOutcome::Cancelled
        };
        info!(
            confirmation_id = %id,
            outcome = %outcome,
            waited_ms = pending.created_at.elapsed().as_millis() as u64,
            "Confirmation resolved"
        );
        let _ = pending.resolver.send(outcome);
        true
    }

    /// Wait for the next confirmation to time out, resolve it, and return its id.
    ///
    /// Returns `None` immediately when nothing is pending.
    pub async fn next_timeout(&mut self) -> Option<String> {
        loop {
            let expired = self.timers.next().await?;
            let id = expired.into_inner();
            if let Some(pending) = self.pending.remove(&id) {
                warn!(confirmation_id = %id, "Payment confirmation timed out");
                let _ = pending.resolver.send(ConfirmationOutcome::TimedOut);
                return Some(id);
            }
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    /// Armed timers. Always equal to the pending count.
    pub fn armed_timers(&self) -> usize {
        self.timers.len()
    }

    fn fresh_id(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let id: String = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(CONFIRMATION_ID_LEN)
                .map(char::from)
                .collect();
            if !self.pending.contains_key(&id) {
                return id;
            }
        }
    }
}

impl Drop for ConfirmationBroker {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            debug!(
                abandoned = self.pending.len(),
                "Session closed with pending confirmations"
            );
        }
    }
}
