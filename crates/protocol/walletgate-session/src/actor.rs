//! The session actor.
//!
//! One actor per connection. It owns the session's confirmation broker and
//! processes inbound frames one at a time, in arrival order. Work that can
//! take a while (payment verification, handlers, confirmation waits) runs as
//! in-flight futures polled from the same loop, so a `confirm` or
//! `list_tools` is handled while earlier calls are still waiting.
//!
//! Replies are not ordered by request. Callers correlate by tool name,
//! confirmation id, or the optional call `id`.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use walletgate_tools::{ToolDescriptor, ToolRegistry, ValidatedArgs};
use walletgate_types::{ErrorCode, CONFIRMATION_TIMEOUT};
use walletgate_x402::{Authorization, PaymentGate, PaymentReceipt, PaymentRequirement};

use crate::broker::{ConfirmationBroker, ConfirmationOutcome, ConfirmationRequest};
use crate::error::DispatchError;
use crate::protocol::{parse_inbound, CallTool, ClientMessage, Inbound, ServerMessage};

/// Inbound frames buffered per session.
pub const INBOUND_BUFFER: usize = 64;

/// Per-session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a payment confirmation may stay pending.
    pub confirmation_timeout: Duration,
    /// Authenticated identity recorded as payer on confirmed payments.
    pub signer: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout: CONFIRMATION_TIMEOUT,
            signer: None,
        }
    }
}

/// A validated call waiting on payment.
struct PendingCall {
    descriptor: Arc<ToolDescriptor>,
    args: ValidatedArgs,
    call_id: Option<Value>,
    requirements: Vec<PaymentRequirement>,
    reason: Option<String>,
}

/// What an in-flight future reports back to the actor.
enum CallProgress {
    /// Send this reply; the call is done.
    Finished(ServerMessage),
    /// The gate refused; open a confirmation.
    NeedsConfirmation(PendingCall),
    /// A confirmation ended.
    Resolved {
        call: PendingCall,
        confirmation_id: String,
        outcome: Result<ConfirmationOutcome, oneshot::error::RecvError>,
    },
}

/// Handle to a spawned session.
pub struct SessionHandle {
    /// Raw inbound frames.
    pub inbound: mpsc::Sender<String>,
    /// Replies and `payment_required` events.
    pub outbox: mpsc::UnboundedReceiver<ServerMessage>,
    pub task: JoinHandle<()>,
}

pub struct SessionActor {
    registry: Arc<ToolRegistry>,
    gate: Arc<PaymentGate>,
    signer: Option<String>,
    broker: ConfirmationBroker,
    outbox: mpsc::UnboundedSender<ServerMessage>,
    in_flight: FuturesUnordered<BoxFuture<'static, CallProgress>>,
}

impl SessionActor {
    pub fn new(
        registry: Arc<ToolRegistry>,
        gate: Arc<PaymentGate>,
        config: SessionConfig,
        outbox: mpsc::UnboundedSender<ServerMessage>,
    ) -> Self {
        Self {
            registry,
            gate,
            signer: config.signer,
            broker: ConfirmationBroker::new(config.confirmation_timeout, outbox.clone()),
            outbox,
            in_flight: FuturesUnordered::new(),
        }
    }

    /// Spawn an actor on the current runtime.
    pub fn spawn(
        registry: Arc<ToolRegistry>,
        gate: Arc<PaymentGate>,
        config: SessionConfig,
    ) -> SessionHandle {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);
        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
        let actor = Self::new(registry, gate, config, outbox_tx);
        let task = tokio::spawn(actor.run(inbound_rx));
        SessionHandle {
            inbound: inbound_tx,
            outbox: outbox_rx,
            task,
        }
    }

    /// Process frames until the inbound channel closes.
    ///
    /// Confirmations still pending at that point are abandoned. Handlers that
    /// already started run to completion on their own tasks.
    pub async fn run(mut self, mut inbound: mpsc::Receiver<String>) {
        debug!(signer = ?self.signer, "Session started");

        loop {
            tokio::select! {
                frame = inbound.recv() => match frame {
                    Some(text) => self.handle_frame(&text),
                    None => break,
                },
                Some(progress) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    self.on_progress(progress);
                }
                Some(_) = self.broker.next_timeout(), if self.broker.has_pending() => {}
            }
        }

        debug!(
            abandoned = self.broker.pending_count(),
            in_flight = self.in_flight.len(),
            "Session ended"
        );
    }

    fn handle_frame(&mut self, text: &str) {
        match parse_inbound(text) {
            Inbound::Message(message) => self.handle_message(message),
            Inbound::Unrecognized(kind) => {
                warn!(message_type = ?kind, "Ignoring unrecognized message type");
            }
            Inbound::Malformed => {
                warn!(code = %ErrorCode::ProtocolError, "Failed to parse message");
                self.send(ServerMessage::parse_error());
            }
        }
    }

    fn handle_message(&mut self, message: ClientMessage) {
        match message {
            ClientMessage::CallTool(call) => self.handle_call(call),
            ClientMessage::Confirm { confirmation_id } => {
                debug!(confirmation_id = %confirmation_id, "Confirm received");
                self.broker.resolve(&confirmation_id, true);
            }
            ClientMessage::Cancel { confirmation_id } => {
                debug!(confirmation_id = %confirmation_id, "Cancel received");
                self.broker.resolve(&confirmation_id, false);
            }
            ClientMessage::ListTools => {
                self.send(ServerMessage::ToolsList {
                    tools: self.registry.list_tools().collect(),
                });
            }
        }
    }

    /// Look up and validate synchronously; authorize and execute in flight.
    fn handle_call(&mut self, call: CallTool) {
        let CallTool {
            tool,
            args,
            id,
            payment,
        } = call;
        debug!(tool = %tool, id = ?id, "call_tool");

        let descriptor = match self.registry.lookup(&tool) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(tool = %tool, "Unknown tool");
                self.send(DispatchError::from(e).into_message(&tool, id));
                return;
            }
        };

        let args = match descriptor.validate(&args.unwrap_or_default()) {
            Ok(args) => args,
            Err(e) => {
                debug!(tool = %tool, error = %e, "Invalid arguments");
                self.send(DispatchError::from(e).into_message(&tool, id));
                return;
            }
        };

        let gate = self.gate.clone();
        let reply_to = (descriptor.name.clone(), id.clone());
        let task = tokio::spawn(async move {
            let authorization = gate
                .authorize(
                    &descriptor.name,
                    &descriptor.description,
                    descriptor.price,
                    payment.as_deref(),
                )
                .await;

            match authorization {
                Authorization::Free => execute(descriptor, args, id, None).await,
                Authorization::Paid(receipt) => execute(descriptor, args, id, Some(receipt)).await,
                Authorization::Required {
                    requirements,
                    reason,
                } => CallProgress::NeedsConfirmation(PendingCall {
                    descriptor,
                    args,
                    call_id: id,
                    requirements,
                    reason,
                }),
            }
        });

        self.track(task, reply_to);
    }

    fn on_progress(&mut self, progress: CallProgress) {
        match progress {
            CallProgress::Finished(message) => self.send(message),
            CallProgress::NeedsConfirmation(call) => self.await_confirmation(call),
            CallProgress::Resolved {
                call,
                confirmation_id,
                outcome,
            } => match outcome {
                Ok(ConfirmationOutcome::Confirmed) => self.run_confirmed(call, confirmation_id),
                Ok(outcome) => {
                    info!(
                        tool = %call.descriptor.name,
                        confirmation_id = %confirmation_id,
                        outcome = %outcome,
                        "Payment rejected"
                    );
                    let error = DispatchError::PaymentRejected {
                        confirmation_id,
                        outcome,
                    };
                    self.send(error.into_message(&call.descriptor.name, call.call_id));
                }
                // Only the broker drops resolvers, and it lives as long as we do.
                Err(_) => {
                    debug!(confirmation_id = %confirmation_id, "Confirmation abandoned");
                }
            },
        }
    }

    fn await_confirmation(&mut self, call: PendingCall) {
        let pending = self.broker.request_confirmation(ConfirmationRequest {
            tool: call.descriptor.name.clone(),
            call_id: call.call_id.clone(),
            requirements: call.requirements.clone(),
            reason: call.reason.clone(),
        });

        let confirmation_id = pending.id;
        self.in_flight.push(
            pending
                .outcome
                .map(move |outcome| CallProgress::Resolved {
                    call,
                    confirmation_id,
                    outcome,
                })
                .boxed(),
        );
    }

    /// Run a confirmed call. The gate is not consulted again: the confirmation
    /// is the authorization.
    fn run_confirmed(&mut self, call: PendingCall, confirmation_id: String) {
        let gate = self.gate.clone();
        let signer = self.signer.clone();
        let reply_to = (call.descriptor.name.clone(), call.call_id.clone());

        let task = tokio::spawn(async move {
            let receipt = match call.requirements.first() {
                Some(requirement) => Some(
                    gate.record_confirmed(requirement, &confirmation_id, signer)
                        .await,
                ),
                None => None,
            };
            execute(call.descriptor, call.args, call.call_id, receipt).await
        });

        self.track(task, reply_to);
    }

    /// Poll a spawned call from the loop. Dropping the handle does not stop the task.
    ///
    /// A task that panics is answered with a `tool_error` for `(tool, call id)`.
    fn track(&mut self, task: JoinHandle<CallProgress>, reply_to: (String, Option<Value>)) {
        self.in_flight.push(
            task.map(move |joined| match joined {
                Ok(progress) => progress,
                Err(e) => {
                    let (tool, call_id) = reply_to;
                    warn!(tool = %tool, error = %e, "Call task failed");
                    CallProgress::Finished(
                        DispatchError::Internal(e.to_string()).into_message(&tool, call_id),
                    )
                }
            })
            .boxed(),
        );
    }

    fn send(&self, message: ServerMessage) {
        if self.outbox.send(message).is_err() {
            debug!("Session outbox closed, dropping reply");
        }
    }
}

/// Run the handler and build the reply.
async fn execute(
    descriptor: Arc<ToolDescriptor>,
    args: ValidatedArgs,
    call_id: Option<Value>,
    receipt: Option<PaymentReceipt>,
) -> CallProgress {
    let reply = match descriptor.handler.call(args).await {
        Ok(result) => {
            info!(tool = %descriptor.name, paid = receipt.is_some(), "Tool executed");
            ServerMessage::tool_result(&descriptor.name, result, call_id, receipt)
        }
        Err(e) => {
            warn!(tool = %descriptor.name, error = %e, "Tool failed");
            DispatchError::from(e).into_message(&descriptor.name, call_id)
        }
    };
    CallProgress::Finished(reply)
}
