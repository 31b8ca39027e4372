//! End-to-end session behavior: dispatch, payment confirmation, timeouts.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use walletgate_session::{ServerMessage, SessionActor, SessionConfig, SessionHandle};
use walletgate_test_utils::{
    test_payment_header, test_x402_config, MockVerifier, MockWalletBackend,
};
use walletgate_tools::{
    handler_fn, wallet_registry, InputSchema, PriceOverrides, ToolDescriptor, ToolError,
    ToolRegistry, ValidatedArgs,
};
use walletgate_types::{Price, CONFIRMATION_TIMEOUT};
use walletgate_x402::PaymentGate;

const ALICE: &str = "0xa11ce00000000000000000000000000000000000";
const BOB: &str = "0xb0b0000000000000000000000000000000000000";
const SIGNER: &str = "0x5151515151515151515151515151515151515151";

struct Harness {
    session: SessionHandle,
    backend: MockWalletBackend,
    gate: Arc<PaymentGate>,
    registry: Arc<ToolRegistry>,
}

fn harness_with(backend: MockWalletBackend, verifier: MockVerifier) -> Harness {
    let registry =
        Arc::new(wallet_registry(Arc::new(backend.clone()), &PriceOverrides::new()).unwrap());
    let gate = Arc::new(PaymentGate::with_verifier(
        test_x402_config(),
        Arc::new(verifier),
    ));
    let session = SessionActor::spawn(
        registry.clone(),
        gate.clone(),
        SessionConfig {
            confirmation_timeout: CONFIRMATION_TIMEOUT,
            signer: Some(SIGNER.to_string()),
        },
    );
    Harness {
        session,
        backend,
        gate,
        registry,
    }
}

fn harness() -> Harness {
    harness_with(
        MockWalletBackend::new().with_wallet(ALICE, "10"),
        MockVerifier::accepting(),
    )
}

impl Harness {
    async fn send(&self, frame: Value) {
        self.send_raw(&frame.to_string()).await;
    }

    async fn send_raw(&self, text: &str) {
        self.session.inbound.send(text.to_string()).await.unwrap();
    }

    async fn recv(&mut self) -> ServerMessage {
        tokio::time::timeout(Duration::from_secs(5), self.session.outbox.recv())
            .await
            .expect("no reply within 5s")
            .expect("session closed")
    }

    /// Send `list_tools` and assert it is the very next reply. Proves nothing
    /// else was queued ahead of it.
    async fn assert_quiet(&mut self) {
        self.send(json!({"type": "list_tools"})).await;
        let reply = self.recv().await;
        assert_eq!(reply.kind(), "tools_list", "unexpected reply: {:?}", reply);
    }
}

fn to_json(message: &ServerMessage) -> Value {
    serde_json::to_value(message).unwrap()
}

fn confirmation_id(message: &ServerMessage) -> String {
    match message {
        ServerMessage::PaymentRequired {
            confirmation_id, ..
        } => confirmation_id.clone(),
        other => panic!("expected payment_required, got {:?}", other),
    }
}

// =============================================================================
// Protocol
// =============================================================================

#[tokio::test]
async fn test_unparseable_frame_gets_one_error_and_session_survives() {
    let mut h = harness();

    h.send_raw("{not json").await;
    assert_eq!(
        to_json(&h.recv().await),
        json!({"type": "error", "error": "Failed to parse message"})
    );

    h.assert_quiet().await;
}

#[tokio::test]
async fn test_unrecognized_type_gets_no_reply() {
    let mut h = harness();

    h.send(json!({"type": "subscribe", "channel": "blocks"})).await;
    h.send(json!({"tool": "get_balance"})).await;
    h.assert_quiet().await;
}

#[tokio::test]
async fn test_list_tools_matches_registry() {
    let mut h = harness();

    h.send(json!({"type": "list_tools"})).await;
    let tools = match h.recv().await {
        ServerMessage::ToolsList { tools } => tools,
        other => panic!("unexpected: {:?}", other),
    };

    let listed: HashSet<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    let registered: HashSet<&str> = h.registry.names().collect();
    assert_eq!(listed, registered);

    for tool in &tools {
        let descriptor = h.registry.lookup(&tool.name).unwrap();
        assert_eq!(tool.price == "free", descriptor.price.is_none());
        assert_eq!(tool.input_schema["type"], "object");
    }
}

// =============================================================================
// Free tools and errors
// =============================================================================

#[tokio::test]
async fn test_check_wallet_unknown_address_reports_not_exists() {
    let mut h = harness();

    h.send(json!({"type": "call_tool", "tool": "check_wallet", "args": {"address": BOB}}))
        .await;
    let reply = to_json(&h.recv().await);
    assert_eq!(reply["type"], "tool_result");
    assert_eq!(reply["tool"], "check_wallet");
    assert_eq!(reply["result"]["exists"], false);
    assert!(reply.get("payment").is_none());
}

#[tokio::test]
async fn test_unknown_tool() {
    let mut h = harness();

    h.send(json!({"type": "call_tool", "tool": "drain_wallet", "args": {}, "id": 9}))
        .await;
    let reply = to_json(&h.recv().await);
    assert_eq!(reply["type"], "tool_error");
    assert_eq!(reply["id"], 9);
    assert_eq!(reply["result"]["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_invalid_arguments_reported_per_field() {
    let mut h = harness();

    h.send(json!({
        "type": "call_tool",
        "tool": "get_transaction_history",
        "args": {"limit": 1000}
    }))
    .await;
    let reply = to_json(&h.recv().await);
    assert_eq!(reply["type"], "tool_error");
    assert_eq!(reply["result"]["error"], "INVALID_ARGUMENTS");
    let fields: Vec<&str> = reply["result"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["address", "limit"]);
    // Rejected before the gate: no confirmation opened.
    h.assert_quiet().await;
}

#[tokio::test]
async fn test_backend_failure_is_tool_error_and_session_survives() {
    let mut h = harness();
    h.backend.set_failure(Some(walletgate_backend::BackendError::Http {
        status: 502,
        body: "bad gateway".into(),
    }));

    h.send(json!({"type": "call_tool", "tool": "get_balance", "args": {"address": ALICE}}))
        .await;
    let reply = to_json(&h.recv().await);
    assert_eq!(reply["type"], "tool_error");
    assert_eq!(reply["result"]["error"], "BACKEND_FAILURE");
    assert_eq!(reply["result"]["message"], "backend returned 502: bad gateway");

    h.backend.set_failure(None);
    h.send(json!({"type": "call_tool", "tool": "get_balance", "args": {"address": ALICE}}))
        .await;
    let reply = to_json(&h.recv().await);
    assert_eq!(reply["type"], "tool_result");
    assert_eq!(reply["result"]["balance"], "10");
}

async fn explode(_args: ValidatedArgs) -> Result<Value, ToolError> {
    panic!("handler bug")
}

fn exploding_session() -> SessionHandle {
    let mut registry = ToolRegistry::new();
    registry
        .register(ToolDescriptor::new(
            "explode",
            "Always panics",
            InputSchema::empty(),
            handler_fn(explode),
        ))
        .unwrap();
    registry
        .register(
            ToolDescriptor::new(
                "explode_paid",
                "Panics after payment",
                InputSchema::empty(),
                handler_fn(explode),
            )
            .with_price(Price::from_cents(1)),
        )
        .unwrap();
    let gate = PaymentGate::unverified(test_x402_config());
    SessionActor::spawn(Arc::new(registry), Arc::new(gate), SessionConfig::default())
}

async fn next(session: &mut SessionHandle) -> Value {
    let message = tokio::time::timeout(Duration::from_secs(5), session.outbox.recv())
        .await
        .expect("no reply within 5s")
        .expect("session closed");
    to_json(&message)
}

#[tokio::test]
async fn test_panicking_handler_answers_with_tool_error() {
    let mut session = exploding_session();

    session
        .inbound
        .send(json!({"type": "call_tool", "tool": "explode", "id": 41}).to_string())
        .await
        .unwrap();
    let reply = next(&mut session).await;
    assert_eq!(reply["type"], "tool_error");
    assert_eq!(reply["tool"], "explode");
    assert_eq!(reply["id"], 41);
    assert_eq!(reply["result"]["error"], "INTERNAL_ERROR");

    // Confirmed calls run on their own task too.
    session
        .inbound
        .send(json!({"type": "call_tool", "tool": "explode_paid", "id": "p-1"}).to_string())
        .await
        .unwrap();
    let required = next(&mut session).await;
    assert_eq!(required["type"], "payment_required");
    let id = required["confirmationId"].as_str().unwrap().to_string();

    session
        .inbound
        .send(json!({"type": "confirm", "confirmationId": id}).to_string())
        .await
        .unwrap();
    let reply = next(&mut session).await;
    assert_eq!(reply["type"], "tool_error");
    assert_eq!(reply["tool"], "explode_paid");
    assert_eq!(reply["id"], "p-1");

    session
        .inbound
        .send(json!({"type": "list_tools"}).to_string())
        .await
        .unwrap();
    assert_eq!(next(&mut session).await["type"], "tools_list");
}

// =============================================================================
// Payment confirmation
// =============================================================================

fn send_tx(id: &str) -> Value {
    json!({
        "type": "call_tool",
        "tool": "send_transaction",
        "args": {"from": ALICE, "to": BOB, "amount": "1.5"},
        "id": id
    })
}

#[tokio::test]
async fn test_paid_call_confirmed() {
    let mut h = harness();

    h.send(send_tx("req-1")).await;
    let required = h.recv().await;
    let id = confirmation_id(&required);
    let json = to_json(&required);
    assert_eq!(json["tool"], "send_transaction");
    assert_eq!(json["id"], "req-1");
    assert_eq!(json["requirements"].as_array().unwrap().len(), 1);
    assert_eq!(json["requirements"][0]["amount"], "50000");
    assert_eq!(h.backend.calls("send_transaction"), 0);

    h.send(json!({"type": "confirm", "confirmationId": id})).await;
    let reply = to_json(&h.recv().await);
    assert_eq!(reply["type"], "tool_result");
    assert_eq!(reply["id"], "req-1");
    assert_eq!(reply["result"]["amount"], "1.5");
    assert_eq!(reply["payment"]["confirmationId"], id.as_str());
    assert_eq!(reply["payment"]["payer"], SIGNER);
    assert_eq!(h.backend.calls("send_transaction"), 1);

    let status = h.gate.status().await;
    assert_eq!(status.confirmed_payments, 1);
    assert_eq!(status.total_volume, 50_000);
}

#[tokio::test]
async fn test_paid_call_cancelled_never_runs_handler() {
    let mut h = harness();

    h.send(send_tx("req-2")).await;
    let id = confirmation_id(&h.recv().await);

    h.send(json!({"type": "cancel", "confirmationId": id})).await;
    let reply = to_json(&h.recv().await);
    assert_eq!(reply["type"], "tool_error");
    assert_eq!(reply["id"], "req-2");
    assert_eq!(reply["result"]["error"], "PAYMENT_REJECTED");
    assert!(reply["result"]["message"].as_str().unwrap().contains("cancelled"));

    // A late confirm for the same id changes nothing.
    h.send(json!({"type": "confirm", "confirmationId": id})).await;
    h.assert_quiet().await;
    assert_eq!(h.backend.calls("send_transaction"), 0);
    assert_eq!(h.gate.status().await.total_payments, 0);
}

#[tokio::test]
async fn test_unknown_confirmation_id_is_ignored() {
    let mut h = harness();

    h.send(send_tx("req-3")).await;
    let id = confirmation_id(&h.recv().await);

    h.send(json!({"type": "confirm", "confirmationId": "doesnotexist"})).await;
    h.send(json!({"type": "cancel", "confirmationId": "doesnotexist"})).await;
    h.assert_quiet().await;

    h.send(json!({"type": "confirm", "confirmationId": id})).await;
    assert_eq!(h.recv().await.kind(), "tool_result");
}

#[tokio::test]
async fn test_concurrent_confirmations_are_independent() {
    let mut h = harness();

    h.send(json!({"type": "call_tool", "tool": "get_analytics", "args": {"metric": "volume"}}))
        .await;
    h.send(json!({
        "type": "call_tool",
        "tool": "get_transaction_history",
        "args": {"address": ALICE}
    }))
    .await;

    let mut ids = std::collections::HashMap::new();
    for _ in 0..2 {
        let message = h.recv().await;
        let tool = to_json(&message)["tool"].as_str().unwrap().to_string();
        ids.insert(tool, confirmation_id(&message));
    }
    let analytics = ids["get_analytics"].clone();
    let history = ids["get_transaction_history"].clone();
    assert_ne!(analytics, history);

    // Resolve in the opposite order of arrival.
    h.send(json!({"type": "cancel", "confirmationId": history})).await;
    let reply = to_json(&h.recv().await);
    assert_eq!(reply["tool"], "get_transaction_history");
    assert_eq!(reply["result"]["error"], "PAYMENT_REJECTED");

    h.send(json!({"type": "confirm", "confirmationId": analytics})).await;
    let reply = to_json(&h.recv().await);
    assert_eq!(reply["type"], "tool_result");
    assert_eq!(reply["tool"], "get_analytics");

    assert_eq!(h.backend.calls("get_analytics"), 1);
    assert_eq!(h.backend.calls("get_transaction_history"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_confirmation_times_out_once() {
    let mut h = harness();

    h.send(send_tx("req-4")).await;
    let id = confirmation_id(&h.recv().await);

    tokio::time::advance(CONFIRMATION_TIMEOUT - Duration::from_secs(1)).await;
    tokio::task::yield_now().await;
    assert!(h.session.outbox.try_recv().is_err());

    let reply = tokio::time::timeout(Duration::from_secs(120), h.session.outbox.recv())
        .await
        .unwrap()
        .unwrap();
    let reply = to_json(&reply);
    assert_eq!(reply["type"], "tool_error");
    assert_eq!(reply["result"]["error"], "PAYMENT_REJECTED");
    assert!(reply["result"]["message"].as_str().unwrap().contains("timed out"));

    // No second firing, and a late confirm does nothing.
    tokio::time::advance(CONFIRMATION_TIMEOUT * 2).await;
    h.send(json!({"type": "confirm", "confirmationId": id})).await;
    h.assert_quiet().await;
    assert_eq!(h.backend.calls("send_transaction"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_handler_does_not_block_session() {
    let mut h = harness_with(
        MockWalletBackend::new()
            .with_wallet(ALICE, "10")
            .with_latency(Duration::from_secs(10)),
        MockVerifier::accepting(),
    );

    h.send(json!({"type": "call_tool", "tool": "get_balance", "args": {"address": ALICE}}))
        .await;
    h.send(send_tx("req-5")).await;

    // The paid call's confirmation arrives while the balance lookup is still running.
    let id = confirmation_id(&h.recv().await);
    h.send(json!({"type": "cancel", "confirmationId": id})).await;
    assert_eq!(h.recv().await.kind(), "tool_error");

    let reply = tokio::time::timeout(Duration::from_secs(30), h.session.outbox.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(to_json(&reply)["result"]["balance"], "10");
}

// =============================================================================
// Payment proofs
// =============================================================================

#[tokio::test]
async fn test_valid_proof_runs_without_confirmation() {
    let mut h = harness();

    let mut frame = send_tx("req-6");
    frame["payment"] = json!(test_payment_header(50_000, "0xproof1"));
    h.send(frame).await;

    let reply = to_json(&h.recv().await);
    assert_eq!(reply["type"], "tool_result");
    assert_eq!(reply["payment"]["txHash"], "0xsettled0001");
    assert!(reply["payment"].get("confirmationId").is_none());
    assert_eq!(h.backend.calls("send_transaction"), 1);
}

#[tokio::test]
async fn test_rejected_proof_falls_back_to_confirmation() {
    let mut h = harness_with(
        MockWalletBackend::new().with_wallet(ALICE, "10"),
        MockVerifier::rejecting("invalid_signature"),
    );

    let mut frame = send_tx("req-7");
    frame["payment"] = json!(test_payment_header(50_000, "0xproof2"));
    h.send(frame).await;

    let required = to_json(&h.recv().await);
    assert_eq!(required["type"], "payment_required");
    assert!(required["reason"].as_str().unwrap().contains("invalid_signature"));
    assert_eq!(h.backend.calls("send_transaction"), 0);
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_disconnect_abandons_pending_confirmations() {
    let mut h = harness();

    h.send(send_tx("req-8")).await;
    let _id = confirmation_id(&h.recv().await);

    let Harness {
        session, backend, ..
    } = h;
    let SessionHandle {
        inbound,
        mut outbox,
        task,
    } = session;

    drop(inbound);
    task.await.unwrap();

    assert!(outbox.recv().await.is_none());
    assert_eq!(backend.calls("send_transaction"), 0);
}
