//! HttpWalletBackend against an in-process axum backend.

use std::net::SocketAddr;

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use walletgate_backend::{
    BackendError, HttpBackendConfig, HttpWalletBackend, SendTransaction, WalletBackend,
    WalletExistence,
};

const KNOWN: &str = "0x1111111111111111111111111111111111111111";

async fn wallet(Path(address): Path<String>) -> Result<Json<Value>, StatusCode> {
    match address.as_str() {
        KNOWN => Ok(Json(json!({"address": KNOWN, "balance": "10.5", "label": "treasury"}))),
        "0xflagged" => Ok(Json(json!({"address": "0xflagged", "exists": false}))),
        "0xbroken" => Err(StatusCode::INTERNAL_SERVER_ERROR),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn balance(Path(address): Path<String>) -> (StatusCode, String) {
    if address == KNOWN {
        (StatusCode::OK, json!({"balance": "10.5"}).to_string())
    } else {
        (StatusCode::NOT_FOUND, "wallet not found".to_string())
    }
}

async fn transactions(headers: HeaderMap, Json(tx): Json<Value>) -> (StatusCode, Json<Value>) {
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer test-key") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "missing key"})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "hash": "0xfeed",
            "from": tx["from"],
            "to": tx["to"],
            "amount": tx["amount"],
            "memo": tx["memo"],
            "status": "pending"
        })),
    )
}

async fn analytics(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    Json(json!({
        "metric": q.get("metric"),
        "timeframe": q.get("timeframe"),
        "value": 1234
    }))
}

async fn history(
    Path(address): Path<String>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Value> {
    let limit: usize = q.get("limit").and_then(|l| l.parse().ok()).unwrap_or(10);
    let txs: Vec<Value> = (0..limit.min(3))
        .map(|i| json!({"hash": format!("0x{i}"), "from": address, "to": "0xdead", "amount": "1"}))
        .collect();
    Json(json!({ "transactions": txs }))
}

async fn spawn_backend() -> SocketAddr {
    let app = Router::new()
        .route("/api/wallets/:address", get(wallet))
        .route("/api/wallets/:address/balance", get(balance))
        .route("/api/wallets/:address/transactions", get(history))
        .route("/api/transactions", post(transactions))
        .route("/api/analytics", get(analytics));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client(addr: SocketAddr) -> HttpWalletBackend {
    let mut config = HttpBackendConfig::new(format!("http://{}/api", addr));
    config.api_key = Some("test-key".to_string());
    HttpWalletBackend::new(config).unwrap()
}

#[tokio::test]
async fn test_probe_wallet_tri_state() {
    let backend = client(spawn_backend().await);

    assert_eq!(backend.probe_wallet(KNOWN).await, WalletExistence::Exists);
    assert_eq!(backend.probe_wallet("0xnobody").await, WalletExistence::Missing);
    assert_eq!(backend.probe_wallet("0xflagged").await, WalletExistence::Missing);
    assert_eq!(backend.probe_wallet("0xbroken").await, WalletExistence::Unknown);
}

#[tokio::test]
async fn test_check_wallet_is_lenient() {
    let backend = client(spawn_backend().await);

    assert!(backend.check_wallet(KNOWN).await);
    assert!(!backend.check_wallet("0xnobody").await);
    // A 500 reads as "does not exist" rather than an error.
    assert!(!backend.check_wallet("0xbroken").await);
}

#[tokio::test]
async fn test_get_wallet_and_balance() {
    let backend = client(spawn_backend().await);

    let info = backend.get_wallet(KNOWN).await.unwrap();
    assert_eq!(info.address, KNOWN);
    assert_eq!(info.extra["label"], "treasury");

    assert_eq!(backend.get_balance(KNOWN).await.unwrap(), "10.5");
}

#[tokio::test]
async fn test_http_failure_message_is_preserved() {
    let backend = client(spawn_backend().await);

    let err = backend.get_balance("0xnobody").await.unwrap_err();
    match err {
        BackendError::Http { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "wallet not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_send_transaction_uses_api_key() {
    let addr = spawn_backend().await;

    let tx = SendTransaction {
        from: KNOWN.to_string(),
        to: "0xdead".to_string(),
        amount: "2.5".to_string(),
        memo: Some("rent".to_string()),
    };

    let record = client(addr).send_transaction(tx.clone()).await.unwrap();
    assert_eq!(record.hash.as_deref(), Some("0xfeed"));
    assert_eq!(record.amount, "2.5");
    assert_eq!(record.memo.as_deref(), Some("rent"));
    assert_eq!(record.status.as_deref(), Some("pending"));

    let anonymous =
        HttpWalletBackend::new(HttpBackendConfig::new(format!("http://{}/api", addr))).unwrap();
    let err = anonymous.send_transaction(tx).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn test_analytics_and_history() {
    let backend = client(spawn_backend().await);

    let record = backend.get_analytics("volume", "24h").await.unwrap();
    assert_eq!(record.metric, "volume");
    assert_eq!(record.timeframe, "24h");
    assert_eq!(record.value, json!(1234));

    let history = backend.get_transaction_history(KNOWN, 2).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].from, KNOWN);
}
