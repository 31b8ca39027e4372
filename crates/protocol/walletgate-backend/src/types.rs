//! Wallet backend data types.
//!
//! Backends differ in how much they return, so every record keeps the fields
//! the gateway understands and carries the rest through untouched in `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result of an existence probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletExistence {
    /// The backend knows the wallet.
    Exists,
    /// The backend answered 404.
    Missing,
    /// The backend could not be asked.
    Unknown,
}

impl WalletExistence {
    /// Collapse to the lenient boolean: only a confirmed wallet exists.
    pub fn exists(self) -> bool {
        matches!(self, Self::Exists)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exists => "exists",
            Self::Missing => "missing",
            Self::Unknown => "unknown",
        }
    }
}

/// Wallet details as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    pub address: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A transfer to submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendTransaction {
    pub from: String,
    pub to: String,
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

/// A transaction as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    #[serde(default)]
    pub from: String,

    #[serde(default)]
    pub to: String,

    #[serde(default)]
    pub amount: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An analytics datapoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsRecord {
    pub metric: String,
    pub timeframe: String,
    #[serde(default)]
    pub value: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `GET /wallets/{address}/balance` body.
#[derive(Debug, Deserialize)]
pub(crate) struct BalanceResponse {
    pub balance: Value,
}

impl BalanceResponse {
    /// Balances come back as strings from most backends and as numbers from some.
    pub fn into_string(self) -> String {
        match self.balance {
            Value::String(s) => s,
            other => other.to_string(),
        }
    }
}

/// `GET /wallets/{address}/transactions` body: either a bare list or
/// `{ "transactions": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum HistoryResponse {
    List(Vec<TransactionRecord>),
    Wrapped { transactions: Vec<TransactionRecord> },
}

impl HistoryResponse {
    pub fn into_vec(self) -> Vec<TransactionRecord> {
        match self {
            Self::List(v) | Self::Wrapped { transactions: v } => v,
        }
    }
}
