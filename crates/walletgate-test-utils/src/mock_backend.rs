//! Mock implementation of the `WalletBackend` trait for testing.
//!
//! Keeps wallets, balances and submitted transactions in memory and counts
//! every call per operation, so tests can assert that a handler ran (or did
//! not run) exactly as often as expected.

use async_trait::async_trait;
use serde_json::{json, Map};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use walletgate_backend::{
    AnalyticsRecord, BackendError, BackendResult, SendTransaction, TransactionRecord,
    WalletBackend, WalletExistence, WalletInfo,
};

struct MockBackendInner {
    /// Known wallets: address -> balance.
    wallets: HashMap<String, String>,
    /// Submitted transactions, oldest first.
    transactions: Vec<TransactionRecord>,
    /// Calls per operation name.
    calls: HashMap<&'static str, usize>,
    /// When set, every operation fails with this error.
    failure: Option<BackendError>,
    /// Artificial latency before every operation.
    latency: Option<Duration>,
    /// Auto-incrementing transaction counter.
    tx_counter: u64,
}

/// A mock implementation of the `WalletBackend` trait for testing.
///
/// Uses `Arc<RwLock<...>>` internally, so it is cheap to clone and
/// all clones share the same state.
#[derive(Clone)]
pub struct MockWalletBackend {
    inner: Arc<RwLock<MockBackendInner>>,
}

impl Default for MockWalletBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockWalletBackend {
    /// Create an empty backend that knows no wallets.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MockBackendInner {
                wallets: HashMap::new(),
                transactions: Vec::new(),
                calls: HashMap::new(),
                failure: None,
                latency: None,
                tx_counter: 0,
            })),
        }
    }

    /// Register a wallet with a balance.
    pub fn with_wallet(self, address: &str, balance: &str) -> Self {
        self.inner
            .write()
            .unwrap()
            .wallets
            .insert(address.to_string(), balance.to_string());
        self
    }

    /// Configure the mock to fail all operations with an HTTP 500 carrying `body`.
    pub fn with_failure(self, body: &str) -> Self {
        self.set_failure(Some(BackendError::Http {
            status: 500,
            body: body.to_string(),
        }));
        self
    }

    /// Delay every operation.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.inner.write().unwrap().latency = Some(latency);
        self
    }

    /// Set the failure mode at runtime.
    pub fn set_failure(&self, failure: Option<BackendError>) {
        self.inner.write().unwrap().failure = failure;
    }

    // =========================================================================
    // Assertion Helpers
    // =========================================================================

    /// Number of calls to one operation (e.g. `"send_transaction"`).
    pub fn calls(&self, operation: &str) -> usize {
        self.inner
            .read()
            .unwrap()
            .calls
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    /// Number of calls across all operations.
    pub fn total_calls(&self) -> usize {
        self.inner.read().unwrap().calls.values().sum()
    }

    /// Transactions submitted so far.
    pub fn sent_transactions(&self) -> Vec<TransactionRecord> {
        self.inner.read().unwrap().transactions.clone()
    }

    /// Count the call, wait out any latency, then surface a configured failure.
    async fn enter(&self, operation: &'static str) -> BackendResult<()> {
        let latency = {
            let mut inner = self.inner.write().unwrap();
            *inner.calls.entry(operation).or_insert(0) += 1;
            inner.latency
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match &self.inner.read().unwrap().failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn not_found(address: &str) -> BackendError {
        BackendError::Http {
            status: 404,
            body: format!("wallet {} not found", address),
        }
    }
}

#[async_trait]
impl WalletBackend for MockWalletBackend {
    async fn probe_wallet(&self, address: &str) -> WalletExistence {
        if self.enter("probe_wallet").await.is_err() {
            return WalletExistence::Unknown;
        }
        if self.inner.read().unwrap().wallets.contains_key(address) {
            WalletExistence::Exists
        } else {
            WalletExistence::Missing
        }
    }

    async fn get_wallet(&self, address: &str) -> BackendResult<WalletInfo> {
        self.enter("get_wallet").await?;
        let inner = self.inner.read().unwrap();
        let balance = inner
            .wallets
            .get(address)
            .ok_or_else(|| Self::not_found(address))?;
        Ok(WalletInfo {
            address: address.to_string(),
            balance: Some(balance.clone()),
            created_at: None,
            extra: Map::new(),
        })
    }

    async fn get_balance(&self, address: &str) -> BackendResult<String> {
        self.enter("get_balance").await?;
        self.inner
            .read()
            .unwrap()
            .wallets
            .get(address)
            .cloned()
            .ok_or_else(|| Self::not_found(address))
    }

    async fn send_transaction(&self, tx: SendTransaction) -> BackendResult<TransactionRecord> {
        self.enter("send_transaction").await?;
        let mut inner = self.inner.write().unwrap();
        inner.tx_counter += 1;
        let record = TransactionRecord {
            hash: Some(format!("0xmock{:04}", inner.tx_counter)),
            from: tx.from,
            to: tx.to,
            amount: tx.amount,
            memo: tx.memo,
            status: Some("pending".to_string()),
            timestamp: None,
            extra: Map::new(),
        };
        inner.transactions.push(record.clone());
        Ok(record)
    }

    async fn get_analytics(&self, metric: &str, timeframe: &str) -> BackendResult<AnalyticsRecord> {
        self.enter("get_analytics").await?;
        let count = self.inner.read().unwrap().transactions.len();
        Ok(AnalyticsRecord {
            metric: metric.to_string(),
            timeframe: timeframe.to_string(),
            value: json!(count),
            extra: Map::new(),
        })
    }

    async fn get_transaction_history(
        &self,
        address: &str,
        limit: u64,
    ) -> BackendResult<Vec<TransactionRecord>> {
        self.enter("get_transaction_history").await?;
        let inner = self.inner.read().unwrap();
        Ok(inner
            .transactions
            .iter()
            .rev()
            .filter(|t| t.from == address || t.to == address)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
