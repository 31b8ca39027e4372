//! The wallet backend seam.

use async_trait::async_trait;
use tracing::warn;

use crate::error::BackendResult;
use crate::types::{AnalyticsRecord, SendTransaction, TransactionRecord, WalletExistence, WalletInfo};

/// Operations the gateway forwards to the wallet backend.
///
/// Every method fails with a [`BackendError`](crate::BackendError) when the
/// backend answers non-success, except [`check_wallet`](Self::check_wallet).
#[async_trait]
pub trait WalletBackend: Send + Sync {
    /// Ask whether a wallet exists, distinguishing "no" from "could not tell".
    async fn probe_wallet(&self, address: &str) -> WalletExistence;

    /// Whether a wallet exists. Any backend failure reads as `false`.
    async fn check_wallet(&self, address: &str) -> bool {
        match self.probe_wallet(address).await {
            WalletExistence::Unknown => {
                warn!(address = %address, "Wallet existence unknown, reporting missing");
                false
            }
            other => other.exists(),
        }
    }

    /// Wallet details.
    async fn get_wallet(&self, address: &str) -> BackendResult<WalletInfo>;

    /// Wallet balance, as the backend formats it.
    async fn get_balance(&self, address: &str) -> BackendResult<String>;

    /// Submit a transfer.
    async fn send_transaction(&self, tx: SendTransaction) -> BackendResult<TransactionRecord>;

    /// Fetch one analytics metric over a timeframe.
    async fn get_analytics(&self, metric: &str, timeframe: &str) -> BackendResult<AnalyticsRecord>;

    /// Most recent transactions for a wallet, newest first, at most `limit`.
    async fn get_transaction_history(
        &self,
        address: &str,
        limit: u64,
    ) -> BackendResult<Vec<TransactionRecord>>;
}
