//! HTTP wallet backend.
//!
//! REST mapping:
//!
//! | Operation | Request |
//! |---|---|
//! | `probe_wallet` / `get_wallet` | `GET /wallets/{address}` |
//! | `get_balance` | `GET /wallets/{address}/balance` |
//! | `send_transaction` | `POST /transactions` |
//! | `get_analytics` | `GET /analytics?metric=..&timeframe=..` |
//! | `get_transaction_history` | `GET /wallets/{address}/transactions?limit=..` |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::backend::WalletBackend;
use crate::error::{BackendError, BackendResult};
use crate::types::{
    AnalyticsRecord, BalanceResponse, HistoryResponse, SendTransaction, TransactionRecord,
    WalletExistence, WalletInfo,
};

/// Default HTTP timeout for backend requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`HttpWalletBackend`].
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    /// Base URL, e.g. `http://localhost:3000/api`.
    pub base_url: String,
    /// Sent as a bearer token when set.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl HttpBackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

/// [`WalletBackend`] over a REST API.
///
/// Holds no per-session state, so a single instance is shared by every session.
#[derive(Clone)]
pub struct HttpWalletBackend {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpWalletBackend {
    /// Create a client. Fails only on an unparseable base URL.
    pub fn new(config: HttpBackendConfig) -> BackendResult<Self> {
        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(config.base_url));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
        })
    }

    /// Get the backend's base URL.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> BackendResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> BackendResult<T> {
        let request = match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[async_trait]
impl WalletBackend for HttpWalletBackend {
    async fn probe_wallet(&self, address: &str) -> WalletExistence {
        let url = match self.endpoint(&["wallets", address]) {
            Ok(url) => url,
            Err(e) => {
                warn!(address = %address, error = %e, "Wallet probe failed");
                return WalletExistence::Unknown;
            }
        };

        match self.execute::<Value>(self.client.get(url)).await {
            // Some backends answer 200 with an explicit flag.
            Ok(body) if body.get("exists") == Some(&Value::Bool(false)) => WalletExistence::Missing,
            Ok(_) => WalletExistence::Exists,
            Err(e) if e.is_not_found() => WalletExistence::Missing,
            Err(e) => {
                warn!(address = %address, error = %e, "Wallet probe failed");
                WalletExistence::Unknown
            }
        }
    }

    async fn get_wallet(&self, address: &str) -> BackendResult<WalletInfo> {
        debug!(address = %address, "Fetching wallet");
        let url = self.endpoint(&["wallets", address])?;
        self.execute(self.client.get(url)).await
    }

    async fn get_balance(&self, address: &str) -> BackendResult<String> {
        debug!(address = %address, "Fetching balance");
        let url = self.endpoint(&["wallets", address, "balance"])?;
        let body: BalanceResponse = self.execute(self.client.get(url)).await?;
        Ok(body.into_string())
    }

    async fn send_transaction(&self, tx: SendTransaction) -> BackendResult<TransactionRecord> {
        debug!(from = %tx.from, to = %tx.to, amount = %tx.amount, "Submitting transaction");
        let url = self.endpoint(&["transactions"])?;
        self.execute(self.client.post(url).json(&tx)).await
    }

    async fn get_analytics(&self, metric: &str, timeframe: &str) -> BackendResult<AnalyticsRecord> {
        debug!(metric = %metric, timeframe = %timeframe, "Fetching analytics");
        let mut url = self.endpoint(&["analytics"])?;
        url.query_pairs_mut()
            .append_pair("metric", metric)
            .append_pair("timeframe", timeframe);
        self.execute(self.client.get(url)).await
    }

    async fn get_transaction_history(
        &self,
        address: &str,
        limit: u64,
    ) -> BackendResult<Vec<TransactionRecord>> {
        debug!(address = %address, limit = limit, "Fetching transaction history");
        let mut url = self.endpoint(&["wallets", address, "transactions"])?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        let body: HistoryResponse = self.execute(self.client.get(url)).await?;
        Ok(body.into_vec())
    }
}

impl std::fmt::Debug for HttpWalletBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpWalletBackend")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> HttpWalletBackend {
        HttpWalletBackend::new(HttpBackendConfig::new(base)).unwrap()
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let b = backend("http://localhost:3000/api/");
        let url = b.endpoint(&["wallets", "0xabc", "balance"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/wallets/0xabc/balance");
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let b = backend("http://localhost:3000");
        let url = b.endpoint(&["wallets", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/wallets/a%2Fb%20c");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpWalletBackend::new(HttpBackendConfig::new("not a url")).unwrap_err();
        assert!(matches!(err, BackendError::InvalidUrl(_)));

        let err = HttpWalletBackend::new(HttpBackendConfig::new("mailto:ops@example.com"))
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidUrl(_)));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut config = HttpBackendConfig::new("http://localhost:3000");
        config.api_key = Some("sk-secret".into());
        let b = HttpWalletBackend::new(config).unwrap();
        let debug = format!("{:?}", b);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("redacted"));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_unknown() {
        // Port 9 (discard) on localhost is reliably closed.
        let b = backend("http://127.0.0.1:9");
        assert_eq!(b.probe_wallet("0xabc").await, WalletExistence::Unknown);
        assert!(!b.check_wallet("0xabc").await);
        assert!(matches!(
            b.get_balance("0xabc").await,
            Err(BackendError::Transport(_))
        ));
    }
}
