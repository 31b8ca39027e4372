//! Built-in wallet tools.
//!
//! | Tool | Default price |
//! |---|---|
//! | `check_wallet` | free |
//! | `get_wallet_info` | free |
//! | `get_balance` | free |
//! | `send_transaction` | $0.05 |
//! | `get_analytics` | $0.01 |
//! | `get_transaction_history` | $0.02 |

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use walletgate_backend::{SendTransaction, WalletBackend};
use walletgate_types::{Price, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};

use crate::error::{RegistryError, ToolError};
use crate::registry::{ToolDescriptor, ToolHandler, ToolRegistry};
use crate::schema::{InputSchema, ParamSpec, ValidatedArgs};

/// Per-tool price overrides. `None` makes a tool free.
pub type PriceOverrides = HashMap<String, Option<Price>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinTool {
    CheckWallet,
    GetWalletInfo,
    GetBalance,
    SendTransaction,
    GetAnalytics,
    GetTransactionHistory,
}

impl BuiltinTool {
    pub const ALL: [BuiltinTool; 6] = [
        Self::CheckWallet,
        Self::GetWalletInfo,
        Self::GetBalance,
        Self::SendTransaction,
        Self::GetAnalytics,
        Self::GetTransactionHistory,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::CheckWallet => "check_wallet",
            Self::GetWalletInfo => "get_wallet_info",
            Self::GetBalance => "get_balance",
            Self::SendTransaction => "send_transaction",
            Self::GetAnalytics => "get_analytics",
            Self::GetTransactionHistory => "get_transaction_history",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::CheckWallet => "Check whether a wallet exists",
            Self::GetWalletInfo => "Get wallet details",
            Self::GetBalance => "Get a wallet's balance",
            Self::SendTransaction => "Send funds from one wallet to another",
            Self::GetAnalytics => "Get an analytics metric over a timeframe",
            Self::GetTransactionHistory => "List a wallet's recent transactions",
        }
    }

    pub fn default_price(self) -> Option<Price> {
        match self {
            Self::CheckWallet | Self::GetWalletInfo | Self::GetBalance => None,
            Self::SendTransaction => Price::from_cents(5),
            Self::GetAnalytics => Price::from_cents(1),
            Self::GetTransactionHistory => Price::from_cents(2),
        }
    }

    pub fn input_schema(self) -> InputSchema {
        let address = || ParamSpec::string("address", "Wallet address");
        match self {
            Self::CheckWallet | Self::GetWalletInfo | Self::GetBalance => {
                InputSchema::new(vec![address()])
            }
            Self::SendTransaction => InputSchema::new(vec![
                ParamSpec::string("from", "Sending wallet address"),
                ParamSpec::string("to", "Receiving wallet address"),
                ParamSpec::amount("amount", "Amount to send, as a decimal"),
                ParamSpec::string("memo", "Optional note attached to the transfer").optional(),
            ]),
            Self::GetAnalytics => InputSchema::new(vec![
                ParamSpec::string("metric", "Metric name, e.g. volume or active_wallets"),
                ParamSpec::string("timeframe", "Window, e.g. 24h or 7d")
                    .default_value(json!("24h")),
            ]),
            Self::GetTransactionHistory => InputSchema::new(vec![
                address(),
                ParamSpec::integer("limit", "Maximum number of transactions")
                    .range(1, MAX_HISTORY_LIMIT as i64)
                    .default_value(json!(DEFAULT_HISTORY_LIMIT)),
            ]),
        }
    }

    /// Descriptor bound to `backend`, priced from `overrides` or the default.
    pub fn descriptor(
        self,
        backend: Arc<dyn WalletBackend>,
        overrides: &PriceOverrides,
    ) -> ToolDescriptor {
        let price = overrides
            .get(self.name())
            .copied()
            .unwrap_or_else(|| self.default_price());

        ToolDescriptor::new(
            self.name(),
            self.description(),
            self.input_schema(),
            Arc::new(BuiltinHandler {
                tool: self,
                backend,
            }),
        )
        .with_price(price)
    }
}

struct BuiltinHandler {
    tool: BuiltinTool,
    backend: Arc<dyn WalletBackend>,
}

#[async_trait]
impl ToolHandler for BuiltinHandler {
    async fn call(&self, args: ValidatedArgs) -> Result<Value, ToolError> {
        let backend = &self.backend;
        match self.tool {
            BuiltinTool::CheckWallet => {
                let address = args.require_str("address")?;
                let existence = backend.probe_wallet(address).await;
                Ok(json!({
                    "address": address,
                    "exists": existence.exists(),
                    "status": existence.as_str(),
                }))
            }
            BuiltinTool::GetWalletInfo => {
                let info = backend.get_wallet(args.require_str("address")?).await?;
                Ok(serde_json::to_value(info)?)
            }
            BuiltinTool::GetBalance => {
                let address = args.require_str("address")?;
                let balance = backend.get_balance(address).await?;
                Ok(json!({ "address": address, "balance": balance }))
            }
            BuiltinTool::SendTransaction => {
                let tx = SendTransaction {
                    from: args.require_str("from")?.to_string(),
                    to: args.require_str("to")?.to_string(),
                    amount: args.require_str("amount")?.to_string(),
                    memo: args.str("memo").map(str::to_string),
                };
                let record = backend.send_transaction(tx).await?;
                Ok(serde_json::to_value(record)?)
            }
            BuiltinTool::GetAnalytics => {
                let record = backend
                    .get_analytics(args.require_str("metric")?, args.require_str("timeframe")?)
                    .await?;
                Ok(serde_json::to_value(record)?)
            }
            BuiltinTool::GetTransactionHistory => {
                let address = args.require_str("address")?;
                let limit = args.require_u64("limit")?;
                let transactions = backend.get_transaction_history(address, limit).await?;
                Ok(json!({
                    "address": address,
                    "count": transactions.len(),
                    "transactions": transactions,
                }))
            }
        }
    }
}

/// Registry holding all six wallet tools.
pub fn wallet_registry(
    backend: Arc<dyn WalletBackend>,
    overrides: &PriceOverrides,
) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    for tool in BuiltinTool::ALL {
        registry.register(tool.descriptor(backend.clone(), overrides))?;
    }
    Ok(registry)
}
