//! Gateway configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use walletgate_backend::HttpBackendConfig;
use walletgate_tools::{BuiltinTool, PriceOverrides};
use walletgate_types::{Price, CONFIRMATION_TIMEOUT, FREE_LABEL};
use walletgate_x402::X402Config;

use crate::error::{ServerError, ServerResult};

/// Config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "walletgate.toml";

/// Written by `walletgate init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Walletgate configuration.
# Values of the form ${VAR} are read from the environment.

[server]
listen = "127.0.0.1:8402"
confirmation_timeout_secs = 60

[backend]
base_url = "http://localhost:3000"
# api_key = "${WALLETGATE_BACKEND_KEY}"
timeout_secs = 30

[x402]
# Set to true to accept x402 payment proofs on call_tool.
enabled = false
network = "base-sepolia"
facilitator_url = "https://x402.org/facilitator"
# Payment recipient. Required while any tool is priced.
pay_to = "${WALLETGATE_PAY_TO}"
asset = "0x036CbD53842c5426634e7929541eC2318f3dCF7e"
max_timeout_seconds = 300
auto_settle = true

[pricing]
# Per-tool overrides. "free" removes the price.
# send_transaction = "$0.10"
# get_wallet_info = "free"
"#;

/// Expand environment variables in a string.
/// Supports `${VAR_NAME}` syntax. Unset variables are left as written.
fn expand_env_vars(input: &str) -> ServerResult<String> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .map_err(|e| ServerError::config(format!("env pattern: {}", e)))?;
    Ok(re
        .replace_all(input, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
        })
        .to_string())
}

/// Gateway configuration loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener and session settings.
    pub server: ServerSection,
    /// Wallet backend settings.
    pub backend: BackendSection,
    /// x402 payment settings.
    pub x402: X402Config,
    /// Per-tool price overrides, keyed by tool name.
    pub pricing: BTreeMap<String, String>,
}

impl GatewayConfig {
    /// Load configuration from a file. A missing file yields the defaults.
    /// Environment variables in `${VAR}` format are expanded in URLs and secrets.
    pub fn load(path: &Path) -> ServerResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> ServerResult<Self> {
        let mut config: Self = toml::from_str(contents)?;

        config.backend.base_url = expand_env_vars(&config.backend.base_url)?;
        if let Some(key) = config.backend.api_key.take() {
            config.backend.api_key = Some(expand_env_vars(&key)?);
        }
        config.x402.facilitator_url = expand_env_vars(&config.x402.facilitator_url)?;
        config.x402.pay_to = expand_env_vars(&config.x402.pay_to)?;

        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> ServerResult<()> {
        if self.server.confirmation_timeout_secs == 0 {
            return Err(ServerError::config(
                "server.confirmation_timeout_secs must be positive",
            ));
        }
        let overrides = self.price_overrides()?;
        let pay_to_unset = self.x402.pay_to.is_empty() || self.x402.pay_to.contains("${");
        if pay_to_unset && self.x402.enabled {
            return Err(ServerError::config(
                "x402.pay_to must be set when x402 is enabled",
            ));
        }
        if pay_to_unset {
            if let Some(tool) = first_priced_tool(&overrides) {
                return Err(ServerError::config(format!(
                    "x402.pay_to must be set while any tool is priced ({} is)",
                    tool.name()
                )));
            }
        }
        Ok(())
    }

    /// Resolve `[pricing]` into registry overrides.
    pub fn price_overrides(&self) -> ServerResult<PriceOverrides> {
        let mut overrides = PriceOverrides::new();
        for (tool, value) in &self.pricing {
            if BuiltinTool::from_name(tool).is_none() {
                return Err(ServerError::config(format!(
                    "pricing: unknown tool '{}'",
                    tool
                )));
            }
            let price = if value.trim().eq_ignore_ascii_case(FREE_LABEL) {
                None
            } else {
                let parsed: Price = value
                    .parse()
                    .map_err(|e| ServerError::config(format!("pricing.{}: {}", tool, e)))?;
                Some(parsed)
            };
            overrides.insert(tool.clone(), price);
        }
        Ok(overrides)
    }

    /// Backend client settings.
    pub fn backend_config(&self) -> HttpBackendConfig {
        HttpBackendConfig {
            base_url: self.backend.base_url.clone(),
            api_key: self.backend.api_key.clone(),
            timeout: Duration::from_secs(self.backend.timeout_secs),
        }
    }

    /// How long a paid call waits for `confirm`/`cancel`.
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.server.confirmation_timeout_secs)
    }
}

/// The first built-in tool that still has a price after `overrides`.
fn first_priced_tool(overrides: &PriceOverrides) -> Option<BuiltinTool> {
    BuiltinTool::ALL.into_iter().find(|tool| {
        overrides
            .get(tool.name())
            .copied()
            .unwrap_or_else(|| tool.default_price())
            .is_some()
    })
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Socket address to listen on.
    pub listen: String,
    /// Seconds a paid call waits for confirmation.
    pub confirmation_timeout_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8402".to_string(),
            confirmation_timeout_secs: CONFIRMATION_TIMEOUT.as_secs(),
        }
    }
}

/// `[backend]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSection {
    /// Base URL of the wallet service.
    pub base_url: String,
    /// Bearer token.
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for BackendSection {
    fn default() -> Self {
        let defaults = HttpBackendConfig::default();
        Self {
            base_url: defaults.base_url,
            api_key: None,
            timeout_secs: defaults.timeout.as_secs(),
        }
    }
}

/// Get the default config file path.
pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}
