use crate::chain::ChainId;
use crate::error::UniswapError;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::Path;
use url::Url;

/// Multicall3 is deployed at the same address on every supported chain.
pub const MULTICALL3_ADDRESS: &str = "0xcA11bde05977b3631167028862bE2a173976CA11";

fn default_false() -> bool {
    false
}
fn default_true() -> bool {
    true
}

// === Per-pair trade settings ===

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UniswapVersion {
    V2,
    V3,
}

/// Static gas price handed through to the trade factory.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GasSettings {
    #[serde(alias = "gas_price_gwei", alias = "gaspricegwei")]
    pub gas_price_gwei: f64,
}

/// Settings carried into the [`PairFactoryContext`](crate::pair::PairFactoryContext).
///
/// `TradeSettings::default()` is the baseline used whenever a caller supplies
/// none. The `config` loader lowercases keys, so every camelCase field also
/// answers to its lowercased and snake_case spellings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TradeSettings {
    /// Accepted slippage as a fraction (0.005 = 0.5%)
    #[serde(default = "default_slippage")]
    pub slippage: f64,
    #[serde(
        default = "default_deadline_minutes",
        alias = "deadline_minutes",
        alias = "deadlineminutes"
    )]
    pub deadline_minutes: u32,
    #[serde(
        default = "default_false",
        alias = "disable_multihops",
        alias = "disablemultihops"
    )]
    pub disable_multihops: bool,
    #[serde(
        default = "default_uniswap_versions",
        alias = "uniswap_versions",
        alias = "uniswapversions"
    )]
    pub uniswap_versions: Vec<UniswapVersion>,
    #[serde(default, alias = "gas_settings", alias = "gassettings")]
    pub gas_settings: Option<GasSettings>,
}

fn default_slippage() -> f64 {
    0.005
}
fn default_deadline_minutes() -> u32 {
    20
}
fn default_uniswap_versions() -> Vec<UniswapVersion> {
    vec![UniswapVersion::V2, UniswapVersion::V3]
}

impl Default for TradeSettings {
    fn default() -> Self {
        Self {
            slippage: default_slippage(),
            deadline_minutes: default_deadline_minutes(),
            disable_multihops: default_false(),
            uniswap_versions: default_uniswap_versions(),
            gas_settings: None,
        }
    }
}

// === SDK settings ===

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Rpc {
    /// Endpoint overrides keyed by chain name (`"goerli"`) or id (`"5"`).
    #[serde(default)]
    pub endpoints: HashMap<String, String>,
}

impl Rpc {
    /// Parses the configured overrides. Unknown chains and malformed urls are
    /// rejected rather than silently ignored.
    pub fn endpoint_overrides(&self) -> Result<HashMap<ChainId, Url>, UniswapError> {
        let mut overrides = HashMap::with_capacity(self.endpoints.len());
        for (chain, raw_url) in &self.endpoints {
            let chain: ChainId = chain.parse().map_err(|e| {
                UniswapError::InvalidConfiguration(format!("rpc.endpoints key `{}`: {}", chain, e))
            })?;
            let url = Url::parse(raw_url.trim()).map_err(|reason| UniswapError::ProviderUrlInvalid {
                url: raw_url.clone(),
                reason,
            })?;
            overrides.insert(chain, url);
        }
        Ok(overrides)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FetchStrategy {
    /// One Multicall3 `aggregate3` call per batch
    #[default]
    Multicall,
    /// Independent `eth_call`s, issued concurrently
    Individual,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokenFetch {
    #[serde(default)]
    pub strategy: FetchStrategy,
    #[serde(default = "default_multicall_address")]
    pub multicall_address: String,
    #[serde(default = "default_multicall_batch_size")]
    pub multicall_batch_size: usize,
    /// Serve well-known tokens from the static registry without a call
    #[serde(default = "default_true")]
    pub use_registry: bool,
}

fn default_multicall_address() -> String {
    MULTICALL3_ADDRESS.to_string()
}
fn default_multicall_batch_size() -> usize {
    150
}

impl Default for TokenFetch {
    fn default() -> Self {
        Self {
            strategy: FetchStrategy::default(),
            multicall_address: default_multicall_address(),
            multicall_batch_size: default_multicall_batch_size(),
            use_registry: default_true(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Metrics {
    #[serde(default = "default_false")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_metrics_port() -> u16 {
    9000
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub rpc: Rpc,
    #[serde(default)]
    pub tokens: TokenFetch,
    #[serde(default)]
    pub trade: TradeSettings,
    #[serde(default)]
    pub log: LogSettings,
    #[serde(default)]
    pub metrics: Metrics,
}

impl Settings {
    /// Loads `Config.toml` from the working directory if present, then applies
    /// `PAIR_*` environment overrides.
    pub fn new() -> Result<Self, ConfigError> {
        Self::build(File::with_name("Config").required(false))
    }

    /// Loads settings from an explicit file; the file must exist.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        Self::build(File::from(path).required(true))
    }

    fn build(file: File<config::FileSourceFile, config::FileFormat>) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("PAIR")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let mut settings: Self = s.try_deserialize()?;

        // A single endpoint for every chain, handy for local nodes and forks
        if let Ok(raw_url) = env::var("PAIR_RPC_URL") {
            let trimmed = raw_url.trim();
            if !trimmed.is_empty() {
                apply_global_endpoint(&mut settings, trimmed);
            }
        }

        Ok(settings)
    }
}

fn apply_global_endpoint(settings: &mut Settings, url: &str) {
    for chain in ChainId::variants() {
        settings
            .rpc
            .endpoints
            .insert(chain.name().to_string(), url.to_string());
    }
}
