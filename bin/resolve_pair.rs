//! # Resolve Pair
//!
//! Resolves one token pair into a `PairFactoryContext` and prints it as JSON.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin resolve_pair -- \
//!     --from 0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48 \
//!     --to 0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2 \
//!     --owner 0xB1E6079212888f0bE0cf55874B2EB9d7a5e02cD9 \
//!     --chain-id mainnet
//! ```
//!
//! Settings come from `Config.toml` (or `--config`) plus `PAIR_*` environment variables.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use uniswap_pair_sdk::{ChainId, PairOptions, Settings, UniswapPair};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Token being sold
    #[arg(long)]
    from: String,

    /// Token being bought
    #[arg(long)]
    to: String,

    /// Address that will own the trade
    #[arg(long)]
    owner: String,

    /// Chain name ("goerli") or numeric id ("5")
    #[arg(long)]
    chain_id: Option<String>,

    /// JSON-RPC endpoint; used alone, the chain id is read from the node
    #[arg(long)]
    provider_url: Option<String>,

    /// Settings file, instead of ./Config.toml
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Names map onto the supported set; bare numbers pass through so the SDK can
/// reject unsupported ids itself.
fn parse_chain_id(raw: &str) -> Result<u64> {
    if let Ok(id) = raw.trim().parse::<u64>() {
        return Ok(id);
    }
    let chain: ChainId = raw.parse()?;
    Ok(chain.id())
}

#[cfg(feature = "observability")]
fn install_metrics_exporter(settings: &Settings) -> Result<()> {
    if !settings.metrics.enabled {
        return Ok(());
    }
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], settings.metrics.port))
        .install()
        .context("installing prometheus exporter")?;
    uniswap_pair_sdk::metrics::describe_metrics();
    info!("Prometheus exporter listening on port {}", settings.metrics.port);
    Ok(())
}

#[cfg(not(feature = "observability"))]
fn install_metrics_exporter(settings: &Settings) -> Result<()> {
    if settings.metrics.enabled {
        log::warn!("metrics.enabled is set but the observability feature is off");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => Settings::from_path(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::new().context("loading settings")?,
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.log.level.as_str()),
    )
    .init();

    install_metrics_exporter(&settings)?;

    let mut options = PairOptions::new()
        .from_token(args.from)
        .to_token(args.to)
        .owner(args.owner);
    if let Some(raw) = args.chain_id.as_deref() {
        options = options.chain_id(parse_chain_id(raw)?);
    }
    if let Some(url) = args.provider_url {
        options = options.provider_url(url);
    }

    let pair = UniswapPair::from_settings(options, &settings)?;
    info!("Pair input accepted, fetching token metadata");

    let context = pair.create_factory().await?;
    println!("{}", serde_json::to_string_pretty(&context)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chain_id() {
        assert_eq!(parse_chain_id("goerli").unwrap(), 5);
        assert_eq!(parse_chain_id("42").unwrap(), 42);
        assert_eq!(parse_chain_id("137").unwrap(), 137);
        assert!(parse_chain_id("polygon").is_err());
    }

    #[test]
    fn test_args() {
        let args = Args::parse_from([
            "resolve_pair",
            "--from",
            "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
            "--to",
            "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
            "--owner",
            "0xB1E6079212888f0bE0cf55874B2EB9d7a5e02cD9",
            "--provider-url",
            "http://127.0.0.1:8545",
        ]);
        assert!(args.chain_id.is_none());
        assert_eq!(args.provider_url.as_deref(), Some("http://127.0.0.1:8545"));
    }
}
