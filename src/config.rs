//! Centralized configuration, loaded from environment variables (and CLI
//! flags where `clap`'s `env` attribute overlays them). Mirrors the shape of
//! `config.py` / `get_chain_config` in the system this crate replaces:
//! a single source of truth for RPC endpoints, the active chain, and the
//! scanner's genesis block.

use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ethers::types::Address;

/// Aave V3 was deployed to Ethereum mainnet at this block; used as the
/// scanner's default starting point when the canonical CSV is empty.
pub const DEFAULT_GENESIS_BLOCK: u64 = 16_000_000;

/// Mainnet chain id. `ProviderPool` rejects any endpoint reporting a
/// different id.
pub const MAINNET_CHAIN_ID: u64 = 1;

pub const DEFAULT_AAVE_V3_POOL: &str = "0x87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2";
pub const DEFAULT_AAVE_V3_ORACLE: &str = "0x54586bE62E3c3580375aE3723C145253060Ca0C2";
pub const DEFAULT_AAVE_V3_CREATION_BLOCK: u64 = 16_291_126;
pub const DEFAULT_WETH_ADDRESS: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "aave-v3-liquidation-indexer",
    about = "Resumable Aave V3 LiquidationCall indexer with historical USD price enrichment"
)]
pub struct Args {
    /// Comma-separated list of Ethereum JSON-RPC HTTP endpoints.
    #[arg(long, env = "RPC_URLS", value_delimiter = ',', required = true)]
    pub rpc_urls: Vec<String>,

    /// Must be "ethereum" — this crate is mainnet-only.
    #[arg(long, env = "ACTIVE_CHAIN", default_value = "ethereum")]
    pub active_chain: String,

    /// Overrides the block the scanner resumes from when the CSV is empty.
    #[arg(long, env = "SCANNER_GENESIS_BLOCK", default_value_t = DEFAULT_GENESIS_BLOCK)]
    pub genesis_block: u64,

    /// Skip the immediate initial scan pass at startup (serve mode only).
    #[arg(long, env = "SKIP_INITIAL_SCAN", default_value_t = false)]
    pub skip_initial_scan: bool,

    /// Disables the scheduler and daily ETH dataset builder entirely; used
    /// by tests that only want to exercise a single scan pass.
    #[arg(long, env = "DISABLE_BACKGROUND_SERVICES", default_value_t = false)]
    pub disable_background_services: bool,

    /// Scheduler interval, in seconds, between scan passes in serve mode.
    #[arg(long, env = "SCHEDULER_INTERVAL_SECS", default_value_t = 60)]
    pub scheduler_interval_secs: u64,

    /// Root directory for the canonical CSV and status files.
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    pub data_dir: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the scanner once, up to an optional upper bound block.
    Scan {
        /// Upper bound block, or the literal "latest".
        #[arg(long, default_value = "latest")]
        to_block: String,
    },
    /// Run a validation-and-gap-fill pass: backfills missing prices and
    /// catches up to the chain tip.
    Validate,
    /// Run the long-lived process: initial scan, then the periodic
    /// scheduler and the daily ETH dataset builder.
    Serve,
}

/// Resolved, validated runtime configuration. Constructing this is the
/// single point where a bad environment turns into a fatal, non-zero-exit
/// failure (spec.md §7).
#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_urls: Vec<String>,
    pub chain_id: u64,
    pub genesis_block: u64,
    pub skip_initial_scan: bool,
    pub disable_background_services: bool,
    pub scheduler_interval_secs: u64,
    pub data_dir: String,
    pub pool_address: Address,
    pub oracle_address: Address,
    pub weth_address: Address,
    pub pool_creation_block: u64,
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Self> {
        if args.active_chain.trim().to_lowercase() != "ethereum" {
            bail!(
                "unsupported active chain '{}': this build only supports 'ethereum'",
                args.active_chain
            );
        }

        let rpc_urls: Vec<String> = args
            .rpc_urls
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if rpc_urls.is_empty() {
            bail!("no RPC providers configured (set RPC_URLS)");
        }

        let pool_address = Address::from_str(DEFAULT_AAVE_V3_POOL)
            .context("invalid hard-coded Aave V3 pool address")?;
        let oracle_address = Address::from_str(DEFAULT_AAVE_V3_ORACLE)
            .context("invalid hard-coded Aave V3 oracle address")?;
        let weth_address = Address::from_str(DEFAULT_WETH_ADDRESS)
            .context("invalid hard-coded WETH address")?;

        Ok(Config {
            rpc_urls,
            chain_id: MAINNET_CHAIN_ID,
            genesis_block: args.genesis_block,
            skip_initial_scan: args.skip_initial_scan,
            disable_background_services: args.disable_background_services,
            scheduler_interval_secs: args.scheduler_interval_secs,
            data_dir: args.data_dir.clone(),
            pool_address,
            oracle_address,
            weth_address,
            pool_creation_block: DEFAULT_AAVE_V3_CREATION_BLOCK,
        })
    }

    pub fn liquidations_csv_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.data_dir).join("liquidations_master.csv")
    }

    pub fn scan_status_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.data_dir).join("scan_status.json")
    }

    pub fn eth_daily_csv_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.data_dir).join("eth_daily_prices.csv")
    }

    pub fn eth_daily_status_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.data_dir).join("eth_daily_status.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            rpc_urls: vec!["https://rpc.example/1".to_string()],
            active_chain: "ethereum".to_string(),
            genesis_block: DEFAULT_GENESIS_BLOCK,
            skip_initial_scan: false,
            disable_background_services: false,
            scheduler_interval_secs: 60,
            data_dir: "data".to_string(),
            command: Command::Serve,
        }
    }

    #[test]
    fn rejects_non_ethereum_chain() {
        let mut args = base_args();
        args.active_chain = "polygon".to_string();
        assert!(Config::from_args(&args).is_err());
    }

    #[test]
    fn rejects_empty_provider_list() {
        let mut args = base_args();
        args.rpc_urls = vec![];
        assert!(Config::from_args(&args).is_err());
    }

    #[test]
    fn accepts_valid_config() {
        let args = base_args();
        let cfg = Config::from_args(&args).expect("valid config");
        assert_eq!(cfg.chain_id, MAINNET_CHAIN_ID);
        assert_eq!(cfg.genesis_block, DEFAULT_GENESIS_BLOCK);
    }
}
