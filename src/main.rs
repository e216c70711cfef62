use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

mod bindings;
mod checkpoint;
mod chunked_log_reader;
mod config;
mod csv_appender;
mod error;
mod price;
mod provider_pool;
mod retry;
mod scanner;
mod scheduler;
mod token_registry;

use config::{Args, Command, Config};
use price::PriceResolver;
use provider_pool::ProviderPool;
use scanner::LiquidationScanner;
use scheduler::{CancellationToken, DailyEthDatasetBuilder, Scheduler};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("aave_v3_liquidation_indexer=info,warn"));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    let args = Args::parse();
    let config = Config::from_args(&args).context("invalid configuration")?;
    info!(data_dir = %config.data_dir, rpc_count = config.rpc_urls.len(), "starting aave-v3-liquidation-indexer");

    let pool = ProviderPool::new(config.rpc_urls.clone(), config.chain_id);
    let prices = Arc::new(PriceResolver::new(pool.clone()));
    let scanner = Arc::new(LiquidationScanner::new(pool.clone(), prices.clone(), &config));

    match &args.command {
        Command::Scan { to_block } => {
            let to_block = parse_to_block(to_block)?;
            let appended = scanner.run(to_block).await?;
            info!(appended, "scan command finished");
        }
        Command::Validate => {
            info!("running validation pass: backfilling missing prices, then catching up to chain tip");
            let (backfilled, appended) = scanner.validate().await?;
            info!(backfilled, appended, "validation pass finished");
        }
        Command::Serve => {
            run_serve(pool, prices, scanner, &config).await?;
        }
    }

    Ok(())
}

fn parse_to_block(raw: &str) -> Result<Option<u64>> {
    if raw.eq_ignore_ascii_case("latest") {
        return Ok(None);
    }
    raw.parse::<u64>()
        .map(Some)
        .with_context(|| format!("invalid --to-block value '{raw}', expected a block number or 'latest'"))
}

async fn run_serve(
    pool: Arc<ProviderPool>,
    prices: Arc<PriceResolver>,
    scanner: Arc<LiquidationScanner>,
    config: &Config,
) -> Result<()> {
    if config.disable_background_services {
        info!("background services disabled, running a single scan pass and exiting");
        scanner.run(None).await?;
        return Ok(());
    }

    let cancel = CancellationToken::new();

    let scheduler = Scheduler::new(scanner, Duration::from_secs(config.scheduler_interval_secs), config.skip_initial_scan, cancel.clone());
    let daily_builder = DailyEthDatasetBuilder::new(pool, prices, config, cancel.clone());

    let scheduler_task = tokio::spawn(async move { scheduler.run().await });
    let daily_task = tokio::spawn(async move { daily_builder.run().await });

    tokio::signal::ctrl_c().await.ok();
    info!("shutdown signal received, cancelling background tasks");
    cancel.cancel();

    let _ = tokio::join!(scheduler_task, daily_task);
    Ok(())
}
