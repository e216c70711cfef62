//! Periodic drivers for the scanner and the independent daily ETH price
//! dataset builder (spec.md §4.8). Grounded in the teacher's
//! `TimeCollector`-style tick loop (`collectors/time_collector.rs`),
//! generalized from a one-shot tick-emitting collector into two
//! self-contained background loops since this crate has no engine/collector
//! framework to plug into.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, TimeZone, Utc};
use ethers::providers::Middleware;
use fs4::FileExt;
use tracing::{error, info, warn};

use crate::checkpoint::{CheckpointStore, ScanState};
use crate::config::Config;
use crate::price::PriceResolver;
use crate::provider_pool::ProviderPool;
use crate::scanner::LiquidationScanner;

/// Shared cancellation flag. `Scheduler` and `DailyEthDatasetBuilder` each
/// hold a clone and check it between passes and during their sleeps
/// (spec.md §5 — cancellation is honored at batch/pass boundaries, never by
/// aborting an in-flight request).
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    async fn sleep_or_cancelled(&self, duration: Duration) {
        let poll_interval = Duration::from_secs(1).min(duration);
        let mut remaining = duration;
        while remaining > Duration::ZERO && !self.is_cancelled() {
            let step = poll_interval.min(remaining);
            tokio::time::sleep(step).await;
            remaining = remaining.saturating_sub(step);
        }
    }
}

/// Invokes `LiquidationScanner` once immediately (unless configured to skip)
/// and then every `interval` thereafter, for as long as the process runs
/// (spec.md §4.8).
pub struct Scheduler {
    scanner: Arc<LiquidationScanner>,
    interval: Duration,
    skip_initial: bool,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(scanner: Arc<LiquidationScanner>, interval: Duration, skip_initial: bool, cancel: CancellationToken) -> Self {
        Self { scanner, interval, skip_initial, cancel }
    }

    pub async fn run(&self) {
        if !self.skip_initial {
            self.run_pass().await;
        }

        while !self.cancel.is_cancelled() {
            self.cancel.sleep_or_cancelled(self.interval).await;
            if self.cancel.is_cancelled() {
                break;
            }
            self.run_pass().await;
        }
        info!("scheduler loop exiting on cancellation");
    }

    async fn run_pass(&self) {
        match self.scanner.run(None).await {
            Ok(appended) => info!(appended, "scheduled scan pass completed"),
            Err(e) => warn!(error = %e, "scheduled scan pass failed, will retry next tick"),
        }
    }
}

/// Builds a one-row-per-UTC-day ETH/USD time series (spec.md §4.8),
/// grounded in `scripts/build_daily_eth_chainlink_dataset.py` (original
/// source). Reuses the shared `ProviderPool`/`PriceResolver` but owns a
/// separate CSV and status file so a corrupt or full liquidations CSV never
/// blocks this pipeline and vice versa.
pub struct DailyEthDatasetBuilder {
    pool: Arc<ProviderPool>,
    prices: Arc<PriceResolver>,
    weth_address: ethers::types::Address,
    csv_path: std::path::PathBuf,
    checkpoint: CheckpointStore,
    cancel: CancellationToken,
}

const DAILY_FIELDNAMES: [&str; 3] = ["date", "block", "eth_price_usd"];

impl DailyEthDatasetBuilder {
    pub fn new(pool: Arc<ProviderPool>, prices: Arc<PriceResolver>, config: &Config, cancel: CancellationToken) -> Self {
        Self {
            pool,
            prices,
            weth_address: config.weth_address,
            csv_path: config.eth_daily_csv_path(),
            checkpoint: CheckpointStore::new(config.eth_daily_csv_path(), config.eth_daily_status_path()),
            cancel,
        }
    }

    pub async fn run(&self) {
        loop {
            let until_next = seconds_until_next_0005_utc();
            info!(seconds = until_next.as_secs(), "daily ETH dataset builder sleeping until next run");
            self.cancel.sleep_or_cancelled(until_next).await;
            if self.cancel.is_cancelled() {
                break;
            }
            if let Err(e) = self.run_pass().await {
                error!(error = %e, "daily ETH dataset pass failed, will retry tomorrow");
            }
        }
        info!("daily ETH dataset builder exiting on cancellation");
    }

    async fn run_pass(&self) -> anyhow::Result<()> {
        let handle = self.pool.acquire(Duration::from_secs(10), false, true).await?;
        let block = handle.client.get_block_number().await?.as_u64();
        let today = Utc::now().date_naive().to_string();

        let Some(eth_price) = self.prices.price_usd("ETH", self.weth_address, block, Utc::now().timestamp() as u64).await else {
            warn!("no ETH price available at block {block}, skipping today's daily row");
            return Ok(());
        };

        let wrote = self.append_if_new_date(&today, block, eth_price)?;
        self.checkpoint.write_status(
            ScanState::Completed,
            Some(block),
            Some(block),
            if wrote { format!("recorded ETH price for {today}") } else { format!("{today} already recorded") },
        );
        Ok(())
    }

    fn append_if_new_date(&self, date: &str, block: u64, eth_price: rust_decimal::Decimal) -> anyhow::Result<bool> {
        if let Some(parent) = self.csv_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        if !self.csv_path.exists() {
            let mut writer = csv::WriterBuilder::new().from_path(&self.csv_path)?;
            writer.write_record(DAILY_FIELDNAMES)?;
            writer.flush()?;
        }

        let mut file = std::fs::OpenOptions::new().read(true).append(true).open(&self.csv_path)?;
        file.lock_exclusive()?;

        let result = (|| -> anyhow::Result<bool> {
            let mut reader = csv::Reader::from_path(&self.csv_path)?;
            let already_present = reader.records().filter_map(|r| r.ok()).any(|r| r.get(0) == Some(date));
            if already_present {
                return Ok(false);
            }
            let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(&mut file);
            writer.write_record([date, &block.to_string(), &eth_price.to_string()])?;
            writer.flush()?;
            Ok(true)
        })();

        let _ = file.unlock();
        result
    }
}

fn seconds_until_next_0005_utc() -> Duration {
    let now = Utc::now();
    let today_target = Utc
        .with_ymd_and_hms(now.year(), now.month(), now.day(), 0, 5, 0)
        .single()
        .unwrap_or(now);
    let target = if now < today_target { today_target } else { today_target + chrono::Duration::days(1) };
    let diff = target - now;
    Duration::from_secs(diff.num_seconds().max(1) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_until_next_run_is_positive_and_bounded_by_a_day() {
        let secs = seconds_until_next_0005_utc().as_secs();
        assert!(secs > 0);
        assert!(secs <= 24 * 3600);
    }
}
