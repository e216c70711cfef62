//! `PriceResolver`: computes the USD price Aave itself would have used for
//! an asset at a historical block, trying a strict priority chain of
//! strategy objects (spec.md §4.4, redesign mandated by spec.md §9).

mod aave_oracle;
mod capo_lsd;
mod chainlink_direct;
mod eth_composition;
mod lsd_common;
mod raw_lsd;
mod stablecoin;
pub mod capo_math;
pub mod tables;

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use ethers::types::Address;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::PriceError;
use crate::provider_pool::{ProviderHandle, ProviderPool};
use crate::retry::{retry, Transience, BACKOFF_SCHEDULE_SECS};

pub use aave_oracle::AaveOracleStrategy;
pub use capo_lsd::CapoLsdStrategy;
pub use chainlink_direct::ChainlinkDirectStrategy;
pub use eth_composition::EthCompositionStrategy;
pub use raw_lsd::RawLsdStrategy;
pub use stablecoin::StablecoinFallbackStrategy;

/// Everything a price strategy needs to price one asset at one block.
#[derive(Debug, Clone)]
pub struct PriceContext {
    pub symbol: String,
    pub asset: Address,
    pub block: u64,
    pub event_timestamp: u64,
}

#[async_trait]
pub trait PriceStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns `Ok(Some(price))` on success, `Ok(None)` when this strategy
    /// legitimately has no data at this block (spec.md §4.4c), or `Err`
    /// only for exhausted transient transport failures.
    async fn try_price(&self, ctx: &PriceContext, resolver: &PriceResolver) -> Result<Option<Decimal>, PriceError>;
}

pub struct PriceResolver {
    pool: Arc<ProviderPool>,
    strategies: Vec<Box<dyn PriceStrategy>>,
}

impl PriceResolver {
    pub fn new(pool: Arc<ProviderPool>) -> Self {
        let strategies: Vec<Box<dyn PriceStrategy>> = vec![
            Box::new(AaveOracleStrategy::new(pool.clone())),
            Box::new(ChainlinkDirectStrategy::new(pool.clone())),
            Box::new(CapoLsdStrategy::new(pool.clone())),
            Box::new(RawLsdStrategy::new(pool.clone())),
            Box::new(EthCompositionStrategy::new(pool.clone())),
            Box::new(StablecoinFallbackStrategy),
        ];
        Self { pool, strategies }
    }

    pub fn pool(&self) -> &Arc<ProviderPool> {
        &self.pool
    }

    /// `price_usd(symbol, asset, block)` from spec.md §4.4: tries every
    /// strategy in priority order and returns the first non-zero positive
    /// result. A `None` means "no authoritative price available" — callers
    /// must write an empty string, never a zero, for that row.
    pub async fn price_usd(&self, symbol: &str, asset: Address, block: u64, event_timestamp: u64) -> Option<Decimal> {
        let ctx = PriceContext { symbol: symbol.to_string(), asset, block, event_timestamp };
        for strategy in &self.strategies {
            match strategy.try_price(&ctx, self).await {
                Ok(Some(price)) if price > Decimal::ZERO => {
                    debug!(symbol, ?asset, block, strategy = strategy.name(), %price, "price resolved");
                    return Some(price);
                }
                Ok(Some(_)) | Ok(None) => continue,
                Err(e) => {
                    warn!(symbol, ?asset, block, strategy = strategy.name(), error = %e, "strategy failed, trying next layer");
                    continue;
                }
            }
        }
        None
    }
}

/// Classifies an RPC-level error message as transient (worth retrying and
/// rotating provider) vs. a legitimate "no data at this block" signal (the
/// feed/contract simply didn't exist yet, or the call reverted).
fn is_transient_transport_error(message: &str) -> bool {
    let m = message.to_lowercase();
    m.contains("timeout")
        || m.contains("timed out")
        || m.contains("connection")
        || m.contains("reset")
        || m.contains("502")
        || m.contains("503")
        || m.contains("429")
        || m.contains("too many requests")
}

/// Shared retry/rotation wrapper used by every price strategy's `eth_call`s.
/// Retries up to the bounded backoff schedule on transient transport
/// errors (spec.md §4.4a/b); returns `Ok(None)` immediately on a
/// non-transient error (revert, missing contract) so the caller can fall
/// through to the next layer without burning retries on data that will
/// never appear.
enum CallOutcome {
    Acquire(String),
    NoData(String),
    Transient(String),
}

pub(crate) async fn call_with_retry<T, F, Fut>(
    pool: &Arc<ProviderPool>,
    contract_name: &str,
    block: u64,
    f: F,
) -> Result<Option<T>, PriceError>
where
    F: Fn(ProviderHandle) -> Fut,
    Fut: Future<Output = Result<T, String>>,
{
    let attempts = BACKOFF_SCHEDULE_SECS.len();

    let outcome = retry(
        |_attempt| async move {
            let handle = pool
                .acquire(Duration::from_secs(10), false, true)
                .await
                .map_err(|e| CallOutcome::Acquire(e.to_string()))?;

            let started = Instant::now();
            match f(handle.clone()).await {
                Ok(v) => {
                    pool.observe_success(handle.index, started.elapsed());
                    Ok(v)
                }
                Err(message) => {
                    pool.observe_failure(handle.index, message.clone());
                    if is_transient_transport_error(&message) {
                        Err(CallOutcome::Transient(message))
                    } else {
                        Err(CallOutcome::NoData(message))
                    }
                }
            }
        },
        attempts,
        |e: &CallOutcome| match e {
            CallOutcome::Transient(_) => Transience::Transient,
            CallOutcome::NoData(_) | CallOutcome::Acquire(_) => Transience::Terminal,
        },
        |_attempt, e: &CallOutcome| match e {
            CallOutcome::Transient(message) => {
                warn!(contract = contract_name, block, error = %message, "transient transport error, rotating provider");
                pool.rotate();
            }
            CallOutcome::NoData(message) => {
                debug!(contract = contract_name, block, error = %message, "non-transient error, treating as no data");
            }
            CallOutcome::Acquire(_) => {}
        },
    )
    .await;

    match outcome {
        Ok(v) => Ok(Some(v)),
        Err(CallOutcome::NoData(_)) => Ok(None),
        Err(CallOutcome::Acquire(message)) | Err(CallOutcome::Transient(message)) => Err(PriceError::Transport {
            contract: contract_name.to_string(),
            block,
            source: anyhow::anyhow!(message),
        }),
    }
}
