//! Layer 2 (spec.md §4.4): direct `X/USD` Chainlink feeds. Symbol aliases
//! (WETH→ETH, WBTC→BTC, …) are resolved before lookup, grounded in
//! `chainlink_price_utils.py`'s `TOKEN_ALIASES` table (original_source).

use std::sync::Arc;

use async_trait::async_trait;
use ethers::providers::Middleware;
use ethers::types::BlockId;
use rust_decimal::Decimal;

use crate::bindings::IChainlinkAggregator;
use crate::error::PriceError;
use crate::provider_pool::ProviderPool;

use super::tables::{normalize_symbol, CHAINLINK_USD_FEEDS};
use super::{call_with_retry, PriceContext, PriceResolver, PriceStrategy};

pub struct ChainlinkDirectStrategy {
    pool: Arc<ProviderPool>,
}

impl ChainlinkDirectStrategy {
    pub fn new(pool: Arc<ProviderPool>) -> Self {
        Self { pool }
    }
}

/// Reads a Chainlink aggregator's price at `block`, returning `None` when
/// `latestRoundData` reverts or the feed wasn't deployed yet.
pub(crate) async fn read_chainlink_feed(
    pool: &Arc<ProviderPool>,
    feed: ethers::types::Address,
    block: u64,
) -> Result<Option<Decimal>, PriceError> {
    let round = call_with_retry(pool, "Chainlink.latestRoundData", block, |handle| {
        let aggregator = IChainlinkAggregator::new(feed, handle.client.clone());
        let block_id = BlockId::Number(block.into());
        async move { aggregator.latest_round_data().block(block_id).call().await.map_err(|e| e.to_string()) }
    })
    .await?;

    let Some((_, answer, _, _, _)) = round else { return Ok(None) };
    if answer <= ethers::types::I256::zero() {
        return Ok(None);
    }

    let decimals = call_with_retry(pool, "Chainlink.decimals", block, |handle| {
        let aggregator = IChainlinkAggregator::new(feed, handle.client.clone());
        let block_id = BlockId::Number(block.into());
        async move { aggregator.decimals().block(block_id).call().await.map_err(|e| e.to_string()) }
    })
    .await?;
    let Some(decimals) = decimals else { return Ok(None) };

    let raw: u128 = answer.low_u128();
    Ok(Some(Decimal::from_i128_with_scale(raw as i128, decimals as u32)))
}

#[async_trait]
impl PriceStrategy for ChainlinkDirectStrategy {
    fn name(&self) -> &'static str {
        "chainlink_direct"
    }

    async fn try_price(&self, ctx: &PriceContext, _resolver: &PriceResolver) -> Result<Option<Decimal>, PriceError> {
        let alias = normalize_symbol(&ctx.symbol);
        let Some(&feed) = CHAINLINK_USD_FEEDS.get(alias.as_str()) else {
            return Ok(None);
        };
        read_chainlink_feed(&self.pool, feed, ctx.block).await
    }
}
