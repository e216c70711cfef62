//! Layer 5 (spec.md §4.4): assets whose only Chainlink feed is `X/ETH`
//! (LDO, MKR). Reads that feed, then multiplies by the ETH/USD price
//! resolved recursively for the same block.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::PriceError;
use crate::provider_pool::ProviderPool;

use super::chainlink_direct::read_chainlink_feed;
use super::tables::{normalize_symbol, CHAINLINK_ETH_FEEDS, SYMBOL_ADDRESS};
use super::{PriceContext, PriceResolver, PriceStrategy};

pub struct EthCompositionStrategy {
    pool: Arc<ProviderPool>,
}

impl EthCompositionStrategy {
    pub fn new(pool: Arc<ProviderPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PriceStrategy for EthCompositionStrategy {
    fn name(&self) -> &'static str {
        "eth_composition"
    }

    async fn try_price(&self, ctx: &PriceContext, resolver: &PriceResolver) -> Result<Option<Decimal>, PriceError> {
        let alias = normalize_symbol(&ctx.symbol);
        let Some(&feed) = CHAINLINK_ETH_FEEDS.get(alias.as_str()) else {
            return Ok(None);
        };

        let Some(x_per_eth) = read_chainlink_feed(&self.pool, feed, ctx.block).await? else {
            return Ok(None);
        };

        let Some(&weth_address) = SYMBOL_ADDRESS.get("ETH") else {
            return Ok(None);
        };
        let Some(eth_usd) = resolver.price_usd("ETH", weth_address, ctx.block, ctx.event_timestamp).await else {
            return Ok(None);
        };

        Ok(Some(x_per_eth * eth_usd))
    }
}
