//! Layer 3 (spec.md §4.4): CAPO-protected liquid staking derivatives
//! (wstETH, rETH, cbETH, weETH, rsETH, osETH, sUSDe). Reads the CAPO
//! adapter's snapshot state, independently computes the raw LSD price, and
//! bounds the ratio by the adapter's maximum yearly growth rate using exact
//! rational arithmetic (spec.md §3, §9).

use std::sync::Arc;

use async_trait::async_trait;
use ethers::providers::Middleware;
use ethers::types::BlockId;
use rust_decimal::Decimal;

use crate::bindings::ICapoAdapter;
use crate::error::PriceError;
use crate::provider_pool::ProviderPool;

use super::capo_math::{apply_capo_cap, CapoParameters};
use super::lsd_common::raw_lsd_prices;
use super::tables::{normalize_symbol, CAPO_ADAPTERS};
use super::{call_with_retry, PriceContext, PriceResolver, PriceStrategy};

pub struct CapoLsdStrategy {
    pool: Arc<ProviderPool>,
}

impl CapoLsdStrategy {
    pub fn new(pool: Arc<ProviderPool>) -> Self {
        Self { pool }
    }

    async fn fetch_capo_parameters(&self, adapter: ethers::types::Address, block: u64) -> Result<Option<CapoParameters>, PriceError> {
        let block_id = BlockId::Number(block.into());

        let snapshot_ratio = call_with_retry(&self.pool, "Capo.snapshotRatio", block, |handle| {
            let c = ICapoAdapter::new(adapter, handle.client.clone());
            async move { c.snapshot_ratio().block(block_id).call().await.map_err(|e| e.to_string()) }
        })
        .await?;
        let Some(snapshot_ratio) = snapshot_ratio else { return Ok(None) };

        let snapshot_timestamp = call_with_retry(&self.pool, "Capo.snapshotTimestamp", block, |handle| {
            let c = ICapoAdapter::new(adapter, handle.client.clone());
            async move { c.snapshot_timestamp().block(block_id).call().await.map_err(|e| e.to_string()) }
        })
        .await?;
        let Some(snapshot_timestamp) = snapshot_timestamp else { return Ok(None) };

        let max_yearly_growth = call_with_retry(&self.pool, "Capo.maxYearlyRatioGrowthPercent", block, |handle| {
            let c = ICapoAdapter::new(adapter, handle.client.clone());
            async move { c.max_yearly_ratio_growth_percent().block(block_id).call().await.map_err(|e| e.to_string()) }
        })
        .await?;
        let Some(max_yearly_growth) = max_yearly_growth else { return Ok(None) };

        let ratio_decimals = call_with_retry(&self.pool, "Capo.RATIO_DECIMALS", block, |handle| {
            let c = ICapoAdapter::new(adapter, handle.client.clone());
            async move { c.ratio_decimals().block(block_id).call().await.map_err(|e| e.to_string()) }
        })
        .await?;
        let Some(ratio_decimals) = ratio_decimals else { return Ok(None) };

        Ok(Some(CapoParameters {
            snapshot_ratio,
            snapshot_timestamp: snapshot_timestamp.as_u64(),
            max_yearly_growth_bps: max_yearly_growth.as_u64(),
            ratio_decimals: ratio_decimals.as_u32() as u8,
        }))
    }
}

#[async_trait]
impl PriceStrategy for CapoLsdStrategy {
    fn name(&self) -> &'static str {
        "capo_lsd"
    }

    async fn try_price(&self, ctx: &PriceContext, resolver: &PriceResolver) -> Result<Option<Decimal>, PriceError> {
        let alias = normalize_symbol(&ctx.symbol);
        let Some(&adapter) = CAPO_ADAPTERS.get(alias.as_str()) else {
            return Ok(None);
        };

        let Some(params) = self.fetch_capo_parameters(adapter, ctx.block).await? else {
            // CAPO contract lookup failed at this block; raw LSD layer (4)
            // is the designated fallback.
            return Ok(None);
        };

        let Some((raw_price, underlying_price)) =
            raw_lsd_prices(&self.pool, resolver, &alias, ctx.asset, ctx.block, ctx.event_timestamp).await?
        else {
            return Ok(None);
        };

        let (capped_price, _was_capped) = apply_capo_cap(raw_price, underlying_price, &params, ctx.event_timestamp);
        Ok(Some(capped_price))
    }
}
