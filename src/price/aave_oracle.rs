//! Layer 1 (spec.md §4.4): the Aave V3 oracle itself. Authoritative for
//! every Aave-listed asset, so tried first — this is the price Aave's own
//! risk engine used to trigger the liquidation.

use std::sync::Arc;

use async_trait::async_trait;
use ethers::providers::Middleware;
use ethers::types::BlockId;
use rust_decimal::Decimal;

use crate::bindings::IAaveOracle;
use crate::config::DEFAULT_AAVE_V3_ORACLE;
use crate::error::PriceError;
use crate::provider_pool::ProviderPool;

use super::{call_with_retry, PriceContext, PriceResolver, PriceStrategy};

pub struct AaveOracleStrategy {
    pool: Arc<ProviderPool>,
}

impl AaveOracleStrategy {
    pub fn new(pool: Arc<ProviderPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PriceStrategy for AaveOracleStrategy {
    fn name(&self) -> &'static str {
        "aave_oracle"
    }

    async fn try_price(&self, ctx: &PriceContext, _resolver: &PriceResolver) -> Result<Option<Decimal>, PriceError> {
        let oracle_address: ethers::types::Address = DEFAULT_AAVE_V3_ORACLE.parse().expect("valid address literal");
        let asset = ctx.asset;
        let block = ctx.block;

        let raw = call_with_retry(&self.pool, "AaveOracle.getAssetPrice", block, |handle| {
            let oracle = IAaveOracle::new(oracle_address, handle.client.clone());
            let block_id = BlockId::Number(block.into());
            async move { oracle.get_asset_price(asset).block(block_id).call().await.map_err(|e| e.to_string()) }
        })
        .await?;

        let Some(raw) = raw else { return Ok(None) };
        if raw.is_zero() {
            return Ok(None);
        }

        // Aave's oracle returns USD prices in 8-decimal fixed point.
        let price = Decimal::from_i128_with_scale(raw.as_u128() as i128, 8);
        Ok(Some(price))
    }
}
