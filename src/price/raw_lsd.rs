//! Layer 4 (spec.md §4.4): raw LSD pricing (`exchange_rate × underlying`)
//! without the CAPO cap. Used when the CAPO contract lookup fails (layer 3
//! returned `None`) or when an asset has no CAPO adapter at all but does
//! expose a documented rate function.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::PriceError;
use crate::provider_pool::ProviderPool;

use super::lsd_common::raw_lsd_prices;
use super::tables::normalize_symbol;
use super::{PriceContext, PriceResolver, PriceStrategy};

pub struct RawLsdStrategy {
    pool: Arc<ProviderPool>,
}

impl RawLsdStrategy {
    pub fn new(pool: Arc<ProviderPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PriceStrategy for RawLsdStrategy {
    fn name(&self) -> &'static str {
        "raw_lsd"
    }

    async fn try_price(&self, ctx: &PriceContext, resolver: &PriceResolver) -> Result<Option<Decimal>, PriceError> {
        let alias = normalize_symbol(&ctx.symbol);
        let result = raw_lsd_prices(&self.pool, resolver, &alias, ctx.asset, ctx.block, ctx.event_timestamp).await?;
        Ok(result.map(|(raw_price, _underlying_price)| raw_price))
    }
}
