//! Layer 6 (spec.md §4.4): last-resort stablecoin fallback. Returns a flat
//! $1.00 for tokens on the curated stablecoin list when no on-chain price
//! source above it produced a result. Unconditional — no depeg awareness
//! (see DESIGN.md Open Question decisions).

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::PriceError;

use super::tables::is_stablecoin;
use super::{PriceContext, PriceResolver, PriceStrategy};

pub struct StablecoinFallbackStrategy;

#[async_trait]
impl PriceStrategy for StablecoinFallbackStrategy {
    fn name(&self) -> &'static str {
        "stablecoin_fallback"
    }

    async fn try_price(&self, ctx: &PriceContext, _resolver: &PriceResolver) -> Result<Option<Decimal>, PriceError> {
        if is_stablecoin(&ctx.symbol) {
            Ok(Some(Decimal::ONE))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use ethers::types::Address;

    use super::*;

    fn ctx(symbol: &str) -> PriceContext {
        PriceContext { symbol: symbol.to_string(), asset: Address::zero(), block: 1, event_timestamp: 0 }
    }

    #[tokio::test]
    async fn returns_one_dollar_for_known_stablecoin() {
        let strategy = StablecoinFallbackStrategy;
        let pool = crate::provider_pool::ProviderPool::new(vec!["http://localhost:1".to_string()], 1);
        let resolver = PriceResolver::new(pool);
        let price = strategy.try_price(&ctx("USDC"), &resolver).await.unwrap();
        assert_eq!(price, Some(Decimal::ONE));
    }

    #[tokio::test]
    async fn returns_none_for_non_stablecoin() {
        let strategy = StablecoinFallbackStrategy;
        let pool = crate::provider_pool::ProviderPool::new(vec!["http://localhost:1".to_string()], 1);
        let resolver = PriceResolver::new(pool);
        let price = strategy.try_price(&ctx("WBTC"), &resolver).await.unwrap();
        assert_eq!(price, None);
    }
}
