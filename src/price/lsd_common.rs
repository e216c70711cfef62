//! Shared exchange-rate fetching for liquid staking derivatives, used by
//! both the CAPO-protected strategy (layer 3) and the raw-LSD strategy
//! (layer 4). Each LSD exposes its rate via a slightly different function
//! name on-chain; this module dispatches per symbol (spec.md §4.4 layer 4).

use std::sync::Arc;

use ethers::providers::Middleware;
use ethers::types::{Address, BlockId, U256};
use rust_decimal::Decimal;

use crate::bindings::{IErc4626, IRateProviderExchangeRate, IRateProviderGetExchangeRate, IWstEth};
use crate::error::PriceError;
use crate::provider_pool::ProviderPool;

use super::call_with_retry;
use super::tables::{LSD_UNDERLYING, SYMBOL_ADDRESS};
use super::PriceResolver;

const WAD: u32 = 18;

/// Raw 1e18-scaled exchange rate of `asset` against its underlying, or
/// `None` if the rate function reverted (e.g. not deployed at this block).
async fn fetch_raw_exchange_rate(
    pool: &Arc<ProviderPool>,
    alias: &str,
    asset: Address,
    block: u64,
) -> Result<Option<U256>, PriceError> {
    let block_id = BlockId::Number(block.into());
    match alias {
        "WSTETH" => {
            call_with_retry(pool, "wstETH.stEthPerToken", block, |handle| {
                let c = IWstEth::new(asset, handle.client.clone());
                async move { c.st_eth_per_token().block(block_id).call().await.map_err(|e| e.to_string()) }
            })
            .await
        }
        "RETH" | "WEETH" | "RSETH" | "OSETH" => {
            call_with_retry(pool, "Lsd.getExchangeRate", block, |handle| {
                let c = IRateProviderGetExchangeRate::new(asset, handle.client.clone());
                async move { c.get_exchange_rate().block(block_id).call().await.map_err(|e| e.to_string()) }
            })
            .await
        }
        "CBETH" => {
            call_with_retry(pool, "cbETH.exchangeRate", block, |handle| {
                let c = IRateProviderExchangeRate::new(asset, handle.client.clone());
                async move { c.exchange_rate().block(block_id).call().await.map_err(|e| e.to_string()) }
            })
            .await
        }
        "SDAI" | "SUSDE" => {
            let one_share = U256::exp10(18);
            call_with_retry(pool, "Erc4626.convertToAssets", block, |handle| {
                let c = IErc4626::new(asset, handle.client.clone());
                async move { c.convert_to_assets(one_share).block(block_id).call().await.map_err(|e| e.to_string()) }
            })
            .await
        }
        _ => Ok(None),
    }
}

/// Computes `(exchange_rate_implied_usd_price, underlying_usd_price)` for
/// an LSD, or `None` if this symbol has no documented rate function or the
/// rate/underlying price could not be resolved at this block.
pub(crate) async fn raw_lsd_prices(
    pool: &Arc<ProviderPool>,
    resolver: &PriceResolver,
    alias: &str,
    asset: Address,
    block: u64,
    event_timestamp: u64,
) -> Result<Option<(Decimal, Decimal)>, PriceError> {
    let Some(&underlying_symbol) = LSD_UNDERLYING.get(alias) else {
        return Ok(None);
    };

    let Some(raw_rate) = fetch_raw_exchange_rate(pool, alias, asset, block).await? else {
        return Ok(None);
    };
    if raw_rate.is_zero() {
        return Ok(None);
    }

    let Some(&underlying_address) = SYMBOL_ADDRESS.get(underlying_symbol) else {
        return Ok(None);
    };
    let Some(underlying_price) = resolver.price_usd(underlying_symbol, underlying_address, block, event_timestamp).await else {
        return Ok(None);
    };

    let rate_decimal = Decimal::from_i128_with_scale(raw_rate.as_u128() as i128, WAD);
    let implied_price = rate_decimal * underlying_price;
    Ok(Some((implied_price, underlying_price)))
}
