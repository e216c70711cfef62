//! Resolves a token contract address to `(symbol, decimals)`, preferring a
//! curated table of well-known Aave-listed assets (grounded in
//! `aave_data.py`'s hardcoded mainnet asset map and
//! `chainlink_price_utils.py`'s symbol tables, original_source) and falling
//! back to on-chain `symbol()`/`decimals()` reads.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use ethers::providers::{Http, Provider};
use ethers::types::{Address, BlockId};
use lazy_static::lazy_static;
use tracing::warn;

use crate::bindings::IErc20Metadata;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub symbol: String,
    pub decimals: u8,
}

struct CuratedEntry {
    address: &'static str,
    symbol: &'static str,
    decimals: u8,
}

const CURATED_TOKENS: &[CuratedEntry] = &[
    CuratedEntry { address: "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", symbol: "WETH", decimals: 18 },
    CuratedEntry { address: "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599", symbol: "WBTC", decimals: 8 },
    CuratedEntry { address: "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", symbol: "USDC", decimals: 6 },
    CuratedEntry { address: "0xdAC17F958D2ee523a2206206994597C13D831ec7", symbol: "USDT", decimals: 6 },
    CuratedEntry { address: "0x6B175474E89094C44Da98b954EedeAC495271d0F", symbol: "DAI", decimals: 18 },
    CuratedEntry { address: "0x7f39C581F595B53c5cb19bD0b3f8dA6c935E2Ca0", symbol: "WSTETH", decimals: 18 },
    CuratedEntry { address: "0xae78736Cd615f374D3085123A210448E74Fc6393", symbol: "RETH", decimals: 18 },
    CuratedEntry { address: "0xBe9895146f7AF43049ca1c1AE358B0541Ea49704", symbol: "CBETH", decimals: 18 },
    CuratedEntry { address: "0xCd5fE23C85820F7B72D0926FC9b05b43E359b7ee", symbol: "WEETH", decimals: 18 },
    CuratedEntry { address: "0xA1290d69c65A6Fe4DF752f95823fae25cB99e5A7", symbol: "RSETH", decimals: 18 },
    CuratedEntry { address: "0xf1C9acDc66974dFB6dEcB12aA385b9cD01190E38", symbol: "OSETH", decimals: 18 },
    CuratedEntry { address: "0x9D39A5DE30e57443BfF2A8307A4256c8797A3497", symbol: "SUSDE", decimals: 18 },
    CuratedEntry { address: "0x4c9EDD5852cd905f086C759E8383e09bff1E68B3", symbol: "USDE", decimals: 18 },
    CuratedEntry { address: "0x83F20F44975D03b1b09e64809B757c47f942BEeA", symbol: "SDAI", decimals: 18 },
    CuratedEntry { address: "0x8f693ca8D21b157107184d29D398A8D082b38b76", symbol: "DETH", decimals: 18 },
    CuratedEntry { address: "0x7Fc66500c84A76Ad7e9c93437bFc5Ac33E2DDaE9", symbol: "AAVE", decimals: 18 },
    CuratedEntry { address: "0x514910771AF9Ca656af840dff83E8264EcF986CA", symbol: "LINK", decimals: 18 },
    CuratedEntry { address: "0x1f9840a85d5aF5bf1D1762F925BDADdC4201F984", symbol: "UNI", decimals: 18 },
    CuratedEntry { address: "0x9f8F72aA9304c8B593d555F12eF6589cC3A579A2", symbol: "MKR", decimals: 18 },
    CuratedEntry { address: "0xD533a949740bb3306d119CC777fa900bA034cd52", symbol: "CRV", decimals: 18 },
    CuratedEntry { address: "0x5f98805A4E8be255a32880FDeC7F6728C6568bA0", symbol: "LUSD", decimals: 18 },
    CuratedEntry { address: "0x40D16FC0246aD3160Ccc09B8D0D3A2cD28aE6C2f", symbol: "GHO", decimals: 18 },
    CuratedEntry { address: "0x6c3ea9036406852006290770BEdFcAbA0e23A0e8", symbol: "PYUSD", decimals: 6 },
    CuratedEntry { address: "0xdC035D45d973E3EC169d2276DDab16f1e407384F", symbol: "USDS", decimals: 18 },
    CuratedEntry { address: "0xf939E0A03FB07F59A73314E73794Be0E57ac1b4E", symbol: "CRVUSD", decimals: 18 },
];

lazy_static! {
    static ref CURATED_TABLE: HashMap<Address, TokenInfo> = CURATED_TOKENS
        .iter()
        .map(|e| {
            (
                Address::from_str(e.address).expect("curated token address must parse"),
                TokenInfo { symbol: e.symbol.to_string(), decimals: e.decimals },
            )
        })
        .collect();
}

pub struct TokenRegistry {
    client: Arc<Provider<Http>>,
    cache: std::sync::Mutex<HashMap<Address, TokenInfo>>,
}

impl TokenRegistry {
    pub fn new(client: Arc<Provider<Http>>) -> Self {
        Self { client, cache: std::sync::Mutex::new(HashMap::new()) }
    }

    pub async fn resolve(&self, address: Address, block: u64) -> TokenInfo {
        if let Some(info) = CURATED_TABLE.get(&address) {
            return info.clone();
        }
        if let Some(info) = self.cache.lock().unwrap().get(&address) {
            return info.clone();
        }

        let contract = IErc20Metadata::new(address, self.client.clone());
        let block_id = BlockId::Number(block.into());

        let symbol = match contract.symbol().block(block_id).call().await {
            Ok(s) if !s.trim().is_empty() => s,
            _ => {
                warn!(?address, "symbol() call failed, falling back to shortened address literal");
                shortened_address(address)
            }
        };
        let decimals = match contract.decimals().block(block_id).call().await {
            Ok(d) => d,
            Err(_) => {
                warn!(?address, "decimals() call failed, defaulting to 18");
                18
            }
        };

        let info = TokenInfo { symbol, decimals };
        self.cache.lock().unwrap().insert(address, info.clone());
        info
    }
}

/// Shortened "0xABCD…1234" literal used when the on-chain `symbol()` call
/// itself fails (spec.md §4.3).
pub fn shortened_address(address: Address) -> String {
    let full = format!("{:#x}", address);
    if full.len() <= 12 {
        return full;
    }
    format!("{}…{}", &full[..6], &full[full.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curated_table_has_correct_decimals_for_stablecoins() {
        let usdc = Address::from_str("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48").unwrap();
        let info = CURATED_TABLE.get(&usdc).expect("USDC must be curated");
        assert_eq!(info.symbol, "USDC");
        assert_eq!(info.decimals, 6);
    }

    #[test]
    fn curated_table_has_correct_decimals_for_wbtc() {
        let wbtc = Address::from_str("0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599").unwrap();
        let info = CURATED_TABLE.get(&wbtc).expect("WBTC must be curated");
        assert_eq!(info.decimals, 8);
    }

    #[test]
    fn shortened_address_format() {
        let addr = Address::from_str("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2").unwrap();
        let s = shortened_address(addr);
        assert!(s.starts_with("0xc02a"));
        assert!(s.ends_with("6cc2"));
    }
}
