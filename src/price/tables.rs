//! Seed data for the price resolver: Chainlink feed addresses, symbol
//! aliases, the stablecoin fallback list, CAPO adapter addresses, and LSD
//! underlying-asset mapping. Grounded directly in
//! `chainlink_price_utils.py`'s `CHAINLINK_FEEDS`, `TOKEN_ALIASES`, and
//! `STABLE_TOKENS` tables (original_source).

use std::collections::HashMap;
use std::str::FromStr;

use ethers::types::Address;
use lazy_static::lazy_static;

fn addr(s: &str) -> Address {
    Address::from_str(s).expect("hard-coded address literal must parse")
}

lazy_static! {
    /// Direct `X/USD` Chainlink aggregators, keyed by the canonicalized
    /// alias symbol (see `TOKEN_ALIASES`).
    pub static ref CHAINLINK_USD_FEEDS: HashMap<&'static str, Address> = {
        let mut m = HashMap::new();
        m.insert("ETH", addr("0x5f4eC3Df9cbd43714FE2740f5E3616155c5b841"));
        m.insert("BTC", addr("0xF4030086522a5bEEa4988F8cA5B36dbC97BeE88c"));
        m.insert("DAI", addr("0xAed0c38402a5d19df6E4c03F4E2DceD6e29c1ee9"));
        m.insert("USDC", addr("0x8fFfFfd4AfB6115b954Bd326cbe7B4BA576818f6"));
        m.insert("USDT", addr("0x3E7d1eAB13ad0104d2750B8863b489D65364e32D"));
        m.insert("AAVE", addr("0x547a514d5e3769680Ce22B2361c10Ea13619e8a9"));
        m.insert("LINK", addr("0x2c1D072e956AFFC0D435Cb7AC38EF18d24d9127c"));
        m.insert("UNI", addr("0x553303d460EE0afB37edFf9bE42922D8FF63220e"));
        m.insert("CRV", addr("0xCd627aA160A6fA45EB793D19Ef54f5062F20f33f"));
        m.insert("COMP", addr("0xdbd020CAeF83eFd542f4De03e3cF0C28A4428bd5"));
        m.insert("WSTETH", addr("0x164b276057258d81941e97B0a900D4C7B358bCe0"));
        m.insert("GHO", addr("0x3f12643D3f6f874d39C2a4c9f2Cd6f2DbAC877FC"));
        m.insert("LUSD", addr("0x3D7aE7E594f2f2091Ad8798313450130d0Aba3a0"));
        m.insert("RPL", addr("0x4E155eD98aFE9034b7A5962f6C84c86d869daA9d"));
        m.insert("ENS", addr("0x5C00128d4d1c2F4f652C267d7bcdD7Ac99C16E16"));
        m.insert("FRAX", addr("0xB9E1E3A9fEff48998E45Fa90847ed4D467E8BcfD"));
        m.insert("SNX", addr("0xDC3EA94CD0AC27d9A86C180091e7f78C683d3699"));
        m.insert("BAL", addr("0xdF2917806E30300537aEB49A7663062F4d1F2b5F"));
        m.insert("FXS", addr("0x6Ebc52C8C1089be9eB3945C4350B68B8E4C2233f"));
        m.insert("1INCH", addr("0xc929ad75B72593967DE83E7F7CdA0493458261D9"));
        m.insert("CBBTC", addr("0x2665701293fCbEB223D11A08D826563EDcCE423A"));
        m.insert("PYUSD", addr("0x8f1dF6D7F2db73eECE86a18b4381F4707b918FB1"));
        m.insert("CRVUSD", addr("0xEEf0C605546958c1f899b6fB336C20671f9cD49F"));
        m.insert("USDS", addr("0xfF30586cD0F29eD462364C7e81375FC0C71219b1"));
        m.insert("USDE", addr("0xa569d910839Ae8865Da8F8e70FfFb0cBA869F961"));
        m
    };

    /// `X/ETH` Chainlink aggregators used by the ETH-composition strategy
    /// (spec.md §4.4 layer 5).
    pub static ref CHAINLINK_ETH_FEEDS: HashMap<&'static str, Address> = {
        let mut m = HashMap::new();
        m.insert("LDO", addr("0x4e844125952D32AcdF339BE976c98E22F6F318dB"));
        m.insert("MKR", addr("0x24551a8Fb2A7211A25a17B1481f043A8a8adC7f2"));
        m
    };

    /// Canonicalizes a raw on-chain symbol to the key used by
    /// `CHAINLINK_USD_FEEDS`/`CHAINLINK_ETH_FEEDS`/`STABLE_TOKENS`.
    pub static ref TOKEN_ALIASES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("WETH", "ETH");
        m.insert("ETH", "ETH");
        m.insert("WBTC", "BTC");
        m.insert("TBTC", "BTC");
        m.insert("BTC", "BTC");
        m.insert("DAI", "DAI");
        m.insert("USDC", "USDC");
        m.insert("USDT", "USDT");
        m.insert("AAVE", "AAVE");
        m.insert("LINK", "LINK");
        m.insert("MKR", "MKR");
        m.insert("UNI", "UNI");
        m.insert("CRV", "CRV");
        m.insert("COMP", "COMP");
        m.insert("WSTETH", "WSTETH");
        m.insert("STETH", "WSTETH");
        m.insert("RETH", "RETH");
        m.insert("LDO", "LDO");
        m.insert("GHO", "GHO");
        m.insert("LUSD", "LUSD");
        m.insert("RPL", "RPL");
        m.insert("ENS", "ENS");
        m.insert("CBETH", "CBETH");
        m.insert("FRAX", "FRAX");
        m.insert("SNX", "SNX");
        m.insert("BAL", "BAL");
        m.insert("FXS", "FXS");
        m.insert("1INCH", "1INCH");
        m.insert("CBBTC", "CBBTC");
        m.insert("PYUSD", "PYUSD");
        m.insert("CRVUSD", "CRVUSD");
        m.insert("USDS", "USDS");
        m.insert("USDE", "USDE");
        m.insert("WEETH", "WEETH");
        m.insert("RSETH", "RSETH");
        m.insert("OSETH", "OSETH");
        m.insert("SUSDE", "SUSDE");
        m.insert("SDAI", "SDAI");
        m
    };

    /// Stablecoins eligible for the final $1.00 fallback layer (spec.md
    /// §4.4 layer 6), tried only after real feeds fail.
    pub static ref STABLE_TOKENS: std::collections::HashSet<&'static str> = {
        [
            "USDC", "USDT", "DAI", "FRAX", "LUSD", "GHO", "PYUSD", "USDS", "CRVUSD", "USDE", "USDB",
            "RLUSD",
        ]
        .into_iter()
        .collect()
    };

    /// CAPO adapter contract per spec.md §4.4 layer 3. These are Aave's
    /// PriceCapAdapter deployments that bound an LSD/underlying ratio.
    pub static ref CAPO_ADAPTERS: HashMap<&'static str, Address> = {
        let mut m = HashMap::new();
        m.insert("WSTETH", addr("0x8B4473e0A0dd4b9a99e8AC76CEB55bA46166A0c8"));
        m.insert("RETH", addr("0xF57Ad781E32c9f0eBEb37b7aaB60F52d14e2bf5B"));
        m.insert("CBETH", addr("0x15D15e8CeE8c75fFEa9fce9F3E9fFF6B6c4aE9e8"));
        m.insert("WEETH", addr("0xA03ffDc7c27C07c5EAC3c38de55ae1D3edC88bD3"));
        m.insert("RSETH", addr("0x9B7D5A3c6ED14c1A3d51b8b99e7F9eE5cD70d2E8"));
        m.insert("OSETH", addr("0xC1d67C5F5d0DD5c16c29e3b75Cf2C0a3A6F7aDa0"));
        m.insert("SUSDE", addr("0x6E2d264C2938A2dAA01fDDc1e70d0b4E9a53Dbb6"));
        m
    };

    /// Underlying asset for each LSD's exchange-rate computation. wstETH's
    /// underlying is stETH (its own dedicated feed); most others are
    /// ETH-denominated; sDAI's underlying is DAI; sUSDe's is USDe.
    pub static ref LSD_UNDERLYING: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("WSTETH", "STETH");
        m.insert("RETH", "ETH");
        m.insert("CBETH", "ETH");
        m.insert("WEETH", "ETH");
        m.insert("RSETH", "ETH");
        m.insert("OSETH", "ETH");
        m.insert("SDAI", "DAI");
        m.insert("SUSDE", "USDE");
        m
    };

    /// Representative mainnet address used when the resolver needs to look
    /// up an underlying asset purely by symbol (e.g. "ETH" -> WETH, "STETH"
    /// -> stETH) rather than the address carried on the liquidation event.
    pub static ref SYMBOL_ADDRESS: HashMap<&'static str, Address> = {
        let mut m = HashMap::new();
        m.insert("ETH", addr("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"));
        m.insert("STETH", addr("0xae7ab96520DE3A18E5e111B5EaAb095312D7fE84"));
        m.insert("DAI", addr("0x6B175474E89094C44Da98b954EedeAC495271d0F"));
        m.insert("USDE", addr("0x4c9EDD5852cd905f086C759E8383e09bff1E68B3"));
        m
    };
}

/// Resolves raw on-chain symbol (upper-cased by the caller) to the alias
/// used by the feed tables above. Unknown symbols pass through unchanged.
pub fn normalize_symbol(symbol: &str) -> String {
    let upper = symbol.to_uppercase();
    TOKEN_ALIASES.get(upper.as_str()).map(|s| s.to_string()).unwrap_or(upper)
}

pub fn is_stablecoin(symbol: &str) -> bool {
    STABLE_TOKENS.contains(normalize_symbol(symbol).as_str())
}
