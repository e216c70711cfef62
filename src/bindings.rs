//! Contract bindings generated in-crate via `ethers::contract::abigen!`.
//!
//! The teacher repo vendors its bindings as separate `bindings-aave` /
//! `bindings-liquidator` path crates built the same way
//! (`i_aave_oracle::IAaveOracle`, `pool::{BorrowFilter, SupplyFilter}`,
//! `ierc20::IERC20`). This crate inlines the equivalent human-readable ABI
//! fragments directly rather than vendoring path dependencies that aren't
//! part of this workspace.

use ethers::contract::abigen;

abigen!(
    IAaveV3Pool,
    r#"[
        event LiquidationCall(address indexed collateralAsset, address indexed debtAsset, address indexed user, uint256 debtToCover, uint256 liquidatedCollateralAmount, address liquidator, bool receiveAToken)
    ]"#
);

abigen!(
    IAaveOracle,
    r#"[
        function getAssetPrice(address asset) external view returns (uint256)
        function BASE_CURRENCY_UNIT() external view returns (uint256)
    ]"#
);

abigen!(
    IChainlinkAggregator,
    r#"[
        function latestRoundData() external view returns (uint80 roundId, int256 answer, uint256 startedAt, uint256 updatedAt, uint80 answeredInRound)
        function decimals() external view returns (uint8)
    ]"#
);

/// Aave's Capped Price Oracle adapter interface (the on-chain analogue of
/// `chainlink_price_utils.py`'s CAPO handling in the original system).
abigen!(
    ICapoAdapter,
    r#"[
        function getRatio() external view returns (uint256)
        function snapshotRatio() external view returns (uint256)
        function snapshotTimestamp() external view returns (uint256)
        function maxYearlyRatioGrowthPercent() external view returns (uint256)
        function RATIO_DECIMALS() external view returns (uint256)
    ]"#
);

abigen!(
    IErc20Metadata,
    r#"[
        function symbol() external view returns (string)
        function decimals() external view returns (uint8)
    ]"#
);

/// wstETH exposes its stETH exchange rate via `stEthPerToken`.
abigen!(
    IWstEth,
    r#"[
        function stEthPerToken() external view returns (uint256)
    ]"#
);

/// rETH (Rocket Pool) and a handful of other LSDs expose `getExchangeRate`.
abigen!(
    IRateProviderGetExchangeRate,
    r#"[
        function getExchangeRate() external view returns (uint256)
    ]"#
);

/// cbETH and several ERC-4626-style wrappers (sDAI, sUSDe) expose a plain
/// `exchangeRate` view, or `convertToAssets(1e18)` in the ERC-4626 case.
abigen!(
    IRateProviderExchangeRate,
    r#"[
        function exchangeRate() external view returns (uint256)
    ]"#
);

abigen!(
    IErc4626,
    r#"[
        function convertToAssets(uint256 shares) external view returns (uint256)
    ]"#
);
