//! Exact-rational CAPO (Capped Price Oracle) growth-rate cap arithmetic.
//! Float math is disallowed here per spec.md §9 REDESIGN FLAGS — Q96/1e27
//! intermediates overflow and round inconsistently under floats, so all of
//! this uses `num_rational::BigRational`.

use ethers::types::U256;
use num_bigint::BigInt;
use num_rational::BigRational;
use rust_decimal::Decimal;
use std::str::FromStr;

pub const PERCENTAGE_FACTOR: u64 = 10_000;
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 3600;

/// `CapoParameters` as described in spec.md §3: a CAPO-protected asset's
/// state at the block of a given event.
#[derive(Debug, Clone)]
pub struct CapoParameters {
    /// Raw on-chain snapshot ratio, scaled by `10^ratio_decimals`.
    pub snapshot_ratio: U256,
    pub snapshot_timestamp: u64,
    pub max_yearly_growth_bps: u64,
    pub ratio_decimals: u8,
}

pub fn u256_to_bigint(v: U256) -> BigInt {
    BigInt::from_str(&v.to_string()).expect("U256 decimal string always parses as BigInt")
}

pub fn decimal_to_rational(d: Decimal) -> BigRational {
    let mantissa = BigInt::from_str(&d.mantissa().to_string()).expect("mantissa parses");
    let scale = d.scale();
    let denom = BigInt::from(10).pow(scale);
    BigRational::new(mantissa, denom)
}

pub fn rational_to_decimal_8dp(r: &BigRational) -> Decimal {
    let scale_factor = BigInt::from(10_i64.pow(8));
    let scaled = (r * BigRational::from_integer(scale_factor)).to_integer();
    let as_i128: i128 = scaled.to_string().parse().unwrap_or(0);
    Decimal::from_i128_with_scale(as_i128, 8)
}

/// The maximum ratio allowed at `event_timestamp`, still scaled by
/// `10^ratio_decimals` exactly as `snapshot_ratio` is (spec.md §3):
/// `snapshot_ratio + snapshot_ratio * max_yearly_bps * elapsed / (10000 * seconds_per_year)`.
pub fn max_ratio(params: &CapoParameters, event_timestamp: u64) -> BigRational {
    let snapshot = BigRational::from_integer(u256_to_bigint(params.snapshot_ratio));
    let elapsed = event_timestamp.saturating_sub(params.snapshot_timestamp);
    let growth = &snapshot * BigInt::from(params.max_yearly_growth_bps) * BigInt::from(elapsed)
        / (BigInt::from(PERCENTAGE_FACTOR) * BigInt::from(SECONDS_PER_YEAR));
    snapshot + growth
}

/// Applies the CAPO cap. `raw_price` and `underlying_price` are USD prices
/// (e.g. the LSD's exchange-rate-implied price and the underlying's
/// Chainlink/Aave-oracle price). Returns the capped USD price, quantized to
/// 8 decimals, and whether the cap was actually applied.
pub fn apply_capo_cap(
    raw_price: Decimal,
    underlying_price: Decimal,
    params: &CapoParameters,
    event_timestamp: u64,
) -> (Decimal, bool) {
    let scale = BigRational::from_integer(BigInt::from(10).pow(params.ratio_decimals as u32));
    let raw_price_r = decimal_to_rational(raw_price);
    let underlying_price_r = decimal_to_rational(underlying_price);

    if underlying_price_r == BigRational::from_integer(BigInt::from(0)) {
        return (Decimal::ZERO, false);
    }

    let current_ratio = (raw_price_r / underlying_price_r.clone()) * &scale;
    let max_ratio = max_ratio(params, event_timestamp);

    let was_capped = current_ratio >= max_ratio;
    let bounded_ratio = std::cmp::min(current_ratio, max_ratio);

    let final_price_r = underlying_price_r * bounded_ratio / scale;
    (rational_to_decimal_8dp(&final_price_r), was_capped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn params() -> CapoParameters {
        CapoParameters {
            snapshot_ratio: U256::from(1_150_000_000_000_000_000_u128), // 1.15 scaled 1e18
            snapshot_timestamp: 1_700_000_000,
            max_yearly_growth_bps: 1000, // 10% per year
            ratio_decimals: 18,
        }
    }

    #[test]
    fn max_ratio_grows_linearly_with_elapsed_time() {
        let p = params();
        let one_year_later = p.snapshot_timestamp + SECONDS_PER_YEAR;
        let r = max_ratio(&p, one_year_later);
        // 1.15 * 1.10 = 1.265, scaled by 1e18
        let expected = BigRational::from_integer(BigInt::from(1_265_000_000_000_000_000_u128));
        assert_eq!(r, expected);
    }

    #[test]
    fn cap_applies_when_ratio_exceeds_max() {
        let p = params();
        let event_ts = p.snapshot_timestamp; // no elapsed time -> max_ratio == snapshot_ratio
        let underlying_price = dec!(3000);
        // raw ratio of 1.30 implies raw_price = 1.30 * 3000 = 3900, above the
        // 1.15 snapshot cap (no elapsed growth), so capped price should equal
        // underlying_price * 1.15 = 3450.
        let raw_price = dec!(3900);
        let (capped, was_capped) = apply_capo_cap(raw_price, underlying_price, &p, event_ts);
        assert!(was_capped);
        assert_eq!(capped, dec!(3450.00000000));
    }

    #[test]
    fn cap_does_not_apply_when_ratio_under_max() {
        let p = params();
        let event_ts = p.snapshot_timestamp;
        let underlying_price = dec!(3000);
        // raw ratio of 1.10 is below the 1.15 cap.
        let raw_price = dec!(3300);
        let (price, was_capped) = apply_capo_cap(raw_price, underlying_price, &p, event_ts);
        assert!(!was_capped);
        assert_eq!(price, dec!(3300.00000000));
    }
}
