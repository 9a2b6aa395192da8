//! Protocol constants.
//!
//! These values are shared with the on-chain contracts; changing any of them
//! breaks bit-for-bit agreement with authoritative results.

/// Decimal places used for every internal balance.
pub const INTERNAL_TOKEN_DECIMALS: u32 = 8;

/// Internal precision shared by all currencies (1e8).
pub const INTERNAL_TOKEN_PRECISION: i128 = 100_000_000;

/// Precision of annualized rates and exchange rates (1e9 = 100% / 1.0).
pub const RATE_PRECISION: i128 = 1_000_000_000;

/// One basis point in rate precision.
pub const BASIS_POINT: i128 = RATE_PRECISION / 10_000;

/// Denominator of haircut and buffer percentages.
pub const PERCENTAGE_DECIMALS: i128 = 100;

/// Denominator of ratios quoted in basis points.
pub const BASIS_POINTS_DECIMALS: i128 = 10_000;

/// Precision of asset-to-underlying exchange rates (1e18).
pub const ASSET_RATE_PRECISION: i128 = 1_000_000_000_000_000_000;

/// Seconds in a day.
pub const SECONDS_IN_DAY: i64 = 86_400;

/// Days in a quarter; markets roll on quarter boundaries.
pub const DAYS_IN_QUARTER: i64 = 90;

/// Seconds in a quarter.
pub const SECONDS_IN_QUARTER: i64 = DAYS_IN_QUARTER * SECONDS_IN_DAY;

/// Seconds in a year (360 day convention).
pub const SECONDS_IN_YEAR: i64 = 360 * SECONDS_IN_DAY;

/// Maximum fCash share of total pool value.
pub const MAX_MARKET_PROPORTION: i128 = RATE_PRECISION * 96 / 100;

/// Highest market index supported by the protocol.
pub const MAX_TRADED_MARKET_INDEX: u8 = 7;

/// Currency id of ETH, the collateral numeraire.
pub const ETH_CURRENCY_ID: u16 = 1;

/// Symbol of the ETH numeraire.
pub const ETH_SYMBOL: &str = "ETH";

/// Symbol of the governance token.
pub const GOVERNANCE_TOKEN_SYMBOL: &str = "NOTE";

/// Default precision of liquidation rate searches (10 basis points).
pub const DEFAULT_LIQUIDATION_RATE_PRECISION: i128 = 10 * BASIS_POINT;
