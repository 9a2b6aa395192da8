//! Quarter-relative market maturities.
//!
//! Markets roll every quarter: the maturity of market index `i` at time `t`
//! is `reference_time(t) + tenor(i)`.

use chrono::{DateTime, Utc};

use crate::constants::{MAX_TRADED_MARKET_INDEX, SECONDS_IN_QUARTER};
use crate::error::{CoreError, CoreResult};

/// Unix timestamp in seconds.
pub type Timestamp = i64;

/// Start of the quarter containing `t`.
#[must_use]
pub fn reference_time(t: Timestamp) -> Timestamp {
    t - t.rem_euclid(SECONDS_IN_QUARTER)
}

/// Length of the market with the given index, in seconds.
pub fn tenor(market_index: u8) -> CoreResult<i64> {
    let quarters = match market_index {
        1 => 1,
        2 => 2,
        3 => 4,
        4 => 8,
        5 => 20,
        6 => 40,
        7 => 80,
        _ => {
            return Err(CoreError::InvalidMarketIndex {
                index: market_index,
                max: MAX_TRADED_MARKET_INDEX,
            })
        }
    };
    Ok(quarters * SECONDS_IN_QUARTER)
}

/// Maturity of market `market_index` at time `t`.
pub fn market_maturity(t: Timestamp, market_index: u8) -> CoreResult<Timestamp> {
    Ok(reference_time(t) + tenor(market_index)?)
}

/// Index of the first market maturing on or after `maturity`.
///
/// The flag is true when `maturity` does not coincide with that market
/// (the maturity is idiosyncratic).
pub fn market_index_for(
    maturity: Timestamp,
    max_market_index: u8,
    t: Timestamp,
) -> CoreResult<(u8, bool)> {
    if maturity <= t {
        return Err(CoreError::maturity_out_of_range(maturity, "matured"));
    }
    for index in 1..=max_market_index {
        let market = market_maturity(t, index)?;
        if market >= maturity {
            return Ok((index, market != maturity));
        }
    }
    Err(CoreError::maturity_out_of_range(
        maturity,
        "beyond the longest market",
    ))
}

/// Returns true if `maturity` is the maturity of an active market.
#[must_use]
pub fn is_market_maturity(maturity: Timestamp, max_market_index: u8, t: Timestamp) -> bool {
    matches!(market_index_for(maturity, max_market_index, t), Ok((_, false)))
}

/// Settlement date of liquidity tokens held at `t`.
#[must_use]
pub fn liquidity_token_settlement(t: Timestamp) -> Timestamp {
    reference_time(t) + SECONDS_IN_QUARTER
}

/// Converts a timestamp to a UTC date time, if representable.
#[must_use]
pub fn to_datetime(t: Timestamp) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(t, 0)
}

/// Renders a maturity as a UTC calendar date, or raw seconds when out of
/// chrono's range.
#[must_use]
pub fn format_maturity(t: Timestamp) -> String {
    match to_datetime(t) {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => format!("{t}s"),
    }
}
