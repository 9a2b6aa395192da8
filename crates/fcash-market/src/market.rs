//! Fixed-rate bonding curve market.
//!
//! A [`Market`] is one (currency, maturity) pool trading fCash against asset
//! cash. Prices follow a logit curve over the pool proportion
//!
//! ```text
//! proportion    = (totalfCash - fCashToAccount) / (totalfCash + totalCashUnderlying)
//! exchange rate = ln(proportion / (1 - proportion)) / rateScalar + rateAnchor
//! ```
//!
//! where the rate scalar grows as maturity approaches and the anchor is
//! re-derived on every trade so that the curve passes through the last
//! implied rate at the current proportion. All values are integers at
//! `RATE_PRECISION`; every division truncates toward zero.
//!
//! Live state changes only through [`Market::set_market`]. Every `simulate*`
//! method returns a detached copy.

use std::sync::Arc;

use fcash_core::config::CashGroupConfig;
use fcash_core::constants::{
    BASIS_POINT, MAX_MARKET_PROPORTION, PERCENTAGE_DECIMALS, RATE_PRECISION, SECONDS_IN_YEAR,
};
use fcash_core::{AssetRate, BalanceKind, CoreError, Currency, CurrencyId, Timestamp, TypedAmount};
use fcash_math::fixed_point::{exp, ln};
use fcash_math::wide::{mul_div, sum_products_div};
use fcash_math::MathError;
use serde::{Deserialize, Serialize};

use crate::error::{MarketError, MarketResult};
use crate::source::MarketSnapshot;

const MAX_BRACKET_DOUBLINGS: u32 = 128;
const MAX_BISECTIONS: u32 = 256;

/// Pricing parameters of one market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketParameters {
    /// Curve scalar before time-to-maturity adjustment.
    pub rate_scalar: i128,
    /// Lowest tradable annual rate.
    pub min_rate: i128,
    /// Highest tradable annual rate.
    pub max_rate: i128,
    /// Total fee in basis points of annual rate.
    pub total_fee_bps: i128,
    /// Percentage of fees paid to the reserve.
    pub reserve_fee_share: i128,
    /// Oracle smoothing window in seconds.
    pub rate_oracle_time_window: i64,
}

impl MarketParameters {
    /// Parameters of market `market_index` in a cash group.
    pub fn for_market(config: &CashGroupConfig, market_index: u8) -> MarketResult<Self> {
        let rate_scalar = usize::from(market_index)
            .checked_sub(1)
            .and_then(|i| config.rate_scalars.get(i))
            .copied()
            .ok_or(CoreError::InvalidMarketIndex {
                index: market_index,
                max: config.max_market_index,
            })?;
        Ok(Self {
            rate_scalar,
            min_rate: config.min_rate,
            max_rate: config.max_rate,
            total_fee_bps: config.total_fee_bps,
            reserve_fee_share: config.reserve_fee_share,
            rate_oracle_time_window: config.rate_oracle_time_window,
        })
    }
}

/// Result of pricing an fCash trade.
///
/// Cash amounts are signed from the account's point of view: lending
/// (positive fCash) pays cash, borrowing (negative fCash) receives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeQuote {
    /// fCash to the account.
    pub fcash: TypedAmount,
    /// Net asset cash to the account, after fees.
    pub net_asset_cash: TypedAmount,
    /// Net underlying cash to the account, after fees.
    pub net_underlying_cash: TypedAmount,
    /// Total fee in underlying.
    pub fee: TypedAmount,
    /// Share of the fee paid to the reserve, in asset cash.
    pub reserve_fee: TypedAmount,
    /// Asset cash added to (positive) or removed from the pool.
    pub asset_cash_to_market: TypedAmount,
    /// Exchange rate before fees.
    pub pre_fee_exchange_rate: i128,
    /// Exchange rate after fees.
    pub post_fee_exchange_rate: i128,
    /// Annualized rate of the post fee exchange rate.
    pub trade_rate: i128,
    /// Implied rate of the pool after the trade.
    pub post_trade_implied_rate: i128,
}

/// A trade quote with a slippage limit applied to its rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlippageQuote {
    /// The unbounded quote.
    pub quote: TradeQuote,
    /// Exchange rate at the slippage limit.
    pub post_slippage_exchange_rate: i128,
    /// Annual rate at the slippage limit.
    pub post_slippage_annual_rate: i128,
}

/// Tokens minted by adding liquidity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityAdded {
    /// Liquidity tokens to the account.
    pub tokens: TypedAmount,
    /// fCash to the account; negative, matching the pool's fCash share.
    pub fcash: TypedAmount,
}

/// Curve state fixed for the duration of one pricing call.
#[derive(Debug, Clone, Copy)]
struct Curve {
    total_fcash: i128,
    total_cash_underlying: i128,
    rate_scalar: i128,
    rate_anchor: i128,
    time_to_maturity: i64,
}

impl Curve {
    fn exchange_rate(&self, fcash_to_account: i128) -> MarketResult<i128> {
        let numerator = self
            .total_fcash
            .checked_sub(fcash_to_account)
            .ok_or_else(|| MathError::overflow("exchange_rate"))?;
        if numerator <= 0 {
            return Err(MarketError::trade_failed("insufficient fCash in market"));
        }
        let denominator = self.total_fcash + self.total_cash_underlying;
        if denominator <= 0 {
            return Err(MarketError::trade_failed("market has no liquidity"));
        }
        let proportion = mul_div(numerator, RATE_PRECISION, denominator)?;
        if proportion > MAX_MARKET_PROPORTION {
            return Err(MarketError::trade_failed(format!(
                "proportion {proportion} above maximum"
            )));
        }

        let rate = ln_proportion(proportion)? / self.rate_scalar + self.rate_anchor;
        if rate < RATE_PRECISION {
            return Err(MarketError::trade_failed("exchange rate below one"));
        }
        Ok(rate)
    }

    fn implied_rate(&self) -> MarketResult<i128> {
        let exchange_rate = self.exchange_rate(0)?;
        rate_for_time(exchange_rate, self.time_to_maturity)
    }
}

fn ln_proportion(proportion: i128) -> MarketResult<i128> {
    if proportion <= 0 || proportion >= RATE_PRECISION {
        return Err(MarketError::trade_failed(format!(
            "proportion {proportion} outside (0, 1)"
        )));
    }
    let odds = mul_div(proportion, RATE_PRECISION, RATE_PRECISION - proportion)?;
    Ok(ln(odds, RATE_PRECISION)?)
}

fn time_to_maturity(maturity: Timestamp, t: Timestamp) -> MarketResult<i64> {
    if maturity <= t {
        return Err(MarketError::Matured { maturity, time: t });
    }
    Ok(maturity - t)
}

fn exchange_rate_for_time(rate: i128, time_to_maturity: i64) -> MarketResult<i128> {
    let exponent = mul_div(
        rate,
        i128::from(time_to_maturity),
        i128::from(SECONDS_IN_YEAR),
    )?;
    Ok(exp(exponent, RATE_PRECISION)?)
}

fn rate_for_time(exchange_rate: i128, time_to_maturity: i64) -> MarketResult<i128> {
    let ln_rate = ln(exchange_rate, RATE_PRECISION)?;
    Ok(mul_div(
        ln_rate,
        i128::from(SECONDS_IN_YEAR),
        i128::from(time_to_maturity),
    )?)
}

/// One (currency, maturity) bonding curve pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Market {
    currency_id: CurrencyId,
    market_index: u8,
    maturity: Timestamp,
    underlying_symbol: Arc<str>,
    asset_symbol: Arc<str>,
    total_fcash: TypedAmount,
    total_asset_cash: TypedAmount,
    total_liquidity: TypedAmount,
    last_implied_rate: i128,
    oracle_rate: i128,
    previous_trade_time: Timestamp,
    parameters: MarketParameters,
    asset_rate: AssetRate,
}

impl Market {
    /// Builds a market from an external snapshot.
    #[must_use]
    pub fn from_snapshot(
        currency: &Currency,
        market_index: u8,
        parameters: MarketParameters,
        snapshot: &MarketSnapshot,
    ) -> Self {
        let underlying = currency.underlying_symbol.clone();
        let asset = currency.asset_symbol.clone();
        Self {
            currency_id: currency.id,
            market_index,
            maturity: snapshot.maturity,
            total_fcash: TypedAmount::from_raw(
                snapshot.total_fcash,
                BalanceKind::InternalUnderlying,
                underlying.clone(),
            ),
            total_asset_cash: TypedAmount::from_raw(
                snapshot.total_asset_cash,
                BalanceKind::InternalAsset,
                asset.clone(),
            ),
            total_liquidity: TypedAmount::from_raw(
                snapshot.total_liquidity,
                BalanceKind::LiquidityToken,
                asset.clone(),
            ),
            underlying_symbol: underlying,
            asset_symbol: asset,
            last_implied_rate: snapshot.last_implied_rate,
            oracle_rate: snapshot.oracle_rate,
            previous_trade_time: snapshot.previous_trade_time,
            parameters,
            asset_rate: currency.asset_rate,
        }
    }

    /// Currency of the market.
    #[must_use]
    pub fn currency_id(&self) -> CurrencyId {
        self.currency_id
    }

    /// Market index within the cash group.
    #[must_use]
    pub fn market_index(&self) -> u8 {
        self.market_index
    }

    /// Maturity timestamp.
    #[must_use]
    pub fn maturity(&self) -> Timestamp {
        self.maturity
    }

    /// Total fCash in the pool.
    #[must_use]
    pub fn total_fcash(&self) -> &TypedAmount {
        &self.total_fcash
    }

    /// Total asset cash in the pool.
    #[must_use]
    pub fn total_asset_cash(&self) -> &TypedAmount {
        &self.total_asset_cash
    }

    /// Total liquidity tokens outstanding.
    #[must_use]
    pub fn total_liquidity(&self) -> &TypedAmount {
        &self.total_liquidity
    }

    /// Implied rate of the last trade.
    #[must_use]
    pub fn last_implied_rate(&self) -> i128 {
        self.last_implied_rate
    }

    /// Stored oracle rate.
    #[must_use]
    pub fn oracle_rate(&self) -> i128 {
        self.oracle_rate
    }

    /// Time of the last trade.
    #[must_use]
    pub fn previous_trade_time(&self) -> Timestamp {
        self.previous_trade_time
    }

    /// Pricing parameters.
    #[must_use]
    pub fn parameters(&self) -> &MarketParameters {
        &self.parameters
    }

    /// Current snapshot of the market state.
    #[must_use]
    pub fn snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            maturity: self.maturity,
            total_fcash: self.total_fcash.value(),
            total_asset_cash: self.total_asset_cash.value(),
            total_liquidity: self.total_liquidity.value(),
            last_implied_rate: self.last_implied_rate,
            oracle_rate: self.oracle_rate,
            previous_trade_time: self.previous_trade_time,
        }
    }

    /// Seconds until maturity; fails once matured.
    pub fn time_to_maturity(&self, t: Timestamp) -> MarketResult<i64> {
        time_to_maturity(self.maturity, t)
    }

    /// Exchange rate `e^(rate * t)` between `t` and `maturity`.
    pub fn exchange_rate_from_interest_rate(
        rate: i128,
        t: Timestamp,
        maturity: Timestamp,
    ) -> MarketResult<i128> {
        exchange_rate_for_time(rate, time_to_maturity(maturity, t)?)
    }

    /// Annual rate `ln(exchange_rate) / t` between `t` and `maturity`.
    pub fn interest_rate_from_exchange_rate(
        exchange_rate: i128,
        t: Timestamp,
        maturity: Timestamp,
    ) -> MarketResult<i128> {
        rate_for_time(exchange_rate, time_to_maturity(maturity, t)?)
    }

    /// Implied rate of the pool at `t`.
    ///
    /// The anchor is fitted to the last implied rate, so until the next trade
    /// the pool implies that rate.
    pub fn implied_rate(&self, t: Timestamp) -> MarketResult<i128> {
        self.time_to_maturity(t)?;
        Ok(self.last_implied_rate)
    }

    /// Oracle rate smoothed over the configured window.
    ///
    /// After a full window without trades this is the last implied rate;
    /// within the window it is the time weighted mix of the last implied rate
    /// and the stored oracle rate.
    pub fn smoothed_oracle_rate(&self, t: Timestamp) -> MarketResult<i128> {
        let window = i128::from(self.parameters.rate_oracle_time_window);
        let elapsed = i128::from((t - self.previous_trade_time).max(0));
        if elapsed > window {
            return Ok(self.last_implied_rate);
        }
        Ok(sum_products_div(
            &[
                (self.last_implied_rate, elapsed),
                (self.oracle_rate, window - elapsed),
            ],
            window,
        )?)
    }

    fn check_rate(&self, rate: i128) -> MarketResult<()> {
        if rate < self.parameters.min_rate || rate > self.parameters.max_rate {
            return Err(MarketError::RateOutOfBounds {
                rate,
                min: self.parameters.min_rate,
                max: self.parameters.max_rate,
            });
        }
        Ok(())
    }

    fn curve(&self, t: Timestamp) -> MarketResult<Curve> {
        let time_to_maturity = self.time_to_maturity(t)?;
        let rate_scalar = mul_div(
            self.parameters.rate_scalar,
            i128::from(SECONDS_IN_YEAR),
            i128::from(time_to_maturity),
        )?;
        if rate_scalar <= 0 {
            return Err(MarketError::trade_failed("rate scalar truncates to zero"));
        }
        let total_fcash = self.total_fcash.value();
        let total_cash_underlying = self
            .asset_rate
            .to_underlying(self.total_asset_cash.value())?;
        if total_fcash + total_cash_underlying <= 0 {
            return Err(MarketError::trade_failed("market has no liquidity"));
        }

        let proportion = mul_div(
            total_fcash,
            RATE_PRECISION,
            total_fcash + total_cash_underlying,
        )?;
        let exchange_rate = exchange_rate_for_time(self.last_implied_rate, time_to_maturity)?;
        let rate_anchor = exchange_rate - ln_proportion(proportion)? / rate_scalar;

        Ok(Curve {
            total_fcash,
            total_cash_underlying,
            rate_scalar,
            rate_anchor,
            time_to_maturity,
        })
    }

    fn underlying(&self, value: i128) -> TypedAmount {
        TypedAmount::from_raw(
            value,
            BalanceKind::InternalUnderlying,
            self.underlying_symbol.clone(),
        )
    }

    fn asset(&self, value: i128) -> TypedAmount {
        TypedAmount::from_raw(value, BalanceKind::InternalAsset, self.asset_symbol.clone())
    }

    fn quote_on_curve(&self, curve: &Curve, fcash: i128) -> MarketResult<TradeQuote> {
        let pre_fee_exchange_rate = curve.exchange_rate(fcash)?;
        let fee_rate = exchange_rate_for_time(
            self.parameters.total_fee_bps * BASIS_POINT,
            curve.time_to_maturity,
        )?;

        // Lending divides by the fee rate, borrowing multiplies
        let post_fee_exchange_rate = if fcash > 0 {
            let rate = mul_div(pre_fee_exchange_rate, RATE_PRECISION, fee_rate)?;
            if rate < RATE_PRECISION {
                return Err(MarketError::trade_failed(
                    "post fee exchange rate below one",
                ));
            }
            rate
        } else {
            mul_div(pre_fee_exchange_rate, fee_rate, RATE_PRECISION)?
        };

        let pre_fee_cash = -mul_div(fcash, RATE_PRECISION, pre_fee_exchange_rate)?;
        let net_cash = -mul_div(fcash, RATE_PRECISION, post_fee_exchange_rate)?;
        let fee = pre_fee_cash - net_cash;
        let reserve_fee = mul_div(fee, self.parameters.reserve_fee_share, PERCENTAGE_DECIMALS)?;

        let net_asset_cash = self.asset_rate.to_asset(net_cash)?;
        let reserve_asset_cash = self.asset_rate.to_asset(reserve_fee)?;
        let asset_cash_to_market = -(net_asset_cash + reserve_asset_cash);

        let post_trade = Curve {
            total_fcash: curve.total_fcash - fcash,
            total_cash_underlying: self
                .asset_rate
                .to_underlying(self.total_asset_cash.value() + asset_cash_to_market)?,
            ..*curve
        };
        let post_trade_implied_rate = post_trade.implied_rate()?;
        self.check_rate(post_trade_implied_rate)?;

        Ok(TradeQuote {
            fcash: self.underlying(fcash),
            net_asset_cash: self.asset(net_asset_cash),
            net_underlying_cash: self.underlying(net_cash),
            fee: self.underlying(fee),
            reserve_fee: self.asset(reserve_asset_cash),
            asset_cash_to_market: self.asset(asset_cash_to_market),
            pre_fee_exchange_rate,
            post_fee_exchange_rate,
            trade_rate: rate_for_time(post_fee_exchange_rate, curve.time_to_maturity)?,
            post_trade_implied_rate,
        })
    }

    /// Prices a trade of `fcash` to the account.
    ///
    /// Fails with [`MarketError::RateOutOfBounds`] when the pool's implied
    /// rate after the trade leaves the configured bounds, and with
    /// [`MarketError::TradeFailed`] when the curve cannot absorb the trade.
    pub fn cash_given_fcash(&self, fcash: &TypedAmount, t: Timestamp) -> MarketResult<TradeQuote> {
        fcash.check(BalanceKind::InternalUnderlying, &self.underlying_symbol)?;
        let curve = self.curve(t)?;
        let quote = self.quote_on_curve(&curve, fcash.value())?;
        tracing::trace!(
            currency_id = self.currency_id,
            maturity = self.maturity,
            fcash = fcash.value(),
            net_cash = quote.net_underlying_cash.value(),
            fee = quote.fee.value(),
            "priced fCash trade"
        );
        Ok(quote)
    }

    /// fCash the account trades to receive (positive) or pay (negative)
    /// `cash`, given in internal underlying or internal asset.
    ///
    /// The bracket is grown by doubling and then bisected on integers; trades
    /// the curve rejects count as overshooting. The result prices back to
    /// `cash` within one unit of truncation whenever `cash` is reachable.
    pub fn fcash_given_cash(&self, cash: &TypedAmount, t: Timestamp) -> MarketResult<TypedAmount> {
        let target = if cash.kind() == BalanceKind::InternalAsset {
            cash.check(BalanceKind::InternalAsset, &self.asset_symbol)?;
            self.asset_rate.to_underlying(cash.value())?
        } else {
            cash.check(BalanceKind::InternalUnderlying, &self.underlying_symbol)?;
            cash.value()
        };
        if target == 0 {
            return Ok(self.underlying(0));
        }

        let curve = self.curve(t)?;
        // Receiving cash means borrowing, paying cash means lending
        let direction: i128 = if target > 0 { -1 } else { 1 };
        let goal = target.abs();
        let cash_for = |magnitude: i128| -> MarketResult<Option<i128>> {
            match self.quote_on_curve(&curve, direction * magnitude) {
                Ok(quote) => Ok(Some(quote.net_underlying_cash.value().abs())),
                Err(e) if e.is_domain_violation() => Ok(None),
                Err(e) => Err(e),
            }
        };

        let mut low: i128 = 0;
        let mut high = goal;
        let mut doublings = 0;
        loop {
            match cash_for(high)? {
                Some(value) if value == goal => return Ok(self.underlying(direction * high)),
                Some(value) if value < goal => {
                    low = high;
                    high = high
                        .checked_mul(2)
                        .ok_or_else(|| MathError::overflow("fcash_given_cash"))?;
                    doublings += 1;
                    if doublings >= MAX_BRACKET_DOUBLINGS {
                        return Err(MarketError::trade_failed("cash amount not reachable"));
                    }
                }
                _ => break,
            }
        }

        let mut iterations = 0;
        while high - low > 1 && iterations < MAX_BISECTIONS {
            let mid = low + (high - low) / 2;
            match cash_for(mid)? {
                Some(value) if value == goal => return Ok(self.underlying(direction * mid)),
                Some(value) if value < goal => low = mid,
                _ => high = mid,
            }
            iterations += 1;
        }

        // The curve rejects everything past `low`, so `goal` is out of reach
        let Some(high_cash) = cash_for(high)? else {
            return Err(MarketError::trade_failed(
                "cash amount exceeds market liquidity",
            ));
        };
        let low_gap = goal - cash_for(low)?.unwrap_or(0);
        let best = if high_cash - goal < low_gap { high } else { low };
        Ok(self.underlying(direction * best))
    }

    /// Prices a trade and bounds its rate by `slippage_bps`.
    ///
    /// Lending is bounded below the trade rate (never below zero), borrowing
    /// above it.
    pub fn quote_with_slippage_bound(
        &self,
        fcash: &TypedAmount,
        slippage_bps: i128,
        t: Timestamp,
    ) -> MarketResult<SlippageQuote> {
        let quote = self.cash_given_fcash(fcash, t)?;
        let shift = slippage_bps * BASIS_POINT;
        let post_slippage_annual_rate = if fcash.is_positive() {
            (quote.trade_rate - shift).max(0)
        } else {
            quote.trade_rate + shift
        };
        let post_slippage_exchange_rate =
            exchange_rate_for_time(post_slippage_annual_rate, self.time_to_maturity(t)?)?;
        Ok(SlippageQuote {
            quote,
            post_slippage_exchange_rate,
            post_slippage_annual_rate,
        })
    }

    /// Pro-rata claim of `tokens` on the pool's fCash and asset cash.
    pub fn liquidity_claims(&self, tokens: &TypedAmount) -> MarketResult<(TypedAmount, TypedAmount)> {
        tokens.check(BalanceKind::LiquidityToken, &self.asset_symbol)?;
        let total = self.total_liquidity.value();
        if total <= 0 {
            return Err(MarketError::trade_failed("market has no liquidity tokens"));
        }
        let fcash = mul_div(self.total_fcash.value(), tokens.value(), total)?;
        let asset_cash = mul_div(self.total_asset_cash.value(), tokens.value(), total)?;
        Ok((self.underlying(fcash), self.asset(asset_cash)))
    }

    /// Refreshes the market from an external snapshot.
    ///
    /// Returns true if any field changed.
    pub fn set_market(&mut self, snapshot: &MarketSnapshot) -> MarketResult<bool> {
        if snapshot.maturity != self.maturity {
            return Err(MarketError::maturity_out_of_range(
                snapshot.maturity,
                format!("snapshot does not match market maturing at {}", self.maturity),
            ));
        }
        if self.snapshot() == *snapshot {
            return Ok(false);
        }
        self.total_fcash = self.total_fcash.with_value(snapshot.total_fcash);
        self.total_asset_cash = self.total_asset_cash.with_value(snapshot.total_asset_cash);
        self.total_liquidity = self.total_liquidity.with_value(snapshot.total_liquidity);
        self.last_implied_rate = snapshot.last_implied_rate;
        self.oracle_rate = snapshot.oracle_rate;
        self.previous_trade_time = snapshot.previous_trade_time;
        Ok(true)
    }

    /// Detached copy whose curve is re-anchored at `rate`.
    ///
    /// Both the last implied and the oracle rate move to `rate` as of `t`.
    pub fn simulate(&self, rate: i128, t: Timestamp) -> MarketResult<Market> {
        self.time_to_maturity(t)?;
        self.check_rate(rate)?;
        let mut market = self.clone();
        market.last_implied_rate = rate;
        market.oracle_rate = rate;
        market.previous_trade_time = t;
        Ok(market)
    }

    /// Detached copy of the pool after trading `fcash` at `t`.
    pub fn simulate_trade(
        &self,
        fcash: &TypedAmount,
        t: Timestamp,
    ) -> MarketResult<(Market, TradeQuote)> {
        let quote = self.cash_given_fcash(fcash, t)?;
        let mut market = self.clone();
        market.oracle_rate = self.smoothed_oracle_rate(t)?;
        market.total_fcash = market.total_fcash.sub(&quote.fcash)?;
        market.total_asset_cash = market.total_asset_cash.add(&quote.asset_cash_to_market)?;
        market.last_implied_rate = quote.post_trade_implied_rate;
        market.previous_trade_time = t;
        Ok((market, quote))
    }

    /// Detached copy of the pool after depositing `asset_cash` as liquidity.
    ///
    /// Tokens and fCash are minted pro rata to the pool's cash.
    pub fn simulate_add_liquidity(
        &self,
        asset_cash: &TypedAmount,
    ) -> MarketResult<(Market, LiquidityAdded)> {
        asset_cash.check(BalanceKind::InternalAsset, &self.asset_symbol)?;
        if !asset_cash.is_positive() {
            return Err(MarketError::trade_failed("liquidity deposit must be positive"));
        }
        let total_cash = self.total_asset_cash.value();
        if total_cash <= 0 {
            return Err(MarketError::trade_failed("market is not initialized"));
        }

        let tokens = mul_div(self.total_liquidity.value(), asset_cash.value(), total_cash)?;
        let fcash = mul_div(self.total_fcash.value(), asset_cash.value(), total_cash)?;

        let mut market = self.clone();
        market.total_liquidity = market
            .total_liquidity
            .add(&self.total_liquidity.with_value(tokens))?;
        market.total_fcash = market.total_fcash.add(&self.underlying(fcash))?;
        market.total_asset_cash = market.total_asset_cash.add(asset_cash)?;

        let added = LiquidityAdded {
            tokens: self.total_liquidity.with_value(tokens),
            fcash: self.underlying(-fcash),
        };
        Ok((market, added))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fcash_core::config::SystemConfig;
    use fcash_core::constants::{INTERNAL_TOKEN_PRECISION, SECONDS_IN_DAY};
    use fcash_core::time::{market_maturity, reference_time};
    use fcash_core::CurrencyRegistry;

    const PERCENT: i128 = RATE_PRECISION / 100;
    const DAI: i128 = INTERNAL_TOKEN_PRECISION;

    fn now() -> Timestamp {
        reference_time(1_700_000_000) + 10 * SECONDS_IN_DAY
    }

    fn market_with(max_rate: i128) -> Market {
        let config = SystemConfig::sample();
        let registry = CurrencyRegistry::from_config(&config).unwrap();
        let mut parameters =
            MarketParameters::for_market(config.cash_group(2).unwrap(), 1).unwrap();
        parameters.max_rate = max_rate;
        let t = now();
        let snapshot = MarketSnapshot {
            maturity: market_maturity(t, 1).unwrap(),
            total_fcash: 1_000_000 * DAI,
            // 50m cDAI at 0.02 is 1m DAI
            total_asset_cash: 50_000_000 * DAI,
            total_liquidity: 50_000_000 * DAI,
            last_implied_rate: 5 * PERCENT,
            oracle_rate: 5 * PERCENT,
            previous_trade_time: t - 3_600,
        };
        Market::from_snapshot(registry.get(2).unwrap(), 1, parameters, &snapshot)
    }

    fn market() -> Market {
        market_with(40 * PERCENT)
    }

    fn dai(value: i128) -> TypedAmount {
        TypedAmount::from_raw(value, BalanceKind::InternalUnderlying, "DAI")
    }

    #[test]
    fn test_parameters_for_market() {
        let config = SystemConfig::sample();
        let group = config.cash_group(2).unwrap();
        assert_eq!(MarketParameters::for_market(group, 3).unwrap().rate_scalar, 210);
        assert!(MarketParameters::for_market(group, 0).is_err());
        assert!(MarketParameters::for_market(group, 4).is_err());
    }

    #[test]
    fn test_exchange_rate_round_trip() {
        let t = now();
        let maturity = t + 360 * SECONDS_IN_DAY;
        let exchange_rate =
            Market::exchange_rate_from_interest_rate(5 * PERCENT, t, maturity).unwrap();
        assert_eq!(exchange_rate, 1_051_271_096);
        let rate = Market::interest_rate_from_exchange_rate(exchange_rate, t, maturity).unwrap();
        assert!((rate - 5 * PERCENT).abs() <= 2);
        assert!(Market::exchange_rate_from_interest_rate(5 * PERCENT, t, t).is_err());
    }

    #[test]
    fn test_smoothed_oracle_rate() {
        let mut market = market();
        let t = now();
        assert_eq!(market.smoothed_oracle_rate(t).unwrap(), 5 * PERCENT);

        let mut snapshot = market.snapshot();
        snapshot.last_implied_rate = 6 * PERCENT;
        snapshot.oracle_rate = 4 * PERCENT;
        snapshot.previous_trade_time = t - 600;
        assert!(market.set_market(&snapshot).unwrap());
        assert_eq!(market.smoothed_oracle_rate(t).unwrap(), 5 * PERCENT);
        assert_eq!(market.smoothed_oracle_rate(t - 600).unwrap(), 4 * PERCENT);
        assert_eq!(market.smoothed_oracle_rate(t + 1_000).unwrap(), 6 * PERCENT);
    }

    #[test]
    fn test_smoothed_oracle_rate_truncates_once() {
        let mut market = market();
        let t = now();
        assert_eq!(market.parameters().rate_oracle_time_window, 1_200);

        let mut snapshot = market.snapshot();
        snapshot.last_implied_rate = 50_000_001;
        snapshot.oracle_rate = 40_000_001;
        snapshot.previous_trade_time = t - 1;
        market.set_market(&snapshot).unwrap();

        // (40_000_001 * 1_199 + 50_000_001) / 1_200, rounding the terms
        // separately would give 40_008_333
        assert_eq!(market.smoothed_oracle_rate(t).unwrap(), 40_008_334);
    }

    #[test]
    fn test_lending_quote() {
        let market = market();
        let quote = market.cash_given_fcash(&dai(100 * DAI), now()).unwrap();

        assert!(quote.net_underlying_cash.is_negative());
        assert!(quote.net_underlying_cash.value() > -100 * DAI);
        assert_eq!(quote.net_asset_cash.symbol(), "cDAI");
        assert!(quote.fee.is_positive());
        assert!(quote.reserve_fee.is_positive());
        assert!(quote.asset_cash_to_market.is_positive());
        assert!(quote.post_fee_exchange_rate < quote.pre_fee_exchange_rate);
        assert!(quote.trade_rate < 5 * PERCENT);
        assert!(quote.post_trade_implied_rate < 5 * PERCENT);
    }

    #[test]
    fn test_borrowing_quote() {
        let market = market();
        let quote = market.cash_given_fcash(&dai(-100 * DAI), now()).unwrap();

        assert!(quote.net_underlying_cash.is_positive());
        assert!(quote.net_underlying_cash.value() < 100 * DAI);
        assert!(quote.fee.is_positive());
        assert!(quote.asset_cash_to_market.is_negative());
        assert!(quote.post_fee_exchange_rate > quote.pre_fee_exchange_rate);
        assert!(quote.trade_rate > 5 * PERCENT);
        assert!(quote.post_trade_implied_rate > 5 * PERCENT);
    }

    #[test]
    fn test_zero_trade() {
        let quote = market().cash_given_fcash(&dai(0), now()).unwrap();
        assert!(quote.net_underlying_cash.is_zero());
        assert!(quote.fee.is_zero());
    }

    #[test]
    fn test_rate_out_of_bounds() {
        let market = market_with(5 * PERCENT + 5 * PERCENT / 100);
        let err = market
            .cash_given_fcash(&dai(-100_000 * DAI), now())
            .unwrap_err();
        assert!(matches!(err, MarketError::RateOutOfBounds { .. }));
    }

    #[test]
    fn test_curve_domain() {
        let market = market();
        let t = now();
        // Borrowing 50m pushes the proportion to 98%
        assert!(matches!(
            market.cash_given_fcash(&dai(-50_000_000 * DAI), t),
            Err(MarketError::TradeFailed { .. })
        ));
        // Lending more fCash than the pool holds
        assert!(matches!(
            market.cash_given_fcash(&dai(2_000_000 * DAI), t),
            Err(MarketError::TradeFailed { .. })
        ));
        assert!(market
            .cash_given_fcash(&TypedAmount::from_raw(1, BalanceKind::InternalAsset, "cDAI"), t)
            .is_err());
    }

    #[test]
    fn test_matured_market() {
        let market = market();
        let err = market
            .cash_given_fcash(&dai(DAI), market.maturity())
            .unwrap_err();
        assert!(matches!(err, MarketError::Matured { .. }));
    }

    #[test]
    fn test_fcash_given_cash_inverts_borrowing() {
        let market = market();
        let t = now();
        for cash in [2_500 * DAI, 37 * DAI + 12_345, 1] {
            let fcash = market.fcash_given_cash(&dai(cash), t).unwrap();
            assert!(fcash.is_negative());
            let quote = market.cash_given_fcash(&fcash, t).unwrap();
            assert!(
                (quote.net_underlying_cash.value() - cash).abs() <= 1,
                "cash {cash} priced back to {}",
                quote.net_underlying_cash.value()
            );
        }
    }

    #[test]
    fn test_fcash_given_cash_inverts_lending() {
        let market = market();
        let t = now();
        for fcash in [1_000 * DAI, 37 * DAI + 12_345] {
            let cash = market
                .cash_given_fcash(&dai(fcash), t)
                .unwrap()
                .net_underlying_cash
                .value();
            let fcash = market.fcash_given_cash(&dai(cash), t).unwrap();
            assert!(fcash.is_positive());
            let quote = market.cash_given_fcash(&fcash, t).unwrap();
            assert!(
                (quote.net_underlying_cash.value() - cash).abs() <= 1,
                "cash {cash} priced back to {}",
                quote.net_underlying_cash.value()
            );
        }
    }

    #[test]
    fn test_fcash_given_asset_cash() {
        let market = market();
        let t = now();
        let asset = TypedAmount::from_raw(50_000 * DAI, BalanceKind::InternalAsset, "cDAI");
        let fcash = market.fcash_given_cash(&asset, t).unwrap();
        assert!(fcash.is_negative());
        let quote = market.cash_given_fcash(&fcash, t).unwrap();
        assert!((quote.net_underlying_cash.value() - 1_000 * DAI).abs() <= 1);
    }

    #[test]
    fn test_fcash_given_unreachable_cash() {
        let err = market()
            .fcash_given_cash(&dai(-5_000_000 * DAI), now())
            .unwrap_err();
        assert!(matches!(err, MarketError::TradeFailed { .. }));
    }

    #[test]
    fn test_slippage_bound() {
        let market = market();
        let t = now();
        let lend = market
            .quote_with_slippage_bound(&dai(100 * DAI), 50, t)
            .unwrap();
        assert_eq!(
            lend.post_slippage_annual_rate,
            lend.quote.trade_rate - 50 * BASIS_POINT
        );
        assert!(lend.post_slippage_exchange_rate < lend.quote.post_fee_exchange_rate);

        let borrow = market
            .quote_with_slippage_bound(&dai(-100 * DAI), 50, t)
            .unwrap();
        assert_eq!(
            borrow.post_slippage_annual_rate,
            borrow.quote.trade_rate + 50 * BASIS_POINT
        );
    }

    #[test]
    fn test_simulate_is_detached() {
        let market = market();
        let t = now();
        let simulated = market.simulate(7 * PERCENT, t).unwrap();
        assert_eq!(simulated.implied_rate(t).unwrap(), 7 * PERCENT);
        assert_eq!(simulated.smoothed_oracle_rate(t).unwrap(), 7 * PERCENT);
        assert_eq!(market.last_implied_rate(), 5 * PERCENT);

        let quote = simulated.cash_given_fcash(&dai(0), t).unwrap();
        // exp and ln each truncate once, amplified by year / time to maturity
        assert!((quote.post_trade_implied_rate - 7 * PERCENT).abs() <= 10);

        assert!(matches!(
            market.simulate(41 * PERCENT, t),
            Err(MarketError::RateOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_set_market_reports_changes() {
        let mut market = market();
        let snapshot = market.snapshot();
        assert!(!market.set_market(&snapshot).unwrap());

        let mut moved = snapshot;
        moved.total_fcash += 1;
        assert!(market.set_market(&moved).unwrap());
        assert_eq!(market.total_fcash().value(), snapshot.total_fcash + 1);

        moved.maturity += 1;
        assert!(market.set_market(&moved).is_err());
    }

    #[test]
    fn test_simulate_trade() {
        let market = market();
        let t = now();
        let (after, quote) = market.simulate_trade(&dai(-1_000 * DAI), t).unwrap();
        assert_eq!(
            after.total_fcash().value(),
            market.total_fcash().value() + 1_000 * DAI
        );
        assert_eq!(
            after.total_asset_cash().value(),
            market.total_asset_cash().value() + quote.asset_cash_to_market.value()
        );
        assert_eq!(after.last_implied_rate(), quote.post_trade_implied_rate);
        assert_eq!(after.previous_trade_time(), t);
        assert_eq!(market.total_fcash().value(), 1_000_000 * DAI);
    }

    #[test]
    fn test_simulate_add_liquidity() {
        let market = market();
        let deposit = TypedAmount::from_raw(500_000 * DAI, BalanceKind::InternalAsset, "cDAI");
        let (after, added) = market.simulate_add_liquidity(&deposit).unwrap();

        // 1% of the pool's cash mints 1% of tokens and fCash
        assert_eq!(added.tokens.value(), 500_000 * DAI);
        assert_eq!(added.fcash.value(), -10_000 * DAI);
        assert_eq!(after.total_liquidity().value(), 50_500_000 * DAI);
        assert_eq!(after.total_fcash().value(), 1_010_000 * DAI);

        let (fcash, cash) = after.liquidity_claims(&added.tokens).unwrap();
        assert_eq!(fcash.value(), 10_000 * DAI);
        assert_eq!(cash.value(), 500_000 * DAI);

        assert!(market.simulate_add_liquidity(&deposit.negate().unwrap()).is_err());
    }
}
