//! Cash groups.
//!
//! A [`CashGroup`] holds the active markets of one currency, ordered by
//! maturity, together with the currency's risk parameters. It derives an
//! oracle rate for any maturity inside the market grid and values fCash,
//! liquidity tokens and yield tokens against it.

use std::collections::BTreeMap;

use fcash_core::config::{CashGroupConfig, Validate};
use fcash_core::constants::{BASIS_POINT, PERCENTAGE_DECIMALS, RATE_PRECISION, SECONDS_IN_YEAR};
use fcash_core::time::market_maturity;
use fcash_core::{BalanceKind, CoreError, Currency, CurrencyId, Timestamp, TypedAmount};
use fcash_math::fixed_point::exp;
use fcash_math::interpolation::interpolate;
use fcash_math::wide::{accumulate, mul_div, product_div};
use serde::{Deserialize, Serialize};

use crate::error::{MarketError, MarketResult};
use crate::market::{Market, MarketParameters};
use crate::source::{MarketSnapshot, MarketStateSource, YieldTokenState};

/// Claims of liquidity tokens on a market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityTokenValue {
    /// fCash claim in internal underlying.
    pub fcash_claim: TypedAmount,
    /// Cash claim in internal asset.
    pub asset_cash_claim: TypedAmount,
}

/// `e^(-rate * time_to_maturity / year)` at `RATE_PRECISION`.
pub fn discount_factor(rate: i128, time_to_maturity: i64) -> MarketResult<i128> {
    let exponent = mul_div(
        rate,
        i128::from(time_to_maturity),
        i128::from(SECONDS_IN_YEAR),
    )?;
    Ok(exp(-exponent, RATE_PRECISION)?)
}

/// The active markets and risk parameters of one currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CashGroup {
    currency: Currency,
    parameters: CashGroupConfig,
    markets: Vec<Market>,
    yield_token: Option<YieldTokenState>,
    short_term_rate: i128,
}

impl CashGroup {
    /// Loads the markets active at `t` from `source`.
    ///
    /// Maturities are derived from the quarter containing `t`, so a cash
    /// group must be reloaded after every quarter roll.
    pub fn load<S>(
        parameters: &CashGroupConfig,
        currency: &Currency,
        source: &S,
        t: Timestamp,
    ) -> MarketResult<Self>
    where
        S: MarketStateSource + ?Sized,
    {
        parameters.validate_or_error()?;
        if parameters.currency_id != currency.id {
            return Err(CoreError::config(format!(
                "cash group for currency {} loaded with currency {}",
                parameters.currency_id, currency.id
            ))
            .into());
        }

        let mut markets = Vec::with_capacity(usize::from(parameters.max_market_index));
        for index in 1..=parameters.max_market_index {
            let maturity = market_maturity(t, index)?;
            let snapshot = source.market_snapshot(currency.id, maturity).ok_or(
                MarketError::MarketNotFound {
                    currency_id: currency.id,
                    maturity,
                },
            )?;
            let market_parameters = MarketParameters::for_market(parameters, index)?;
            markets.push(Market::from_snapshot(
                currency,
                index,
                market_parameters,
                &snapshot,
            ));
        }

        tracing::debug!(
            currency_id = currency.id,
            markets = markets.len(),
            "cash group loaded"
        );

        Ok(Self {
            currency: currency.clone(),
            parameters: parameters.clone(),
            markets,
            yield_token: source.yield_token_state(currency.id),
            short_term_rate: currency.asset_rate.supply_rate,
        })
    }

    /// Currency id.
    #[must_use]
    pub fn currency_id(&self) -> CurrencyId {
        self.currency.id
    }

    /// Registry entry of the currency.
    #[must_use]
    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    /// Risk and market parameters.
    #[must_use]
    pub fn parameters(&self) -> &CashGroupConfig {
        &self.parameters
    }

    /// Number of active markets.
    #[must_use]
    pub fn max_market_index(&self) -> u8 {
        self.parameters.max_market_index
    }

    /// Markets ordered by maturity.
    #[must_use]
    pub fn markets(&self) -> &[Market] {
        &self.markets
    }

    /// Rate interpolated against for maturities before the first market.
    #[must_use]
    pub fn short_term_rate(&self) -> i128 {
        self.short_term_rate
    }

    /// Yield token holdings, if the currency has a yield token.
    #[must_use]
    pub fn yield_token_state(&self) -> Option<&YieldTokenState> {
        self.yield_token.as_ref()
    }

    /// Market with the given 1-based index.
    pub fn market(&self, market_index: u8) -> MarketResult<&Market> {
        usize::from(market_index)
            .checked_sub(1)
            .and_then(|i| self.markets.get(i))
            .ok_or_else(|| {
                CoreError::InvalidMarketIndex {
                    index: market_index,
                    max: self.max_market_index(),
                }
                .into()
            })
    }

    /// Market maturing exactly at `maturity`.
    #[must_use]
    pub fn market_for_maturity(&self, maturity: Timestamp) -> Option<&Market> {
        self.markets.iter().find(|m| m.maturity() == maturity)
    }

    /// Returns true if `maturity` matches no active market.
    #[must_use]
    pub fn is_idiosyncratic(&self, maturity: Timestamp) -> bool {
        self.market_for_maturity(maturity).is_none()
    }

    fn underlying(&self, value: i128) -> TypedAmount {
        TypedAmount::from_raw(
            value,
            BalanceKind::InternalUnderlying,
            self.currency.underlying_symbol.clone(),
        )
    }

    /// Oracle rate for an arbitrary maturity.
    ///
    /// A market maturity returns that market's smoothed oracle rate. Other
    /// maturities interpolate between the bounding markets, or between the
    /// short-term rate at `t` and the first market.
    pub fn oracle_rate(&self, maturity: Timestamp, t: Timestamp) -> MarketResult<i128> {
        if maturity <= t {
            return Err(MarketError::maturity_out_of_range(
                maturity,
                "at or before valuation time",
            ));
        }
        let position = self
            .markets
            .iter()
            .position(|m| m.maturity() >= maturity)
            .ok_or_else(|| {
                MarketError::maturity_out_of_range(maturity, "beyond the longest market")
            })?;
        let market = &self.markets[position];
        let rate = market.smoothed_oracle_rate(t)?;
        if market.maturity() == maturity {
            return Ok(rate);
        }

        let (x0, y0) = match position {
            0 => (t, self.short_term_rate),
            _ => {
                let previous = &self.markets[position - 1];
                (previous.maturity(), previous.smoothed_oracle_rate(t)?)
            }
        };
        if x0 >= maturity {
            return Err(MarketError::maturity_out_of_range(
                maturity,
                "markets are stale for this valuation time",
            ));
        }
        Ok(interpolate(
            i128::from(x0),
            y0,
            i128::from(market.maturity()),
            rate,
            i128::from(maturity),
        )?)
    }

    /// Discount rate for a notional of the given sign.
    ///
    /// Haircuts raise the rate for assets and lower it, floored at zero,
    /// for debts.
    fn risk_adjusted_rate(&self, rate: i128, negative: bool, apply_haircuts: bool) -> i128 {
        match (apply_haircuts, negative) {
            (false, _) => rate,
            (true, false) => rate + self.parameters.fcash_haircut_bps * BASIS_POINT,
            (true, true) => (rate - self.parameters.debt_buffer_bps * BASIS_POINT).max(0),
        }
    }

    /// Present value of an fCash notional at `t`.
    ///
    /// Matured notionals are worth par.
    pub fn present_value(
        &self,
        maturity: Timestamp,
        notional: &TypedAmount,
        apply_haircuts: bool,
        t: Timestamp,
    ) -> MarketResult<TypedAmount> {
        notional.check(
            BalanceKind::InternalUnderlying,
            &self.currency.underlying_symbol,
        )?;
        if maturity <= t {
            return Ok(notional.clone());
        }
        let oracle_rate = self.oracle_rate(maturity, t)?;
        let rate = self.risk_adjusted_rate(oracle_rate, notional.is_negative(), apply_haircuts);
        let factor = discount_factor(rate, maturity - t)?;
        Ok(notional.scale(factor, RATE_PRECISION)?)
    }

    /// Liquidity token haircut of a market, in percent.
    pub fn liquidity_token_haircut(&self, market_index: u8) -> MarketResult<i128> {
        self.market(market_index)?;
        Ok(self.parameters.liquidity_token_haircuts[usize::from(market_index) - 1])
    }

    /// Pro-rata claims of `tokens` on market `market_index`.
    pub fn liquidity_token_value(
        &self,
        market_index: u8,
        tokens: &TypedAmount,
        apply_haircuts: bool,
    ) -> MarketResult<LiquidityTokenValue> {
        let (fcash_claim, asset_cash_claim) = self.market(market_index)?.liquidity_claims(tokens)?;
        if !apply_haircuts {
            return Ok(LiquidityTokenValue {
                fcash_claim,
                asset_cash_claim,
            });
        }
        let haircut = self.liquidity_token_haircut(market_index)?;
        Ok(LiquidityTokenValue {
            fcash_claim: fcash_claim.scale(haircut, PERCENTAGE_DECIMALS)?,
            asset_cash_claim: asset_cash_claim.scale(haircut, PERCENTAGE_DECIMALS)?,
        })
    }

    /// Present value of everything the yield token account holds, in
    /// internal underlying, without haircuts.
    pub fn yield_token_present_value(&self, t: Timestamp) -> MarketResult<TypedAmount> {
        let state = self
            .yield_token
            .as_ref()
            .ok_or(MarketError::YieldTokenNotFound {
                currency_id: self.currency.id,
            })?;
        let asset_rate = &self.currency.asset_rate;
        let mut total = asset_rate.to_underlying(state.cash_balance)?;
        let mut fcash: BTreeMap<Timestamp, i128> = BTreeMap::new();

        for (index, tokens) in &state.liquidity_tokens {
            let market = self.market(*index)?;
            let tokens = market.total_liquidity().with_value(*tokens);
            let (fcash_claim, cash_claim) = market.liquidity_claims(&tokens)?;
            accumulate(&mut total, asset_rate.to_underlying(cash_claim.value())?)?;
            accumulate(fcash.entry(market.maturity()).or_default(), fcash_claim.value())?;
        }
        for (maturity, notional) in &state.fcash {
            accumulate(fcash.entry(*maturity).or_default(), *notional)?;
        }
        for (maturity, notional) in fcash {
            let present_value = self.present_value(maturity, &self.underlying(notional), false, t)?;
            accumulate(&mut total, present_value.value())?;
        }
        Ok(self.underlying(total))
    }

    /// Underlying value of a yield token balance, optionally haircut.
    pub fn yield_token_value(
        &self,
        balance: &TypedAmount,
        apply_haircut: bool,
        t: Timestamp,
    ) -> MarketResult<TypedAmount> {
        balance.check(
            BalanceKind::YieldToken,
            &self.currency.yield_token_symbol,
        )?;
        if balance.is_zero() {
            return Ok(self.underlying(0));
        }
        let supply = self
            .yield_token
            .as_ref()
            .map(|state| state.total_supply)
            .ok_or(MarketError::YieldTokenNotFound {
                currency_id: self.currency.id,
            })?;
        if supply <= 0 {
            return Err(MarketError::trade_failed("yield token has no supply"));
        }
        let haircut = if apply_haircut {
            self.parameters.yield_token_haircut
        } else {
            PERCENTAGE_DECIMALS
        };
        let present_value = self.yield_token_present_value(t)?;
        let value = product_div(
            &[present_value.value(), balance.value(), haircut],
            &[supply, PERCENTAGE_DECIMALS],
        )?;
        Ok(self.underlying(value))
    }

    /// Refreshes the market maturing at `snapshot.maturity`.
    pub fn set_market(&mut self, snapshot: &MarketSnapshot) -> MarketResult<bool> {
        let currency_id = self.currency.id;
        let market = self
            .markets
            .iter_mut()
            .find(|m| m.maturity() == snapshot.maturity)
            .ok_or(MarketError::MarketNotFound {
                currency_id,
                maturity: snapshot.maturity,
            })?;
        market.set_market(snapshot)
    }

    /// Detached copy with every market re-anchored at `rate`.
    ///
    /// The short-term rate moves to `rate` as well, so every maturity in
    /// the group values at `rate`.
    pub fn simulate(&self, rate: i128, t: Timestamp) -> MarketResult<CashGroup> {
        let markets = self
            .markets
            .iter()
            .map(|m| m.simulate(rate, t))
            .collect::<MarketResult<Vec<_>>>()?;
        Ok(Self {
            currency: self.currency.clone(),
            parameters: self.parameters.clone(),
            markets,
            yield_token: self.yield_token.clone(),
            short_term_rate: rate,
        })
    }
}
