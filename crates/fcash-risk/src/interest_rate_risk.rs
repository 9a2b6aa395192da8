//! Interest rate risk.
//!
//! A currency is risky when the account both owes and holds rate-sensitive
//! value in it: a rate move shifts the local net and may push free
//! collateral through zero. The liquidation rates are the flat rates at
//! which that happens, searched from each edge of the cash group's rate
//! bounds toward the current rate of the first market.
//!
//! ```text
//!   max_rate ──► ... ──► upper ──── safe ──── lower ◄── ... ◄── min_rate
//! ```

use std::collections::{BTreeMap, BTreeSet};

use fcash_core::constants::DEFAULT_LIQUIDATION_RATE_PRECISION;
use fcash_core::{CurrencyId, CurrencyRegistry, Timestamp, TypedAmount};
use fcash_market::System;
use fcash_math::search::{directed_search, DirectedSearchConfig, SearchOutcome, DEFAULT_MAX_PROBES};
use serde::{Deserialize, Serialize};

use crate::error::{RiskError, RiskResult};
use crate::free_collateral::{evaluate, net_local_available, FreeCollateral};
use crate::parallel::map_currencies;
use crate::portfolio::{Account, AssetType};

/// Flat rates at which a currency's positions exhaust free collateral.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationRates {
    /// Lowest rate above the current rate that leaves the account liquidatable.
    pub upper: Option<i128>,
    /// Highest rate below the current rate that leaves the account liquidatable.
    pub lower: Option<i128>,
}

/// Direction of a liquidation rate search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchDirection {
    /// Rates above the current rate, searched down from the maximum rate.
    Upper,
    /// Rates below the current rate, searched up from the minimum rate.
    Lower,
}

/// Currencies holding both debt and rate-sensitive collateral.
///
/// Debt is negative fCash or a negative cash balance. Collateral is positive
/// fCash, liquidity tokens, yield tokens, or positive cash offsetting fCash
/// debt in the same currency.
#[must_use]
pub fn risky_currencies(account: &Account) -> BTreeSet<CurrencyId> {
    let mut debt = BTreeSet::new();
    let mut fcash_debt = BTreeSet::new();
    let mut collateral = BTreeSet::new();

    for asset in &account.assets {
        match asset.asset_type {
            AssetType::FCash if asset.notional.is_negative() => {
                debt.insert(asset.currency_id);
                fcash_debt.insert(asset.currency_id);
            }
            AssetType::FCash if asset.notional.is_positive() => {
                collateral.insert(asset.currency_id);
            }
            AssetType::LiquidityToken { .. } if asset.notional.is_positive() => {
                collateral.insert(asset.currency_id);
            }
            _ => {}
        }
    }
    for balance in &account.balances {
        if balance.cash_balance.is_negative() {
            debt.insert(balance.currency_id);
        }
        if balance.yield_token_balance.is_positive()
            || (balance.cash_balance.is_positive() && fcash_debt.contains(&balance.currency_id))
        {
            collateral.insert(balance.currency_id);
        }
    }

    debt.intersection(&collateral).copied().collect()
}

fn collateral_gap(
    free: &FreeCollateral,
    local: &TypedAmount,
    currency_id: CurrencyId,
    registry: &CurrencyRegistry,
) -> RiskResult<TypedAmount> {
    let free_collateral = free.free_collateral();
    if !free_collateral.is_positive() {
        return Ok(TypedAmount::from_eth(&free_collateral, currency_id, registry, true)?);
    }

    if local.is_positive() {
        let local_eth = local.to_eth(registry, true)?;
        if free_collateral.lte(&local_eth)? {
            return Ok(TypedAmount::from_eth(&free_collateral, currency_id, registry, true)?);
        }
        // The whole local collateral goes, then the rest is buffered debt
        let remaining = local_eth.sub(&free_collateral)?;
        let debt = TypedAmount::from_eth(&remaining, currency_id, registry, true)?;
        return Ok(local.sub(&debt)?);
    }

    let debt = TypedAmount::from_eth(&free_collateral.negate()?, currency_id, registry, true)?;
    Ok(debt.negate()?)
}

fn local_position(
    system: &System,
    account: &Account,
    currency_id: CurrencyId,
    t: Timestamp,
) -> RiskResult<(FreeCollateral, TypedAmount)> {
    let free = evaluate(system, account, t, &[])?;
    let local = match free.available(currency_id) {
        Some(local) => local.clone(),
        None => net_local_available(system.cash_group(currency_id)?, account, true, t)?,
    };
    Ok((free, local))
}

/// Local underlying loss in `currency_id` that drives free collateral to zero.
///
/// Losses first consume haircut collateral, then accrue as buffered debt.
/// Zero or negative when the account is already liquidatable.
pub fn local_currency_collateral_gap(
    system: &System,
    account: &Account,
    currency_id: CurrencyId,
    t: Timestamp,
) -> RiskResult<TypedAmount> {
    let (free, local) = local_position(system, account, currency_id, t)?;
    collateral_gap(&free, &local, currency_id, system.registry())
}

/// Net local value of the account with every market of the currency moved
/// to `rate`.
pub fn simulate_local_currency_value(
    system: &System,
    account: &Account,
    currency_id: CurrencyId,
    rate: i128,
    t: Timestamp,
) -> RiskResult<TypedAmount> {
    let simulated = system.cash_group(currency_id)?.simulate(rate, t)?;
    net_local_available(&simulated, account, true, t)
}

/// Runs one liquidation rate search.
///
/// Each probe revalues the local currency at a flat trial rate. The outcome
/// is exhausted when the bound itself is safe or the probe budget runs out.
pub fn liquidation_search(
    system: &System,
    account: &Account,
    currency_id: CurrencyId,
    direction: SearchDirection,
    precision: i128,
    t: Timestamp,
) -> RiskResult<SearchOutcome> {
    let (free, local) = local_position(system, account, currency_id, t)?;
    let gap = collateral_gap(&free, &local, currency_id, system.registry())?;
    if !gap.is_positive() {
        tracing::warn!(
            currency_id,
            free_collateral = free.free_collateral().value(),
            "account is already under-collateralized"
        );
        return Ok(SearchOutcome::Exhausted { probes: 0 });
    }

    let threshold = local.value() - gap.value();
    let group = system.cash_group(currency_id)?;
    let origin = group.market(1)?.smoothed_oracle_rate(t)?;
    let parameters = group.parameters();
    let boundary = match direction {
        SearchDirection::Upper => parameters.max_rate,
        SearchDirection::Lower => parameters.min_rate,
    };
    let config = DirectedSearchConfig::new(precision, DEFAULT_MAX_PROBES);

    let outcome = directed_search(boundary, origin, &config, |rate| {
        let value = simulate_local_currency_value(system, account, currency_id, rate, t)?;
        let excess = value.value() - threshold;
        tracing::debug!(currency_id, rate, excess, "liquidation rate probe");
        Ok::<_, RiskError>(excess)
    })?;

    tracing::debug!(
        currency_id,
        ?direction,
        rate = ?outcome.point(),
        probes = outcome.probes(),
        "liquidation rate search finished"
    );
    Ok(outcome)
}

/// Upper and lower liquidation rates of `currency_id`.
///
/// Each side is `None` when no rate between the bound and the current rate
/// exhausts free collateral.
pub fn liquidation_rates(
    system: &System,
    account: &Account,
    currency_id: CurrencyId,
    precision: i128,
    t: Timestamp,
) -> RiskResult<LiquidationRates> {
    let upper =
        liquidation_search(system, account, currency_id, SearchDirection::Upper, precision, t)?;
    let lower =
        liquidation_search(system, account, currency_id, SearchDirection::Lower, precision, t)?;
    Ok(LiquidationRates {
        upper: upper.point(),
        lower: lower.point(),
    })
}

/// Liquidation rates of every risky currency of the account.
pub fn calculate_interest_rate_risk(
    system: &System,
    account: &Account,
    t: Timestamp,
) -> RiskResult<BTreeMap<CurrencyId, LiquidationRates>> {
    let currencies: Vec<_> = risky_currencies(account).into_iter().collect();
    map_currencies(&currencies, |currency_id| {
        liquidation_rates(
            system,
            account,
            currency_id,
            DEFAULT_LIQUIDATION_RATE_PRECISION,
            t,
        )
        .map(|rates| (currency_id, rates))
    })
    .into_iter()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::{AccountBalance, PortfolioAsset};
    use fcash_core::BalanceKind;

    fn dai(value: i128) -> TypedAmount {
        TypedAmount::from_raw(value, BalanceKind::InternalUnderlying, "DAI")
    }

    fn balance(currency_id: CurrencyId, cash: i128, yield_tokens: i128) -> AccountBalance {
        let (asset, token) = match currency_id {
            2 => ("cDAI", "nDAI"),
            _ => ("cUSDC", "nUSDC"),
        };
        AccountBalance {
            currency_id,
            cash_balance: TypedAmount::from_raw(cash, BalanceKind::InternalAsset, asset),
            yield_token_balance: TypedAmount::from_raw(yield_tokens, BalanceKind::YieldToken, token),
        }
    }

    #[test]
    fn test_borrower_with_cash_is_risky() {
        let account = Account::new()
            .with_balance(balance(2, 100, 0))
            .with_asset(PortfolioAsset::fcash(2, 1, dai(-50)));
        assert_eq!(risky_currencies(&account), BTreeSet::from([2]));
    }

    #[test]
    fn test_cash_debt_against_fcash_is_risky() {
        let account = Account::new()
            .with_balance(balance(2, -100, 0))
            .with_asset(PortfolioAsset::fcash(2, 1, dai(50)));
        assert_eq!(risky_currencies(&account), BTreeSet::from([2]));
    }

    #[test]
    fn test_one_sided_positions_are_not_risky() {
        let lender = Account::new()
            .with_balance(balance(2, 100, 10))
            .with_asset(PortfolioAsset::fcash(2, 1, dai(50)));
        assert!(risky_currencies(&lender).is_empty());

        // Debt and collateral in different currencies
        let cross = Account::new()
            .with_balance(balance(3, 100, 0))
            .with_asset(PortfolioAsset::fcash(2, 1, dai(-50)));
        assert!(risky_currencies(&cross).is_empty());
    }

    #[test]
    fn test_yield_tokens_against_fcash_debt() {
        let account = Account::new()
            .with_balance(balance(2, 0, 10))
            .with_asset(PortfolioAsset::fcash(2, 1, dai(-50)));
        assert_eq!(risky_currencies(&account), BTreeSet::from([2]));
    }
}
