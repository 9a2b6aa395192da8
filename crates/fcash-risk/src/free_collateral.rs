//! Free collateral.
//!
//! Every currency an account touches is netted into one local underlying
//! figure: cash, yield token value, liquidity token claims and the present
//! value of fCash. Positive nets count as collateral after the currency's
//! haircut, negative nets as debt after its buffer, both in ETH.
//!
//! Valuation uses haircut present values throughout. The unadjusted totals
//! differ only in the ETH conversion.

use std::collections::BTreeMap;

use fcash_core::constants::{BASIS_POINTS_DECIMALS, ETH_SYMBOL, PERCENTAGE_DECIMALS};
use fcash_core::time::format_maturity;
use fcash_core::{BalanceKind, CurrencyId, CurrencyRegistry, Timestamp, TypedAmount};
use fcash_market::{CashGroup, MarketError, System};
use fcash_math::wide::{accumulate, mul_div, product_div};
use serde::{Deserialize, Serialize};

use crate::error::{RiskError, RiskResult};
use crate::portfolio::{Account, AssetType};

/// Solvency of an account across all its currencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeCollateral {
    /// Debt in ETH after buffers, as a positive amount.
    pub net_debt_with_buffer: TypedAmount,
    /// Collateral in ETH after haircuts.
    pub net_collateral_with_haircut: TypedAmount,
    /// Debt in ETH without buffers, as a positive amount.
    pub net_debt: TypedAmount,
    /// Collateral in ETH without haircuts.
    pub net_collateral: TypedAmount,
    /// Net local underlying per currency, haircut and buffered.
    pub per_currency_available: BTreeMap<CurrencyId, TypedAmount>,
}

impl FreeCollateral {
    fn empty() -> Self {
        let zero = eth(0);
        Self {
            net_debt_with_buffer: zero.clone(),
            net_collateral_with_haircut: zero.clone(),
            net_debt: zero.clone(),
            net_collateral: zero,
            per_currency_available: BTreeMap::new(),
        }
    }

    /// Collateral with haircut less debt with buffer, in ETH.
    ///
    /// Negative free collateral means the account can be liquidated.
    #[must_use]
    pub fn free_collateral(&self) -> TypedAmount {
        self.net_collateral_with_haircut
            .with_value(self.net_collateral_with_haircut.value() - self.net_debt_with_buffer.value())
    }

    /// Collateral with haircut over debt with buffer, in basis points.
    ///
    /// `None` when the account has no debt.
    #[must_use]
    pub fn collateral_ratio(&self) -> Option<i128> {
        ratio_bps(
            self.net_collateral_with_haircut.value(),
            self.net_debt_with_buffer.value(),
        )
    }

    /// Net local underlying available in `currency_id`.
    #[must_use]
    pub fn available(&self, currency_id: CurrencyId) -> Option<&TypedAmount> {
        self.per_currency_available.get(&currency_id)
    }
}

/// Collateral required in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowRequirement {
    /// Deposit bringing free collateral to zero.
    pub min_collateral: TypedAmount,
    /// Deposit reaching the target ratio.
    pub target_collateral: TypedAmount,
    /// Collateral ratio after depositing `min_collateral`.
    pub min_collateral_ratio: Option<i128>,
    /// Collateral ratio after depositing `target_collateral`.
    pub target_collateral_ratio: Option<i128>,
}

fn eth(value: i128) -> TypedAmount {
    TypedAmount::from_raw(value, BalanceKind::InternalUnderlying, ETH_SYMBOL)
}

fn ratio_bps(collateral: i128, debt: i128) -> Option<i128> {
    if debt <= 0 {
        return None;
    }
    mul_div(collateral, BASIS_POINTS_DECIMALS, debt).ok()
}

/// Cash group for `currency_id`, preferring an override.
pub(crate) fn cash_group_for<'a>(
    system: &'a System,
    overrides: &'a [CashGroup],
    currency_id: CurrencyId,
) -> RiskResult<&'a CashGroup> {
    match overrides.iter().find(|g| g.currency_id() == currency_id) {
        Some(group) => Ok(group),
        None => Ok(system.cash_group(currency_id)?),
    }
}

/// Net local underlying of the account in the cash group's currency.
///
/// Liquidity token fCash claims are netted into the fCash held at the same
/// maturity before discounting, so offsetting positions are valued once.
pub fn net_local_available(
    group: &CashGroup,
    account: &Account,
    apply_haircuts: bool,
    t: Timestamp,
) -> RiskResult<TypedAmount> {
    let currency = group.currency();
    let currency_id = currency.id;
    let asset_rate = &currency.asset_rate;
    let mut total: i128 = 0;

    if let Some(balance) = account.balance(currency_id) {
        accumulate(&mut total, asset_rate.to_underlying(balance.cash_balance.value())?)?;
        if !balance.yield_token_balance.is_zero() {
            let value = group.yield_token_value(&balance.yield_token_balance, apply_haircuts, t)?;
            accumulate(&mut total, value.value())?;
        }
    }

    let mut fcash: BTreeMap<Timestamp, i128> = BTreeMap::new();
    for asset in account.assets_in(currency_id) {
        match asset.asset_type {
            AssetType::FCash => {
                accumulate(fcash.entry(asset.maturity).or_default(), asset.notional.value())?;
            }
            AssetType::LiquidityToken { market_index } => {
                let market = group.market(market_index)?;
                if market.maturity() != asset.maturity {
                    return Err(RiskError::invalid_position(
                        currency_id,
                        format!(
                            "{asset} does not match market {market_index} maturing {}",
                            format_maturity(market.maturity())
                        ),
                    ));
                }
                let claims = group.liquidity_token_value(market_index, &asset.notional, apply_haircuts)?;
                accumulate(&mut total, asset_rate.to_underlying(claims.asset_cash_claim.value())?)?;
                accumulate(fcash.entry(asset.maturity).or_default(), claims.fcash_claim.value())?;
            }
        }
    }

    for (maturity, notional) in fcash {
        if notional == 0 {
            continue;
        }
        let notional = TypedAmount::from_raw(
            notional,
            BalanceKind::InternalUnderlying,
            currency.underlying_symbol.clone(),
        );
        let present_value = group.present_value(maturity, &notional, apply_haircuts, t)?;
        accumulate(&mut total, present_value.value())?;
    }

    Ok(TypedAmount::from_raw(
        total,
        BalanceKind::InternalUnderlying,
        currency.underlying_symbol.clone(),
    ))
}

/// Evaluates the free collateral of `account` at `t`.
///
/// Cash groups in `overrides` replace the system's for their currency, which
/// projects the account onto simulated markets.
pub fn evaluate(
    system: &System,
    account: &Account,
    t: Timestamp,
    overrides: &[CashGroup],
) -> RiskResult<FreeCollateral> {
    let registry = system.registry();
    account.check(registry)?;

    let mut result = FreeCollateral::empty();
    for currency_id in account.currencies() {
        let group = cash_group_for(system, overrides, currency_id)?;
        let available = net_local_available(group, account, true, t)?;
        accumulate_currency(&mut result, &available, registry)?;
        result.per_currency_available.insert(currency_id, available);
    }

    tracing::debug!(
        collateral = result.net_collateral_with_haircut.value(),
        debt = result.net_debt_with_buffer.value(),
        currencies = result.per_currency_available.len(),
        "free collateral evaluated"
    );
    Ok(result)
}

fn accumulate_currency(
    result: &mut FreeCollateral,
    available: &TypedAmount,
    registry: &CurrencyRegistry,
) -> RiskResult<()> {
    if available.is_zero() {
        return Ok(());
    }
    let adjusted = available.to_eth(registry, true)?;
    let unadjusted = available.to_eth(registry, false)?;
    if available.is_negative() {
        result.net_debt_with_buffer = result.net_debt_with_buffer.sub(&adjusted)?;
        result.net_debt = result.net_debt.sub(&unadjusted)?;
    } else {
        result.net_collateral_with_haircut = result.net_collateral_with_haircut.add(&adjusted)?;
        result.net_collateral = result.net_collateral.add(&unadjusted)?;
    }
    Ok(())
}

/// Final local balance in `currency_id` reaching `ratio_bps` given the
/// collateral and debt held in every other currency.
fn required_local_balance(
    registry: &CurrencyRegistry,
    currency_id: CurrencyId,
    other_collateral: i128,
    other_debt: i128,
    ratio_bps: i128,
) -> RiskResult<i128> {
    let shortfall = mul_div(other_debt, ratio_bps, BASIS_POINTS_DECIMALS)? - other_collateral;
    if shortfall >= 0 {
        return Ok(TypedAmount::from_eth(&eth(shortfall), currency_id, registry, true)?.value());
    }
    // Surplus collateral leaves room for buffered debt in this currency
    let room = mul_div(-shortfall, BASIS_POINTS_DECIMALS, ratio_bps)?;
    Ok(TypedAmount::from_eth(&eth(-room), currency_id, registry, true)?.value())
}

/// Collateral `target_currency` needs to cover the account's debt.
///
/// The account already reflects any new borrow. Balances held in the target
/// currency are netted off, so the requirement is the additional deposit:
/// asset cash, or yield tokens when `use_yield_token_collateral` is set.
pub fn calculate_borrow_requirement(
    system: &System,
    target_currency: CurrencyId,
    target_ratio_bps: i128,
    account: &Account,
    use_yield_token_collateral: bool,
    t: Timestamp,
) -> RiskResult<BorrowRequirement> {
    if target_ratio_bps < BASIS_POINTS_DECIMALS {
        return Err(RiskError::invalid_ratio(
            target_ratio_bps,
            "target ratio must be at least 100%",
        ));
    }
    let registry = system.registry();
    let group = system.cash_group(target_currency)?;
    let free = evaluate(system, account, t, &[])?;

    let existing = free
        .available(target_currency)
        .map_or(0, TypedAmount::value);
    let existing_eth = if existing == 0 {
        0
    } else {
        group
            .currency()
            .eth_rate
            .convert_to_eth(existing, true)?
    };
    let mut other_collateral = free.net_collateral_with_haircut.value();
    let mut other_debt = free.net_debt_with_buffer.value();
    if existing_eth > 0 {
        accumulate(&mut other_collateral, -existing_eth)?;
    } else {
        accumulate(&mut other_debt, existing_eth)?;
    }

    let requirement = |target_bps: i128| -> RiskResult<(TypedAmount, Option<i128>)> {
        let required = required_local_balance(
            registry,
            target_currency,
            other_collateral,
            other_debt,
            target_bps,
        )?;
        let deposit = (required - existing).max(0);
        let final_eth = group
            .currency()
            .eth_rate
            .convert_to_eth(existing + deposit, true)?;
        let ratio = if final_eth > 0 {
            ratio_bps(other_collateral + final_eth, other_debt)
        } else {
            ratio_bps(other_collateral, other_debt - final_eth)
        };
        let amount = deposit_amount(group, deposit, use_yield_token_collateral, t)?;
        Ok((amount, ratio))
    };

    let (min_collateral, min_collateral_ratio) = requirement(BASIS_POINTS_DECIMALS)?;
    let (target_collateral, target_collateral_ratio) = requirement(target_ratio_bps)?;

    tracing::debug!(
        currency_id = target_currency,
        min = min_collateral.value(),
        target = target_collateral.value(),
        "borrow requirement calculated"
    );

    Ok(BorrowRequirement {
        min_collateral,
        target_collateral,
        min_collateral_ratio,
        target_collateral_ratio,
    })
}

/// Expresses an underlying deposit as asset cash or yield tokens.
fn deposit_amount(
    group: &CashGroup,
    underlying: i128,
    use_yield_token: bool,
    t: Timestamp,
) -> RiskResult<TypedAmount> {
    let currency = group.currency();
    if !use_yield_token {
        let asset = currency.asset_rate.to_asset(underlying)?;
        return Ok(TypedAmount::from_raw(
            asset,
            BalanceKind::InternalAsset,
            currency.asset_symbol.clone(),
        ));
    }

    let symbol = currency.yield_token_symbol.clone();
    if underlying == 0 {
        return Ok(TypedAmount::zero(BalanceKind::YieldToken, symbol));
    }
    let supply = group
        .yield_token_state()
        .map(|state| state.total_supply)
        .ok_or(MarketError::YieldTokenNotFound {
            currency_id: currency.id,
        })?;
    let present_value = group.yield_token_present_value(t)?.value();
    if present_value <= 0 {
        return Err(RiskError::invalid_position(
            currency.id,
            "yield token has no value",
        ));
    }
    let tokens = product_div(
        &[underlying, supply, PERCENTAGE_DECIMALS],
        &[present_value, group.parameters().yield_token_haircut],
    )?;
    Ok(TypedAmount::from_raw(tokens, BalanceKind::YieldToken, symbol))
}
