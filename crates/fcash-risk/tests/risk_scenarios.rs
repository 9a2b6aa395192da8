//! Integration tests for fcash-risk.
//!
//! Accounts are valued against a flat 5% curve in every sample currency so
//! that simulated and live cash groups agree at the current rate.

use approx::assert_relative_eq;
use fcash_market::prelude::*;
use fcash_math::search::DEFAULT_MAX_PROBES;
use fcash_math::MathError;
use fcash_risk::prelude::*;
use proptest::prelude::*;

// =============================================================================
// TEST FIXTURES
// =============================================================================

const PERCENT: i128 = RATE_PRECISION / 100;
const UNIT: i128 = INTERNAL_TOKEN_PRECISION;

fn now() -> Timestamp {
    reference_time(1_700_000_000) + 10 * SECONDS_IN_DAY
}

fn create_system() -> System {
    let t = now();
    let mut source = StaticMarketSource::new();
    for currency_id in 1..=3 {
        for index in 1..=3 {
            source.insert_market(
                currency_id,
                MarketSnapshot {
                    maturity: market_maturity(t, index).unwrap(),
                    total_fcash: 1_000_000 * UNIT,
                    total_asset_cash: 50_000_000 * UNIT,
                    total_liquidity: 50_000_000 * UNIT,
                    last_implied_rate: 5 * PERCENT,
                    oracle_rate: 5 * PERCENT,
                    previous_trade_time: t - 3_600,
                },
            );
        }
    }
    let source = source.with_yield_token(
        2,
        YieldTokenState {
            total_supply: 1_000 * UNIT,
            cash_balance: 1_000_000 * UNIT,
            liquidity_tokens: Vec::new(),
            fcash: Vec::new(),
        },
    );
    System::from_config(&SystemConfig::sample(), &source, t).unwrap()
}

fn symbols(currency_id: CurrencyId) -> (&'static str, &'static str, &'static str) {
    match currency_id {
        1 => ("ETH", "cETH", "nETH"),
        2 => ("DAI", "cDAI", "nDAI"),
        _ => ("USDC", "cUSDC", "nUSDC"),
    }
}

fn cash(currency_id: CurrencyId, asset_cash: i128) -> AccountBalance {
    let (_, asset, token) = symbols(currency_id);
    AccountBalance {
        currency_id,
        cash_balance: TypedAmount::from_raw(asset_cash, BalanceKind::InternalAsset, asset),
        yield_token_balance: TypedAmount::zero(BalanceKind::YieldToken, token),
    }
}

fn fcash(currency_id: CurrencyId, market_index: u8, notional: i128) -> PortfolioAsset {
    let (underlying, _, _) = symbols(currency_id);
    PortfolioAsset::fcash(
        currency_id,
        market_maturity(now(), market_index).unwrap(),
        TypedAmount::from_raw(notional, BalanceKind::InternalUnderlying, underlying),
    )
}

fn to_f64(amount: &TypedAmount) -> f64 {
    amount.value() as f64 / UNIT as f64
}

// =============================================================================
// FREE COLLATERAL
// =============================================================================

#[test]
fn test_empty_portfolio_has_no_collateral_or_debt() {
    let system = create_system();
    let fc = evaluate(&system, &Account::new(), now(), &[]).unwrap();
    assert!(fc.net_debt_with_buffer.is_zero());
    assert!(fc.net_collateral_with_haircut.is_zero());
    assert!(fc.net_debt.is_zero());
    assert!(fc.net_collateral.is_zero());
    assert!(fc.per_currency_available.is_empty());
    assert_eq!(fc.collateral_ratio(), None);
}

#[test]
fn test_cash_and_fcash_debt_net_in_one_currency() {
    let system = create_system();
    let t = now();
    let group = system.cash_group(2).unwrap();
    let account = Account::new()
        .with_balance(cash(2, 5_000 * UNIT))
        .with_asset(fcash(2, 2, -100 * UNIT));

    let fc = evaluate(&system, &account, t, &[]).unwrap();

    let cash_value = group.currency().asset_rate.to_underlying(5_000 * UNIT).unwrap();
    let debt = group
        .present_value(
            market_maturity(t, 2).unwrap(),
            &TypedAmount::from_raw(-100 * UNIT, BalanceKind::InternalUnderlying, "DAI"),
            true,
            t,
        )
        .unwrap();
    let expected = debt.with_value(cash_value + debt.value());
    assert_eq!(fc.available(2), Some(&expected));

    // 100 DAI of cash covers the buffered present value of 100 DAI of debt
    assert!(expected.is_positive());
    assert!(fc.net_debt_with_buffer.is_zero());
    assert_eq!(
        fc.net_collateral_with_haircut,
        expected.to_eth(system.registry(), true).unwrap()
    );
    assert!(fc.net_collateral.value() > fc.net_collateral_with_haircut.value());
}

#[test]
fn test_collateral_ratio_falls_as_debt_grows() {
    let system = create_system();
    let t = now();
    let mut last_free = i128::MAX;
    let mut last_ratio = i128::MAX;

    for notional in [100, 150, 200, 400, 800] {
        let account = Account::new()
            .with_balance(cash(1, 50 * UNIT))
            .with_balance(cash(2, 5_000 * UNIT))
            .with_asset(fcash(2, 2, -notional * UNIT));
        let fc = evaluate(&system, &account, t, &[]).unwrap();

        let free = fc.free_collateral().value();
        let ratio = fc.collateral_ratio().unwrap_or(i128::MAX);
        assert!(free < last_free, "free collateral did not fall at {notional}");
        assert!(ratio <= last_ratio, "ratio rose at {notional}");
        if notional > 100 {
            assert!(ratio < last_ratio);
            assert!(fc.net_debt_with_buffer.value() > fc.net_debt.value());
        }
        last_free = free;
        last_ratio = ratio;
    }
}

#[test]
fn test_overrides_replace_cash_groups() {
    let system = create_system();
    let t = now();
    let account = Account::new().with_asset(fcash(2, 3, 1_000 * UNIT));

    let live = evaluate(&system, &account, t, &[]).unwrap();
    let stressed = system.cash_group(2).unwrap().simulate(20 * PERCENT, t).unwrap();
    let projected = evaluate(&system, &account, t, &[stressed]).unwrap();
    assert!(projected.free_collateral().value() < live.free_collateral().value());
}

#[test]
fn test_unknown_currency_is_rejected() {
    let system = create_system();
    let account = Account::new().with_asset(PortfolioAsset::fcash(
        9,
        market_maturity(now(), 1).unwrap(),
        TypedAmount::from_raw(1, BalanceKind::InternalUnderlying, "XYZ"),
    ));
    assert!(evaluate(&system, &account, now(), &[]).is_err());
}

#[test]
fn test_overflowing_positions_report_an_error() {
    let system = create_system();
    let half = i128::MAX / 2 + 1;
    let account = Account::new()
        .with_asset(fcash(2, 2, half))
        .with_asset(fcash(2, 2, half));
    assert!(matches!(
        evaluate(&system, &account, now(), &[]),
        Err(RiskError::Math(MathError::Overflow { .. }))
    ));
}

#[test]
fn test_liquidity_token_on_the_wrong_market_is_rejected() {
    let system = create_system();
    let t = now();
    let tokens = TypedAmount::from_raw(10 * UNIT, BalanceKind::LiquidityToken, "cDAI");
    let maturity = market_maturity(t, 2).unwrap();
    let account =
        Account::new().with_asset(PortfolioAsset::liquidity_token(2, 1, maturity, tokens, t));

    match evaluate(&system, &account, t, &[]) {
        Err(RiskError::InvalidPosition { currency_id, reason }) => {
            assert_eq!(currency_id, 2);
            assert!(reason.contains(&format_maturity(maturity)));
            assert!(reason.contains(&format_maturity(market_maturity(t, 1).unwrap())));
        }
        other => panic!("expected an invalid position, got {other:?}"),
    }
}

// =============================================================================
// BORROW REQUIREMENTS
// =============================================================================

fn borrower() -> Account {
    Account::new().with_asset(fcash(2, 3, -1_000 * UNIT))
}

#[test]
fn test_borrow_requirement_reaches_min_and_target_ratio() {
    let system = create_system();
    let t = now();
    let requirement =
        calculate_borrow_requirement(&system, 1, 15_000, &borrower(), false, t).unwrap();

    assert_eq!(requirement.min_collateral.kind(), BalanceKind::InternalAsset);
    assert_eq!(requirement.min_collateral.symbol(), "cETH");
    let min_ratio = requirement.min_collateral_ratio.unwrap();
    let target_ratio = requirement.target_collateral_ratio.unwrap();
    assert!((9_999..=10_000).contains(&min_ratio));
    assert!((14_999..=15_000).contains(&target_ratio));
    assert!(requirement.target_collateral.value() > requirement.min_collateral.value());

    // Posting the minimum leaves free collateral at zero
    let funded = borrower().with_balance(cash(1, requirement.min_collateral.value()));
    let fc = evaluate(&system, &funded, t, &[]).unwrap();
    assert!(fc.free_collateral().value().abs() <= 10);
}

#[test]
fn test_borrow_requirement_nets_existing_balance() {
    let system = create_system();
    let t = now();
    let bare = calculate_borrow_requirement(&system, 1, 12_000, &borrower(), false, t).unwrap();
    let partly_funded = borrower().with_balance(cash(1, 10 * UNIT));
    let netted =
        calculate_borrow_requirement(&system, 1, 12_000, &partly_funded, false, t).unwrap();

    let difference = bare.min_collateral.value() - netted.min_collateral.value();
    assert!((difference - 10 * UNIT).abs() <= 2);
}

#[test]
fn test_over_collateralized_account_needs_nothing() {
    let system = create_system();
    let account = borrower().with_balance(cash(1, 1_000 * UNIT));
    let requirement =
        calculate_borrow_requirement(&system, 1, 15_000, &account, false, now()).unwrap();
    assert!(requirement.min_collateral.is_zero());
    assert!(requirement.target_collateral.is_zero());
    assert!(requirement.target_collateral_ratio.unwrap() > 15_000);
}

#[test]
fn test_borrow_requirement_in_yield_tokens() {
    let system = create_system();
    let t = now();
    let account = Account::new().with_asset(fcash(3, 3, -1_000 * UNIT));
    let requirement = calculate_borrow_requirement(&system, 2, 10_000, &account, true, t).unwrap();
    assert_eq!(requirement.min_collateral.kind(), BalanceKind::YieldToken);
    assert_eq!(requirement.min_collateral.symbol(), "nDAI");

    // 20 DAI per token at a 90% haircut
    let debt_eth = evaluate(&system, &account, t, &[]).unwrap().net_debt_with_buffer;
    let expected_tokens = to_f64(&debt_eth) / (0.0005 * 0.95) / 18.0;
    assert_relative_eq!(to_f64(&requirement.min_collateral), expected_tokens, max_relative = 1e-6);

    let mut balance = cash(2, 0);
    balance.yield_token_balance = requirement.min_collateral.clone();
    let funded = account.with_balance(balance);
    let fc = evaluate(&system, &funded, t, &[]).unwrap();
    assert!(fc.free_collateral().value().abs() <= 100);
}

#[test]
fn test_borrow_requirement_in_the_borrowed_currency() {
    let system = create_system();
    let t = now();
    let requirement =
        calculate_borrow_requirement(&system, 2, 15_000, &borrower(), false, t).unwrap();

    // Depositing local cash cancels the debt, leaving no ratio to report
    assert_eq!(requirement.min_collateral.symbol(), "cDAI");
    assert!(requirement.min_collateral.is_positive());
    assert_eq!(requirement.min_collateral, requirement.target_collateral);
    assert_eq!(requirement.min_collateral_ratio, None);
    assert_eq!(requirement.target_collateral_ratio, None);

    let funded = borrower().with_balance(cash(2, requirement.min_collateral.value()));
    let fc = evaluate(&system, &funded, t, &[]).unwrap();
    assert!(fc.free_collateral().value().abs() <= 10);
}

#[test]
fn test_borrow_requirement_rejects_bad_input() {
    let system = create_system();
    let t = now();
    assert!(matches!(
        calculate_borrow_requirement(&system, 1, 9_000, &borrower(), false, t),
        Err(RiskError::InvalidRatio { ratio_bps: 9_000, .. })
    ));
    assert!(matches!(
        calculate_borrow_requirement(&system, 9, 12_000, &borrower(), false, t),
        Err(RiskError::MissingCashGroup { currency_id: 9 })
    ));
    // USDC has no yield token
    assert!(calculate_borrow_requirement(&system, 3, 12_000, &borrower(), true, t).is_err());
}

// =============================================================================
// INTEREST RATE RISK
// =============================================================================

#[test]
fn test_account_without_debt_has_no_liquidation_rate() {
    let system = create_system();
    let t = now();
    let account = Account::new()
        .with_balance(cash(2, 50_000 * UNIT))
        .with_asset(fcash(2, 3, 500 * UNIT));

    assert!(risky_currencies(&account).is_empty());
    assert!(calculate_interest_rate_risk(&system, &account, t).unwrap().is_empty());
    let rates = liquidation_rates(&system, &account, 2, DEFAULT_LIQUIDATION_RATE_PRECISION, t).unwrap();
    assert_eq!(rates, LiquidationRates::default());
}

#[test]
fn test_falling_rates_liquidate_a_cash_funded_borrower() {
    let system = create_system();
    let t = now();
    // 1,000 DAI of cash against 1,020 DAI owed in a year
    let account = Account::new()
        .with_balance(cash(2, 50_000 * UNIT))
        .with_asset(fcash(2, 3, -1_020 * UNIT));

    let risk = calculate_interest_rate_risk(&system, &account, t).unwrap();
    let rates = risk[&2];
    assert_eq!(rates.upper, None);

    // Discounting at (r - 1.5%) over 350 days values the debt at the cash
    let years = (market_maturity(t, 3).unwrap() - t) as f64 / SECONDS_IN_YEAR as f64;
    let crossing = (1.02_f64).ln() / years + 0.015;
    let lower = rates.lower.unwrap() as f64 / RATE_PRECISION as f64;
    assert!(lower <= crossing && lower > crossing - 0.001, "lower {lower} vs {crossing}");

    let search = liquidation_search(
        &system,
        &account,
        2,
        SearchDirection::Lower,
        DEFAULT_LIQUIDATION_RATE_PRECISION,
        t,
    )
    .unwrap();
    assert!(search.probes() <= DEFAULT_MAX_PROBES);
}

#[test]
fn test_crossing_at_the_rate_bound_terminates() {
    let system = create_system();
    let t = now();
    let max_rate = system.cash_group(2).unwrap().parameters().max_rate;
    // fCash whose haircut value meets the cash debt just inside the bound
    let account = Account::new()
        .with_balance(cash(2, -50_000 * UNIT))
        .with_asset(fcash(2, 3, 149_627_000_000));

    let search = liquidation_search(
        &system,
        &account,
        2,
        SearchDirection::Upper,
        DEFAULT_LIQUIDATION_RATE_PRECISION,
        t,
    )
    .unwrap();
    assert_eq!(search.point(), Some(max_rate));
    assert!(search.probes() < 10);

    let rates = liquidation_rates(&system, &account, 2, DEFAULT_LIQUIDATION_RATE_PRECISION, t).unwrap();
    assert_eq!(rates.upper, Some(max_rate));
    assert_eq!(rates.lower, None);
}

#[test]
fn test_under_collateralized_account_has_no_search() {
    let system = create_system();
    let t = now();
    let account = Account::new()
        .with_balance(cash(2, -50_000 * UNIT))
        .with_asset(fcash(2, 3, 1_000 * UNIT));

    assert!(!local_currency_collateral_gap(&system, &account, 2, t).unwrap().is_positive());
    let rates = liquidation_rates(&system, &account, 2, DEFAULT_LIQUIDATION_RATE_PRECISION, t).unwrap();
    assert_eq!(rates, LiquidationRates::default());
}

#[test]
fn test_collateral_gap_converts_free_collateral_at_the_buffer() {
    let system = create_system();
    let t = now();
    let account = Account::new()
        .with_balance(cash(1, 50 * UNIT))
        .with_asset(fcash(2, 3, -1_000 * UNIT));

    let fc = evaluate(&system, &account, t, &[]).unwrap();
    let gap = local_currency_collateral_gap(&system, &account, 2, t).unwrap();
    // DAI is net debt, so losses accrue at the 109% buffer
    let expected = to_f64(&fc.free_collateral()) / (0.0005 * 1.09);
    assert_relative_eq!(to_f64(&gap), expected, max_relative = 1e-6);

    let revalued = simulate_local_currency_value(&system, &account, 2, 5 * PERCENT, t).unwrap();
    assert_eq!(Some(&revalued), fc.available(2));
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn property_more_debt_never_frees_collateral(debt in UNIT..10_000 * UNIT, extra in 1..1_000 * UNIT) {
        let system = create_system();
        let t = now();
        let evaluate_debt = |notional: i128| {
            let account = Account::new()
                .with_balance(cash(1, 50 * UNIT))
                .with_asset(fcash(2, 2, -notional));
            evaluate(&system, &account, t, &[]).unwrap()
        };

        let smaller = evaluate_debt(debt);
        let larger = evaluate_debt(debt + extra);
        prop_assert!(larger.free_collateral().value() <= smaller.free_collateral().value());
        prop_assert!(larger.net_debt_with_buffer.value() >= smaller.net_debt_with_buffer.value());
        prop_assert!(larger.collateral_ratio() <= smaller.collateral_ratio());
    }
}
