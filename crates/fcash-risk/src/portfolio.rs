//! Account portfolios.
//!
//! An [`Account`] is plain data: per-currency balances and a list of fCash
//! and liquidity token positions. Portfolio sources deserialize it directly.

use std::collections::BTreeSet;
use std::fmt;

use fcash_core::time::{format_maturity, is_market_maturity, liquidity_token_settlement};
use fcash_core::{BalanceKind, CoreResult, CurrencyId, CurrencyRegistry, Timestamp, TypedAmount};
use serde::{Deserialize, Serialize};

/// Kind of a portfolio position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    /// A fixed amount of underlying paid at maturity.
    FCash,
    /// A claim on the pool of the market with the given index.
    LiquidityToken {
        /// 1-based market index.
        market_index: u8,
    },
}

/// An fCash or liquidity token position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioAsset {
    /// Currency of the position.
    pub currency_id: CurrencyId,
    /// Maturity of the fCash or of the token's market.
    pub maturity: Timestamp,
    /// Position kind.
    pub asset_type: AssetType,
    /// Signed notional: internal underlying for fCash, liquidity tokens otherwise.
    pub notional: TypedAmount,
    /// When the position settles into cash.
    pub settlement_date: Timestamp,
}

impl PortfolioAsset {
    /// An fCash position, settling at maturity.
    #[must_use]
    pub fn fcash(currency_id: CurrencyId, maturity: Timestamp, notional: TypedAmount) -> Self {
        Self {
            currency_id,
            maturity,
            asset_type: AssetType::FCash,
            notional,
            settlement_date: maturity,
        }
    }

    /// Liquidity tokens of a market, settling at the next quarter roll after `t`.
    #[must_use]
    pub fn liquidity_token(
        currency_id: CurrencyId,
        market_index: u8,
        maturity: Timestamp,
        tokens: TypedAmount,
        t: Timestamp,
    ) -> Self {
        Self {
            currency_id,
            maturity,
            asset_type: AssetType::LiquidityToken { market_index },
            notional: tokens,
            settlement_date: liquidity_token_settlement(t),
        }
    }

    /// Returns true for fCash positions.
    #[must_use]
    pub fn is_fcash(&self) -> bool {
        self.asset_type == AssetType::FCash
    }

    /// Returns true if the maturity matches no market active at `t`.
    #[must_use]
    pub fn is_idiosyncratic(&self, max_market_index: u8, t: Timestamp) -> bool {
        !is_market_maturity(self.maturity, max_market_index, t)
    }

    /// Returns true once the settlement date has passed.
    #[must_use]
    pub fn is_settled(&self, t: Timestamp) -> bool {
        self.settlement_date <= t
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetType::FCash => f.write_str("fCash"),
            AssetType::LiquidityToken { market_index } => {
                write!(f, "liquidity token (market {market_index})")
            }
        }
    }
}

impl fmt::Display for PortfolioAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} maturing {}",
            self.asset_type,
            self.notional,
            format_maturity(self.maturity)
        )
    }
}

/// Cash and yield token balances of one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// Currency of the balances.
    pub currency_id: CurrencyId,
    /// Cash balance in internal asset.
    pub cash_balance: TypedAmount,
    /// Yield token balance.
    pub yield_token_balance: TypedAmount,
}

impl AccountBalance {
    /// Creates empty balances for a registered currency.
    pub fn empty(currency_id: CurrencyId, registry: &CurrencyRegistry) -> CoreResult<Self> {
        let currency = registry.get(currency_id)?;
        Ok(Self {
            currency_id,
            cash_balance: TypedAmount::zero(BalanceKind::InternalAsset, currency.asset_symbol.clone()),
            yield_token_balance: TypedAmount::zero(
                BalanceKind::YieldToken,
                currency.yield_token_symbol.clone(),
            ),
        })
    }

    /// Returns true if both balances are zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cash_balance.is_zero() && self.yield_token_balance.is_zero()
    }
}

/// An account: balances plus fCash and liquidity token positions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Per-currency balances.
    #[serde(default)]
    pub balances: Vec<AccountBalance>,
    /// fCash and liquidity token positions.
    #[serde(default)]
    pub assets: Vec<PortfolioAsset>,
}

impl Account {
    /// Creates an empty account.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds balances, replacing any existing balances of the currency.
    #[must_use]
    pub fn with_balance(mut self, balance: AccountBalance) -> Self {
        self.balances.retain(|b| b.currency_id != balance.currency_id);
        self.balances.push(balance);
        self
    }

    /// Adds a position.
    #[must_use]
    pub fn with_asset(mut self, asset: PortfolioAsset) -> Self {
        self.assets.push(asset);
        self
    }

    /// Balances of `currency_id`, if any.
    #[must_use]
    pub fn balance(&self, currency_id: CurrencyId) -> Option<&AccountBalance> {
        self.balances.iter().find(|b| b.currency_id == currency_id)
    }

    /// Positions denominated in `currency_id`.
    pub fn assets_in(&self, currency_id: CurrencyId) -> impl Iterator<Item = &PortfolioAsset> {
        self.assets
            .iter()
            .filter(move |a| a.currency_id == currency_id)
    }

    /// Every currency with a balance or position, ascending.
    #[must_use]
    pub fn currencies(&self) -> BTreeSet<CurrencyId> {
        self.balances
            .iter()
            .map(|b| b.currency_id)
            .chain(self.assets.iter().map(|a| a.currency_id))
            .collect()
    }

    /// Returns true if the account holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.balances.iter().all(AccountBalance::is_empty) && self.assets.is_empty()
    }

    /// Checks every amount against its currency's registry entry.
    ///
    /// Cash must be internal asset, yield tokens the currency's yield token,
    /// fCash internal underlying and liquidity tokens the asset symbol.
    pub fn check(&self, registry: &CurrencyRegistry) -> CoreResult<()> {
        for balance in &self.balances {
            let currency = registry.get(balance.currency_id)?;
            balance
                .cash_balance
                .check(BalanceKind::InternalAsset, &currency.asset_symbol)?;
            balance
                .yield_token_balance
                .check(BalanceKind::YieldToken, &currency.yield_token_symbol)?;
        }
        for asset in &self.assets {
            let currency = registry.get(asset.currency_id)?;
            match asset.asset_type {
                AssetType::FCash => asset
                    .notional
                    .check(BalanceKind::InternalUnderlying, &currency.underlying_symbol)?,
                AssetType::LiquidityToken { .. } => asset
                    .notional
                    .check(BalanceKind::LiquidityToken, &currency.asset_symbol)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fcash_core::config::SystemConfig;
    use fcash_core::constants::SECONDS_IN_DAY;
    use fcash_core::time::{market_maturity, reference_time};

    fn registry() -> CurrencyRegistry {
        CurrencyRegistry::from_config(&SystemConfig::sample()).unwrap()
    }

    fn dai(value: i128) -> TypedAmount {
        TypedAmount::from_raw(value, BalanceKind::InternalUnderlying, "DAI")
    }

    #[test]
    fn test_idiosyncratic_flag() {
        let t = reference_time(1_700_000_000) + 5 * SECONDS_IN_DAY;
        let maturity = market_maturity(t, 2).unwrap();
        let on_grid = PortfolioAsset::fcash(2, maturity, dai(1));
        let off_grid = PortfolioAsset::fcash(2, maturity + SECONDS_IN_DAY, dai(1));
        assert!(!on_grid.is_idiosyncratic(3, t));
        assert!(off_grid.is_idiosyncratic(3, t));
        assert_eq!(on_grid.settlement_date, maturity);
    }

    #[test]
    fn test_liquidity_token_settles_at_quarter_roll() {
        let t = reference_time(1_700_000_000) + 5 * SECONDS_IN_DAY;
        let tokens = TypedAmount::from_raw(10, BalanceKind::LiquidityToken, "cDAI");
        let asset = PortfolioAsset::liquidity_token(2, 2, market_maturity(t, 2).unwrap(), tokens, t);
        assert_eq!(asset.settlement_date, market_maturity(t, 1).unwrap());
        assert!(!asset.is_fcash());
        assert!(!asset.is_settled(t));
    }

    #[test]
    fn test_asset_display_shows_maturity_date() {
        let t = reference_time(1_700_000_000) + 5 * SECONDS_IN_DAY;
        let maturity = market_maturity(t, 1).unwrap();
        let expected_date = format_maturity(maturity);
        assert_eq!(expected_date.len(), 10);

        let fcash = PortfolioAsset::fcash(2, maturity, dai(-5));
        assert_eq!(fcash.to_string(), format!("fCash {} maturing {expected_date}", dai(-5)));

        let tokens = TypedAmount::from_raw(10, BalanceKind::LiquidityToken, "cDAI");
        let lt = PortfolioAsset::liquidity_token(2, 1, maturity, tokens, t);
        assert!(lt.to_string().starts_with("liquidity token (market 1) 10 cDAI"));
        assert!(lt.to_string().ends_with(&expected_date));
    }

    #[test]
    fn test_account_currencies_and_check() {
        let registry = registry();
        let mut balance = AccountBalance::empty(2, &registry).unwrap();
        assert!(balance.is_empty());
        balance.cash_balance = balance.cash_balance.with_value(100);

        let usdc = TypedAmount::from_raw(-1, BalanceKind::InternalUnderlying, "USDC");
        let account = Account::new()
            .with_balance(balance)
            .with_asset(PortfolioAsset::fcash(3, 0, usdc));
        assert_eq!(account.currencies().into_iter().collect::<Vec<_>>(), vec![2, 3]);
        assert!(account.check(&registry).is_ok());
        assert!(!account.is_empty());

        // DAI notional booked against USDC
        let wrong = Account::new().with_asset(PortfolioAsset::fcash(3, 0, dai(1)));
        assert!(wrong.check(&registry).is_err());
    }

    #[test]
    fn test_account_json() {
        let registry = registry();
        let account = Account::new()
            .with_balance(AccountBalance::empty(2, &registry).unwrap())
            .with_asset(PortfolioAsset::fcash(2, 100, dai(-5)));
        let json = serde_json::to_string(&account).unwrap();
        let back: Account = serde_json::from_str(&json).unwrap();
        assert_eq!(back, account);
        assert_eq!(serde_json::from_str::<Account>("{}").unwrap(), Account::new());
    }
}
