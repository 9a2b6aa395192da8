//! Currency registry.
//!
//! The registry is the read-only context threaded through every conversion:
//! it maps ids and symbols to decimals, asset exchange rates and ETH rates.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use fcash_math::wide::{mul_div, product_div};
use serde::{Deserialize, Serialize};

use crate::config::{SystemConfig, Validate};
use crate::constants::{
    ASSET_RATE_PRECISION, GOVERNANCE_TOKEN_SYMBOL, INTERNAL_TOKEN_DECIMALS, PERCENTAGE_DECIMALS,
};
use crate::error::{CoreError, CoreResult};
use crate::kind::BalanceKind;

/// Protocol currency identifier.
pub type CurrencyId = u16;

/// Exchange rate from an interest-bearing asset token to its underlying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRate {
    /// Underlying per asset at [`ASSET_RATE_PRECISION`], both at internal precision.
    pub rate: i128,
    /// Annualized supply rate at `RATE_PRECISION`, used as the short-term reference rate.
    pub supply_rate: i128,
}

impl AssetRate {
    /// Creates an asset rate.
    #[must_use]
    pub fn new(rate: i128, supply_rate: i128) -> Self {
        Self { rate, supply_rate }
    }

    /// Converts an internal asset value to internal underlying.
    pub fn to_underlying(&self, asset: i128) -> CoreResult<i128> {
        Ok(mul_div(asset, self.rate, ASSET_RATE_PRECISION)?)
    }

    /// Converts an internal underlying value to internal asset.
    pub fn to_asset(&self, underlying: i128) -> CoreResult<i128> {
        Ok(mul_div(underlying, ASSET_RATE_PRECISION, self.rate)?)
    }
}

/// Exchange rate from a currency's underlying to ETH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EthRate {
    /// ETH per unit of underlying at `10^rate_decimals`.
    pub rate: i128,
    /// Decimal places of `rate`.
    pub rate_decimals: u32,
    /// Percentage of positive value counted as collateral.
    pub haircut: i128,
    /// Percentage applied to negative value counted as debt.
    pub buffer: i128,
}

impl EthRate {
    /// Creates an ETH rate.
    #[must_use]
    pub fn new(rate: i128, rate_decimals: u32, haircut: i128, buffer: i128) -> Self {
        Self {
            rate,
            rate_decimals,
            haircut,
            buffer,
        }
    }

    /// Percentage multiplier for a value of the given sign.
    ///
    /// Positive values take the haircut, negative values the buffer; without
    /// adjustment the multiplier is 100%.
    #[must_use]
    pub fn multiplier(&self, negative: bool, use_haircut: bool) -> i128 {
        match (use_haircut, negative) {
            (false, _) => PERCENTAGE_DECIMALS,
            (true, false) => self.haircut,
            (true, true) => self.buffer,
        }
    }

    /// `10^rate_decimals`.
    pub fn rate_precision(&self) -> CoreResult<i128> {
        pow10(self.rate_decimals)
    }

    /// Converts internal underlying to internal-precision ETH.
    pub fn convert_to_eth(&self, underlying: i128, use_haircut: bool) -> CoreResult<i128> {
        let multiplier = self.multiplier(underlying < 0, use_haircut);
        Ok(product_div(
            &[underlying, self.rate, multiplier],
            &[self.rate_precision()?, PERCENTAGE_DECIMALS],
        )?)
    }

    /// Converts internal-precision ETH back to internal underlying.
    pub fn convert_from_eth(&self, eth: i128, use_haircut: bool) -> CoreResult<i128> {
        let multiplier = self.multiplier(eth < 0, use_haircut);
        Ok(product_div(
            &[eth, self.rate_precision()?, PERCENTAGE_DECIMALS],
            &[self.rate, multiplier],
        )?)
    }
}

/// A registered currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Currency {
    /// Protocol id.
    pub id: CurrencyId,
    /// Underlying token symbol (`DAI`).
    pub underlying_symbol: Arc<str>,
    /// Asset token symbol (`cDAI`).
    pub asset_symbol: Arc<str>,
    /// Yield token symbol (`nDAI`).
    pub yield_token_symbol: Arc<str>,
    /// Native decimals of the underlying token.
    pub underlying_decimals: u32,
    /// Native decimals of the asset token.
    pub asset_decimals: u32,
    /// Asset to underlying rate.
    pub asset_rate: AssetRate,
    /// Underlying to ETH rate.
    pub eth_rate: EthRate,
}

impl Currency {
    /// Native decimals for an amount of `kind` denominated in this currency.
    #[must_use]
    pub fn decimals(&self, kind: BalanceKind) -> u32 {
        match kind {
            BalanceKind::ExternalUnderlying => self.underlying_decimals,
            BalanceKind::ExternalAsset => self.asset_decimals,
            _ => INTERNAL_TOKEN_DECIMALS,
        }
    }

    /// Symbol an amount of `kind` in this currency is denominated in.
    ///
    /// Liquidity tokens are denominated in the asset token.
    #[must_use]
    pub fn symbol_for(&self, kind: BalanceKind) -> Option<&Arc<str>> {
        match kind {
            BalanceKind::InternalUnderlying | BalanceKind::ExternalUnderlying => {
                Some(&self.underlying_symbol)
            }
            BalanceKind::InternalAsset
            | BalanceKind::ExternalAsset
            | BalanceKind::LiquidityToken => Some(&self.asset_symbol),
            BalanceKind::YieldToken => Some(&self.yield_token_symbol),
            BalanceKind::GovernanceToken => None,
        }
    }
}

/// Read-only lookup of every registered currency.
#[derive(Debug, Clone, Default)]
pub struct CurrencyRegistry {
    currencies: BTreeMap<CurrencyId, Currency>,
    symbols: HashMap<Arc<str>, CurrencyId>,
}

impl CurrencyRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from validated configuration.
    pub fn from_config(config: &SystemConfig) -> CoreResult<Self> {
        config.validate_or_error()?;
        let mut registry = Self::new();
        for currency in &config.currencies {
            registry.register(currency.to_currency())?;
        }
        tracing::debug!(currencies = registry.len(), "currency registry loaded");
        Ok(registry)
    }

    /// Registers a currency, indexing all of its symbols.
    pub fn register(&mut self, currency: Currency) -> CoreResult<()> {
        let symbols = [
            currency.underlying_symbol.clone(),
            currency.asset_symbol.clone(),
            currency.yield_token_symbol.clone(),
        ];
        for symbol in &symbols {
            if symbol.as_ref() == GOVERNANCE_TOKEN_SYMBOL {
                return Err(CoreError::config(format!("symbol {symbol} is reserved")));
            }
            if let Some(existing) = self.symbols.get(symbol) {
                if *existing != currency.id {
                    return Err(CoreError::config(format!(
                        "symbol {symbol} already registered to currency {existing}"
                    )));
                }
            }
        }
        if let Some(previous) = self.currencies.get(&currency.id) {
            for symbol in [
                &previous.underlying_symbol,
                &previous.asset_symbol,
                &previous.yield_token_symbol,
            ] {
                self.symbols.remove(symbol);
            }
        }
        for symbol in symbols {
            self.symbols.insert(symbol, currency.id);
        }
        self.currencies.insert(currency.id, currency);
        Ok(())
    }

    /// Looks up a currency by id.
    pub fn get(&self, id: CurrencyId) -> CoreResult<&Currency> {
        self.currencies
            .get(&id)
            .ok_or_else(|| CoreError::unknown_currency(id))
    }

    /// Looks up a currency by any of its symbols.
    pub fn by_symbol(&self, symbol: &str) -> CoreResult<&Currency> {
        let id = self
            .symbols
            .get(symbol)
            .ok_or_else(|| CoreError::unknown_currency(symbol))?;
        self.get(*id)
    }

    /// Native decimals of an amount of `kind` denominated in `symbol`.
    ///
    /// Fails when `symbol` is not the symbol `kind` is denominated in.
    pub fn decimals(&self, kind: BalanceKind, symbol: &str) -> CoreResult<u32> {
        if kind == BalanceKind::GovernanceToken {
            return if symbol == GOVERNANCE_TOKEN_SYMBOL {
                Ok(INTERNAL_TOKEN_DECIMALS)
            } else {
                Err(CoreError::unknown_currency(symbol))
            };
        }
        let currency = self.by_symbol(symbol)?;
        match currency.symbol_for(kind) {
            Some(expected) if expected.as_ref() == symbol => Ok(currency.decimals(kind)),
            Some(expected) => Err(CoreError::UnitMismatch {
                expected: format!("{kind} {expected}"),
                found: format!("{kind} {symbol}"),
            }),
            None => Err(CoreError::invalid_conversion(kind, "decimals")),
        }
    }

    /// Replaces the ETH rate of a currency.
    pub fn with_eth_rate(mut self, id: CurrencyId, eth_rate: EthRate) -> CoreResult<Self> {
        self.currencies
            .get_mut(&id)
            .ok_or_else(|| CoreError::unknown_currency(id))?
            .eth_rate = eth_rate;
        Ok(self)
    }

    /// Iterates currencies in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Currency> {
        self.currencies.values()
    }

    /// Number of registered currencies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.currencies.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
    }
}

/// `10^exponent` as an `i128`.
pub(crate) fn pow10(exponent: u32) -> CoreResult<i128> {
    10_i128
        .checked_pow(exponent)
        .ok_or_else(|| fcash_math::MathError::overflow("pow10").into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> CurrencyRegistry {
        CurrencyRegistry::from_config(&SystemConfig::sample()).unwrap()
    }

    #[test]
    fn test_lookup_by_any_symbol() {
        let registry = registry();
        assert_eq!(registry.by_symbol("DAI").unwrap().id, 2);
        assert_eq!(registry.by_symbol("cDAI").unwrap().id, 2);
        assert_eq!(registry.by_symbol("nDAI").unwrap().id, 2);
        assert!(matches!(
            registry.by_symbol("WBTC"),
            Err(CoreError::UnknownCurrency { .. })
        ));
        assert!(registry.get(99).is_err());
    }

    #[test]
    fn test_decimals_by_kind() {
        let registry = registry();
        assert_eq!(
            registry
                .decimals(BalanceKind::ExternalUnderlying, "USDC")
                .unwrap(),
            6
        );
        assert_eq!(
            registry.decimals(BalanceKind::InternalUnderlying, "USDC").unwrap(),
            8
        );
        assert_eq!(
            registry.decimals(BalanceKind::GovernanceToken, "NOTE").unwrap(),
            8
        );
        assert!(registry
            .decimals(BalanceKind::InternalAsset, "DAI")
            .is_err());
    }

    #[test]
    fn test_duplicate_symbol_rejected() {
        let mut registry = registry();
        let mut clash = registry.get(2).unwrap().clone();
        clash.id = 9;
        assert!(registry.register(clash).is_err());
    }

    #[test]
    fn test_asset_rate_conversion() {
        let rate = AssetRate::new(20_000_000_000_000_000, 0);
        assert_eq!(rate.to_underlying(5_000).unwrap(), 100);
        assert_eq!(rate.to_asset(100).unwrap(), 5_000);
    }

    #[test]
    fn test_eth_multiplier_by_sign() {
        let rate = EthRate::new(1_000_000_000_000_000_000, 18, 95, 109);
        assert_eq!(rate.convert_to_eth(100, false).unwrap(), 100);
        assert_eq!(rate.convert_to_eth(100, true).unwrap(), 95);
        assert_eq!(rate.convert_to_eth(-100, true).unwrap(), -109);
        assert_eq!(rate.convert_from_eth(-109, true).unwrap(), -100);
    }

    #[test]
    fn test_with_eth_rate() {
        let rate = EthRate::new(1, 0, 50, 150);
        let registry = registry().with_eth_rate(2, rate).unwrap();
        assert_eq!(registry.get(2).unwrap().eth_rate, rate);
        assert!(CurrencyRegistry::new().with_eth_rate(2, rate).is_err());
    }
}
