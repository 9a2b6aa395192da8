//! Currency and cash group configuration.
//!
//! Configuration is plain serde data loaded from JSON and validated before
//! any registry or market is built from it.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::constants::{
    ETH_CURRENCY_ID, ETH_SYMBOL, MAX_TRADED_MARKET_INDEX, PERCENTAGE_DECIMALS, RATE_PRECISION,
};
use crate::currency::{AssetRate, Currency, CurrencyId, EthRate};
use crate::error::{CoreError, CoreResult};

/// A single validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field that failed validation.
    pub field: String,
    /// Validation error message.
    pub message: String,
    /// Validation rule that was violated.
    pub rule: Option<String>,
}

impl ValidationError {
    /// Creates a new validation error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: None,
        }
    }

    /// Creates a validation error with a rule name.
    pub fn with_rule(
        field: impl Into<String>,
        message: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: Some(rule.into()),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)?;
        if let Some(rule) = &self.rule {
            write!(f, " (rule: {rule})")?;
        }
        Ok(())
    }
}

/// Trait for validatable configuration.
pub trait Validate {
    /// Returns every validation error, or an empty vector if valid.
    fn validate(&self) -> Vec<ValidationError>;

    /// Returns true if the configuration is valid.
    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Validates and returns an error if invalid.
    fn validate_or_error(&self) -> CoreResult<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(errors))
        }
    }
}

fn check_percentage(errors: &mut Vec<ValidationError>, field: String, value: i128) {
    if !(0..=PERCENTAGE_DECIMALS).contains(&value) {
        errors.push(ValidationError::with_rule(
            field,
            format!("{value} is not a percentage"),
            "0 <= value <= 100",
        ));
    }
}

/// Configuration of one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Protocol id.
    pub id: CurrencyId,
    /// Underlying token symbol.
    pub underlying_symbol: String,
    /// Asset token symbol.
    pub asset_symbol: String,
    /// Yield token symbol; defaults to `n` + underlying symbol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yield_token_symbol: Option<String>,
    /// Native decimals of the underlying token.
    pub underlying_decimals: u32,
    /// Native decimals of the asset token.
    #[serde(default = "default_asset_decimals")]
    pub asset_decimals: u32,
    /// Asset to underlying exchange rate.
    pub asset_rate: AssetRate,
    /// Underlying to ETH exchange rate.
    pub eth_rate: EthRate,
}

fn default_asset_decimals() -> u32 {
    8
}

impl CurrencyConfig {
    /// Builds the registry entry for this currency.
    #[must_use]
    pub fn to_currency(&self) -> Currency {
        let yield_token_symbol = self
            .yield_token_symbol
            .clone()
            .unwrap_or_else(|| format!("n{}", self.underlying_symbol));
        Currency {
            id: self.id,
            underlying_symbol: Arc::from(self.underlying_symbol.as_str()),
            asset_symbol: Arc::from(self.asset_symbol.as_str()),
            yield_token_symbol: Arc::from(yield_token_symbol),
            underlying_decimals: self.underlying_decimals,
            asset_decimals: self.asset_decimals,
            asset_rate: self.asset_rate,
            eth_rate: self.eth_rate,
        }
    }
}

impl Validate for CurrencyConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let prefix = format!("currencies[{}]", self.id);

        if self.underlying_symbol.is_empty() || self.asset_symbol.is_empty() {
            errors.push(ValidationError::new(
                format!("{prefix}.symbols"),
                "symbols must not be empty",
            ));
        }
        if self.underlying_symbol == self.asset_symbol {
            errors.push(ValidationError::new(
                format!("{prefix}.asset_symbol"),
                "asset and underlying symbols must differ",
            ));
        }
        for (field, decimals) in [
            ("underlying_decimals", self.underlying_decimals),
            ("asset_decimals", self.asset_decimals),
        ] {
            if decimals > 18 {
                errors.push(ValidationError::with_rule(
                    format!("{prefix}.{field}"),
                    format!("{decimals} decimals not supported"),
                    "decimals <= 18",
                ));
            }
        }
        if self.asset_rate.rate <= 0 {
            errors.push(ValidationError::with_rule(
                format!("{prefix}.asset_rate.rate"),
                "asset rate must be positive",
                "rate > 0",
            ));
        }
        if self.eth_rate.rate <= 0 {
            errors.push(ValidationError::with_rule(
                format!("{prefix}.eth_rate.rate"),
                "ETH rate must be positive",
                "rate > 0",
            ));
        }
        if self.eth_rate.rate_decimals > 36 {
            errors.push(ValidationError::new(
                format!("{prefix}.eth_rate.rate_decimals"),
                "too many rate decimals",
            ));
        }
        check_percentage(
            &mut errors,
            format!("{prefix}.eth_rate.haircut"),
            self.eth_rate.haircut,
        );
        if self.eth_rate.buffer < PERCENTAGE_DECIMALS {
            errors.push(ValidationError::with_rule(
                format!("{prefix}.eth_rate.buffer"),
                format!("buffer {} below 100", self.eth_rate.buffer),
                "buffer >= 100",
            ));
        }
        if self.id == ETH_CURRENCY_ID && self.underlying_symbol != ETH_SYMBOL {
            errors.push(ValidationError::new(
                format!("{prefix}.underlying_symbol"),
                "currency 1 must be ETH",
            ));
        }
        errors
    }
}

/// Risk and market parameters of one cash group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashGroupConfig {
    /// Currency the cash group trades.
    pub currency_id: CurrencyId,
    /// Number of active markets.
    pub max_market_index: u8,
    /// Oracle rate smoothing window in seconds.
    pub rate_oracle_time_window: i64,
    /// Total trading fee in basis points.
    pub total_fee_bps: i128,
    /// Share of fees paid to the reserve, in percent.
    pub reserve_fee_share: i128,
    /// Discount rate increase for positive fCash, in basis points.
    pub fcash_haircut_bps: i128,
    /// Discount rate decrease for negative fCash, in basis points.
    pub debt_buffer_bps: i128,
    /// Liquidity token haircut per market index, in percent.
    pub liquidity_token_haircuts: Vec<i128>,
    /// Rate scalar per market index.
    pub rate_scalars: Vec<i128>,
    /// Yield token haircut in percent.
    pub yield_token_haircut: i128,
    /// Lowest tradable annual rate.
    #[serde(default)]
    pub min_rate: i128,
    /// Highest tradable annual rate.
    pub max_rate: i128,
}

impl Validate for CashGroupConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let prefix = format!("cash_groups[{}]", self.currency_id);
        let markets = usize::from(self.max_market_index);

        if self.max_market_index == 0 || self.max_market_index > MAX_TRADED_MARKET_INDEX {
            errors.push(ValidationError::with_rule(
                format!("{prefix}.max_market_index"),
                format!("{} markets not supported", self.max_market_index),
                "1 <= max_market_index <= 7",
            ));
        }
        if self.rate_oracle_time_window <= 0 {
            errors.push(ValidationError::new(
                format!("{prefix}.rate_oracle_time_window"),
                "window must be positive",
            ));
        }
        if !(0..10_000).contains(&self.total_fee_bps) {
            errors.push(ValidationError::new(
                format!("{prefix}.total_fee_bps"),
                "fee must be between 0 and 10000 basis points",
            ));
        }
        check_percentage(
            &mut errors,
            format!("{prefix}.reserve_fee_share"),
            self.reserve_fee_share,
        );
        check_percentage(
            &mut errors,
            format!("{prefix}.yield_token_haircut"),
            self.yield_token_haircut,
        );
        for (field, value) in [
            ("fcash_haircut_bps", self.fcash_haircut_bps),
            ("debt_buffer_bps", self.debt_buffer_bps),
        ] {
            if value < 0 {
                errors.push(ValidationError::new(
                    format!("{prefix}.{field}"),
                    "must not be negative",
                ));
            }
        }
        if self.liquidity_token_haircuts.len() != markets {
            errors.push(ValidationError::with_rule(
                format!("{prefix}.liquidity_token_haircuts"),
                format!(
                    "{} haircuts for {} markets",
                    self.liquidity_token_haircuts.len(),
                    markets
                ),
                "one entry per market",
            ));
        }
        for (i, haircut) in self.liquidity_token_haircuts.iter().enumerate() {
            check_percentage(
                &mut errors,
                format!("{prefix}.liquidity_token_haircuts[{i}]"),
                *haircut,
            );
        }
        if self.rate_scalars.len() != markets {
            errors.push(ValidationError::with_rule(
                format!("{prefix}.rate_scalars"),
                format!("{} scalars for {} markets", self.rate_scalars.len(), markets),
                "one entry per market",
            ));
        }
        if self.rate_scalars.iter().any(|s| *s <= 0) {
            errors.push(ValidationError::new(
                format!("{prefix}.rate_scalars"),
                "rate scalars must be positive",
            ));
        }
        if self.min_rate < 0 || self.min_rate >= self.max_rate {
            errors.push(ValidationError::with_rule(
                format!("{prefix}.min_rate"),
                format!("invalid rate bounds [{}, {}]", self.min_rate, self.max_rate),
                "0 <= min_rate < max_rate",
            ));
        }
        if self.max_rate > 10 * RATE_PRECISION {
            errors.push(ValidationError::new(
                format!("{prefix}.max_rate"),
                "max rate above 1000%",
            ));
        }
        errors
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Registered currencies.
    pub currencies: Vec<CurrencyConfig>,
    /// Cash groups, at most one per currency.
    #[serde(default)]
    pub cash_groups: Vec<CashGroupConfig>,
}

impl SystemConfig {
    /// Parses and validates configuration from JSON.
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CoreError::config(e.to_string()))?;
        config.validate_or_error()?;
        Ok(config)
    }

    /// Serializes configuration as pretty JSON.
    pub fn to_json_string(&self) -> CoreResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CoreError::config(e.to_string()))
    }

    /// Cash group configuration of a currency, if any.
    #[must_use]
    pub fn cash_group(&self, currency_id: CurrencyId) -> Option<&CashGroupConfig> {
        self.cash_groups
            .iter()
            .find(|group| group.currency_id == currency_id)
    }

    /// A small ETH / DAI / USDC configuration with three markets per
    /// currency, used by examples and tests.
    #[must_use]
    pub fn sample() -> Self {
        let rate_2pct = 2 * RATE_PRECISION / 100;
        let cash_group = |currency_id| CashGroupConfig {
            currency_id,
            max_market_index: 3,
            rate_oracle_time_window: 20 * 60,
            total_fee_bps: 30,
            reserve_fee_share: 50,
            fcash_haircut_bps: 150,
            debt_buffer_bps: 150,
            liquidity_token_haircuts: vec![99, 98, 97],
            rate_scalars: vec![210, 210, 210],
            yield_token_haircut: 90,
            min_rate: 0,
            max_rate: 4 * RATE_PRECISION / 10,
        };
        Self {
            currencies: vec![
                CurrencyConfig {
                    id: ETH_CURRENCY_ID,
                    underlying_symbol: ETH_SYMBOL.into(),
                    asset_symbol: "cETH".into(),
                    yield_token_symbol: None,
                    underlying_decimals: 18,
                    asset_decimals: 8,
                    asset_rate: AssetRate::new(20_000_000_000_000_000, rate_2pct),
                    eth_rate: EthRate::new(1_000_000_000_000_000_000, 18, 70, 130),
                },
                CurrencyConfig {
                    id: 2,
                    underlying_symbol: "DAI".into(),
                    asset_symbol: "cDAI".into(),
                    yield_token_symbol: None,
                    underlying_decimals: 18,
                    asset_decimals: 8,
                    asset_rate: AssetRate::new(20_000_000_000_000_000, 3 * RATE_PRECISION / 100),
                    eth_rate: EthRate::new(500_000_000_000_000, 18, 95, 109),
                },
                CurrencyConfig {
                    id: 3,
                    underlying_symbol: "USDC".into(),
                    asset_symbol: "cUSDC".into(),
                    yield_token_symbol: None,
                    underlying_decimals: 6,
                    asset_decimals: 8,
                    asset_rate: AssetRate::new(20_000_000_000_000_000, rate_2pct),
                    eth_rate: EthRate::new(500_000_000_000_000, 18, 95, 109),
                },
            ],
            cash_groups: vec![cash_group(ETH_CURRENCY_ID), cash_group(2), cash_group(3)],
        }
    }
}

impl Validate for SystemConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut ids = HashSet::new();
        let mut symbols = HashSet::new();

        for currency in &self.currencies {
            errors.extend(currency.validate());
            if !ids.insert(currency.id) {
                errors.push(ValidationError::with_rule(
                    format!("currencies[{}]", currency.id),
                    "duplicate currency id",
                    "unique ids",
                ));
            }
            let registered = currency.to_currency();
            for symbol in [
                registered.underlying_symbol,
                registered.asset_symbol,
                registered.yield_token_symbol,
            ] {
                if !symbols.insert(symbol.clone()) {
                    errors.push(ValidationError::with_rule(
                        format!("currencies[{}]", currency.id),
                        format!("duplicate symbol {symbol}"),
                        "unique symbols",
                    ));
                }
            }
        }

        let mut grouped = HashSet::new();
        for group in &self.cash_groups {
            errors.extend(group.validate());
            if !ids.contains(&group.currency_id) {
                errors.push(ValidationError::new(
                    format!("cash_groups[{}]", group.currency_id),
                    "cash group for unknown currency",
                ));
            }
            if !grouped.insert(group.currency_id) {
                errors.push(ValidationError::new(
                    format!("cash_groups[{}]", group.currency_id),
                    "duplicate cash group",
                ));
            }
        }
        errors
    }
}
