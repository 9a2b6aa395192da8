//! Unit-safe amounts.
//!
//! A [`TypedAmount`] is a signed integer tagged with a [`BalanceKind`] and a
//! denomination symbol. Binary operations require both tags to match; every
//! change of kind or precision goes through a named conversion that takes the
//! [`CurrencyRegistry`] as context.
//!
//! Multiplicative chains are evaluated with 512-bit intermediates and divided
//! exactly once, truncating toward zero.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use fcash_math::wide::{mul_div, product_div};
use fcash_math::MathError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{ASSET_RATE_PRECISION, ETH_SYMBOL, INTERNAL_TOKEN_PRECISION};
use crate::currency::{pow10, Currency, CurrencyId, CurrencyRegistry};
use crate::error::{CoreError, CoreResult};
use crate::kind::BalanceKind;

/// An immutable amount tagged with kind and denomination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypedAmount {
    value: i128,
    kind: BalanceKind,
    symbol: Arc<str>,
}

impl TypedAmount {
    /// Wraps a raw integer already expressed at the precision of `kind`.
    #[must_use]
    pub fn from_raw(value: i128, kind: BalanceKind, symbol: impl Into<Arc<str>>) -> Self {
        Self {
            value,
            kind,
            symbol: symbol.into(),
        }
    }

    /// A zero amount.
    #[must_use]
    pub fn zero(kind: BalanceKind, symbol: impl Into<Arc<str>>) -> Self {
        Self::from_raw(0, kind, symbol)
    }

    /// Parses a decimal string such as `"-12.5"`.
    ///
    /// Fails when the string has more fractional digits than the precision of
    /// `kind` in `symbol`, rather than rounding.
    pub fn parse(
        input: &str,
        kind: BalanceKind,
        symbol: &str,
        registry: &CurrencyRegistry,
    ) -> CoreResult<Self> {
        let decimals = registry.decimals(kind, symbol)?;
        let parsed = Decimal::from_str(input.trim())
            .map_err(|e| CoreError::Parse {
                input: input.to_string(),
                reason: e.to_string(),
            })?
            .normalize();
        let scale = parsed.scale();
        if scale > decimals {
            return Err(CoreError::PrecisionLoss {
                input: input.to_string(),
                decimals,
            });
        }
        let value = parsed
            .mantissa()
            .checked_mul(pow10(decimals - scale)?)
            .ok_or_else(|| MathError::overflow("parse"))?;
        Ok(Self::from_raw(value, kind, symbol))
    }

    /// Raw integer value.
    #[must_use]
    pub fn value(&self) -> i128 {
        self.value
    }

    /// Balance kind.
    #[must_use]
    pub fn kind(&self) -> BalanceKind {
        self.kind
    }

    /// Denomination symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Returns true if the value is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Returns true if the value is strictly positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.value > 0
    }

    /// Returns true if the value is strictly negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.value < 0
    }

    /// Same kind and denomination with a different value.
    #[must_use]
    pub fn with_value(&self, value: i128) -> Self {
        Self {
            value,
            kind: self.kind,
            symbol: self.symbol.clone(),
        }
    }

    /// Fails unless the amount has exactly this kind and denomination.
    ///
    /// Call at every external input boundary.
    pub fn check(&self, kind: BalanceKind, symbol: &str) -> CoreResult<()> {
        if self.kind == kind && self.symbol.as_ref() == symbol {
            Ok(())
        } else {
            Err(CoreError::UnitMismatch {
                expected: format!("{kind} {symbol}"),
                found: format!("{} {}", self.kind, self.symbol),
            })
        }
    }

    fn ensure_compatible(&self, other: &Self) -> CoreResult<()> {
        other.check(self.kind, &self.symbol)
    }

    /// Checked addition of a compatible amount.
    pub fn add(&self, other: &Self) -> CoreResult<Self> {
        self.ensure_compatible(other)?;
        let value = self
            .value
            .checked_add(other.value)
            .ok_or_else(|| MathError::overflow("add"))?;
        Ok(self.with_value(value))
    }

    /// Checked subtraction of a compatible amount.
    pub fn sub(&self, other: &Self) -> CoreResult<Self> {
        self.ensure_compatible(other)?;
        let value = self
            .value
            .checked_sub(other.value)
            .ok_or_else(|| MathError::overflow("sub"))?;
        Ok(self.with_value(value))
    }

    /// Negated amount.
    pub fn negate(&self) -> CoreResult<Self> {
        let value = self
            .value
            .checked_neg()
            .ok_or_else(|| MathError::overflow("negate"))?;
        Ok(self.with_value(value))
    }

    /// Absolute value.
    pub fn abs(&self) -> CoreResult<Self> {
        let value = self
            .value
            .checked_abs()
            .ok_or_else(|| MathError::overflow("abs"))?;
        Ok(self.with_value(value))
    }

    /// `self * numerator / denominator`, truncating toward zero.
    pub fn scale(&self, numerator: i128, denominator: i128) -> CoreResult<Self> {
        Ok(self.with_value(mul_div(self.value, numerator, denominator)?))
    }

    /// Orders two compatible amounts.
    pub fn compare(&self, other: &Self) -> CoreResult<Ordering> {
        self.ensure_compatible(other)?;
        Ok(self.value.cmp(&other.value))
    }

    /// Checked equality; differs from `==` by failing on incompatible tags.
    pub fn eq(&self, other: &Self) -> CoreResult<bool> {
        Ok(self.compare(other)? == Ordering::Equal)
    }

    /// Checked `<`.
    pub fn lt(&self, other: &Self) -> CoreResult<bool> {
        Ok(self.compare(other)? == Ordering::Less)
    }

    /// Checked `<=`.
    pub fn lte(&self, other: &Self) -> CoreResult<bool> {
        Ok(self.compare(other)? != Ordering::Greater)
    }

    /// Checked `>`.
    pub fn gt(&self, other: &Self) -> CoreResult<bool> {
        Ok(self.compare(other)? == Ordering::Greater)
    }

    /// Checked `>=`.
    pub fn gte(&self, other: &Self) -> CoreResult<bool> {
        Ok(self.compare(other)? != Ordering::Less)
    }

    fn currency<'a>(&self, registry: &'a CurrencyRegistry) -> CoreResult<&'a Currency> {
        registry.decimals(self.kind, &self.symbol)?;
        registry.by_symbol(&self.symbol)
    }

    /// Currency id of the denomination.
    pub fn currency_id(&self, registry: &CurrencyRegistry) -> CoreResult<CurrencyId> {
        Ok(self.currency(registry)?.id)
    }

    /// Converts an external amount to internal precision.
    ///
    /// Truncates toward zero when the token has more than 8 decimals.
    /// Internal amounts are returned unchanged.
    pub fn to_internal_precision(&self, registry: &CurrencyRegistry) -> CoreResult<Self> {
        if self.kind.is_internal() {
            return Ok(self.clone());
        }
        let decimals = self.currency(registry)?.decimals(self.kind);
        let value = mul_div(self.value, INTERNAL_TOKEN_PRECISION, pow10(decimals)?)?;
        Ok(Self::from_raw(value, self.kind.internal(), self.symbol.clone()))
    }

    /// Converts an internal asset or underlying amount to the token's native
    /// precision.
    ///
    /// Truncates toward zero when the token has fewer than 8 decimals.
    pub fn to_external_precision(&self, registry: &CurrencyRegistry) -> CoreResult<Self> {
        let Some(external) = self.kind.external() else {
            return Err(CoreError::invalid_conversion(
                self.kind,
                "to_external_precision",
            ));
        };
        if self.kind.is_external() {
            return Ok(self.clone());
        }
        let decimals = self.currency(registry)?.decimals(external);
        let value = mul_div(self.value, pow10(decimals)?, INTERNAL_TOKEN_PRECISION)?;
        Ok(Self::from_raw(value, external, self.symbol.clone()))
    }

    /// Converts an underlying amount to asset form, keeping the precision
    /// class. Truncates toward zero.
    pub fn to_asset_form(&self, registry: &CurrencyRegistry) -> CoreResult<Self> {
        if self.kind.is_asset() {
            return Ok(self.clone());
        }
        if !self.kind.is_underlying() {
            return Err(CoreError::invalid_conversion(self.kind, "to_asset_form"));
        }
        let currency = self.currency(registry)?;
        let rate = currency.asset_rate.rate;
        let (kind, value) = if self.kind.is_internal() {
            (
                BalanceKind::InternalAsset,
                mul_div(self.value, ASSET_RATE_PRECISION, rate)?,
            )
        } else {
            (
                BalanceKind::ExternalAsset,
                product_div(
                    &[
                        self.value,
                        ASSET_RATE_PRECISION,
                        pow10(currency.asset_decimals)?,
                    ],
                    &[pow10(currency.underlying_decimals)?, rate],
                )?,
            )
        };
        Ok(Self::from_raw(value, kind, currency.asset_symbol.clone()))
    }

    /// Converts an asset amount to underlying form, keeping the precision
    /// class. Truncates toward zero.
    pub fn to_underlying_form(&self, registry: &CurrencyRegistry) -> CoreResult<Self> {
        if self.kind.is_underlying() {
            return Ok(self.clone());
        }
        if !self.kind.is_asset() {
            return Err(CoreError::invalid_conversion(
                self.kind,
                "to_underlying_form",
            ));
        }
        let currency = self.currency(registry)?;
        let rate = currency.asset_rate.rate;
        let (kind, value) = if self.kind.is_internal() {
            (
                BalanceKind::InternalUnderlying,
                mul_div(self.value, rate, ASSET_RATE_PRECISION)?,
            )
        } else {
            (
                BalanceKind::ExternalUnderlying,
                product_div(
                    &[self.value, rate, pow10(currency.underlying_decimals)?],
                    &[ASSET_RATE_PRECISION, pow10(currency.asset_decimals)?],
                )?,
            )
        };
        Ok(Self::from_raw(value, kind, currency.underlying_symbol.clone()))
    }

    /// Converts an asset or underlying amount to internal-precision ETH.
    ///
    /// With `use_haircut`, positive values are multiplied by the currency's
    /// haircut and negative values by its buffer; otherwise by 100%. The full
    /// chain of asset rate, precision and ETH rate is divided once.
    pub fn to_eth(&self, registry: &CurrencyRegistry, use_haircut: bool) -> CoreResult<Self> {
        if !(self.kind.is_asset() || self.kind.is_underlying()) {
            return Err(CoreError::invalid_conversion(self.kind, "to_eth"));
        }
        let currency = self.currency(registry)?;
        let eth_rate = &currency.eth_rate;

        let mut factors = vec![self.value];
        let mut divisors = Vec::with_capacity(4);
        if self.kind.is_asset() {
            factors.push(currency.asset_rate.rate);
            divisors.push(ASSET_RATE_PRECISION);
        }
        if self.kind.is_external() {
            factors.push(INTERNAL_TOKEN_PRECISION);
            divisors.push(pow10(currency.decimals(self.kind))?);
        }
        factors.push(eth_rate.rate);
        factors.push(eth_rate.multiplier(self.value < 0, use_haircut));
        divisors.push(eth_rate.rate_precision()?);
        divisors.push(crate::constants::PERCENTAGE_DECIMALS);

        let value = product_div(&factors, &divisors)?;
        Ok(Self::from_raw(value, BalanceKind::InternalUnderlying, ETH_SYMBOL))
    }

    /// Converts an internal ETH amount to internal underlying of a currency.
    ///
    /// Inverse of [`to_eth`](Self::to_eth): with `use_haircut`, positive ETH
    /// is divided by the haircut and negative ETH by the buffer.
    pub fn from_eth(
        eth: &Self,
        currency_id: CurrencyId,
        registry: &CurrencyRegistry,
        use_haircut: bool,
    ) -> CoreResult<Self> {
        eth.check(BalanceKind::InternalUnderlying, ETH_SYMBOL)?;
        let currency = registry.get(currency_id)?;
        let value = currency.eth_rate.convert_from_eth(eth.value, use_haircut)?;
        Ok(Self::from_raw(
            value,
            BalanceKind::InternalUnderlying,
            currency.underlying_symbol.clone(),
        ))
    }

    /// Human readable decimal value at the precision of the amount's kind.
    pub fn to_decimal(&self, registry: &CurrencyRegistry) -> CoreResult<Decimal> {
        let decimals = if self.symbol.as_ref() == ETH_SYMBOL && self.kind.is_internal() {
            crate::constants::INTERNAL_TOKEN_DECIMALS
        } else {
            registry.decimals(self.kind, &self.symbol)?
        };
        Decimal::try_from_i128_with_scale(self.value, decimals).map_err(|e| CoreError::Parse {
            input: self.value.to_string(),
            reason: e.to_string(),
        })
    }
}

impl fmt::Display for TypedAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.value, self.symbol, self.kind)
    }
}
