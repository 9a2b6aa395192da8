//! Error types for market operations.

use fcash_core::{CoreError, CurrencyId, Timestamp};
use fcash_math::MathError;
use thiserror::Error;

/// A specialized Result type for market operations.
pub type MarketResult<T> = Result<T, MarketError>;

/// Errors that can occur while pricing or valuing against markets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketError {
    /// A trade or simulation leaves the market's rate bounds.
    #[error("Rate {rate} out of bounds [{min}, {max}]")]
    RateOutOfBounds {
        /// The offending annual rate.
        rate: i128,
        /// Lowest permitted rate.
        min: i128,
        /// Highest permitted rate.
        max: i128,
    },

    /// A maturity cannot be valued by the cash group.
    #[error("Maturity {maturity} out of range: {reason}")]
    MaturityOutOfRange {
        /// The maturity timestamp.
        maturity: Timestamp,
        /// Why it is out of range.
        reason: String,
    },

    /// The market matured at or before the requested time.
    #[error("Market maturing at {maturity} has matured at {time}")]
    Matured {
        /// Maturity of the market.
        maturity: Timestamp,
        /// The requested time.
        time: Timestamp,
    },

    /// No market or market state is known.
    #[error("No market for currency {currency_id} at {maturity}")]
    MarketNotFound {
        /// Currency of the requested market.
        currency_id: CurrencyId,
        /// Maturity of the requested market.
        maturity: Timestamp,
    },

    /// No cash group is configured for the currency.
    #[error("No cash group for currency {currency_id}")]
    CashGroupNotFound {
        /// The currency.
        currency_id: CurrencyId,
    },

    /// The currency has no yield token state.
    #[error("No yield token state for currency {currency_id}")]
    YieldTokenNotFound {
        /// The currency.
        currency_id: CurrencyId,
    },

    /// The market cannot execute the trade.
    #[error("Trade failed: {reason}")]
    TradeFailed {
        /// Why the trade cannot execute.
        reason: String,
    },

    /// Core type error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Fixed-point arithmetic error.
    #[error(transparent)]
    Math(#[from] MathError),
}

impl MarketError {
    /// Creates a trade failure.
    #[must_use]
    pub fn trade_failed(reason: impl Into<String>) -> Self {
        Self::TradeFailed {
            reason: reason.into(),
        }
    }

    /// Creates a maturity out of range error.
    #[must_use]
    pub fn maturity_out_of_range(maturity: Timestamp, reason: impl Into<String>) -> Self {
        Self::MaturityOutOfRange {
            maturity,
            reason: reason.into(),
        }
    }

    /// Returns true for failures caused by the size or direction of a trade
    /// rather than by missing state.
    #[must_use]
    pub fn is_domain_violation(&self) -> bool {
        matches!(
            self,
            Self::RateOutOfBounds { .. } | Self::TradeFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MarketError::RateOutOfBounds {
            rate: 5,
            min: 10,
            max: 20,
        };
        assert_eq!(err.to_string(), "Rate 5 out of bounds [10, 20]");
        assert!(err.is_domain_violation());
        assert!(!MarketError::CashGroupNotFound { currency_id: 2 }.is_domain_violation());
    }

    #[test]
    fn test_from_core() {
        let err: MarketError = CoreError::unknown_currency("XYZ").into();
        assert!(matches!(err, MarketError::Core(_)));
    }
}
