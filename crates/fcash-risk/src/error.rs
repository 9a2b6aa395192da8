//! Error types for risk evaluation.

use fcash_core::{CoreError, CurrencyId};
use fcash_market::MarketError;
use fcash_math::MathError;
use thiserror::Error;

/// Result type for risk operations.
pub type RiskResult<T> = Result<T, RiskError>;

/// Errors that can occur while evaluating an account.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RiskError {
    /// The account holds a currency with no loaded cash group.
    #[error("No cash group loaded for currency {currency_id}")]
    MissingCashGroup {
        /// The currency.
        currency_id: CurrencyId,
    },

    /// A collateral ratio outside the accepted range.
    #[error("Invalid collateral ratio {ratio_bps} bps: {reason}")]
    InvalidRatio {
        /// The requested ratio in basis points.
        ratio_bps: i128,
        /// Why it was rejected.
        reason: String,
    },

    /// A portfolio position that cannot be valued.
    #[error("Invalid position in currency {currency_id}: {reason}")]
    InvalidPosition {
        /// Currency of the position.
        currency_id: CurrencyId,
        /// Why it cannot be valued.
        reason: String,
    },

    /// Market or cash group error.
    #[error(transparent)]
    Market(MarketError),

    /// Core type error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Fixed-point arithmetic error.
    #[error(transparent)]
    Math(#[from] MathError),
}

impl RiskError {
    /// Creates an invalid ratio error.
    #[must_use]
    pub fn invalid_ratio(ratio_bps: i128, reason: impl Into<String>) -> Self {
        Self::InvalidRatio {
            ratio_bps,
            reason: reason.into(),
        }
    }

    /// Creates an invalid position error.
    #[must_use]
    pub fn invalid_position(currency_id: CurrencyId, reason: impl Into<String>) -> Self {
        Self::InvalidPosition {
            currency_id,
            reason: reason.into(),
        }
    }
}

impl From<MarketError> for RiskError {
    fn from(err: MarketError) -> Self {
        match err {
            MarketError::CashGroupNotFound { currency_id } => {
                Self::MissingCashGroup { currency_id }
            }
            MarketError::Core(core) => Self::Core(core),
            MarketError::Math(math) => Self::Math(math),
            other => Self::Market(other),
        }
    }
}
