//! Error types for core operations.

use fcash_math::MathError;
use thiserror::Error;

use crate::config::ValidationError;

/// A specialized Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// The main error type for core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Kind or denomination of two amounts differ.
    #[error("Unit mismatch: expected {expected}, found {found}")]
    UnitMismatch {
        /// Kind and symbol the operation expected.
        expected: String,
        /// Kind and symbol that was supplied.
        found: String,
    },

    /// Currency id or symbol is not present in the registry.
    #[error("Unknown currency: {key}")]
    UnknownCurrency {
        /// The id or symbol that was looked up.
        key: String,
    },

    /// A decimal string could not be parsed.
    #[error("Cannot parse '{input}': {reason}")]
    Parse {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A value has more fractional digits than its precision allows.
    #[error("'{input}' exceeds {decimals} decimal places")]
    PrecisionLoss {
        /// The rejected input.
        input: String,
        /// Decimal places permitted.
        decimals: u32,
    },

    /// A conversion is not defined for the amount's kind.
    #[error("Cannot apply {operation} to a {kind} amount")]
    InvalidConversion {
        /// The balance kind of the amount.
        kind: String,
        /// The requested conversion.
        operation: String,
    },

    /// Market index outside `1..=max`.
    #[error("Invalid market index {index} (max {max})")]
    InvalidMarketIndex {
        /// The requested index.
        index: u8,
        /// The highest valid index.
        max: u8,
    },

    /// A maturity cannot be placed on the active market grid.
    #[error("Maturity {maturity} out of range: {reason}")]
    MaturityOutOfRange {
        /// The maturity timestamp.
        maturity: i64,
        /// Why it is out of range.
        reason: String,
    },

    /// Configuration is missing or malformed.
    #[error("Configuration error: {reason}")]
    Config {
        /// Description of the configuration error.
        reason: String,
    },

    /// Configuration failed validation.
    #[error("Validation failed: {0:?}")]
    Validation(Vec<ValidationError>),

    /// Fixed-point arithmetic failed.
    #[error(transparent)]
    Math(#[from] MathError),
}

impl CoreError {
    /// Creates an unknown currency error.
    #[must_use]
    pub fn unknown_currency(key: impl ToString) -> Self {
        Self::UnknownCurrency {
            key: key.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Creates an invalid conversion error.
    #[must_use]
    pub fn invalid_conversion(kind: impl ToString, operation: impl Into<String>) -> Self {
        Self::InvalidConversion {
            kind: kind.to_string(),
            operation: operation.into(),
        }
    }

    /// Creates a maturity out of range error.
    #[must_use]
    pub fn maturity_out_of_range(maturity: i64, reason: impl Into<String>) -> Self {
        Self::MaturityOutOfRange {
            maturity,
            reason: reason.into(),
        }
    }
}
