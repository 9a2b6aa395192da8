//! Error types for fixed-point operations.

use thiserror::Error;

/// A specialized Result type for fixed-point operations.
pub type MathResult<T> = Result<T, MathError>;

/// Errors that can occur during fixed-point operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    /// Result does not fit in a signed 128-bit integer.
    #[error("Numerical overflow in {operation}")]
    Overflow {
        /// The operation that overflowed.
        operation: String,
    },

    /// Division by zero.
    #[error("Division by zero in {operation}")]
    DivisionByZero {
        /// The operation that divided by zero.
        operation: String,
    },

    /// Invalid input parameter.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Description of the invalid input.
        reason: String,
    },
}

impl MathError {
    /// Creates an overflow error.
    #[must_use]
    pub fn overflow(operation: impl Into<String>) -> Self {
        Self::Overflow {
            operation: operation.into(),
        }
    }

    /// Creates a division by zero error.
    #[must_use]
    pub fn division_by_zero(operation: impl Into<String>) -> Self {
        Self::DivisionByZero {
            operation: operation.into(),
        }
    }

    /// Creates an invalid input error.
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MathError::overflow("mul_div");
        assert!(err.to_string().contains("mul_div"));

        let err = MathError::division_by_zero("scale");
        assert!(err.to_string().contains("Division by zero"));
    }
}
