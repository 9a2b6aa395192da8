//! Multiply-then-divide in double-width arithmetic.
//!
//! Every product is formed in a 512-bit unsigned intermediate with the sign
//! tracked separately, and the quotient is truncated toward zero exactly once.
//! Truncating after each multiplication instead biases risk figures that chain
//! several rates together (asset rate, ETH rate, haircut).

use primitive_types::U512;

use crate::error::{MathError, MathResult};

fn magnitude(value: i128) -> U512 {
    U512::from(value.unsigned_abs())
}

fn to_signed(quotient: U512, negative: bool, operation: &str) -> MathResult<i128> {
    if quotient.bits() > 127 {
        // i128::MIN is the only value whose magnitude needs the 128th bit
        if negative && quotient == U512::from(1u128 << 127) {
            return Ok(i128::MIN);
        }
        return Err(MathError::overflow(operation));
    }

    let value = quotient.low_u128() as i128;
    Ok(if negative { -value } else { value })
}

/// Adds `value` to a running `total`, reporting overflow instead of wrapping.
pub fn accumulate(total: &mut i128, value: i128) -> MathResult<()> {
    *total = total
        .checked_add(value)
        .ok_or_else(|| MathError::overflow("accumulate"))?;
    Ok(())
}

/// Computes `a * b / denominator`, truncating toward zero.
///
/// # Example
///
/// ```rust
/// use fcash_math::wide::mul_div;
///
/// // Would overflow i128 if the product were formed directly
/// let big = 10_i128.pow(30);
/// assert_eq!(mul_div(big, big, 10_i128.pow(25)).unwrap(), 10_i128.pow(35));
/// assert_eq!(mul_div(-7, 1, 2).unwrap(), -3);
/// ```
pub fn mul_div(a: i128, b: i128, denominator: i128) -> MathResult<i128> {
    product_div(&[a, b], &[denominator])
}

/// Computes `(a1 * b1 + a2 * b2 + ...) / denominator`, truncating toward zero
/// once.
///
/// Positive and negative products are summed separately in 512-bit
/// intermediates, so a weighted average never rounds its terms before the
/// final division.
///
/// # Example
///
/// ```rust
/// use fcash_math::wide::sum_products_div;
///
/// // 2/3 + 2/3 is 1 after one truncation, 0 after two
/// assert_eq!(sum_products_div(&[(2, 1), (2, 1)], 3).unwrap(), 1);
/// ```
pub fn sum_products_div(terms: &[(i128, i128)], denominator: i128) -> MathResult<i128> {
    if denominator == 0 {
        return Err(MathError::division_by_zero("sum_products_div"));
    }

    let mut positive = U512::zero();
    let mut negative = U512::zero();
    for (a, b) in terms {
        let product = magnitude(*a) * magnitude(*b);
        let sum = if (*a < 0) ^ (*b < 0) {
            &mut negative
        } else {
            &mut positive
        };
        *sum = sum
            .checked_add(product)
            .ok_or_else(|| MathError::overflow("sum_products_div"))?;
    }

    let (numerator, numerator_negative) = if positive >= negative {
        (positive - negative, false)
    } else {
        (negative - positive, true)
    };
    to_signed(
        numerator / magnitude(denominator),
        numerator_negative ^ (denominator < 0),
        "sum_products_div",
    )
}

/// Computes `(f1 * f2 * ...) / (d1 * d2 * ...)` with a single truncation.
///
/// Both products are formed in 512-bit intermediates; an intermediate that
/// does not fit is reported as an overflow.
pub fn product_div(factors: &[i128], divisors: &[i128]) -> MathResult<i128> {
    let mut negative = false;

    let mut numerator = U512::one();
    for factor in factors {
        negative ^= *factor < 0;
        numerator = numerator
            .checked_mul(magnitude(*factor))
            .ok_or_else(|| MathError::overflow("product_div numerator"))?;
    }

    let mut denominator = U512::one();
    for divisor in divisors {
        if *divisor == 0 {
            return Err(MathError::division_by_zero("product_div"));
        }
        negative ^= *divisor < 0;
        denominator = denominator
            .checked_mul(magnitude(*divisor))
            .ok_or_else(|| MathError::overflow("product_div denominator"))?;
    }

    to_signed(numerator / denominator, negative, "product_div")
}
