//! Fixed-point exponential and natural logarithm.
//!
//! Inputs and outputs are integers at a caller supplied decimal `precision`
//! (for example `1e9` for annual rates). Series are evaluated at an internal
//! working precision of [`WAD`] and every intermediate product is truncated
//! toward zero, so results never round up.

use crate::error::{MathError, MathResult};
use crate::wide::mul_div;

/// Internal working precision (1e18).
pub const WAD: i128 = 1_000_000_000_000_000_000;

/// ln(2) at [`WAD`] precision.
const LN2_WAD: i128 = 693_147_180_559_945_309;

/// Largest exponent accepted by [`exp`]; e^40 at WAD still fits an i128.
const MAX_EXP_WAD: i128 = 40 * WAD;

const MAX_SERIES_TERMS: i128 = 512;

fn check_precision(precision: i128) -> MathResult<()> {
    if precision <= 0 {
        return Err(MathError::invalid_input(format!(
            "precision must be positive, got {}",
            precision
        )));
    }
    Ok(())
}

/// Taylor series for e^x with x >= 0 at WAD precision.
fn exp_wad(x: i128) -> MathResult<i128> {
    if x > MAX_EXP_WAD {
        return Err(MathError::overflow("exp"));
    }

    let mut sum = WAD;
    let mut term = WAD;
    let mut n = 1;
    while n < MAX_SERIES_TERMS {
        term = mul_div(term, x, n * WAD)?;
        if term == 0 {
            return Ok(sum);
        }
        sum = sum.checked_add(term).ok_or_else(|| MathError::overflow("exp"))?;
        n += 1;
    }

    Err(MathError::overflow("exp series did not converge"))
}

/// Computes `e^x` where `x` and the result are scaled by `precision`.
///
/// Negative exponents are evaluated as the truncated reciprocal of `e^|x|`.
///
/// # Example
///
/// ```rust
/// use fcash_math::fixed_point::exp;
///
/// let precision = 1_000_000_000;
/// assert_eq!(exp(0, precision).unwrap(), precision);
/// assert_eq!(exp(precision, precision).unwrap(), 2_718_281_828);
/// ```
pub fn exp(x: i128, precision: i128) -> MathResult<i128> {
    check_precision(precision)?;
    let x_wad = mul_div(x, WAD, precision)?;

    let result_wad = if x_wad < 0 {
        let positive = exp_wad(-x_wad)?;
        mul_div(WAD, WAD, positive)?
    } else {
        exp_wad(x_wad)?
    };

    mul_div(result_wad, precision, WAD)
}

/// Computes `ln(x)` where `x` and the result are scaled by `precision`.
///
/// The argument is reduced to `[1, 2)` by powers of two, then the
/// `atanh` series `ln(m) = 2 * (y + y^3/3 + y^5/5 + ...)` with
/// `y = (m - 1) / (m + 1)` is summed until the next term truncates to zero.
///
/// # Errors
///
/// Returns `MathError::InvalidInput` when `x <= 0`.
pub fn ln(x: i128, precision: i128) -> MathResult<i128> {
    check_precision(precision)?;
    if x <= 0 {
        return Err(MathError::invalid_input(format!(
            "ln argument must be positive, got {}",
            x
        )));
    }

    let mut m = mul_div(x, WAD, precision)?;
    if m == 0 {
        return Err(MathError::invalid_input("ln argument underflows working precision"));
    }

    let mut k: i128 = 0;
    while m >= 2 * WAD {
        m /= 2;
        k += 1;
    }
    while m < WAD {
        m *= 2;
        k -= 1;
    }

    let y = mul_div(m - WAD, WAD, m + WAD)?;
    let y_squared = mul_div(y, y, WAD)?;

    let mut sum = 0;
    let mut term = y;
    let mut n = 1;
    while term != 0 && n < MAX_SERIES_TERMS {
        sum += term / n;
        term = mul_div(term, y_squared, WAD)?;
        n += 2;
    }

    let ln_wad = 2 * sum + k * LN2_WAD;
    mul_div(ln_wad, precision, WAD)
}
