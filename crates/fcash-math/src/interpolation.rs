//! Integer linear interpolation.

use crate::error::{MathError, MathResult};
use crate::wide::mul_div;

/// Linearly interpolates `y` at `x` between `(x0, y0)` and `(x1, y1)`.
///
/// The offset from `y0` is computed on the absolute difference and truncated
/// toward zero, so the result is always rounded toward `y0`. This keeps the
/// interpolated value inside `[min(y0, y1), max(y0, y1)]`.
///
/// # Errors
///
/// Returns `MathError::InvalidInput` if `x1 <= x0` or `x` lies outside
/// `[x0, x1]`.
///
/// # Example
///
/// ```rust
/// use fcash_math::interpolation::interpolate;
///
/// assert_eq!(interpolate(0, 100, 10, 200, 5).unwrap(), 150);
/// assert_eq!(interpolate(0, 200, 10, 100, 3).unwrap(), 170);
/// ```
pub fn interpolate(x0: i128, y0: i128, x1: i128, y1: i128, x: i128) -> MathResult<i128> {
    if x1 <= x0 {
        return Err(MathError::invalid_input(format!(
            "interpolation bounds must be increasing: {} >= {}",
            x0, x1
        )));
    }
    if x < x0 || x > x1 {
        return Err(MathError::invalid_input(format!(
            "{} is outside [{}, {}]",
            x, x0, x1
        )));
    }

    if y1 >= y0 {
        Ok(y0 + mul_div(y1 - y0, x - x0, x1 - x0)?)
    } else {
        Ok(y0 - mul_div(y0 - y1, x - x0, x1 - x0)?)
    }
}
