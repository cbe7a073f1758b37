//! Fixed-point math utilities for deterministic modifier composition.
//!
//! All multipliers in the engine are integer percentages. Scaling a stat
//! multiplies first and divides second in fixed-point, so the only rounding
//! is the final round-half-away-from-zero step. Floating-point math would
//! give different results for values like `50 × 0.33` on different targets.

use fixed::types::I32F32;

/// Fixed-point number type for all modifier math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// A multiplier expressed in whole percent (`150` is ×1.5).
pub type Percent = u32;

/// The identity multiplier.
pub const PERCENT_ONE: Percent = 100;

/// Convert a percentage to a fixed-point multiplier.
#[must_use]
pub fn percent_to_fixed(percent: Percent) -> Fixed {
    Fixed::saturating_from_num(percent) / Fixed::from_num(100)
}

/// Scale `value` by `percent` and round half away from zero.
///
/// # Example
///
/// ```
/// use tactics_core::math::scale_by_percent;
///
/// assert_eq!(scale_by_percent(10, 25), 3);
/// assert_eq!(scale_by_percent(50, 33), 17);
/// assert_eq!(scale_by_percent(10, 400), 40);
/// ```
#[must_use]
pub fn scale_by_percent(value: i32, percent: Percent) -> i32 {
    let product = i64::from(value) * i64::from(percent);
    let scaled = Fixed::saturating_from_num(product) / Fixed::from_num(100);
    scaled.round().saturating_to_num::<i32>()
}

/// Take `percent` of `value`, rounded up (used for relative floors).
#[must_use]
pub fn percent_of_ceil(value: i32, percent: Percent) -> i32 {
    let product = i64::from(value) * i64::from(percent);
    let scaled = Fixed::saturating_from_num(product) / Fixed::from_num(100);
    scaled.ceil().saturating_to_num::<i32>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        for value in [0, 1, 7, 10, 255, 9999] {
            assert_eq!(scale_by_percent(value, PERCENT_ONE), value);
        }
    }

    #[test]
    fn test_half_rounds_away_from_zero() {
        // 10 × 0.25 = 2.5
        assert_eq!(scale_by_percent(10, 25), 3);
        // 50 × 0.33 = 16.5
        assert_eq!(scale_by_percent(50, 33), 17);
        // 7 × 0.5 = 3.5
        assert_eq!(scale_by_percent(7, 50), 4);
    }

    #[test]
    fn test_exact_products() {
        assert_eq!(scale_by_percent(50, 28), 14);
        assert_eq!(scale_by_percent(100, 67), 67);
        assert_eq!(scale_by_percent(20, 200), 40);
    }

    #[test]
    fn test_percent_to_fixed() {
        assert_eq!(percent_to_fixed(150), Fixed::from_num(3) / Fixed::from_num(2));
        assert_eq!(percent_to_fixed(100), Fixed::ONE);
    }

    #[test]
    fn test_percent_of_ceil() {
        assert_eq!(percent_of_ceil(10, 25), 3);
        assert_eq!(percent_of_ceil(8, 25), 2);
        assert_eq!(percent_of_ceil(0, 25), 0);
    }

    #[test]
    fn test_determinism() {
        for value in 0..500 {
            for percent in [25, 28, 33, 40, 50, 67, 100, 150, 200, 250, 300, 350, 400] {
                assert_eq!(
                    scale_by_percent(value, percent),
                    scale_by_percent(value, percent)
                );
            }
        }
    }
}
