//! # Bigmath — Arbitrary-Precision Square Roots
//!
//! Square root of a non-negative `rug::Float` to a requested number of
//! significant decimal digits, plus the integer-accurate floor root used as
//! the trial-division bound by [`crate::worker`].
//!
//! ## Algorithm: Adaptive-Precision Newton Iteration
//!
//! Starting from a cheap guess (the `f64` square root when the value fits in
//! an `f64`, otherwise `x / 2`), iterate
//!
//! ```text
//! next = (x / cur + cur) / 2
//! ```
//!
//! The working precision starts at 17 significant digits (what an `f64` guess
//! already carries) and doubles every iteration, capped at `precision + 4`
//! guard digits. Newton converges quadratically, so each iteration roughly
//! doubles the number of correct digits and early iterations never pay for
//! the full target precision. Iteration stops once the cap is reached and the
//! step between successive iterates drops below `10^-(precision + 1)`, or
//! stops shrinking (the working precision floor for very large values).
//!
//! ## Precision
//!
//! Precision is requested in decimal digits and mapped to binary precision as
//! `ceil(digits * log2(10)) + 1` bits. The final value is rounded to that
//! binary precision with the caller's [`Round`] mode.

use crate::error::{EngineError, Result};
use rug::float::Round;
use rug::{Float, Integer};

/// Working precision of the first Newton step, in significant digits.
const EXPECTED_INITIAL_PRECISION: u32 = 17;

/// Extra digits carried past the requested precision while iterating.
const GUARD_DIGITS: u32 = 4;

/// Minimum binary precision used when lifting an `Integer` into a `Float`.
const MIN_EXACT_BITS: u32 = 64;

/// Binary precision that holds `digits` significant decimal digits.
pub fn digits_to_bits(digits: u32) -> u32 {
    (digits as f64 * std::f64::consts::LOG2_10).ceil() as u32 + 1
}

/// Estimate decimal digit count from bit length, avoiding expensive to_string conversion.
pub fn estimate_digits(n: &Integer) -> u32 {
    let bits = n.significant_bits();
    if bits == 0 {
        return 1;
    }
    (bits as f64 * std::f64::consts::LOG10_2) as u32 + 1
}

/// True when `|x|` does not exceed the largest finite `f64`.
///
/// Only used to pick the initial Newton guess; precision loss in the
/// conversion is irrelevant there.
pub fn is_representable_as_f64(x: &Float) -> bool {
    x.is_finite() && *x.as_abs() <= f64::MAX
}

/// Total-order minimum. Returns `a` when the two compare equal.
pub fn min<T: Ord>(a: T, b: T) -> T {
    if a > b {
        b
    } else {
        a
    }
}

/// Square root of `x` accurate to `precision` significant decimal digits.
///
/// Fails with [`EngineError::Domain`] for negative, NaN or infinite input and
/// with [`EngineError::InvalidPrecision`] when `precision` is zero.
pub fn sqrt(x: &Float, precision: u32, round: Round) -> Result<Float> {
    if precision == 0 {
        return Err(EngineError::InvalidPrecision(precision));
    }
    if x.is_nan() || x.is_infinite() || (x.is_sign_negative() && !x.is_zero()) {
        return Err(EngineError::Domain {
            value: x.to_string(),
        });
    }

    let target_bits = digits_to_bits(precision);
    if x.is_zero() {
        return Ok(Float::new(target_bits));
    }

    let max_precision = precision + GUARD_DIGITS;
    let max_bits = digits_to_bits(max_precision);
    let acceptable_error =
        Float::with_val(max_bits, Float::u_pow_u(10, precision + 1)).recip();

    let f64_guess = if is_representable_as_f64(x) {
        x.to_f64().sqrt()
    } else {
        0.0
    };
    let mut result = if f64_guess.is_normal() {
        Float::with_val(max_bits, f64_guess)
    } else {
        Float::with_val_round(max_bits, x / 2u32, round).0
    };

    let square = Float::with_val_round(target_bits, result.square_ref(), round).0;
    if square == *x {
        // exact square
        return Ok(Float::with_val_round(target_bits, &result, round).0);
    }

    let mut adaptive = EXPECTED_INITIAL_PRECISION;
    let mut last_step: Option<Float> = None;
    loop {
        let last = result;
        adaptive = min(adaptive * 2, max_precision);
        let bits = digits_to_bits(adaptive);

        let quotient = Float::with_val_round(bits, x / &last, round).0;
        let sum = Float::with_val_round(bits, &quotient + &last, round).0;
        result = Float::with_val_round(bits, &sum / 2u32, round).0;

        if adaptive < max_precision {
            continue;
        }
        let step = Float::with_val(max_bits, &result - &last).abs();
        if step <= acceptable_error {
            break;
        }
        if let Some(previous) = &last_step {
            if step >= *previous {
                break;
            }
        }
        last_step = Some(step);
    }

    Ok(Float::with_val_round(target_bits, &result, round).0)
}

/// Floor of the square root of a non-negative integer.
///
/// Computed with [`sqrt`] at enough digits to cover the integer part, then
/// corrected exactly by integer squaring so the result is never off by one.
pub fn integer_sqrt(n: &Integer) -> Result<Integer> {
    if *n < 0 {
        return Err(EngineError::Domain {
            value: n.to_string(),
        });
    }
    if *n == 0 {
        return Ok(Integer::new());
    }

    let exact_bits = n.significant_bits().max(MIN_EXACT_BITS);
    let x = Float::with_val(exact_bits, n);
    let precision = estimate_digits(n) / 2 + 2;
    let root = sqrt(&x, precision, Round::Down)?;

    let mut r = root
        .to_integer_round(Round::Down)
        .map(|(r, _)| r)
        .ok_or_else(|| EngineError::Domain {
            value: root.to_string(),
        })?;

    while r > 0 && Integer::from(r.square_ref()) > *n {
        r -= 1u32;
    }
    loop {
        let next = Integer::from(&r + 1u32);
        if Integer::from(next.square_ref()) <= *n {
            r = next;
        } else {
            break;
        }
    }
    Ok(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rug::ops::Pow;

    fn close_to(actual: &Float, expected: &Float, digits: u32) -> bool {
        let tolerance = Float::with_val(256, Float::u_pow_u(10, digits)).recip();
        let diff = Float::with_val(256, actual - expected).abs();
        let scale = Float::with_val(256, expected)
            .abs()
            .max(&Float::with_val(256, 1));
        diff / scale <= tolerance
    }

    #[test]
    fn sqrt_of_negative_is_domain_error() {
        let x = Float::with_val(64, -1);
        for precision in [1, 5, 17, 50] {
            assert!(matches!(
                sqrt(&x, precision, Round::Nearest),
                Err(EngineError::Domain { .. })
            ));
        }
    }

    #[test]
    fn sqrt_of_nan_and_infinity_is_domain_error() {
        let nan = Float::with_val(64, rug::float::Special::Nan);
        let inf = Float::with_val(64, rug::float::Special::Infinity);
        assert!(sqrt(&nan, 10, Round::Nearest).is_err());
        assert!(sqrt(&inf, 10, Round::Nearest).is_err());
    }

    #[test]
    fn sqrt_zero_precision_rejected() {
        let x = Float::with_val(64, 4);
        assert!(matches!(
            sqrt(&x, 0, Round::Nearest),
            Err(EngineError::InvalidPrecision(0))
        ));
    }

    #[test]
    fn sqrt_of_zero_is_exactly_zero() {
        let x = Float::new(64);
        let r = sqrt(&x, 20, Round::Nearest).unwrap();
        assert!(r.is_zero());
    }

    #[test]
    fn sqrt_of_perfect_squares_is_exact() {
        for k in [1u32, 2, 3, 12, 99, 1000, 65_535] {
            let x = Float::with_val(64, k as u64 * k as u64);
            let r = sqrt(&x, 20, Round::Nearest).unwrap();
            assert_eq!(r, k, "sqrt({}^2)", k);
        }
    }

    #[test]
    fn sqrt_two_to_thirty_digits() {
        let x = Float::with_val(64, 2);
        let r = sqrt(&x, 30, Round::Nearest).unwrap();
        let expected = Float::with_val(256, 2).sqrt();
        assert!(close_to(&r, &expected, 29), "got {}", r);
    }

    #[test]
    fn sqrt_of_fraction() {
        let x = Float::with_val(64, 0.25);
        let r = sqrt(&x, 10, Round::Nearest).unwrap();
        assert_eq!(r, 0.5);
    }

    #[test]
    fn sqrt_beyond_f64_range_uses_halving_guess() {
        let big = Integer::from(10u32).pow(400u32);
        let x = Float::with_val(digits_to_bits(401), &big);
        assert!(!is_representable_as_f64(&x));
        let r = sqrt(&x, 25, Round::Nearest).unwrap();
        let expected = Float::with_val(256, Integer::from(10u32).pow(200u32));
        assert!(close_to(&r, &expected, 22), "got {}", r);
    }

    #[test]
    fn sqrt_terminates_when_ulp_exceeds_error_bound() {
        // 40-digit value at 10 digits: ulp of the root is far above 10^-11
        let n = Integer::from(10u32).pow(40u32) + 12_345u32;
        let x = Float::with_val(256, &n);
        let r = sqrt(&x, 10, Round::Nearest).unwrap();
        let expected = Float::with_val(256, Integer::from(10u32).pow(20u32));
        assert!(close_to(&r, &expected, 9));
    }

    #[test]
    fn representable_bounds() {
        assert!(is_representable_as_f64(&Float::with_val(64, f64::MAX)));
        assert!(is_representable_as_f64(&Float::with_val(64, -1e300)));
        let over = Float::with_val(2048, f64::MAX) * 2u32;
        assert!(!is_representable_as_f64(&over));
    }

    #[test]
    fn integer_sqrt_small_values() {
        let expected = [0u32, 1, 1, 1, 2, 2, 2, 2, 2, 3, 3];
        for (n, want) in expected.iter().enumerate() {
            assert_eq!(integer_sqrt(&Integer::from(n)).unwrap(), *want, "isqrt({})", n);
        }
    }

    #[test]
    fn integer_sqrt_around_large_squares() {
        let k = Integer::from(10u32).pow(30u32) + 7u32;
        let square = Integer::from(k.square_ref());
        assert_eq!(integer_sqrt(&square).unwrap(), k);
        assert_eq!(integer_sqrt(&(square.clone() - 1u32)).unwrap(), k.clone() - 1u32);
        assert_eq!(integer_sqrt(&(square + 1u32)).unwrap(), k);
    }

    #[test]
    fn integer_sqrt_negative_is_domain_error() {
        assert!(integer_sqrt(&Integer::from(-9)).is_err());
    }

    #[test]
    fn min_prefers_first_on_ties() {
        assert_eq!(min(Integer::from(3), Integer::from(9)), 3);
        assert_eq!(min(Integer::from(9), Integer::from(3)), 3);
        assert_eq!(min(5, 5), 5);
    }

    #[test]
    fn estimate_digits_within_one_of_exact() {
        for v in [
            Integer::from(1u32),
            Integer::from(9u32),
            Integer::from(10u32),
            Integer::from(999u32),
            Integer::from(10u32).pow(50u32),
            Integer::from(2u32).pow(1000u32),
        ] {
            let exact = v.to_string_radix(10).len() as i64;
            let est = estimate_digits(&v) as i64;
            assert!((est - exact).abs() <= 1, "estimate_digits({})", v);
        }
    }
}
