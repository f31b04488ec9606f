//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::{Float, FloatConst};

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where 
    T: Float 
{
    target_range.0 
        + ((value - source_range.0) 
        * (target_range.1 - target_range.0) 
        / (source_range.1 - source_range.0))
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Wrap an angle into the half-open range (-pi, pi].
///
/// Non-finite inputs give a non-finite output.
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float + FloatConst
{
    let pi_t = T::PI();
    let tau_t = pi_t + pi_t;

    let mut wrapped = pi_t - rem_euclid(pi_t - angle, tau_t);

    // rem_euclid can round up to tau for tiny negative values
    if wrapped <= -pi_t {
        wrapped = wrapped + tau_t;
    }

    wrapped
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0.0, 1.0), (2.0, 4.0), 0.5), 3.0);
        assert_eq!(lin_map((1.0, 3.0), (0.0, -1.0), 3.0), -1.0);
    }

    #[test]
    fn test_wrap_pi() {
        assert_eq!(wrap_pi(0.0), 0.0);
        assert_eq!(wrap_pi(PI), PI);
        assert_eq!(wrap_pi(-PI), PI);
        assert!((wrap_pi(3.0 * PI) - PI).abs() < 1e-12);
        assert!((wrap_pi(-0.5) + 0.5).abs() < 1e-12);
        assert!((wrap_pi(2.0 * PI + 0.25) - 0.25).abs() < 1e-12);
        assert!(wrap_pi(std::f64::NAN).is_nan());

        // Sweep a wide range and check the output range
        let mut a = -20.0;
        while a < 20.0 {
            let w = wrap_pi(a);
            assert!(w > -PI && w <= PI, "wrap_pi({}) = {}", a, w);
            assert!((w.sin() - a.sin()).abs() < 1e-9);
            assert!((w.cos() - a.cos()).abs() < 1e-9);
            a += 0.01;
        }
    }
}
