//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration.num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Number of whole fixed-size steps that fit in the given duration.
///
/// The duration is rounded to the nearest step so that `10.0 / 0.05` gives
/// 200 steps rather than 199 from floating point error.
///
/// Returns `None` if the number of steps is not finite or does not fit in a
/// `usize`.
pub fn num_steps(duration_s: f64, step_s: f64) -> Option<usize> {
    let steps = (duration_s / step_s).round().max(0.0);

    if steps.is_finite() && steps < usize::MAX as f64 {
        Some(steps as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_num_steps() {
        assert_eq!(num_steps(10.0, 0.05), Some(200));
        assert_eq!(num_steps(20.0, 0.02), Some(1000));
        assert_eq!(num_steps(0.0, 0.1), Some(0));
        assert_eq!(num_steps(1e300, 1e-3), None);
        assert_eq!(num_steps(1.0, 0.0), None);
    }

    #[test]
    fn test_duration_to_seconds() {
        let d = chrono::Duration::milliseconds(1500);
        assert_eq!(duration_to_seconds(d), Some(1.5));
    }
}
