//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Convert a count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn count_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Convert a u32 round or bracket ordinal to a `usize` index.
#[must_use]
pub fn u32_to_usize(value: u32) -> usize {
    cast::<u32, usize>(value).unwrap_or(usize::MAX)
}

/// Convert a `usize` to u32, saturating at `u32::MAX`.
#[must_use]
pub fn usize_to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Floor a non-negative f64 to `usize`, returning 0 for NaN and negatives.
#[must_use]
pub fn floor_f64_to_usize(value: f64) -> usize {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    cast::<f64, usize>(value.floor()).unwrap_or(usize::MAX)
}

/// Smallest `r` with `2^r >= n`; zero for `n <= 1`.
#[must_use]
pub const fn ceil_log2(n: usize) -> u32 {
    if n <= 1 {
        return 0;
    }
    usize::BITS - (n - 1).leading_zeros()
}

/// Largest `r` with `2^r <= n`; zero for `n <= 1`.
#[must_use]
pub const fn floor_log2(n: usize) -> u32 {
    if n <= 1 {
        return 0;
    }
    usize::BITS - 1 - n.leading_zeros()
}

/// Largest power of two not exceeding `n`, or zero when `n` is zero.
#[must_use]
pub const fn floor_pow2(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    1 << floor_log2(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log2_helpers_cover_edges() {
        assert_eq!(ceil_log2(0), 0);
        assert_eq!(ceil_log2(1), 0);
        assert_eq!(ceil_log2(2), 1);
        assert_eq!(ceil_log2(5), 3);
        assert_eq!(ceil_log2(8), 3);
        assert_eq!(ceil_log2(9), 4);
        assert_eq!(floor_log2(9), 3);
        assert_eq!(floor_log2(1024), 10);
    }

    #[test]
    fn floor_pow2_reduces_to_bracket_size() {
        assert_eq!(floor_pow2(0), 0);
        assert_eq!(floor_pow2(1), 1);
        assert_eq!(floor_pow2(7), 4);
        assert_eq!(floor_pow2(8), 8);
        assert_eq!(floor_pow2(33), 32);
    }

    #[test]
    fn float_floor_handles_non_finite() {
        assert_eq!(floor_f64_to_usize(f64::NAN), 0);
        assert_eq!(floor_f64_to_usize(-3.5), 0);
        assert_eq!(floor_f64_to_usize(3.9), 3);
        assert!((count_to_f64(12) - 12.0).abs() < f64::EPSILON);
    }
}
