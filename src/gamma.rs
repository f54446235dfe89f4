//! Gamma lookup tables used by the bilinear resamplers.
//!
//! `fix` expands an 8-bit channel into 16-bit linear light (exponent 2.2),
//! `unfix` maps a 16-bit linear value back to 8 bits. Interpolating in the
//! linear space keeps edges between bright and dark pixels from going muddy.

use std::sync::LazyLock;

const GAMMA: f64 = 2.2;

static TABLE_FIX: LazyLock<Vec<u16>> = LazyLock::new(|| {
    (0..256)
        .map(|i| ((i as f64 / 255.0).powf(GAMMA) * 65535.0).round() as u16)
        .collect()
});

static TABLE_UNFIX: LazyLock<Vec<u8>> = LazyLock::new(|| {
    (0..65536)
        .map(|i| ((i as f64 / 65535.0).powf(1.0 / GAMMA) * 255.0).round() as u8)
        .collect()
});

/// 8-bit channel to 16-bit linear.
#[inline]
pub fn fix(val: u8) -> u16 {
    TABLE_FIX[val as usize]
}

/// 16-bit linear back to an 8-bit channel. Out-of-range input is clamped.
#[inline]
pub fn unfix(val: i32) -> u8 {
    TABLE_UNFIX[val.clamp(0, 65535) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_exact() {
        assert_eq!(fix(0), 0);
        assert_eq!(fix(255), 65535);
        assert_eq!(unfix(0), 0);
        assert_eq!(unfix(65535), 255);
    }

    #[test]
    fn round_trip_within_one() {
        for v in 0..=255u8 {
            let back = unfix(fix(v) as i32);
            assert!((back as i32 - v as i32).abs() <= 1, "{v} -> {back}");
        }
    }

    #[test]
    fn fix_is_monotonic() {
        for v in 1..=255u8 {
            assert!(fix(v) >= fix(v - 1));
        }
    }
}
