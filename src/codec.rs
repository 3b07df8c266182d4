//! Unix timestamp ↔ decimal digit conversion.
//!
//! A timestamp is shown as exactly [`NUM_DIGITS`] decimal digits, most
//! significant first, with leading zeros. Ten digits can spell values up to
//! 9 999 999 999 but a `u32` stops at 4 294 967 295: [`decode`] saturates
//! anything above [`MAX_TIMESTAMP`], [`decode_wide`] gives the exact value.

use crate::config::NUM_DIGITS;

/// Largest timestamp a folded digit buffer can produce.
pub const MAX_TIMESTAMP: u32 = u32::MAX;

/// Largest value ten decimal digits can spell.
pub const MAX_DIGIT_VALUE: u64 = 9_999_999_999;

/// Ten decimal digits, most significant first. Every entry is in `0..=9`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Digits([u8; NUM_DIGITS]);

impl Digits {
    /// Build from raw values; anything above 9 is reduced modulo 10.
    pub fn new(raw: [u8; NUM_DIGITS]) -> Self {
        Self(raw.map(|d| d % 10))
    }

    pub fn as_array(&self) -> &[u8; NUM_DIGITS] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<u8> {
        self.0.get(index).copied()
    }

    /// Increment one digit, 9 rolls over to 0. Out-of-range index is ignored.
    pub fn increment(&mut self, index: usize) {
        if let Some(d) = self.0.get_mut(index) {
            *d = if *d >= 9 { 0 } else { *d + 1 };
        }
    }

    /// Decrement one digit, 0 rolls over to 9. Out-of-range index is ignored.
    pub fn decrement(&mut self, index: usize) {
        if let Some(d) = self.0.get_mut(index) {
            *d = if *d == 0 { 9 } else { *d - 1 };
        }
    }
}

/// Spell `timestamp` as ten digits.
pub fn encode(timestamp: u32) -> Digits {
    let mut digits = [0u8; NUM_DIGITS];
    let mut remainder = timestamp;
    let mut divisor: u32 = 1_000_000_000;

    for d in digits.iter_mut() {
        *d = (remainder / divisor) as u8;
        remainder %= divisor;
        divisor /= 10;
    }

    Digits(digits)
}

/// Exact value of the digits, up to [`MAX_DIGIT_VALUE`].
pub fn decode_wide(digits: &Digits) -> u64 {
    digits
        .0
        .iter()
        .fold(0u64, |acc, &d| acc * 10 + u64::from(d))
}

/// Fold the digits into a timestamp, saturating at [`MAX_TIMESTAMP`].
pub fn decode(digits: &Digits) -> u32 {
    u32::try_from(decode_wide(digits)).unwrap_or(MAX_TIMESTAMP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_new_year_2013() {
        let digits = encode(1_356_998_400);
        assert_eq!(digits.as_array(), &[1, 3, 5, 6, 9, 9, 8, 4, 0, 0]);
    }

    #[test]
    fn encodes_leading_zeros() {
        assert_eq!(encode(0).as_array(), &[0; 10]);
        assert_eq!(encode(42).as_array(), &[0, 0, 0, 0, 0, 0, 0, 0, 4, 2]);
    }

    #[test]
    fn encodes_u32_max() {
        assert_eq!(encode(u32::MAX).as_array(), &[4, 2, 9, 4, 9, 6, 7, 2, 9, 5]);
    }

    #[test]
    fn roundtrip_across_the_u32_range() {
        let samples = [
            0,
            1,
            9,
            10,
            999_999_999,
            1_000_000_000,
            1_356_998_400,
            2_147_483_647,
            2_147_483_648,
            u32::MAX - 1,
            u32::MAX,
        ];
        for t in samples {
            assert_eq!(decode(&encode(t)), t, "t = {t}");
        }
        // Coarse sweep of the whole range.
        let mut t: u32 = 7;
        while let Some(next) = t.checked_add(65_521 * 97) {
            assert_eq!(decode(&encode(t)), t);
            t = next;
        }
    }

    #[test]
    fn wide_decode_reaches_ten_nines() {
        let nines = Digits::new([9; 10]);
        assert_eq!(decode_wide(&nines), MAX_DIGIT_VALUE);
    }

    #[test]
    fn decode_saturates_above_u32() {
        let nines = Digits::new([9; 10]);
        assert_eq!(decode(&nines), MAX_TIMESTAMP);

        // One above u32::MAX.
        let just_over = Digits::new([4, 2, 9, 4, 9, 6, 7, 2, 9, 6]);
        assert_eq!(decode_wide(&just_over), u64::from(u32::MAX) + 1);
        assert_eq!(decode(&just_over), MAX_TIMESTAMP);
    }

    #[test]
    fn increment_rolls_over() {
        let mut digits = encode(9);
        digits.increment(9);
        assert_eq!(digits.get(9), Some(0));
        digits.increment(9);
        assert_eq!(digits.get(9), Some(1));
    }

    #[test]
    fn decrement_rolls_under() {
        let mut digits = encode(0);
        digits.decrement(0);
        assert_eq!(digits.get(0), Some(9));
        digits.decrement(0);
        assert_eq!(digits.get(0), Some(8));
    }

    #[test]
    fn out_of_range_index_is_ignored() {
        let mut digits = encode(123);
        digits.increment(10);
        digits.decrement(42);
        assert_eq!(digits, encode(123));
        assert_eq!(digits.get(10), None);
    }

    #[test]
    fn new_clamps_raw_values_into_range() {
        let digits = Digits::new([10, 11, 0, 0, 0, 0, 0, 0, 0, 19]);
        assert_eq!(digits.as_array(), &[0, 1, 0, 0, 0, 0, 0, 0, 0, 9]);
    }
}
