//! Word-level helpers shared by the instruction handlers.
//!
//! All LC-3 arithmetic is plain 16-bit two's complement with wraparound,
//! so the only non-trivial helper is widening the narrow immediate and
//! offset fields.

/// Sign-extend the low `bit_count` bits of `value` to a full 16-bit word.
///
/// Bits above `bit_count` are ignored. Bit `bit_count - 1` is treated as the
/// sign and copied into every higher bit.
#[inline]
pub fn sign_extend(value: u16, bit_count: u32) -> u16 {
    debug_assert!(bit_count > 0 && bit_count <= 16, "bad field width {}", bit_count);
    if bit_count >= 16 {
        return value;
    }
    let mask = (1u16 << bit_count) - 1;
    let field = value & mask;
    if (field >> (bit_count - 1)) & 1 == 1 {
        field | !mask
    } else {
        field
    }
}

/// Extract `width` bits of `word` starting at bit `lsb`.
#[inline]
pub(crate) fn bits(word: u16, lsb: u32, width: u32) -> u16 {
    debug_assert!(width > 0 && lsb + width <= 16, "bad field {}+{}", lsb, width);
    (word >> lsb) & (u16::MAX >> (16 - width))
}

/// Interpret a word as a signed value.
#[inline]
pub fn as_signed(word: u16) -> i16 {
    word as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sign_extend_positive() {
        assert_eq!(sign_extend(0b01111, 5), 15);
        assert_eq!(sign_extend(0x0FF, 9), 0x00FF);
    }

    #[test]
    fn test_sign_extend_negative() {
        assert_eq!(sign_extend(0b11111, 5), 0xFFFF);
        assert_eq!(sign_extend(0b10000, 5), (-16i16) as u16);
        assert_eq!(sign_extend(0x1FF, 9), 0xFFFF);
        assert_eq!(sign_extend(0x400, 11), (-1024i16) as u16);
    }

    #[test]
    fn test_sign_extend_ignores_high_bits() {
        // Opcode and register bits above the field must not leak through.
        assert_eq!(sign_extend(0x1025, 5), 5);
        assert_eq!(sign_extend(0xF03F, 6), 0xFFFF);
    }

    #[test]
    fn test_bits() {
        let word = 0b0001_0110_0110_0101;
        assert_eq!(bits(word, 12, 4), 0b0001);
        assert_eq!(bits(word, 9, 3), 0b011);
        assert_eq!(bits(word, 6, 3), 0b001);
        assert_eq!(bits(word, 5, 1), 1);
        assert_eq!(bits(0xABCD, 0, 16), 0xABCD);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "bad field")]
    fn test_bits_past_top_of_word() {
        bits(0xFFFF, 12, 8);
    }

    proptest! {
        #[test]
        fn prop_sign_extend_preserves_low_bits(x in any::<u16>(), n in prop::sample::select(vec![5u32, 6, 9, 11])) {
            let mask = (1u16 << n) - 1;
            prop_assert_eq!(sign_extend(x, n) & mask, x & mask);
        }

        #[test]
        fn prop_sign_extend_fills_with_sign(x in any::<u16>(), n in prop::sample::select(vec![5u32, 6, 9, 11])) {
            let sign = (x >> (n - 1)) & 1;
            let upper = sign_extend(x, n) >> n;
            let expected = if sign == 1 { 0xFFFFu16 >> n } else { 0 };
            prop_assert_eq!(upper, expected);
        }

        #[test]
        fn prop_sign_extend_preserves_value(v in -16i16..16) {
            prop_assert_eq!(as_signed(sign_extend(v as u16, 5)), v);
        }
    }
}
