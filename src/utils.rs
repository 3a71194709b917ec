// utils.rs
//
// Conversions between raw register payloads and the values they carry.

/// Split a register value into `width` bits (at most 32), least significant first.
pub fn bits_from_register(value: u32, width: u32) -> Vec<bool> {
    (0..width.min(32)).map(|i| test_bit(value, i)).collect()
}

/// Split a 16 bit register into its bits, least significant first.
pub fn bits_from_word(value: u16) -> Vec<bool> {
    bits_from_register(value as u32, 16)
}

/// Join pairs of 16 bit words into 32 bit values.
///
/// With `big_endian` the first word of each pair is the high half. The
/// input must hold an even number of words; a trailing odd word is ignored.
pub fn words_to_longs(words: &[u16], big_endian: bool) -> Vec<u32> {
    words
        .chunks_exact(2)
        .map(|pair| {
            let (high, low) = if big_endian { (pair[0], pair[1]) } else { (pair[1], pair[0]) };
            ((high as u32) << 16) | low as u32
        })
        .collect()
}

/// Split 32 bit values into pairs of 16 bit words, the inverse of [`words_to_longs`].
pub fn longs_to_words(longs: &[u32], big_endian: bool) -> Vec<u16> {
    let mut words = Vec::with_capacity(longs.len() * 2);
    for &long in longs {
        let high = (long >> 16) as u16;
        let low = long as u16;
        if big_endian {
            words.push(high);
            words.push(low);
        } else {
            words.push(low);
            words.push(high);
        }
    }
    words
}

pub fn decode_ieee754(value: u32) -> f32 {
    f32::from_bits(value)
}

pub fn encode_ieee754(value: f32) -> u32 {
    value.to_bits()
}

/// Signed interpretation of the low `width` bits of `value`.
pub fn twos_complement(value: u32, width: u32) -> i64 {
    let value = value as i64;
    if width == 0 || width > 32 {
        return value;
    }
    if value & (1 << (width - 1)) != 0 {
        value - (1 << width)
    } else {
        value
    }
}

pub fn twos_complement_list(values: &[u32], width: u32) -> Vec<i64> {
    values.iter().map(|&v| twos_complement(v, width)).collect()
}

pub fn test_bit(value: u32, offset: u32) -> bool {
    value & (1 << offset) != 0
}

pub fn set_bit(value: u32, offset: u32) -> u32 {
    value | (1 << offset)
}

pub fn reset_bit(value: u32, offset: u32) -> u32 {
    value & !(1 << offset)
}

pub fn toggle_bit(value: u32, offset: u32) -> u32 {
    value ^ (1 << offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_from_register_lsb_first() {
        let bits = bits_from_word(0x0005);
        assert_eq!(bits.len(), 16);
        assert!(bits[0]);
        assert!(!bits[1]);
        assert!(bits[2]);
        assert!(bits[3..].iter().all(|b| !b));

        assert_eq!(bits_from_register(0b1010, 4), vec![false, true, false, true]);
    }

    #[test]
    fn test_words_longs_round_trip() {
        let longs = vec![0x1234_5678, 0xFFFF_0000, 0, u32::MAX];
        for big_endian in [true, false] {
            let words = longs_to_words(&longs, big_endian);
            assert_eq!(words.len(), longs.len() * 2);
            assert_eq!(words_to_longs(&words, big_endian), longs);
        }

        let words = vec![0x0001, 0x0002, 0xABCD, 0xEF01];
        for big_endian in [true, false] {
            assert_eq!(longs_to_words(&words_to_longs(&words, big_endian), big_endian), words);
        }
    }

    #[test]
    fn test_words_to_longs_word_order() {
        assert_eq!(words_to_longs(&[0x1234, 0x5678], true), vec![0x1234_5678]);
        assert_eq!(words_to_longs(&[0x1234, 0x5678], false), vec![0x5678_1234]);
        assert_eq!(longs_to_words(&[0x1234_5678], false), vec![0x5678, 0x1234]);
    }

    #[test]
    fn test_ieee754() {
        for x in [0.0f32, -0.0, 1.5, -273.15, 3.4028235e38] {
            let decoded = decode_ieee754(encode_ieee754(x));
            assert_eq!(decoded.to_bits(), x.to_bits());
        }
        assert_eq!(encode_ieee754(1.5), 0x3FC0_0000);
        assert_eq!(decode_ieee754(0x3FC0_0000), 1.5);
    }

    #[test]
    fn test_twos_complement() {
        assert_eq!(twos_complement(0xFFFF, 16), -1);
        assert_eq!(twos_complement(0x7FFF, 16), 32767);
        assert_eq!(twos_complement(0x8000, 16), -32768);
        assert_eq!(twos_complement(0xFFFF_FFFF, 32), -1);
        assert_eq!(twos_complement_list(&[0x0001, 0xFFFE], 16), vec![1, -2]);
    }

    #[test]
    fn test_bit_helpers() {
        assert!(test_bit(0b100, 2));
        assert_eq!(set_bit(0, 3), 0b1000);
        assert_eq!(reset_bit(0b1111, 0), 0b1110);
        assert_eq!(toggle_bit(0b01, 1), 0b11);
        assert_eq!(toggle_bit(0b11, 1), 0b01);
    }
}
