//! Fixed-offset signal extraction from CAN payloads.
//!
//! All helpers run in constant time and never panic. Reads past the end of the payload yield zero bits,
//! so a short frame decodes to a definite value instead of an error.

/// Byte `idx` of the payload, or 0 when the payload is shorter.
pub fn get_byte(data: &[u8], idx: usize) -> u8 {
    data.get(idx).copied().unwrap_or(0)
}

/// Single bit using little-endian bit numbering: bit `n` is bit `n % 8` of byte `n / 8`.
pub fn get_bit(data: &[u8], bit: usize) -> bool {
    (get_byte(data, bit / 8) >> (bit % 8)) & 1 == 1
}

/// Big-endian 16 bit value spanning bytes `start` and `start + 1`.
pub fn get_be_u16(data: &[u8], start: usize) -> u16 {
    u16::from_be_bytes([get_byte(data, start), get_byte(data, start + 1)])
}

/// Interpret the low `bits` bits of `value` as a two's complement number.
pub fn to_signed(value: u32, bits: u32) -> i32 {
    debug_assert!((1..=32).contains(&bits));
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

/// Low `bits` bits of a signed value, the inverse of [`to_signed`].
pub fn from_signed(value: i32, bits: u32) -> u32 {
    debug_assert!((1..=32).contains(&bits));
    let mask = if bits == 32 { u32::MAX } else { (1u32 << bits) - 1 };
    (value as u32) & mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_out_of_range_is_zero() {
        let data = [0xaa, 0xbb];
        assert_eq!(get_byte(&data, 1), 0xbb);
        assert_eq!(get_byte(&data, 2), 0);
        assert_eq!(get_byte(&[], 0), 0);
    }

    #[test]
    fn bit_numbering() {
        let data = [0b0010_0000, 0x00, 0b1000_0000];
        assert!(get_bit(&data, 5));
        assert!(!get_bit(&data, 4));
        assert!(get_bit(&data, 23));
        assert!(!get_bit(&data, 22));
        assert!(!get_bit(&data, 63));
    }

    #[test]
    fn be_u16() {
        let data = [0x09, 0xc4, 0xff];
        assert_eq!(get_be_u16(&data, 0), 2500);
        assert_eq!(get_be_u16(&data, 2), 0xff00);
    }

    #[test]
    fn sign_extension() {
        assert_eq!(to_signed(0, 14), 0);
        assert_eq!(to_signed(0x1fff, 14), 8191);
        assert_eq!(to_signed(0x2000, 14), -8192);
        assert_eq!(to_signed(0x3fff, 14), -1);
        // Bits above the field are ignored
        assert_eq!(to_signed(0xc001, 14), 1);
        assert_eq!(to_signed(0xffff_ffff, 32), -1);
    }

    #[test]
    fn signed_round_trip() {
        for value in -8192..=8191 {
            assert_eq!(to_signed(from_signed(value, 14), 14), value);
        }
    }
}
