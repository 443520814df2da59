//! Endianness-aware decoding for the integer and float widths TIFF uses.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::Serialize;

/// Byte order governing every multi-byte decode, announced by the `II` or
/// `MM` mark at the head of a TIFF header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// Pick the `byteorder` decoder matching this order. Every fixed-width
    /// reader below is one line of dispatch through here.
    fn decode<T>(self, le: fn(&[u8]) -> T, be: fn(&[u8]) -> T, data: &[u8]) -> T {
        match self {
            Endian::Little => le(data),
            Endian::Big => be(data),
        }
    }

    pub fn read_u16(self, data: &[u8]) -> u16 {
        self.decode(LittleEndian::read_u16, BigEndian::read_u16, data)
    }

    pub fn read_u32(self, data: &[u8]) -> u32 {
        self.decode(LittleEndian::read_u32, BigEndian::read_u32, data)
    }

    pub fn read_i16(self, data: &[u8]) -> i16 {
        self.decode(LittleEndian::read_i16, BigEndian::read_i16, data)
    }

    pub fn read_i32(self, data: &[u8]) -> i32 {
        self.decode(LittleEndian::read_i32, BigEndian::read_i32, data)
    }

    pub fn read_f32(self, data: &[u8]) -> f32 {
        self.decode(LittleEndian::read_f32, BigEndian::read_f32, data)
    }

    pub fn read_f64(self, data: &[u8]) -> f64 {
        self.decode(LittleEndian::read_f64, BigEndian::read_f64, data)
    }

    /// Decode an unsigned integer of 1, 2 or 4 bytes, the widths JPEG and
    /// TIFF headers deal in. Other widths are programmer errors, not data
    /// errors.
    pub fn read_uint(self, data: &[u8]) -> u64 {
        debug_assert!(
            matches!(data.len(), 1 | 2 | 4),
            "unsupported integer width: {}",
            data.len()
        );
        match self {
            Endian::Little => LittleEndian::read_uint(data, data.len()),
            Endian::Big => BigEndian::read_uint(data, data.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_integers() {
        let data = [0x12, 0x34, 0x56, 0x78];

        let le = Endian::Little;
        assert_eq!(le.read_u16(&data), 0x3412);
        assert_eq!(le.read_u32(&data), 0x78563412);

        let be = Endian::Big;
        assert_eq!(be.read_u16(&data), 0x1234);
        assert_eq!(be.read_u32(&data), 0x12345678);
    }

    #[test]
    fn test_read_signed() {
        let data = [0xFF, 0xFE, 0xFF, 0xFF];
        assert_eq!(Endian::Big.read_i16(&data), -2);
        assert_eq!(Endian::Little.read_i16(&data[0..2]), -257);
        assert_eq!(Endian::Little.read_i32(&[0xFE, 0xFF, 0xFF, 0xFF]), -2);
    }

    #[test]
    fn test_read_floats() {
        let bits = 1.5f32.to_le_bytes();
        assert_eq!(Endian::Little.read_f32(&bits), 1.5);
        let bits = (-0.25f64).to_be_bytes();
        assert_eq!(Endian::Big.read_f64(&bits), -0.25);
    }

    #[test]
    fn test_read_uint_widths() {
        assert_eq!(Endian::Big.read_uint(&[0xFF]), 0xFF);
        assert_eq!(Endian::Big.read_uint(&[0x01, 0x02]), 0x0102);
        assert_eq!(Endian::Little.read_uint(&[0x01, 0x02, 0x03, 0x04]), 0x04030201);
    }

    #[test]
    fn test_byte_reversal_symmetry() {
        // The same bytes decoded under both orders are byte-reversed values
        let data = [0xAB, 0xCD];
        assert_eq!(
            Endian::Little.read_u16(&data),
            Endian::Big.read_u16(&data).swap_bytes()
        );
        let data = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(
            Endian::Little.read_u32(&data),
            Endian::Big.read_u32(&data).swap_bytes()
        );
    }
}
