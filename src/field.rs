//! IFD field records and typed value decoding.
//!
//! A field is a fixed 12-byte record: tag id, type id, element count, and a
//! 4-byte slot that either holds the value inline (when the payload fits) or
//! an offset to it, relative to the TIFF header. Parsing reads only the
//! record; the value itself is decoded on first access.

use std::io::{Read, Seek, SeekFrom};
use std::rc::Rc;

use tracing::trace;

use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::field_type::FieldType;
use crate::reader::{self, Loaded, SharedStream};
use crate::tiff::TiffHeader;
use crate::value::Value;

/// On-disk size of one field record.
pub const ENTRY_SIZE: u64 = 12;

/// Capacity of the record's inline value slot.
const INLINE_VALUE_SIZE: u64 = 4;

/// One field of an IFD, with a lazily decoded value.
#[derive(Debug)]
pub struct IfdEntry<R> {
    stream: SharedStream<R>,
    byte_order: Endian,
    tag_id: u16,
    field_type: FieldType,
    count: u32,
    /// Absolute position of the value payload. For inline values this points
    /// into the record's own 4-byte slot.
    value_offset: u64,
    /// Absolute position of the 12-byte record.
    offset: u64,
    /// Contribution to the enclosing IFD's size: the record itself plus the
    /// 4-aligned out-of-line payload, if any.
    size: u64,
    value: Loaded<Value>,
}

impl<R: Read + Seek> IfdEntry<R> {
    /// Parse the record at the stream's current position. Consumes exactly
    /// 12 bytes; the value payload is not touched.
    pub(crate) fn parse(stream: &SharedStream<R>, tiff: &TiffHeader) -> Result<Self> {
        let byte_order = tiff.byte_order;
        let mut s = stream.borrow_mut();
        let offset = s.stream_position()?;

        let buf: [u8; 2] = reader::read_bytes(&mut *s)?;
        let tag_id = byte_order.read_u16(&buf);

        let buf: [u8; 2] = reader::read_bytes(&mut *s)?;
        let field_type = FieldType::from_u16(byte_order.read_u16(&buf));

        let buf: [u8; 4] = reader::read_bytes(&mut *s)?;
        let count = byte_order.read_u32(&buf);

        let payload = u64::from(count) * field_type.byte_size() as u64;
        let (value_offset, size) = if payload <= INLINE_VALUE_SIZE {
            s.seek(SeekFrom::Current(INLINE_VALUE_SIZE as i64))?;
            (offset + 8, ENTRY_SIZE)
        } else {
            let buf: [u8; 4] = reader::read_bytes(&mut *s)?;
            let external = u64::from(byte_order.read_u32(&buf));
            (tiff.offset + external, reader::align4(payload) + ENTRY_SIZE)
        };
        drop(s);

        trace!(tag_id, ?field_type, count, value_offset, size, "field record");

        Ok(IfdEntry {
            stream: Rc::clone(stream),
            byte_order,
            tag_id,
            field_type,
            count,
            value_offset,
            offset,
            size,
            value: Loaded::Unloaded,
        })
    }

    pub fn tag_id(&self) -> u16 {
        self.tag_id
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Absolute position of the 12-byte record.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Absolute position of the value payload.
    pub fn value_offset(&self) -> u64 {
        self.value_offset
    }

    /// Bytes this field contributes to its IFD, out-of-line payload included.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_loaded(&self) -> bool {
        self.value.is_loaded()
    }

    /// The decoded value, materialized on first access.
    ///
    /// A failed decode is terminal; later calls report the same error. The
    /// record's header stays valid either way, so `size` and the offsets
    /// remain usable for fields of unknown type.
    pub fn value(&mut self) -> Result<&Value> {
        if !self.value.is_loaded() {
            self.value = match self.load_value() {
                Ok(value) => Loaded::Loaded(value),
                Err(err) => Loaded::Failed(err),
            };
        }
        match &self.value {
            Loaded::Loaded(value) => Ok(value),
            Loaded::Failed(err) => Err(err.clone()),
            Loaded::Unloaded => unreachable!("value load settles the state"),
        }
    }

    fn load_value(&self) -> Result<Value> {
        let payload = self.count as usize * self.field_type.byte_size();
        let mut s = self.stream.borrow_mut();
        s.seek(SeekFrom::Start(self.value_offset))?;
        let data = reader::read_vec(&mut *s, payload)?;
        drop(s);

        decode_value(&data, self.field_type, self.count, self.byte_order)
    }
}

/// Decode `count` elements of `field_type` from `data`.
///
/// Singletons unwrap to scalars; anything larger keeps on-disk order in the
/// array variant.
fn decode_value(data: &[u8], field_type: FieldType, count: u32, byte_order: Endian) -> Result<Value> {
    let n = count as usize;
    let value = match field_type {
        FieldType::Ascii => Value::Ascii(decode_ascii(data)),
        FieldType::Undefined => Value::Undefined(data.to_vec()),
        FieldType::Byte => {
            let vals = data[..n].to_vec();
            if n == 1 {
                Value::U8(vals[0])
            } else {
                Value::U8Array(vals)
            }
        }
        FieldType::SByte => {
            let vals: Vec<i8> = data[..n].iter().map(|&b| b as i8).collect();
            if n == 1 {
                Value::I8(vals[0])
            } else {
                Value::I8Array(vals)
            }
        }
        FieldType::Short => {
            let vals: Vec<u16> = data
                .chunks_exact(2)
                .take(n)
                .map(|c| byte_order.read_u16(c))
                .collect();
            if n == 1 {
                Value::U16(vals[0])
            } else {
                Value::U16Array(vals)
            }
        }
        FieldType::SShort => {
            let vals: Vec<i16> = data
                .chunks_exact(2)
                .take(n)
                .map(|c| byte_order.read_i16(c))
                .collect();
            if n == 1 {
                Value::I16(vals[0])
            } else {
                Value::I16Array(vals)
            }
        }
        FieldType::Long => {
            let vals: Vec<u32> = data
                .chunks_exact(4)
                .take(n)
                .map(|c| byte_order.read_u32(c))
                .collect();
            if n == 1 {
                Value::U32(vals[0])
            } else {
                Value::U32Array(vals)
            }
        }
        FieldType::SLong => {
            let vals: Vec<i32> = data
                .chunks_exact(4)
                .take(n)
                .map(|c| byte_order.read_i32(c))
                .collect();
            if n == 1 {
                Value::I32(vals[0])
            } else {
                Value::I32Array(vals)
            }
        }
        FieldType::Float => {
            let vals: Vec<f32> = data
                .chunks_exact(4)
                .take(n)
                .map(|c| byte_order.read_f32(c))
                .collect();
            if n == 1 {
                Value::F32(vals[0])
            } else {
                Value::F32Array(vals)
            }
        }
        FieldType::Double => {
            let vals: Vec<f64> = data
                .chunks_exact(8)
                .take(n)
                .map(|c| byte_order.read_f64(c))
                .collect();
            if n == 1 {
                Value::F64(vals[0])
            } else {
                Value::F64Array(vals)
            }
        }
        FieldType::Rational => {
            let vals: Vec<(u32, u32)> = data
                .chunks_exact(8)
                .take(n)
                .map(|c| (byte_order.read_u32(&c[..4]), byte_order.read_u32(&c[4..])))
                .collect();
            if n == 1 {
                Value::Rational(vals[0].0, vals[0].1)
            } else {
                Value::RationalArray(vals)
            }
        }
        FieldType::SRational => {
            let vals: Vec<(i32, i32)> = data
                .chunks_exact(8)
                .take(n)
                .map(|c| (byte_order.read_i32(&c[..4]), byte_order.read_i32(&c[4..])))
                .collect();
            if n == 1 {
                Value::SRational(vals[0].0, vals[0].1)
            } else {
                Value::SRationalArray(vals)
            }
        }
        FieldType::Unknown(type_id) => return Err(Error::UnknownFieldType(type_id)),
    };
    Ok(value)
}

/// Cut at the first NUL and convert. Bytes above `0x7F` are replaced rather
/// than rejected; an immediate NUL yields the empty string.
fn decode_ascii(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Cursor;

    fn stream_of(bytes: Vec<u8>) -> SharedStream<Cursor<Vec<u8>>> {
        Rc::new(RefCell::new(Cursor::new(bytes)))
    }

    fn le_header() -> TiffHeader {
        TiffHeader {
            byte_order: Endian::Little,
            ifd0_offset: 8,
            offset: 0,
        }
    }

    #[test]
    fn test_parse_inline_short() {
        // Orientation = 6, stored inline
        let data = vec![
            0x12, 0x01, // tag 0x0112
            0x03, 0x00, // type 3 (Short)
            0x01, 0x00, 0x00, 0x00, // count 1
            0x06, 0x00, 0x00, 0x00, // value 6
        ];
        let stream = stream_of(data);
        let mut entry = IfdEntry::parse(&stream, &le_header()).unwrap();

        assert_eq!(entry.tag_id(), 0x0112);
        assert_eq!(entry.field_type(), FieldType::Short);
        assert_eq!(entry.count(), 1);
        assert_eq!(entry.value_offset(), entry.offset() + 8);
        assert_eq!(entry.size(), ENTRY_SIZE);
        assert!(!entry.is_loaded());

        assert_eq!(entry.value().unwrap(), &Value::U16(6));
        assert!(entry.is_loaded());
        // Decoding is idempotent
        assert_eq!(entry.value().unwrap(), &Value::U16(6));
    }

    #[test]
    fn test_parse_external_rational() {
        // XResolution = 72/1, payload behind an offset
        let mut data = vec![
            0x1A, 0x01, // tag 0x011A
            0x05, 0x00, // type 5 (Rational)
            0x01, 0x00, 0x00, 0x00, // count 1
            0x0C, 0x00, 0x00, 0x00, // offset 12 from the TIFF anchor
        ];
        data.extend_from_slice(&[0x48, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]);
        let stream = stream_of(data);
        let mut entry = IfdEntry::parse(&stream, &le_header()).unwrap();

        assert_eq!(entry.value_offset(), 12);
        assert_eq!(entry.size(), ENTRY_SIZE + 8);
        assert_eq!(entry.value().unwrap(), &Value::Rational(72, 1));
    }

    #[test]
    fn test_external_payload_is_aligned_in_size() {
        // 5 ASCII bytes round up to 8 in the size accounting
        let mut data = vec![
            0x0F, 0x01, // tag 0x010F (Make)
            0x02, 0x00, // type 2 (ASCII)
            0x05, 0x00, 0x00, 0x00, // count 5
            0x0C, 0x00, 0x00, 0x00, // offset 12
        ];
        data.extend_from_slice(b"Nik\0\0");
        let stream = stream_of(data);
        let mut entry = IfdEntry::parse(&stream, &le_header()).unwrap();

        assert_eq!(entry.size(), ENTRY_SIZE + 8);
        assert_eq!(entry.value().unwrap(), &Value::Ascii("Nik".into()));
    }

    #[test]
    fn test_big_endian_record() {
        let tiff = TiffHeader {
            byte_order: Endian::Big,
            ifd0_offset: 8,
            offset: 0,
        };
        let data = vec![
            0x01, 0x12, // tag 0x0112
            0x00, 0x03, // type 3
            0x00, 0x00, 0x00, 0x01, // count 1
            0x00, 0x06, 0x00, 0x00, // value 6 in the slot's first two bytes
        ];
        let stream = stream_of(data);
        let mut entry = IfdEntry::parse(&stream, &tiff).unwrap();
        assert_eq!(entry.value().unwrap(), &Value::U16(6));
    }

    #[test]
    fn test_unknown_type_header_stays_valid() {
        let data = vec![
            0xAD, 0xDE, // tag 0xDEAD
            0xFF, 0x00, // type 255, not in the catalog
            0x01, 0x00, 0x00, 0x00, // count 1
            0x00, 0x00, 0x00, 0x00,
        ];
        let stream = stream_of(data);
        let mut entry = IfdEntry::parse(&stream, &le_header()).unwrap();

        assert_eq!(entry.field_type(), FieldType::Unknown(255));
        // Unknown types occupy zero bytes, so the record is self-contained
        assert_eq!(entry.size(), ENTRY_SIZE);
        assert_eq!(entry.value_offset(), entry.offset() + 8);

        // The value is undecodable, and stays that way
        assert!(matches!(entry.value(), Err(Error::UnknownFieldType(255))));
        assert!(matches!(entry.value(), Err(Error::UnknownFieldType(255))));
    }

    #[test]
    fn test_ascii_inline() {
        let data = vec![
            0x0F, 0x01, // tag 0x010F
            0x02, 0x00, // type 2 (ASCII)
            0x04, 0x00, 0x00, 0x00, // count 4
            b'A', b'b', 0x00, b'x', // "Ab" + NUL + junk
        ];
        let stream = stream_of(data);
        let mut entry = IfdEntry::parse(&stream, &le_header()).unwrap();
        assert_eq!(entry.value().unwrap(), &Value::Ascii("Ab".into()));
    }

    #[test]
    fn test_ascii_leading_nul_is_empty() {
        let data = vec![
            0x0F, 0x01, 0x02, 0x00, //
            0x02, 0x00, 0x00, 0x00, // count 2
            0x00, b'Z', 0x00, 0x00,
        ];
        let stream = stream_of(data);
        let mut entry = IfdEntry::parse(&stream, &le_header()).unwrap();
        assert_eq!(entry.value().unwrap(), &Value::Ascii(String::new()));
    }

    #[test]
    fn test_srational_negative() {
        let mut data = vec![
            0x04, 0x92, // tag 0x9204 (exposure bias)
            0x0A, 0x00, // type 10 (SRational)
            0x01, 0x00, 0x00, 0x00, // count 1
            0x0C, 0x00, 0x00, 0x00, // offset 12
        ];
        data.extend_from_slice(&[0xFE, 0xFF, 0xFF, 0xFF, 0x03, 0x00, 0x00, 0x00]); // -2/3
        let stream = stream_of(data);
        let mut entry = IfdEntry::parse(&stream, &le_header()).unwrap();
        assert_eq!(entry.value().unwrap(), &Value::SRational(-2, 3));
    }

    #[test]
    fn test_short_array_keeps_order() {
        let mut data = vec![
            0x02, 0x01, // tag 0x0102 (BitsPerSample)
            0x03, 0x00, // type 3
            0x03, 0x00, 0x00, 0x00, // count 3: 6 bytes, out of line
            0x0C, 0x00, 0x00, 0x00,
        ];
        data.extend_from_slice(&[0x08, 0x00, 0x09, 0x00, 0x0A, 0x00]);
        let stream = stream_of(data);
        let mut entry = IfdEntry::parse(&stream, &le_header()).unwrap();
        assert_eq!(entry.value().unwrap(), &Value::U16Array(vec![8, 9, 10]));
    }

    #[test]
    fn test_rational_zero_denominator_preserved() {
        let mut data = vec![
            0x1A, 0x01, 0x05, 0x00, //
            0x01, 0x00, 0x00, 0x00, //
            0x0C, 0x00, 0x00, 0x00,
        ];
        data.extend_from_slice(&[0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]); // 5/0
        let stream = stream_of(data);
        let mut entry = IfdEntry::parse(&stream, &le_header()).unwrap();
        assert_eq!(entry.value().unwrap(), &Value::Rational(5, 0));
    }

    #[test]
    fn test_truncated_payload_fails() {
        let data = vec![
            0x1A, 0x01, 0x05, 0x00, //
            0x01, 0x00, 0x00, 0x00, //
            0x0C, 0x00, 0x00, 0x00, // offset 12, but nothing lives there
        ];
        let stream = stream_of(data);
        let mut entry = IfdEntry::parse(&stream, &le_header()).unwrap();
        assert!(matches!(entry.value(), Err(Error::UnexpectedEof)));
    }
}
