//! Decoded field values.
//!
//! Every field decodes into one [`Value`]. Fields with `count = 1` unwrap to
//! the scalar variant of their type; larger counts produce the array variant
//! in on-disk element order. Rationals stay as raw numerator/denominator
//! pairs, including a denominator of zero, so nothing is lost before the
//! caller decides how to interpret them.

use std::fmt;

use serde::Serialize;

/// A decoded TIFF field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    /// ASCII string, cut at the first NUL. Bytes above `0x7F` are replaced,
    /// never rejected.
    Ascii(String),
    U8(u8),
    U8Array(Vec<u8>),
    U16(u16),
    U16Array(Vec<u16>),
    U32(u32),
    U32Array(Vec<u32>),
    I8(i8),
    I8Array(Vec<i8>),
    I16(i16),
    I16Array(Vec<i16>),
    I32(i32),
    I32Array(Vec<i32>),
    F32(f32),
    F32Array(Vec<f32>),
    F64(f64),
    F64Array(Vec<f64>),
    /// Unsigned rational (numerator, denominator), preserved verbatim
    Rational(u32, u32),
    RationalArray(Vec<(u32, u32)>),
    /// Signed rational (numerator, denominator), preserved verbatim
    SRational(i32, i32),
    SRationalArray(Vec<(i32, i32)>),
    /// Raw bytes of an `Undefined` field
    Undefined(Vec<u8>),
}

impl Value {
    /// Unsigned integer view of a scalar value (or of the first array
    /// element, which is how multi-valued tags are conventionally read).
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::U8(v) => Some(u32::from(*v)),
            Value::U16(v) => Some(u32::from(*v)),
            Value::U32(v) => Some(*v),
            Value::U8Array(v) => v.first().map(|&x| u32::from(x)),
            Value::U16Array(v) => v.first().map(|&x| u32::from(x)),
            Value::U32Array(v) => v.first().copied(),
            _ => None,
        }
    }

    /// String view of an ASCII value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Ascii(s) => Some(s),
            _ => None,
        }
    }

    /// Unsigned rational view (first element for arrays).
    pub fn as_rational(&self) -> Option<(u32, u32)> {
        match self {
            Value::Rational(num, den) => Some((*num, *den)),
            Value::RationalArray(v) => v.first().copied(),
            _ => None,
        }
    }

    /// Signed rational view (first element for arrays).
    pub fn as_srational(&self) -> Option<(i32, i32)> {
        match self {
            Value::SRational(num, den) => Some((*num, *den)),
            Value::SRationalArray(v) => v.first().copied(),
            _ => None,
        }
    }

    /// Raw bytes of an `Undefined` value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Undefined(data) => Some(data),
            _ => None,
        }
    }

    /// JSON rendering of the value.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "null".to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        }

        struct Ratio<T: fmt::Display>(T, T);
        impl<T: fmt::Display> fmt::Display for Ratio<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}/{}", self.0, self.1)
            }
        }

        match self {
            Value::Ascii(s) => write!(f, "{s}"),
            Value::U8(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::I8(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Rational(n, d) => write!(f, "{n}/{d}"),
            Value::SRational(n, d) => write!(f, "{n}/{d}"),
            Value::U8Array(v) => list(f, v),
            Value::U16Array(v) => list(f, v),
            Value::U32Array(v) => list(f, v),
            Value::I8Array(v) => list(f, v),
            Value::I16Array(v) => list(f, v),
            Value::I32Array(v) => list(f, v),
            Value::F32Array(v) => list(f, v),
            Value::F64Array(v) => list(f, v),
            Value::RationalArray(v) => {
                let ratios: Vec<Ratio<u32>> = v.iter().map(|&(n, d)| Ratio(n, d)).collect();
                list(f, &ratios)
            }
            Value::SRationalArray(v) => {
                let ratios: Vec<Ratio<i32>> = v.iter().map(|&(n, d)| Ratio(n, d)).collect();
                list(f, &ratios)
            }
            Value::Undefined(data) => write!(f, "({} bytes)", data.len()),
        }
    }
}
