//! jpeg-probe - lazy, random-access inspection of JPEG structure and Exif
//! metadata
//!
//! This crate walks a JPEG's marker skeleton once, then hands out handles
//! that pull segment headers, IFDs and field values from the stream only
//! when asked. It never mutates or re-encodes anything; it answers questions
//! about what is in the file and where the compressed image payload lives.
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use jpeg_probe::{JpegParser, ParseOptions, TagPath, Value};
//!
//! // A minimal JPEG: APP1/Exif with a single Orientation field, an empty
//! // SOS header, and EOI.
//! let mut data = vec![0xFF, 0xD8]; // SOI
//! data.extend_from_slice(&[0xFF, 0xE1, 0x00, 0x22]); // APP1
//! data.extend_from_slice(b"Exif\0\0");
//! data.extend_from_slice(b"II\x2A\x00\x08\x00\x00\x00"); // TIFF header, LE
//! data.extend_from_slice(&[0x01, 0x00]); // IFD0: one field
//! data.extend_from_slice(&[
//!     0x12, 0x01, 0x03, 0x00, // Orientation, Short
//!     0x01, 0x00, 0x00, 0x00, // count 1
//!     0x06, 0x00, 0x00, 0x00, // value 6
//! ]);
//! data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // no IFD1
//! data.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02]); // SOS
//! data.extend_from_slice(&[0xFF, 0xD9]); // EOI
//!
//! let mut parser = JpegParser::open_with(
//!     Cursor::new(data),
//!     ParseOptions { estimate_image_size: true },
//! )?;
//!
//! let orientation = parser.get_tag_value(TagPath::new("APP1", 0, 0x0112))?;
//! assert_eq!(orientation, Some(Value::U16(6)));
//! assert_eq!(parser.image_data_size()?, 0);
//! # Ok::<(), jpeg_probe::Error>(())
//! ```

pub mod endian;
pub mod error;
pub mod field;
pub mod field_type;
pub mod ifd;
pub mod info;
pub mod marker;
pub mod parser;
pub mod segment;
pub mod tiff;
pub mod value;

mod reader;
mod scanner;

// Re-export commonly used types
pub use endian::Endian;
pub use error::{Error, Result};
pub use field::IfdEntry;
pub use field_type::FieldType;
pub use ifd::Ifd;
pub use info::ExifInfo;
pub use marker::{Marker, MarkerKind};
pub use parser::{JpegParser, ParseOptions, TagPath};
pub use segment::{ExifSegment, GenericSegment, JfifSegment, Segment, SegmentDescriptor};
pub use tiff::TiffHeader;
pub use value::Value;
