//! TIFF header parsing.
//!
//! The 8-byte header anchors the Exif offset space: every offset stored in
//! an IFD or field record is relative to the header's first byte, so the
//! header records its own absolute stream position at parse time.

use std::io::{Read, Seek};

use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::reader;

/// The 16-bit magic that follows the byte-order mark.
const TIFF_MAGIC: u16 = 0x002A;

/// On-disk size of the header.
pub const TIFF_HEADER_SIZE: u64 = 8;

/// TIFF header: byte order, magic, and the offset of IFD0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    pub byte_order: Endian,
    /// Offset of IFD0, relative to the header's first byte.
    pub ifd0_offset: u32,
    /// Absolute stream position of the header's first byte. All Exif
    /// offsets are re-anchored against this.
    pub offset: u64,
}

impl TiffHeader {
    /// Parse the header at the stream's current position.
    pub fn parse<R: Read + Seek>(stream: &mut R) -> Result<Self> {
        let offset = stream.stream_position()?;

        let bom: [u8; 2] = reader::read_bytes(stream)?;
        // Both bytes must agree: "II" or "MM"
        let byte_order = match &bom {
            b"II" => Endian::Little,
            b"MM" => Endian::Big,
            _ => {
                return Err(Error::InvalidTiffHeader(format!(
                    "bad byte-order mark {:02X} {:02X}",
                    bom[0], bom[1]
                )))
            }
        };

        let magic_bytes: [u8; 2] = reader::read_bytes(stream)?;
        let magic = byte_order.read_u16(&magic_bytes);
        if magic != TIFF_MAGIC {
            return Err(Error::InvalidTiffHeader(format!(
                "bad magic 0x{magic:04X} (expected 0x{TIFF_MAGIC:04X})"
            )));
        }

        let offset_bytes: [u8; 4] = reader::read_bytes(stream)?;
        let ifd0_offset = byte_order.read_u32(&offset_bytes);

        Ok(TiffHeader {
            byte_order,
            ifd0_offset,
            offset,
        })
    }
}
