//! JPEG segment variants.
//!
//! APP segments are polymorphic: APP0 carries JFIF and stays opaque, APP1
//! carries Exif with exactly two linked IFDs, and higher APPn segments get a
//! generic Exif-like treatment that tolerates vendor layouts. Everything
//! else is held as a bare descriptor.

mod exif;
mod generic;
mod jfif;

pub use exif::ExifSegment;
pub use generic::GenericSegment;
pub use jfif::JfifSegment;

use std::io::{Read, Seek};

use serde::Serialize;

use crate::error::Result;
use crate::ifd::Ifd;
use crate::marker::{Marker, MarkerKind, LENGTH_SIZE, MARKER_SIZE};
use crate::reader::{self, SharedStream};

/// Location and extent of one segment inside the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SegmentDescriptor {
    pub marker: Marker,
    /// Absolute offset of the marker's first byte.
    pub offset: u64,
    /// Byte count, marker included.
    pub size: u64,
}

impl SegmentDescriptor {
    /// First byte past the segment.
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    /// First byte of the payload, past the marker and length prefix.
    pub(crate) fn payload_offset(&self) -> u64 {
        self.offset + MARKER_SIZE + LENGTH_SIZE
    }
}

/// A classified segment.
///
/// The variants that can carry Exif data expose `ifd`; the rest answer the
/// common descriptor queries only.
#[derive(Debug)]
pub enum Segment<R> {
    Jfif(JfifSegment<R>),
    Exif(ExifSegment<R>),
    Generic(GenericSegment<R>),
    Other(SegmentDescriptor),
}

impl<R: Read + Seek> Segment<R> {
    /// Classify a scanned segment by its marker.
    pub(crate) fn create(descriptor: SegmentDescriptor, stream: &SharedStream<R>) -> Segment<R> {
        match descriptor.marker.kind() {
            MarkerKind::App(0) => Segment::Jfif(JfifSegment::new(descriptor, stream)),
            MarkerKind::App(1) => Segment::Exif(ExifSegment::new(descriptor, stream)),
            MarkerKind::App(_) => Segment::Generic(GenericSegment::new(descriptor, stream)),
            _ => Segment::Other(descriptor),
        }
    }

    pub fn descriptor(&self) -> &SegmentDescriptor {
        match self {
            Segment::Jfif(s) => s.descriptor(),
            Segment::Exif(s) => s.descriptor(),
            Segment::Generic(s) => s.descriptor(),
            Segment::Other(d) => d,
        }
    }

    pub fn marker(&self) -> Marker {
        self.descriptor().marker
    }

    pub fn offset(&self) -> u64 {
        self.descriptor().offset
    }

    pub fn size(&self) -> u64 {
        self.descriptor().size
    }

    /// Whether the segment header has been pulled from the stream. Segments
    /// without lazy content count as loaded from the start.
    pub fn is_loaded(&self) -> bool {
        match self {
            Segment::Jfif(s) => s.is_loaded(),
            Segment::Exif(s) => s.is_loaded(),
            Segment::Generic(s) => s.is_loaded(),
            Segment::Other(_) => true,
        }
    }

    /// IFD access for the Exif-bearing variants; `Ok(None)` elsewhere, so a
    /// tag-path walk degrades instead of erroring.
    pub fn ifd(&mut self, index: usize) -> Result<Option<&mut Ifd<R>>> {
        match self {
            Segment::Exif(s) => s.ifd(index),
            Segment::Generic(s) => s.ifd(index),
            Segment::Jfif(_) | Segment::Other(_) => Ok(None),
        }
    }
}

/// Read the NUL-terminated ASCII identifier at the head of an APP payload.
pub(crate) fn read_identifier<R: Read>(stream: &mut R) -> Result<String> {
    let mut name = Vec::new();
    loop {
        let byte: [u8; 1] = reader::read_bytes(stream)?;
        if byte[0] == 0x00 {
            break;
        }
        name.push(byte[0]);
    }
    Ok(String::from_utf8_lossy(&name).into_owned())
}
