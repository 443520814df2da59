//! Generic APPn segment (n > 1) with Exif-like content.
//!
//! The prelude matches APP1 (identifier, pad, TIFF header) but enumeration
//! is unbounded, because vendors store any number of IFDs here and some omit
//! the next-IFD linkage entirely. Enumeration follows the link when it is
//! present and otherwise falls back to measuring the current IFD to find the
//! next one, which forces its field table.

use std::io::{Read, Seek, SeekFrom};
use std::rc::Rc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::ifd::Ifd;
use crate::reader::{self, Loaded, SharedStream};
use crate::segment::{read_identifier, SegmentDescriptor};
use crate::tiff::TiffHeader;

#[derive(Debug, Clone)]
struct GenericHeader {
    identifier: String,
    /// `None` when the prelude does not announce a TIFF block.
    tiff: Option<TiffHeader>,
}

/// Where the enumeration will look next.
#[derive(Debug, Clone, Copy)]
enum NextIfd {
    /// Nothing parsed yet; the first cursor comes from the TIFF header.
    Unset,
    At(u64),
    Exhausted,
}

#[derive(Debug)]
pub struct GenericSegment<R> {
    stream: SharedStream<R>,
    descriptor: SegmentDescriptor,
    header: Loaded<GenericHeader>,
    ifds: Vec<Ifd<R>>,
    next_ifd: NextIfd,
    /// Latched enumeration failure; later requests repeat it.
    failure: Option<Error>,
}

impl<R: Read + Seek> GenericSegment<R> {
    pub(crate) fn new(descriptor: SegmentDescriptor, stream: &SharedStream<R>) -> Self {
        GenericSegment {
            stream: Rc::clone(stream),
            descriptor,
            header: Loaded::Unloaded,
            ifds: Vec::new(),
            next_ifd: NextIfd::Unset,
            failure: None,
        }
    }

    pub fn descriptor(&self) -> &SegmentDescriptor {
        &self.descriptor
    }

    pub fn is_loaded(&self) -> bool {
        self.header.is_loaded()
    }

    /// Load the prelude if it has not been read yet.
    ///
    /// Unlike strict APP1, a broken prelude degrades: a missing pad byte
    /// leaves the segment headerless instead of failing, and IFD requests
    /// then yield `None`.
    pub fn load(&mut self) -> Result<()> {
        if !self.header.is_loaded() {
            self.header = match self.parse_header() {
                Ok(header) => Loaded::Loaded(header),
                Err(err) => Loaded::Failed(err),
            };
        }
        match &self.header {
            Loaded::Failed(err) => Err(err.clone()),
            _ => Ok(()),
        }
    }

    /// The identifier at the head of the payload.
    pub fn identifier(&mut self) -> Result<&str> {
        self.load()?;
        match &self.header {
            Loaded::Loaded(header) => Ok(&header.identifier),
            _ => unreachable!("load settles the state"),
        }
    }

    /// The TIFF header, or `None` when the prelude carries no TIFF block.
    pub fn tiff_header(&mut self) -> Result<Option<TiffHeader>> {
        self.load()?;
        match &self.header {
            Loaded::Loaded(header) => Ok(header.tiff),
            _ => unreachable!("load settles the state"),
        }
    }

    /// IFD by index, loading and caching every intermediate one.
    ///
    /// The IFDs before `index` have to come along: without an out-of-band
    /// length there is no way to locate the k-th IFD directly.
    pub fn ifd(&mut self, index: usize) -> Result<Option<&mut Ifd<R>>> {
        while self.ifds.len() <= index {
            if !self.load_next_ifd()? {
                break;
            }
        }
        Ok(self.ifds.get_mut(index))
    }

    fn parse_header(&mut self) -> Result<GenericHeader> {
        let mut s = self.stream.borrow_mut();
        s.seek(SeekFrom::Start(self.descriptor.payload_offset()))?;
        debug!(segment = %self.descriptor.marker, "loading segment header");

        let identifier = read_identifier(&mut *s)?;
        debug!(%identifier, "segment identifier");

        let pad: [u8; 1] = reader::read_bytes(&mut *s)?;
        if pad[0] != 0x00 {
            debug!(pad = pad[0], "missing pad byte, treating segment as opaque");
            return Ok(GenericHeader {
                identifier,
                tiff: None,
            });
        }

        let tiff = TiffHeader::parse(&mut *s)?;
        debug!(?tiff, "TIFF header");
        Ok(GenericHeader {
            identifier,
            tiff: Some(tiff),
        })
    }

    /// Parse one more IFD. Returns `false` once the segment is exhausted.
    fn load_next_ifd(&mut self) -> Result<bool> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        match self.advance() {
            Ok(more) => Ok(more),
            Err(err) => {
                self.failure = Some(err.clone());
                Err(err)
            }
        }
    }

    fn advance(&mut self) -> Result<bool> {
        self.load()?;
        let Some(tiff) = self.tiff_header()? else {
            return Ok(false);
        };
        if let NextIfd::Unset = self.next_ifd {
            self.next_ifd = NextIfd::At(tiff.offset + u64::from(tiff.ifd0_offset));
        }
        let NextIfd::At(cursor) = self.next_ifd else {
            return Ok(false);
        };

        let index = self.ifds.len();
        debug!(index, offset = cursor, "IFD");
        self.stream.borrow_mut().seek(SeekFrom::Start(cursor))?;
        let mut ifd = Ifd::parse(&self.stream, &tiff, index, self.descriptor.end())?;

        if ifd.next_ifd_offset() > 0 {
            // linked list: the record names its successor
            self.next_ifd = NextIfd::At(tiff.offset + u64::from(ifd.next_ifd_offset()));
        } else {
            // Sequential layout: some vendors put IFDs back to back with no
            // linkage, so the only way to find a successor is to measure
            // this IFD, which forces its field table.
            let end = ifd.offset() + ifd.size()?;
            let segment_end = self.descriptor.end();
            if end > segment_end {
                return Err(Error::MalformedIfd(format!(
                    "IFD #{index} ends at {end}, past the segment end {segment_end}"
                )));
            }
            self.next_ifd = if end == segment_end {
                NextIfd::Exhausted
            } else {
                NextIfd::At(end)
            };
        }

        self.ifds.push(ifd);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::Marker;
    use crate::value::Value;
    use std::cell::RefCell;
    use std::io::Cursor;

    fn segment_of(data: Vec<u8>) -> GenericSegment<Cursor<Vec<u8>>> {
        let size = data.len() as u64;
        let stream = Rc::new(RefCell::new(Cursor::new(data)));
        let descriptor = SegmentDescriptor {
            marker: Marker::app(2),
            offset: 0,
            size,
        };
        GenericSegment::new(descriptor, &stream)
    }

    /// APP2 with two sequential IFDs, both with next_ifd_offset = 0, that
    /// together run exactly to the segment end.
    fn sequential_app2() -> Vec<u8> {
        let mut data = vec![0xFF, 0xE2, 0x00, 0x00]; // length patched below
        data.extend_from_slice(b"FPXR\0\0");
        data.extend_from_slice(b"II\x2A\x00\x08\x00\x00\x00"); // TIFF at offset 10
        for tag in [0x0100u16, 0x0101u16] {
            data.extend_from_slice(&[0x01, 0x00]); // one record
            data.extend_from_slice(&tag.to_le_bytes());
            data.extend_from_slice(&[0x03, 0x00]); // Short
            data.extend_from_slice(&[0x01, 0x00, 0x00, 0x00, 0x2A, 0x00, 0x00, 0x00]); // count 1, value 42
            data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // no link
        }
        let length = (data.len() - 2) as u16;
        data[2..4].copy_from_slice(&length.to_be_bytes());
        data
    }

    #[test]
    fn test_sequential_ifds() {
        let mut segment = segment_of(sequential_app2());

        let ifd0 = segment.ifd(0).unwrap().unwrap();
        assert_eq!(ifd0.offset(), 18);
        let width = ifd0.get_field(0x0100).unwrap().unwrap();
        assert_eq!(width.value().unwrap(), &Value::U16(42));

        let ifd1 = segment.ifd(1).unwrap().unwrap();
        assert_eq!(ifd1.offset(), 36);
        assert!(ifd1.get_field(0x0101).unwrap().is_some());

        // exact fit: enumeration stops cleanly
        assert!(segment.ifd(2).unwrap().is_none());
    }

    #[test]
    fn test_skipping_ahead_loads_intermediates() {
        let mut segment = segment_of(sequential_app2());
        assert!(segment.ifd(1).unwrap().is_some());
        assert_eq!(segment.ifds.len(), 2);
    }

    #[test]
    fn test_sequential_overrun_is_malformed() {
        let data = sequential_app2();
        // truncate the declared segment size so the second IFD overruns it
        let size = (data.len() - 4) as u64;
        let stream = Rc::new(RefCell::new(Cursor::new(data)));
        let descriptor = SegmentDescriptor {
            marker: Marker::app(2),
            offset: 0,
            size,
        };
        let mut segment = GenericSegment::new(descriptor, &stream);

        assert!(segment.ifd(0).unwrap().is_some());
        assert!(matches!(segment.ifd(1), Err(Error::MalformedIfd(_))));
        // the failure is latched
        assert!(matches!(segment.ifd(1), Err(Error::MalformedIfd(_))));
    }

    #[test]
    fn test_missing_pad_degrades() {
        let mut data = vec![0xFF, 0xE2, 0x00, 0x10];
        data.extend_from_slice(b"FPXR\0\x01"); // pad is not 0x00
        data.extend_from_slice(&[0u8; 8]);
        let mut segment = segment_of(data);

        segment.load().unwrap();
        assert_eq!(segment.tiff_header().unwrap(), None);
        assert!(segment.ifd(0).unwrap().is_none());
    }
}
