//! APP1/Exif segment, strict form.
//!
//! The payload opens with `"Exif\0"` plus one pad byte, then a TIFF header
//! that anchors the offset space. Exactly two IFDs are reachable: IFD0 at
//! the header's `ifd0_offset`, and IFD1 through IFD0's next-IFD link. Other
//! Exif structures (sub-IFDs, thumbnails) hang off IFD0 fields and are the
//! caller's business.

use std::io::{Read, Seek, SeekFrom};
use std::rc::Rc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::ifd::Ifd;
use crate::reader::{self, Loaded, SharedStream};
use crate::segment::{read_identifier, SegmentDescriptor};
use crate::tiff::TiffHeader;

#[derive(Debug, Clone)]
struct ExifHeader {
    identifier: String,
    /// `None` when the payload is not Exif; IFD requests then yield nothing.
    tiff: Option<TiffHeader>,
}

#[derive(Debug)]
pub struct ExifSegment<R> {
    stream: SharedStream<R>,
    descriptor: SegmentDescriptor,
    header: Loaded<ExifHeader>,
    ifd0: Loaded<Option<Ifd<R>>>,
    ifd1: Loaded<Option<Ifd<R>>>,
}

impl<R: Read + Seek> ExifSegment<R> {
    pub(crate) fn new(descriptor: SegmentDescriptor, stream: &SharedStream<R>) -> Self {
        ExifSegment {
            stream: Rc::clone(stream),
            descriptor,
            header: Loaded::Unloaded,
            ifd0: Loaded::Unloaded,
            ifd1: Loaded::Unloaded,
        }
    }

    pub fn descriptor(&self) -> &SegmentDescriptor {
        &self.descriptor
    }

    pub fn is_loaded(&self) -> bool {
        self.header.is_loaded()
    }

    /// Load the segment header (identifier, pad, TIFF header) if it has not
    /// been read yet. A failure is latched.
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

    /// The identifier at the head of the payload, `"Exif"` for real Exif.
    pub fn identifier(&mut self) -> Result<&str> {
        self.load()?;
        match &self.header {
            Loaded::Loaded(header) => Ok(&header.identifier),
            _ => unreachable!("load settles the state"),
        }
    }

    /// The TIFF header, or `None` when the payload is not Exif.
    pub fn tiff_header(&mut self) -> Result<Option<TiffHeader>> {
        self.load()?;
        match &self.header {
            Loaded::Loaded(header) => Ok(header.tiff),
            _ => unreachable!("load settles the state"),
        }
    }

    /// IFD by index. APP1 exposes exactly two: `ifd(0)` and `ifd(1)`;
    /// anything beyond is `None` without touching the stream.
    pub fn ifd(&mut self, index: usize) -> Result<Option<&mut Ifd<R>>> {
        match index {
            0 => {
                self.ensure_ifd0()?;
                Ok(match &mut self.ifd0 {
                    Loaded::Loaded(ifd) => ifd.as_mut(),
                    _ => None,
                })
            }
            1 => {
                self.ensure_ifd1()?;
                Ok(match &mut self.ifd1 {
                    Loaded::Loaded(ifd) => ifd.as_mut(),
                    _ => None,
                })
            }
            _ => Ok(None),
        }
    }

    fn parse_header(&mut self) -> Result<ExifHeader> {
        let mut s = self.stream.borrow_mut();
        s.seek(SeekFrom::Start(self.descriptor.payload_offset()))?;
        debug!(segment = %self.descriptor.marker, "loading segment header");

        let identifier = read_identifier(&mut *s)?;
        if !identifier.eq_ignore_ascii_case("exif") {
            // not Exif; leave the payload alone
            debug!(%identifier, "APP1 payload is not Exif");
            return Ok(ExifHeader {
                identifier,
                tiff: None,
            });
        }

        // the signature is "Exif\0\0"; the identifier read consumed one NUL
        let pad: [u8; 1] = reader::read_bytes(&mut *s)?;
        if pad[0] != 0x00 {
            return Err(Error::MalformedSegment {
                marker: self.descriptor.marker.name(),
                reason: format!("expected 0x00 pad after Exif identifier, found 0x{:02X}", pad[0]),
            });
        }

        let tiff = TiffHeader::parse(&mut *s)?;
        debug!(?tiff, "TIFF header");
        Ok(ExifHeader {
            identifier,
            tiff: Some(tiff),
        })
    }

    fn ensure_ifd0(&mut self) -> Result<()> {
        if !self.ifd0.is_loaded() {
            self.ifd0 = match self.parse_ifd0() {
                Ok(ifd) => Loaded::Loaded(ifd),
                Err(err) => Loaded::Failed(err),
            };
        }
        match &self.ifd0 {
            Loaded::Failed(err) => Err(err.clone()),
            _ => Ok(()),
        }
    }

    fn parse_ifd0(&mut self) -> Result<Option<Ifd<R>>> {
        let Some(tiff) = self.tiff_header()? else {
            debug!("TIFF header is missing, no IFDs");
            return Ok(None);
        };
        let ifd0_offset = tiff.offset + u64::from(tiff.ifd0_offset);
        debug!(offset = ifd0_offset, "IFD #0");
        self.stream.borrow_mut().seek(SeekFrom::Start(ifd0_offset))?;
        Ifd::parse(&self.stream, &tiff, 0, self.descriptor.end()).map(Some)
    }

    fn ensure_ifd1(&mut self) -> Result<()> {
        if !self.ifd1.is_loaded() {
            self.ifd1 = match self.parse_ifd1() {
                Ok(ifd) => Loaded::Loaded(ifd),
                Err(err) => Loaded::Failed(err),
            };
        }
        match &self.ifd1 {
            Loaded::Failed(err) => Err(err.clone()),
            _ => Ok(()),
        }
    }

    fn parse_ifd1(&mut self) -> Result<Option<Ifd<R>>> {
        let Some(tiff) = self.tiff_header()? else {
            return Ok(None);
        };
        self.ensure_ifd0()?;
        let next = match &self.ifd0 {
            Loaded::Loaded(Some(ifd0)) => ifd0.next_ifd_offset(),
            _ => return Ok(None),
        };
        if next == 0 {
            return Ok(None);
        }
        let ifd1_offset = tiff.offset + u64::from(next);
        debug!(offset = ifd1_offset, "IFD #1");
        self.stream.borrow_mut().seek(SeekFrom::Start(ifd1_offset))?;
        Ifd::parse(&self.stream, &tiff, 1, self.descriptor.end()).map(Some)
    }
}
