//! Top-level JPEG metadata parser.
//!
//! Owns the stream, scans the segment skeleton once at construction, and
//! hands out lazily loading segment, IFD and field handles. Nothing beyond
//! the segment index is read until something asks for it.

use std::cell::RefCell;
use std::io::{Read, Seek};
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::info::ExifInfo;
use crate::marker::MarkerKind;
use crate::reader::SharedStream;
use crate::scanner;
use crate::segment::{Segment, SegmentDescriptor};
use crate::value::Value;

/// Scan-time options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Scan past SOS for the EOI marker, so [`JpegParser::image_data_size`]
    /// can be answered. Off by default; the byte scan touches the whole
    /// stream.
    pub estimate_image_size: bool,
}

/// Address of one tag: segment name, IFD index within it, tag id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagPath<'a> {
    pub app: &'a str,
    pub ifd: usize,
    pub tag: u16,
}

impl<'a> TagPath<'a> {
    pub fn new(app: &'a str, ifd: usize, tag: u16) -> Self {
        TagPath { app, ifd, tag }
    }
}

/// The parser: segment index plus the shared stream every handle reads from.
pub struct JpegParser<R: Read + Seek> {
    stream: SharedStream<R>,
    segments: IndexMap<String, Segment<R>>,
    sos: Option<SegmentDescriptor>,
    eoi: Option<SegmentDescriptor>,
}

impl<R: Read + Seek> JpegParser<R> {
    /// Scan the stream's segment structure. The stream must be positioned at
    /// the start of the JPEG data.
    pub fn open(stream: R) -> Result<Self> {
        Self::open_with(stream, ParseOptions::default())
    }

    /// [`JpegParser::open`] with explicit options.
    pub fn open_with(mut stream: R, options: ParseOptions) -> Result<Self> {
        let descriptors = scanner::scan_segments(&mut stream, options.estimate_image_size)?;
        let stream = Rc::new(RefCell::new(stream));

        let mut segments = IndexMap::new();
        let mut sos = None;
        let mut eoi = None;
        for descriptor in descriptors {
            match descriptor.marker.kind() {
                MarkerKind::Sos => sos = Some(descriptor),
                MarkerKind::Eoi => eoi = Some(descriptor),
                _ => {}
            }
            // key by marker name; on a collision the first segment wins, so
            // a second APP1 (XMP, typically) cannot shadow the Exif one
            segments
                .entry(descriptor.marker.name())
                .or_insert_with(|| Segment::create(descriptor, &stream));
        }
        debug!(segments = segments.len(), "JPEG structure scanned");

        Ok(JpegParser {
            stream,
            segments,
            sos,
            eoi,
        })
    }

    /// Segments in file order, with their index names.
    pub fn segments(&self) -> impl Iterator<Item = (&str, &Segment<R>)> {
        self.segments.iter().map(|(name, seg)| (name.as_str(), seg))
    }

    /// Segments in file order, mutable for lazy loading.
    pub fn segments_mut(&mut self) -> impl Iterator<Item = (&str, &mut Segment<R>)> {
        self.segments
            .iter_mut()
            .map(|(name, seg)| (name.as_str(), seg))
    }

    /// Segment by index name (`"APP1"`, `"DQT"`, ...), case-insensitive.
    pub fn get_segment(&mut self, name: &str) -> Option<&mut Segment<R>> {
        self.segments.get_mut(name.to_ascii_uppercase().as_str())
    }

    /// Resolve a tag path to its decoded value.
    ///
    /// Every absent hop (no such segment, the segment carries no IFDs, no
    /// such IFD, no such tag) is `Ok(None)`; pick a default with
    /// `unwrap_or`. Errors are reserved for structural or decoding failures
    /// on a path that exists.
    pub fn get_tag_value(&mut self, path: TagPath<'_>) -> Result<Option<Value>> {
        let Some(segment) = self.get_segment(path.app) else {
            return Ok(None);
        };
        let Some(ifd) = segment.ifd(path.ifd)? else {
            return Ok(None);
        };
        let Some(field) = ifd.get_field(path.tag)? else {
            return Ok(None);
        };
        field.value().map(|value| Some(value.clone()))
    }

    /// Named accessors over the standard Exif catalog.
    pub fn exif_info(&mut self) -> ExifInfo<'_, R> {
        ExifInfo::new(self)
    }

    /// The SOS descriptor, when the stream has one.
    pub fn sos_segment(&self) -> Option<&SegmentDescriptor> {
        self.sos.as_ref()
    }

    /// The EOI descriptor; present only when the EOI scan ran and succeeded.
    pub fn eoi_segment(&self) -> Option<&SegmentDescriptor> {
        self.eoi.as_ref()
    }

    /// First byte of the entropy-coded image data, right past the SOS
    /// header. `None` when the stream never reached SOS.
    pub fn image_data_offset(&self) -> Option<u64> {
        self.sos.map(|sos| sos.end())
    }

    /// Byte count of the entropy-coded image data, up to EOI. Needs the
    /// EOI scan ([`ParseOptions::estimate_image_size`]).
    pub fn image_data_size(&self) -> Result<u64> {
        match (self.image_data_offset(), self.eoi) {
            (Some(offset), Some(eoi)) => Ok(eoi.offset - offset),
            _ => Err(Error::EoiNotAvailable),
        }
    }

    pub(crate) fn stream_handle(&self) -> SharedStream<R> {
        Rc::clone(&self.stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn minimal_with_sos() -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];
        data.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x04, 0x00, 0x00]); // DQT, 2 payload bytes
        data.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02]); // SOS
        data.extend_from_slice(&[0xAB, 0xCD]);
        data.extend_from_slice(&[0xFF, 0xD9]);
        data
    }

    #[test]
    fn test_segment_index_in_file_order() {
        let parser = JpegParser::open(Cursor::new(minimal_with_sos())).unwrap();
        let names: Vec<&str> = parser.segments().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["SOI", "DQT", "SOS"]);
    }

    #[test]
    fn test_get_segment_case_insensitive() {
        let mut parser = JpegParser::open(Cursor::new(minimal_with_sos())).unwrap();
        assert!(parser.get_segment("dqt").is_some());
        assert!(parser.get_segment("DQT").is_some());
        assert!(parser.get_segment("APP1").is_none());
    }

    #[test]
    fn test_image_data_bounds() {
        let options = ParseOptions {
            estimate_image_size: true,
        };
        let parser = JpegParser::open_with(Cursor::new(minimal_with_sos()), options).unwrap();

        // SOS sits at offset 8 and covers 4 bytes
        assert_eq!(parser.image_data_offset(), Some(12));
        assert_eq!(parser.image_data_size().unwrap(), 2);
    }

    #[test]
    fn test_image_data_size_needs_eoi_scan() {
        let parser = JpegParser::open(Cursor::new(minimal_with_sos())).unwrap();
        assert_eq!(parser.image_data_offset(), Some(12));
        assert!(matches!(
            parser.image_data_size(),
            Err(Error::EoiNotAvailable)
        ));
    }

    #[test]
    fn test_tag_path_on_absent_segment() {
        let mut parser = JpegParser::open(Cursor::new(minimal_with_sos())).unwrap();
        let value = parser
            .get_tag_value(TagPath::new("APP1", 0, 0x0112))
            .unwrap();
        assert_eq!(value, None);
        // non-Exif segments degrade the same way
        let value = parser
            .get_tag_value(TagPath::new("DQT", 0, 0x0112))
            .unwrap();
        assert_eq!(value, None);
    }
}
