//! IFD (Image File Directory) traversal.
//!
//! An IFD is a 2-byte record count, `count` fixed 12-byte field records, and
//! a trailing 4-byte offset to the next IFD (0 when there is none). Parsing
//! reads only the count and the trailing offset; field records load one at a
//! time as lookups demand them.

use std::io::{Read, Seek, SeekFrom};
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::field::{IfdEntry, ENTRY_SIZE};
use crate::reader::{self, SharedStream};
use crate::tiff::TiffHeader;

/// Bytes of the record-count prefix.
const COUNT_SIZE: u64 = 2;
/// Bytes of the trailing next-IFD offset.
const NEXT_OFFSET_SIZE: u64 = 4;

/// One directory of fields, loaded incrementally.
///
/// The field table is an insertion-ordered map: tag lookups are map hits,
/// while size accounting and positional access walk the same entries in
/// on-disk order.
#[derive(Debug)]
pub struct Ifd<R> {
    stream: SharedStream<R>,
    tiff: TiffHeader,
    offset: u64,
    index: usize,
    field_count: u16,
    next_ifd_offset: u32,
    fields: IndexMap<u16, IfdEntry<R>>,
    /// Records consumed from the table so far. This, not the map length,
    /// drives lazy loading: duplicate tag ids collapse in the map but still
    /// advance the table.
    records_loaded: u16,
    next_field_offset: u64,
}

impl<R: Read + Seek> Ifd<R> {
    /// Parse the IFD header at the stream's current position.
    ///
    /// Reads the count, skips the field table, and reads the next-IFD
    /// offset; no field record is materialized. The declared table must fit
    /// inside `segment_end` or the count cannot be trusted.
    pub(crate) fn parse(
        stream: &SharedStream<R>,
        tiff: &TiffHeader,
        index: usize,
        segment_end: u64,
    ) -> Result<Self> {
        let mut s = stream.borrow_mut();
        let offset = s.stream_position()?;

        let buf: [u8; 2] = reader::read_bytes(&mut *s)?;
        let field_count = tiff.byte_order.read_u16(&buf);

        let table_end =
            offset + COUNT_SIZE + u64::from(field_count) * ENTRY_SIZE + NEXT_OFFSET_SIZE;
        if table_end > segment_end {
            return Err(Error::MalformedIfd(format!(
                "declared field table ({field_count} records) ends at {table_end}, \
                 past the segment end {segment_end}"
            )));
        }

        s.seek(SeekFrom::Current(i64::from(field_count) * ENTRY_SIZE as i64))?;
        let buf: [u8; 4] = reader::read_bytes(&mut *s)?;
        let next_ifd_offset = tiff.byte_order.read_u32(&buf);
        drop(s);

        debug!(index, offset, field_count, next_ifd_offset, "IFD header");

        Ok(Ifd {
            stream: Rc::clone(stream),
            tiff: *tiff,
            offset,
            index,
            field_count,
            next_ifd_offset,
            fields: IndexMap::new(),
            records_loaded: 0,
            next_field_offset: offset + COUNT_SIZE,
        })
    }

    /// Absolute position of the IFD's first byte.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Position of this IFD within its segment's enumeration.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of field records the directory declares.
    pub fn field_count(&self) -> u16 {
        self.field_count
    }

    /// Offset of the successor IFD, relative to the TIFF header. Zero means
    /// no linked successor.
    pub fn next_ifd_offset(&self) -> u32 {
        self.next_ifd_offset
    }

    /// Look up a field by tag id.
    ///
    /// Already-cached fields return immediately; otherwise records load one
    /// by one, each advancing the table by exactly 12 bytes, until the tag
    /// matches or the table is exhausted. The cache is append-only.
    pub fn get_field(&mut self, tag_id: u16) -> Result<Option<&mut IfdEntry<R>>> {
        if !self.fields.contains_key(&tag_id) {
            while self.records_loaded < self.field_count {
                if self.load_next_field()? == tag_id {
                    break;
                }
            }
        }
        Ok(self.fields.get_mut(&tag_id))
    }

    /// Look up a field by its position in on-disk order.
    pub fn get_field_by_index(&mut self, index: usize) -> Result<Option<&mut IfdEntry<R>>> {
        while self.fields.len() <= index && self.records_loaded < self.field_count {
            self.load_next_field()?;
        }
        Ok(self.fields.get_index_mut(index).map(|(_, entry)| entry))
    }

    /// Total on-disk footprint: count prefix, every field's contribution
    /// (4-aligned out-of-line payloads included), and the trailing offset.
    /// Forces a full load of the field table.
    pub fn size(&mut self) -> Result<u64> {
        self.load_all()?;
        let fields: u64 = self.fields.values().map(IfdEntry::size).sum();
        Ok(COUNT_SIZE + NEXT_OFFSET_SIZE + fields)
    }

    /// Iterate fields in on-disk order. Forces a full load.
    pub fn fields(&mut self) -> Result<impl Iterator<Item = &IfdEntry<R>>> {
        self.load_all()?;
        Ok(self.fields.values())
    }

    /// Iterate fields mutably (for value decoding) in on-disk order.
    pub fn fields_mut(&mut self) -> Result<impl Iterator<Item = &mut IfdEntry<R>>> {
        self.load_all()?;
        Ok(self.fields.values_mut())
    }

    fn load_all(&mut self) -> Result<()> {
        while self.records_loaded < self.field_count {
            self.load_next_field()?;
        }
        Ok(())
    }

    fn load_next_field(&mut self) -> Result<u16> {
        self.stream
            .borrow_mut()
            .seek(SeekFrom::Start(self.next_field_offset))?;
        let entry = IfdEntry::parse(&self.stream, &self.tiff)?;
        self.next_field_offset += ENTRY_SIZE;
        self.records_loaded += 1;

        let tag_id = entry.tag_id();
        self.fields.insert(tag_id, entry);
        Ok(tag_id)
    }
}
