//! Structural walk of the JPEG marker stream.
//!
//! The scan starts at SOI and records one descriptor per segment until SOS,
//! where the entropy-coded data begins and marker parsing stops. When asked,
//! it then hunts for EOI with a plain byte scan; `0xFF 0xD9` is matched
//! literally, without byte-stuffing awareness, so a pathological scan stream
//! can fool it.

use std::io::{Read, Seek, SeekFrom};

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::marker::{Marker, MarkerKind, LENGTH_SIZE, MARKER_SIZE};
use crate::reader;
use crate::segment::SegmentDescriptor;

/// Scan the stream from its current position (the start of the file).
///
/// Returns descriptors in file order, starting with SOI and normally ending
/// with SOS. With `include_eoi`, an EOI descriptor is appended: either the
/// one found by the byte scan behind SOS, or, in degenerate streams with no
/// scan data at all, the EOI met during the structural walk.
pub(crate) fn scan_segments<R: Read + Seek>(
    stream: &mut R,
    include_eoi: bool,
) -> Result<Vec<SegmentDescriptor>> {
    let start = stream.stream_position()?;
    if read_signature(stream)? != Marker::SOI.signature() {
        return Err(Error::NotAJpeg);
    }
    let mut segments = vec![SegmentDescriptor {
        marker: Marker::SOI,
        offset: start,
        size: MARKER_SIZE,
    }];

    loop {
        let offset = stream.stream_position()?;
        let marker = Marker::detect(read_signature(stream)?)?;
        trace!(marker = %marker, offset, "marker");

        if marker.kind() == MarkerKind::Eoi {
            if include_eoi {
                // no scan data at all; record the EOI and stop
                segments.push(SegmentDescriptor {
                    marker,
                    offset,
                    size: MARKER_SIZE,
                });
                return Ok(segments);
            }
            return Err(Error::UnexpectedEoi);
        }

        // every remaining marker carries a big-endian length that counts itself
        let buf: [u8; 2] = reader::read_bytes(stream)?;
        let length = u64::from(u16::from_be_bytes(buf));
        if length < LENGTH_SIZE {
            return Err(Error::MalformedSegment {
                marker: marker.name(),
                reason: format!("declared length {length} is shorter than the length field"),
            });
        }
        let descriptor = SegmentDescriptor {
            marker,
            offset,
            size: length + MARKER_SIZE,
        };
        debug!(segment = %descriptor.marker, offset = descriptor.offset, size = descriptor.size, "segment");

        if descriptor.marker.kind() == MarkerKind::Sos {
            // the scan data follows; marker parsing ends here
            segments.push(descriptor);
            break;
        }
        stream.seek(SeekFrom::Current(length as i64 - LENGTH_SIZE as i64))?;
        segments.push(descriptor);
    }

    if include_eoi {
        let last = segments
            .last()
            .expect("scan always yields at least SOI");
        stream.seek(SeekFrom::Start(last.end()))?;
        let offset = scan_for_eoi(stream)?;
        debug!(offset, "EOI");
        segments.push(SegmentDescriptor {
            marker: Marker::EOI,
            offset,
            size: MARKER_SIZE,
        });
    }

    Ok(segments)
}

/// Linear search for the first `0xFF 0xD9` pair from the current position.
/// Returns the absolute offset of the `0xFF` byte.
fn scan_for_eoi<R: Read + Seek>(stream: &mut R) -> Result<u64> {
    let mut offset = stream.stream_position()?;
    let mut buf = [0u8; 4096];
    let mut prev_was_ff = false;

    loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(Error::EoiNotFound);
        }
        for (i, &byte) in buf[..n].iter().enumerate() {
            if prev_was_ff && byte == 0xD9 {
                return Ok(offset + i as u64 - 1);
            }
            prev_was_ff = byte == 0xFF;
        }
        offset += n as u64;
    }
}

fn read_signature<R: Read>(stream: &mut R) -> Result<u16> {
    let buf: [u8; 2] = reader::read_bytes(stream)?;
    Ok(u16::from_be_bytes(buf))
}
