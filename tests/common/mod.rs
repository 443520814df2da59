//! Common test utilities shared across integration tests
#![allow(dead_code)]

/// Incremental JPEG byte-stream builder.
pub struct JpegBuilder {
    data: Vec<u8>,
}

impl JpegBuilder {
    /// Start with SOI.
    pub fn new() -> Self {
        JpegBuilder {
            data: vec![0xFF, 0xD8],
        }
    }

    /// Append a marker segment; the big-endian length field is computed
    /// from the payload.
    pub fn segment(mut self, marker: u8, payload: &[u8]) -> Self {
        self.data.extend_from_slice(&[0xFF, marker]);
        let length = (payload.len() + 2) as u16;
        self.data.extend_from_slice(&length.to_be_bytes());
        self.data.extend_from_slice(payload);
        self
    }

    /// A plausible APP0/JFIF segment.
    pub fn jfif(self) -> Self {
        let mut payload = b"JFIF\0".to_vec();
        payload.extend_from_slice(&[0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00]);
        self.segment(0xE0, &payload)
    }

    /// An APPn segment with the given payload.
    pub fn app(self, index: u8, payload: &[u8]) -> Self {
        self.segment(0xE0 + index, payload)
    }

    /// Close with an empty SOS header, the given scan bytes, and EOI.
    pub fn finish(mut self, scan: &[u8]) -> Vec<u8> {
        self.data.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02]);
        self.data.extend_from_slice(scan);
        self.data.extend_from_slice(&[0xFF, 0xD9]);
        self.data
    }

    /// Close with SOS and scan bytes but no EOI.
    pub fn finish_without_eoi(mut self, scan: &[u8]) -> Vec<u8> {
        self.data.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02]);
        self.data.extend_from_slice(scan);
        self.data
    }
}

/// `"Exif\0\0"` plus a little-endian TIFF header; `body` lands at TIFF
/// offset 8, where `ifd0_offset` points.
pub fn exif_le_payload(body: &[u8]) -> Vec<u8> {
    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(b"II\x2A\x00\x08\x00\x00\x00");
    payload.extend_from_slice(body);
    payload
}

/// Big-endian variant of [`exif_le_payload`].
pub fn exif_be_payload(body: &[u8]) -> Vec<u8> {
    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(b"MM\x00\x2A\x00\x00\x00\x08");
    payload.extend_from_slice(body);
    payload
}

/// One 12-byte little-endian field record with raw value-slot bytes.
pub fn field_le(tag: u16, type_id: u16, count: u32, value: [u8; 4]) -> [u8; 12] {
    let mut record = [0u8; 12];
    record[0..2].copy_from_slice(&tag.to_le_bytes());
    record[2..4].copy_from_slice(&type_id.to_le_bytes());
    record[4..8].copy_from_slice(&count.to_le_bytes());
    record[8..12].copy_from_slice(&value);
    record
}

/// A little-endian IFD: count, records, next-IFD offset.
pub fn ifd_le(fields: &[[u8; 12]], next_ifd_offset: u32) -> Vec<u8> {
    let mut data = (fields.len() as u16).to_le_bytes().to_vec();
    for field in fields {
        data.extend_from_slice(field);
    }
    data.extend_from_slice(&next_ifd_offset.to_le_bytes());
    data
}

/// APP1 payload with IFD0 (Make, Model, Orientation, XResolution, Exif IFD
/// pointer) and an Exif sub-IFD (ExposureTime, ISO, ExifVersion,
/// DateTimeOriginal). All offsets below are relative to the TIFF header.
pub fn rich_exif_payload() -> Vec<u8> {
    const MAKE: u32 = 74; // right after IFD0 (8 + 2 + 5 * 12 + 4)
    const MODEL: u32 = 80;
    const XRES: u32 = 86;
    const SUB_IFD: u32 = 94;
    const EXPOSURE: u32 = 148; // right after the sub-IFD (94 + 2 + 4 * 12 + 4)
    const DATETIME: u32 = 156;

    let ifd0 = ifd_le(
        &[
            field_le(0x010F, 2, 6, MAKE.to_le_bytes()),
            field_le(0x0110, 2, 6, MODEL.to_le_bytes()),
            field_le(0x0112, 3, 1, [6, 0, 0, 0]),
            field_le(0x011A, 5, 1, XRES.to_le_bytes()),
            field_le(0x8769, 4, 1, SUB_IFD.to_le_bytes()),
        ],
        0,
    );
    let sub_ifd = ifd_le(
        &[
            field_le(0x829A, 5, 1, EXPOSURE.to_le_bytes()),
            field_le(0x8827, 3, 1, [200, 0, 0, 0]),
            field_le(0x9000, 7, 4, *b"0230"),
            field_le(0x9003, 2, 20, DATETIME.to_le_bytes()),
        ],
        0,
    );

    let mut body = ifd0;
    body.extend_from_slice(b"Canon\0");
    body.extend_from_slice(b"EOS-1\0");
    body.extend_from_slice(&72u32.to_le_bytes());
    body.extend_from_slice(&1u32.to_le_bytes());
    body.extend_from_slice(&sub_ifd);
    body.extend_from_slice(&1u32.to_le_bytes());
    body.extend_from_slice(&125u32.to_le_bytes());
    body.extend_from_slice(b"2008:11:01 21:15:07\0");
    exif_le_payload(&body)
}
