//! JPEG marker catalog and recognition.
//!
//! A marker is a two-byte signature whose high byte is `0xFF`. Most markers
//! are fixed, but APP0..APP15 and RST0..RST7 are families recognized through
//! a low-nibble mask: the masked bits of the observed signature select the
//! family member.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

/// Size of a marker on disk.
pub const MARKER_SIZE: u64 = 2;
/// Size of the big-endian length prefix that follows most markers.
pub const LENGTH_SIZE: u64 = 2;
/// High byte shared by every marker.
pub const MARKER_START: u8 = 0xFF;

const APPN_BASE: u16 = 0xFFE0;
const APPN_INDEX_MASK: u16 = 0x000F;
const RSTN_BASE: u16 = 0xFFD0;
const RSTN_INDEX_MASK: u16 = 0x0007;

/// What a marker means, with family index for the masked families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarkerKind {
    /// Start of Image
    Soi,
    /// End of Image
    Eoi,
    /// Start of Frame (Baseline)
    Sof0,
    /// Start of Frame (Progressive)
    Sof2,
    /// Define Huffman Table(s)
    Dht,
    /// Define Quantization Table(s)
    Dqt,
    /// Define Restart Interval
    Dri,
    /// Start of Scan
    Sos,
    /// Comment
    Com,
    /// Application-specific segment APP0..APP15
    App(u8),
    /// Restart RST0..RST7
    Rst(u8),
    /// Signature starts with `0xFF` but is not in the catalog
    Unknown,
}

/// A recognized (or explicitly unknown) JPEG marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Marker {
    signature: u16,
    kind: MarkerKind,
}

impl Marker {
    pub const SOI: Marker = Marker::fixed(0xFFD8, MarkerKind::Soi);
    pub const EOI: Marker = Marker::fixed(0xFFD9, MarkerKind::Eoi);
    pub const SOF0: Marker = Marker::fixed(0xFFC0, MarkerKind::Sof0);
    pub const SOF2: Marker = Marker::fixed(0xFFC2, MarkerKind::Sof2);
    pub const DHT: Marker = Marker::fixed(0xFFC4, MarkerKind::Dht);
    pub const DQT: Marker = Marker::fixed(0xFFDB, MarkerKind::Dqt);
    pub const DRI: Marker = Marker::fixed(0xFFDD, MarkerKind::Dri);
    pub const SOS: Marker = Marker::fixed(0xFFDA, MarkerKind::Sos);
    pub const COM: Marker = Marker::fixed(0xFFFE, MarkerKind::Com);

    const fn fixed(signature: u16, kind: MarkerKind) -> Marker {
        Marker { signature, kind }
    }

    /// The APPn marker for a family index in `0..=15`.
    pub fn app(index: u8) -> Marker {
        debug_assert!(u16::from(index) <= APPN_INDEX_MASK, "APP index out of range");
        Marker {
            signature: APPN_BASE | u16::from(index),
            kind: MarkerKind::App(index),
        }
    }

    /// The RSTn marker for a family index in `0..=7`.
    pub fn rst(index: u8) -> Marker {
        debug_assert!(u16::from(index) <= RSTN_INDEX_MASK, "RST index out of range");
        Marker {
            signature: RSTN_BASE | u16::from(index),
            kind: MarkerKind::Rst(index),
        }
    }

    pub fn signature(&self) -> u16 {
        self.signature
    }

    pub fn kind(&self) -> MarkerKind {
        self.kind
    }

    /// Human-readable name; masked families carry their index (`APP1`, `RST3`).
    pub fn name(&self) -> String {
        match self.kind {
            MarkerKind::Soi => "SOI".into(),
            MarkerKind::Eoi => "EOI".into(),
            MarkerKind::Sof0 => "SOF0".into(),
            MarkerKind::Sof2 => "SOF2".into(),
            MarkerKind::Dht => "DHT".into(),
            MarkerKind::Dqt => "DQT".into(),
            MarkerKind::Dri => "DRI".into(),
            MarkerKind::Sos => "SOS".into(),
            MarkerKind::Com => "COM".into(),
            MarkerKind::App(i) => format!("APP{i}"),
            MarkerKind::Rst(i) => format!("RST{i}"),
            MarkerKind::Unknown => format!("UNK[0x{:04X}]", self.signature),
        }
    }

    /// Recognize a raw 16-bit signature.
    ///
    /// Fixed markers are matched first, then the APPn/RSTn mask families.
    /// Anything else with a `0xFF` high byte becomes an `Unknown` marker; a
    /// high byte other than `0xFF` is [`Error::InvalidMarker`].
    pub fn detect(signature: u16) -> Result<Marker> {
        if (signature >> 8) as u8 != MARKER_START {
            return Err(Error::InvalidMarker(signature));
        }

        let marker = match signature {
            0xFFD8 => Marker::SOI,
            0xFFD9 => Marker::EOI,
            0xFFC0 => Marker::SOF0,
            0xFFC2 => Marker::SOF2,
            0xFFC4 => Marker::DHT,
            0xFFDB => Marker::DQT,
            0xFFDD => Marker::DRI,
            0xFFDA => Marker::SOS,
            0xFFFE => Marker::COM,
            _ if signature & !APPN_INDEX_MASK == APPN_BASE => {
                Marker::app((signature & APPN_INDEX_MASK) as u8)
            }
            _ if signature & !RSTN_INDEX_MASK == RSTN_BASE => {
                Marker::rst((signature & RSTN_INDEX_MASK) as u8)
            }
            _ => Marker {
                signature,
                kind: MarkerKind::Unknown,
            },
        };

        Ok(marker)
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[0x{:04X}]", self.name(), self.signature)
    }
}
