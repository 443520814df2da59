//! Error types for jpeg-probe

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file is not a JPEG")]
    NotAJpeg,

    #[error("unexpected end of stream")]
    UnexpectedEof,

    #[error("EOI marker before SOS")]
    UnexpectedEoi,

    #[error("EOI marker not found")]
    EoiNotFound,

    #[error("invalid JPEG marker: 0x{0:04X}")]
    InvalidMarker(u16),

    #[error("invalid TIFF header: {0}")]
    InvalidTiffHeader(String),

    #[error("malformed {marker} segment: {reason}")]
    MalformedSegment { marker: String, reason: String },

    #[error("malformed IFD: {0}")]
    MalformedIfd(String),

    #[error("unknown field type: {0}")]
    UnknownFieldType(u16),

    #[error("image data boundaries are not available (EOI scan disabled)")]
    EoiNotAvailable,
}

// Lazy entities latch their first failure and must report it again on every
// later access, so the error has to be duplicable. `std::io::Error` is not
// `Clone`; rebuild it from its kind and message.
impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Error::Io(e) => Error::Io(std::io::Error::new(e.kind(), e.to_string())),
            Error::NotAJpeg => Error::NotAJpeg,
            Error::UnexpectedEof => Error::UnexpectedEof,
            Error::UnexpectedEoi => Error::UnexpectedEoi,
            Error::EoiNotFound => Error::EoiNotFound,
            Error::InvalidMarker(sig) => Error::InvalidMarker(*sig),
            Error::InvalidTiffHeader(msg) => Error::InvalidTiffHeader(msg.clone()),
            Error::MalformedSegment { marker, reason } => Error::MalformedSegment {
                marker: marker.clone(),
                reason: reason.clone(),
            },
            Error::MalformedIfd(msg) => Error::MalformedIfd(msg.clone()),
            Error::UnknownFieldType(id) => Error::UnknownFieldType(*id),
            Error::EoiNotAvailable => Error::EoiNotAvailable,
        }
    }
}
