//! Named accessors over the standard Exif tag catalog.
//!
//! Thin shims over [`JpegParser::get_tag_value`]: every accessor resolves
//! one tag path and coerces the value, answering `None` for anything absent
//! or malformed. Tags of the Exif-private IFD are served through the
//! sub-IFD pointer (tag `0x8769` in IFD0), resolved lazily once.

use std::io::{Read, Seek, SeekFrom};

use tracing::debug;

use crate::error::Result;
use crate::ifd::Ifd;
use crate::parser::{JpegParser, TagPath};
use crate::reader::Loaded;
use crate::segment::Segment;
use crate::value::Value;

/// Tag ids from the Exif 2.x baseline catalog.
mod tag {
    pub const IMAGE_WIDTH: u16 = 0x0100;
    pub const IMAGE_HEIGHT: u16 = 0x0101;
    pub const BITS_PER_SAMPLE: u16 = 0x0102;
    pub const COMPRESSION: u16 = 0x0103;
    pub const PHOTOMETRIC_INTERPRETATION: u16 = 0x0106;
    pub const IMAGE_DESCRIPTION: u16 = 0x010E;
    pub const MAKE: u16 = 0x010F;
    pub const MODEL: u16 = 0x0110;
    pub const ORIENTATION: u16 = 0x0112;
    pub const SAMPLES_PER_PIXEL: u16 = 0x0115;
    pub const X_RESOLUTION: u16 = 0x011A;
    pub const Y_RESOLUTION: u16 = 0x011B;
    pub const RESOLUTION_UNIT: u16 = 0x0128;
    pub const SOFTWARE: u16 = 0x0131;
    pub const DATETIME: u16 = 0x0132;
    pub const ARTIST: u16 = 0x013B;
    pub const YCBCR_POSITIONING: u16 = 0x0213;
    pub const COPYRIGHT: u16 = 0x8298;
    pub const EXIF_IFD_POINTER: u16 = 0x8769;
    pub const GPS_IFD_POINTER: u16 = 0x8825;

    // Exif-private IFD
    pub const EXPOSURE_TIME: u16 = 0x829A;
    pub const F_NUMBER: u16 = 0x829D;
    pub const EXPOSURE_PROGRAM: u16 = 0x8822;
    pub const ISO_SPEED: u16 = 0x8827;
    pub const EXIF_VERSION: u16 = 0x9000;
    pub const DATETIME_ORIGINAL: u16 = 0x9003;
    pub const DATETIME_DIGITIZED: u16 = 0x9004;
    pub const SHUTTER_SPEED: u16 = 0x9201;
    pub const APERTURE: u16 = 0x9202;
    pub const BRIGHTNESS: u16 = 0x9203;
    pub const EXPOSURE_BIAS: u16 = 0x9204;
    pub const MAX_APERTURE: u16 = 0x9205;
    pub const SUBJECT_DISTANCE: u16 = 0x9206;
    pub const METERING_MODE: u16 = 0x9207;
    pub const LIGHT_SOURCE: u16 = 0x9208;
    pub const FLASH: u16 = 0x9209;
    pub const FOCAL_LENGTH: u16 = 0x920A;
    pub const USER_COMMENT: u16 = 0x9286;
    pub const FLASHPIX_VERSION: u16 = 0xA000;
    pub const COLOR_SPACE: u16 = 0xA001;
    pub const PIXEL_X_DIMENSION: u16 = 0xA002;
    pub const PIXEL_Y_DIMENSION: u16 = 0xA003;
    pub const INTEROP_IFD_POINTER: u16 = 0xA005;
    pub const EXPOSURE_MODE: u16 = 0xA402;
    pub const WHITE_BALANCE: u16 = 0xA403;
    pub const DIGITAL_ZOOM_RATIO: u16 = 0xA404;
    pub const FOCAL_LENGTH_35MM: u16 = 0xA405;
    pub const SCENE_CAPTURE_TYPE: u16 = 0xA406;
}

/// Named view of the Exif data reachable through APP1.
///
/// Borrows the parser mutably for its lifetime; accessors trigger the same
/// lazy loads the tag-path primitive would.
pub struct ExifInfo<'p, R: Read + Seek> {
    parser: &'p mut JpegParser<R>,
    sub_ifd: Loaded<Option<Ifd<R>>>,
}

impl<'p, R: Read + Seek> ExifInfo<'p, R> {
    pub fn new(parser: &'p mut JpegParser<R>) -> Self {
        ExifInfo {
            parser,
            sub_ifd: Loaded::Unloaded,
        }
    }

    /// Whether APP1 carries a readable Exif IFD0.
    pub fn is_available(&mut self) -> bool {
        match self.parser.get_segment("APP1") {
            Some(Segment::Exif(segment)) => matches!(segment.ifd(0), Ok(Some(_))),
            _ => false,
        }
    }

    pub fn image_width(&mut self) -> Option<u32> {
        self.ifd0_u32(tag::IMAGE_WIDTH)
    }

    pub fn image_height(&mut self) -> Option<u32> {
        self.ifd0_u32(tag::IMAGE_HEIGHT)
    }

    /// Bit depth per component; typically a triple, so the raw value is kept.
    pub fn bits_per_sample(&mut self) -> Option<Value> {
        self.ifd0_value(tag::BITS_PER_SAMPLE)
    }

    pub fn compression(&mut self) -> Option<u32> {
        self.ifd0_u32(tag::COMPRESSION)
    }

    pub fn photometric_interpretation(&mut self) -> Option<u32> {
        self.ifd0_u32(tag::PHOTOMETRIC_INTERPRETATION)
    }

    pub fn image_description(&mut self) -> Option<String> {
        self.ifd0_string(tag::IMAGE_DESCRIPTION)
    }

    pub fn make(&mut self) -> Option<String> {
        self.ifd0_string(tag::MAKE)
    }

    pub fn model(&mut self) -> Option<String> {
        self.ifd0_string(tag::MODEL)
    }

    pub fn orientation(&mut self) -> Option<u32> {
        self.ifd0_u32(tag::ORIENTATION)
    }

    pub fn samples_per_pixel(&mut self) -> Option<u32> {
        self.ifd0_u32(tag::SAMPLES_PER_PIXEL)
    }

    pub fn x_resolution(&mut self) -> Option<(u32, u32)> {
        self.ifd0_rational(tag::X_RESOLUTION)
    }

    pub fn y_resolution(&mut self) -> Option<(u32, u32)> {
        self.ifd0_rational(tag::Y_RESOLUTION)
    }

    pub fn resolution_unit(&mut self) -> Option<u32> {
        self.ifd0_u32(tag::RESOLUTION_UNIT)
    }

    pub fn software(&mut self) -> Option<String> {
        self.ifd0_string(tag::SOFTWARE)
    }

    pub fn datetime(&mut self) -> Option<String> {
        self.ifd0_string(tag::DATETIME)
    }

    pub fn artist(&mut self) -> Option<String> {
        self.ifd0_string(tag::ARTIST)
    }

    pub fn ycbcr_positioning(&mut self) -> Option<u32> {
        self.ifd0_u32(tag::YCBCR_POSITIONING)
    }

    pub fn copyright(&mut self) -> Option<String> {
        self.ifd0_string(tag::COPYRIGHT)
    }

    /// Offset of the Exif-private IFD, relative to the TIFF header.
    pub fn exif_ifd_pointer(&mut self) -> Option<u32> {
        self.ifd0_u32(tag::EXIF_IFD_POINTER)
    }

    /// Offset of the GPS IFD, relative to the TIFF header. The GPS IFD
    /// itself is not interpreted here.
    pub fn gps_ifd_pointer(&mut self) -> Option<u32> {
        self.ifd0_u32(tag::GPS_IFD_POINTER)
    }

    /// Offset of the interoperability IFD, relative to the TIFF header.
    pub fn interop_ifd_pointer(&mut self) -> Option<u32> {
        self.sub_u32(tag::INTEROP_IFD_POINTER)
    }

    pub fn exif_version(&mut self) -> Option<String> {
        version_string(self.sub_value(tag::EXIF_VERSION)?)
    }

    pub fn flashpix_version(&mut self) -> Option<String> {
        version_string(self.sub_value(tag::FLASHPIX_VERSION)?)
    }

    pub fn color_space(&mut self) -> Option<u32> {
        self.sub_u32(tag::COLOR_SPACE)
    }

    pub fn pixel_x_dimension(&mut self) -> Option<u32> {
        self.sub_u32(tag::PIXEL_X_DIMENSION)
    }

    pub fn pixel_y_dimension(&mut self) -> Option<u32> {
        self.sub_u32(tag::PIXEL_Y_DIMENSION)
    }

    pub fn datetime_original(&mut self) -> Option<String> {
        self.sub_string(tag::DATETIME_ORIGINAL)
    }

    pub fn datetime_digitized(&mut self) -> Option<String> {
        self.sub_string(tag::DATETIME_DIGITIZED)
    }

    pub fn exposure_time(&mut self) -> Option<(u32, u32)> {
        self.sub_rational(tag::EXPOSURE_TIME)
    }

    pub fn f_number(&mut self) -> Option<(u32, u32)> {
        self.sub_rational(tag::F_NUMBER)
    }

    pub fn exposure_program(&mut self) -> Option<u32> {
        self.sub_u32(tag::EXPOSURE_PROGRAM)
    }

    pub fn iso_speed(&mut self) -> Option<u32> {
        self.sub_u32(tag::ISO_SPEED)
    }

    pub fn shutter_speed(&mut self) -> Option<(i32, i32)> {
        self.sub_srational(tag::SHUTTER_SPEED)
    }

    pub fn aperture_value(&mut self) -> Option<(u32, u32)> {
        self.sub_rational(tag::APERTURE)
    }

    pub fn brightness_value(&mut self) -> Option<(i32, i32)> {
        self.sub_srational(tag::BRIGHTNESS)
    }

    pub fn exposure_bias(&mut self) -> Option<(i32, i32)> {
        self.sub_srational(tag::EXPOSURE_BIAS)
    }

    pub fn max_aperture_value(&mut self) -> Option<(u32, u32)> {
        self.sub_rational(tag::MAX_APERTURE)
    }

    pub fn subject_distance(&mut self) -> Option<(u32, u32)> {
        self.sub_rational(tag::SUBJECT_DISTANCE)
    }

    pub fn metering_mode(&mut self) -> Option<u32> {
        self.sub_u32(tag::METERING_MODE)
    }

    pub fn light_source(&mut self) -> Option<u32> {
        self.sub_u32(tag::LIGHT_SOURCE)
    }

    pub fn flash(&mut self) -> Option<u32> {
        self.sub_u32(tag::FLASH)
    }

    pub fn focal_length(&mut self) -> Option<(u32, u32)> {
        self.sub_rational(tag::FOCAL_LENGTH)
    }

    /// Raw user comment, encoding prefix included.
    pub fn user_comment(&mut self) -> Option<Value> {
        self.sub_value(tag::USER_COMMENT)
    }

    pub fn exposure_mode(&mut self) -> Option<u32> {
        self.sub_u32(tag::EXPOSURE_MODE)
    }

    pub fn white_balance(&mut self) -> Option<u32> {
        self.sub_u32(tag::WHITE_BALANCE)
    }

    pub fn digital_zoom_ratio(&mut self) -> Option<(u32, u32)> {
        self.sub_rational(tag::DIGITAL_ZOOM_RATIO)
    }

    pub fn focal_length_35mm(&mut self) -> Option<u32> {
        self.sub_u32(tag::FOCAL_LENGTH_35MM)
    }

    pub fn scene_capture_type(&mut self) -> Option<u32> {
        self.sub_u32(tag::SCENE_CAPTURE_TYPE)
    }

    fn ifd0_value(&mut self, tag_id: u16) -> Option<Value> {
        self.parser
            .get_tag_value(TagPath::new("APP1", 0, tag_id))
            .ok()
            .flatten()
    }

    fn ifd0_u32(&mut self, tag_id: u16) -> Option<u32> {
        self.ifd0_value(tag_id)?.as_u32()
    }

    fn ifd0_string(&mut self, tag_id: u16) -> Option<String> {
        match self.ifd0_value(tag_id)? {
            Value::Ascii(s) => Some(s),
            _ => None,
        }
    }

    fn ifd0_rational(&mut self, tag_id: u16) -> Option<(u32, u32)> {
        self.ifd0_value(tag_id)?.as_rational()
    }

    fn sub_value(&mut self, tag_id: u16) -> Option<Value> {
        if !self.sub_ifd.is_loaded() {
            self.sub_ifd = match self.parse_sub_ifd() {
                Ok(ifd) => Loaded::Loaded(ifd),
                Err(err) => Loaded::Failed(err),
            };
        }
        let ifd = match &mut self.sub_ifd {
            Loaded::Loaded(Some(ifd)) => ifd,
            _ => return None,
        };
        let field = ifd.get_field(tag_id).ok().flatten()?;
        field.value().ok().cloned()
    }

    fn sub_u32(&mut self, tag_id: u16) -> Option<u32> {
        self.sub_value(tag_id)?.as_u32()
    }

    fn sub_string(&mut self, tag_id: u16) -> Option<String> {
        match self.sub_value(tag_id)? {
            Value::Ascii(s) => Some(s),
            _ => None,
        }
    }

    fn sub_rational(&mut self, tag_id: u16) -> Option<(u32, u32)> {
        self.sub_value(tag_id)?.as_rational()
    }

    fn sub_srational(&mut self, tag_id: u16) -> Option<(i32, i32)> {
        self.sub_value(tag_id)?.as_srational()
    }

    fn parse_sub_ifd(&mut self) -> Result<Option<Ifd<R>>> {
        let Some(pointer) = self.ifd0_u32(tag::EXIF_IFD_POINTER) else {
            return Ok(None);
        };
        let Some(Segment::Exif(app1)) = self.parser.get_segment("APP1") else {
            return Ok(None);
        };
        let Some(tiff) = app1.tiff_header()? else {
            return Ok(None);
        };
        let segment_end = app1.descriptor().end();

        let offset = tiff.offset + u64::from(pointer);
        debug!(offset, "Exif sub-IFD");
        let stream = self.parser.stream_handle();
        stream.borrow_mut().seek(SeekFrom::Start(offset))?;
        Ifd::parse(&stream, &tiff, 0, segment_end).map(Some)
    }
}

/// Version tags store four ASCII digits in an `Undefined` payload.
fn version_string(value: Value) -> Option<String> {
    let bytes = value.as_bytes()?;
    Some(bytes.iter().map(|&b| char::from(b)).collect())
}
