//! Image fixtures for tests.
//!
//! Builds small JPEG files in memory with exactly the EXIF entries a test asks
//! for, including deliberately malformed values, and ships one real HEIC
//! sample for the HEIF container path.

use anyhow::{Context, Result, anyhow};
use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use img_parts::Bytes;
use img_parts::jpeg::{Jpeg, JpegSegment, markers};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::tags::GPS_INFO_TAG;

/// A 64x64 HEIC image whose EXIF block holds `Software` and `ExifVersion`
pub const HEIC_SAMPLE: &[u8] = include_bytes!("../tests/fixtures/exif.heic");

/// Primary-image EXIF fields for a mock image
#[derive(Debug, Clone, Default)]
pub struct MockExif {
    fields: Vec<Field>,
}

impl MockExif {
    /// Add a primary-image field; the writer places it in the IFD its tag belongs to
    pub fn with(mut self, tag: Tag, value: Value) -> Self {
        self.fields.push(Field {
            tag,
            ifd_num: In::PRIMARY,
            value,
        });
        self
    }

    /// Shorthand for an ASCII entry
    pub fn with_text(self, tag: Tag, text: &str) -> Self {
        self.with(tag, Value::Ascii(vec![text.as_bytes().to_vec()]))
    }

    /// Shorthand for a whole-number DMS triple
    pub fn with_dms(self, tag: Tag, degrees: u32, minutes: u32, seconds: u32) -> Self {
        self.with(tag, rationals(&[(degrees, 1), (minutes, 1), (seconds, 1)]))
    }

    /// Encode as a little-endian TIFF structure
    pub fn tiff_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new();
        for field in &self.fields {
            writer.push_field(field);
        }
        let mut out = Cursor::new(Vec::new());
        writer
            .write(&mut out, true)
            .context("Failed to write mock EXIF")?;
        Ok(out.into_inner())
    }
}

/// A RATIONAL value, denominators taken as given (zero included)
pub fn rationals(pairs: &[(u32, u32)]) -> Value {
    Value::Rational(
        pairs
            .iter()
            .map(|&(num, denom)| Rational { num, denom })
            .collect(),
    )
}

/// Point the GPS IFD pointer of a little-endian TIFF at `offset`.
///
/// Returns false when IFD0 has no GPS pointer.
pub fn redirect_gps_pointer(tiff: &mut [u8], offset: u32) -> bool {
    let read_u16 = |at: usize| tiff.get(at..at + 2).map(|b| u16::from_le_bytes([b[0], b[1]]));
    let Some(ifd0) = tiff
        .get(4..8)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
    else {
        return false;
    };
    let Some(count) = read_u16(ifd0) else {
        return false;
    };

    let slot = (0..usize::from(count))
        .map(|index| ifd0 + 2 + 12 * index)
        .find(|&entry| read_u16(entry) == Some(GPS_INFO_TAG));
    match slot {
        Some(entry) if entry + 12 <= tiff.len() => {
            tiff[entry + 8..entry + 12].copy_from_slice(&offset.to_le_bytes());
            true
        }
        _ => false,
    }
}

/// APP1 segment carrying a TIFF structure
pub fn exif_segment(tiff: &[u8]) -> JpegSegment {
    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(tiff);
    JpegSegment::new_with_contents(markers::APP1, Bytes::from(payload))
}

/// APP0 JFIF 1.01 segment, no density unit
pub fn jfif_segment() -> JpegSegment {
    JpegSegment::new_with_contents(
        markers::APP0,
        Bytes::from_static(b"JFIF\0\x01\x01\x00\x00\x01\x00\x01\x00\x00"),
    )
}

/// COM segment
pub fn comment_segment(text: &str) -> JpegSegment {
    JpegSegment::new_with_contents(markers::COM, Bytes::from(text.as_bytes().to_vec()))
}

fn parse_jpeg(bytes: &[u8]) -> Result<Jpeg> {
    Jpeg::from_bytes(Bytes::copy_from_slice(bytes))
        .map_err(|e| anyhow!("Failed to parse mock JPEG: {}", e))
}

fn encode_jpeg(jpeg: Jpeg) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    jpeg.encoder()
        .write_to(&mut out)
        .context("Failed to write mock JPEG")?;
    Ok(out)
}

fn is_metadata_marker(marker: u8) -> bool {
    (markers::APP0..=markers::APP15).contains(&marker) || marker == markers::COM
}

/// A baseline JPEG with no APPn or COM segments at all
pub fn jpeg_bytes(width: u32, height: u32) -> Result<Vec<u8>> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 16) as u8, (y * 16) as u8, 128])
    });
    let mut encoded = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_with_encoder(JpegEncoder::new_with_quality(&mut encoded, 90))
        .context("Failed to encode mock JPEG")?;

    let mut jpeg = parse_jpeg(&encoded)?;
    jpeg.segments_mut()
        .retain(|segment| !is_metadata_marker(segment.marker()));
    encode_jpeg(jpeg)
}

/// Insert extra segments right after SOI, in order
pub fn with_segments(jpeg: &[u8], segments: Vec<JpegSegment>) -> Result<Vec<u8>> {
    let mut jpeg = parse_jpeg(jpeg)?;
    for (index, segment) in segments.into_iter().enumerate() {
        jpeg.segments_mut().insert(index, segment);
    }
    encode_jpeg(jpeg)
}

/// A small JPEG carrying an already encoded TIFF structure
pub fn jpeg_with_tiff(tiff: &[u8]) -> Result<Vec<u8>> {
    with_segments(&jpeg_bytes(8, 8)?, vec![exif_segment(tiff)])
}

/// A small JPEG carrying the given EXIF entries
pub fn jpeg_with_exif(exif: &MockExif) -> Result<Vec<u8>> {
    jpeg_with_tiff(&exif.tiff_bytes()?)
}

/// A small JPEG carrying only a comment
pub fn jpeg_with_comment(text: &str) -> Result<Vec<u8>> {
    with_segments(&jpeg_bytes(8, 8)?, vec![comment_segment(text)])
}

/// Write fixture bytes into `dir`
pub fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, bytes)
        .with_context(|| format!("Failed to write fixture {}", path.display()))?;
    Ok(path)
}
