//! Image decoding for exifcheck.
//!
//! Opens a candidate file and exposes the three things the metadata
//! extractor needs: the pixel dimensions (proof that the file really is an
//! image), the raw EXIF entries keyed by numeric tag id, and an auxiliary
//! info map summarizing the container's own metadata segments.
//!
//! JPEG and the other raster formats go through the `image` crate, which only
//! has to parse the headers to report dimensions. HEIF goes through libheif
//! when the `heif` feature is enabled; without it a HEIF file is not an image
//! this crate can decode. EXIF is read with `kamadak-exif`, which understands
//! both containers.

use anyhow::{Context, Result};
use exif::{In, Tag, Value};
use image::{ImageFormat, ImageReader};
use img_parts::Bytes;
use img_parts::jpeg::{Jpeg, markers};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read, Seek};
use std::path::Path;

use crate::tags::{GPS_INFO_TAG, TagKey, TagMap, TagValue};

#[cfg(feature = "heif")]
use libheif_rs::HeifContext;

/// Container family of a decoded image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Heif,
    /// Any other format the `image` crate recognized by content
    Other(ImageFormat),
}

/// Result of opening and decoding an image file
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
    /// Primary-image EXIF entries keyed by numeric tag id, GPS nested under `GPSInfo`
    pub exif: Vec<(u16, TagValue)>,
    /// Container metadata (JFIF header, comments, ICC profile, ...)
    pub info: BTreeMap<String, TagValue>,
}

/// Where a HEIF container is read from
#[cfg_attr(not(feature = "heif"), allow(dead_code))]
enum HeifSource<'a> {
    File(&'a Path),
    Bytes(&'a [u8]),
}

/// Open and decode an image file.
///
/// Fails when the file can't be read or isn't an image. A missing or
/// unreadable EXIF block is not a failure; it just leaves `exif` empty.
pub fn decode_image(path: &Path) -> Result<DecodedImage> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open image file at {}", path.display()))?;
    let mut reader = BufReader::new(file);

    match sniff_format(&mut reader)? {
        Some(format) => decode_raster(&mut reader, format),
        None => decode_heif(HeifSource::File(path), &mut reader),
    }
}

/// Decode an image already loaded into memory
pub fn decode_bytes(bytes: &[u8]) -> Result<DecodedImage> {
    let mut cursor = Cursor::new(bytes);

    match sniff_format(&mut cursor)? {
        Some(format) => decode_raster(&mut cursor, format),
        None => decode_heif(HeifSource::Bytes(bytes), &mut cursor),
    }
}

fn sniff_format<R: BufRead + Seek>(reader: &mut R) -> Result<Option<ImageFormat>> {
    let format = ImageReader::new(&mut *reader)
        .with_guessed_format()
        .context("Failed to sniff image format")?
        .format();
    Ok(format)
}

fn decode_raster<R: BufRead + Seek>(reader: &mut R, format: ImageFormat) -> Result<DecodedImage> {
    let (width, height) = ImageReader::with_format(&mut *reader, format)
        .into_dimensions()
        .context("Failed to decode image header")?;
    let kind = match format {
        ImageFormat::Jpeg => ImageKind::Jpeg,
        other => ImageKind::Other(other),
    };

    reader.rewind()?;
    let exif = read_exif_entries(reader);

    let info = match kind {
        ImageKind::Jpeg => {
            reader.rewind()?;
            let mut bytes = Vec::new();
            reader
                .read_to_end(&mut bytes)
                .context("Failed to read JPEG segments")?;
            jpeg_info(&bytes)
        }
        _ => BTreeMap::new(),
    };

    finish(kind, width, height, exif, info)
}

fn decode_heif<R: BufRead + Seek>(source: HeifSource<'_>, reader: &mut R) -> Result<DecodedImage> {
    let (width, height) = heif_dimensions(source)?;
    reader.rewind()?;
    let exif = read_exif_entries(reader);
    finish(ImageKind::Heif, width, height, exif, BTreeMap::new())
}

fn finish(
    kind: ImageKind,
    width: u32,
    height: u32,
    exif: Vec<(u16, TagValue)>,
    info: BTreeMap<String, TagValue>,
) -> Result<DecodedImage> {
    if width == 0 || height == 0 {
        anyhow::bail!("Image has zero dimensions ({}x{})", width, height);
    }

    Ok(DecodedImage {
        kind,
        width,
        height,
        exif,
        info,
    })
}

/// Dimensions of the primary image of a HEIF container
#[cfg(feature = "heif")]
fn heif_dimensions(source: HeifSource<'_>) -> Result<(u32, u32)> {
    let ctx = match source {
        HeifSource::File(path) => {
            let name = path.to_str().context("HEIF path is not valid UTF-8")?;
            HeifContext::read_from_file(name)
        }
        HeifSource::Bytes(bytes) => HeifContext::read_from_bytes(bytes),
    }
    .context("Unrecognized image format")?;

    let handle = ctx
        .primary_image_handle()
        .context("HEIF container has no primary image")?;
    Ok((handle.width(), handle.height()))
}

#[cfg(not(feature = "heif"))]
fn heif_dimensions(_source: HeifSource<'_>) -> Result<(u32, u32)> {
    anyhow::bail!("Unrecognized image format (HEIF support requires the `heif` feature)")
}

/// Read the primary-image EXIF entries.
///
/// TIFF and Exif IFD fields are flattened into one list. GPS IFD fields are
/// collected into a block stored under the `GPSInfo` id. A broken sub-IFD
/// only loses its own fields; everything else that parsed is kept.
pub fn read_exif_entries<R: BufRead + Seek>(reader: &mut R) -> Vec<(u16, TagValue)> {
    let mut exif_reader = exif::Reader::new();
    exif_reader.continue_on_error(true);

    let exif = match exif_reader.read_from_container(reader) {
        Ok(exif) => exif,
        Err(exif::Error::PartialResult(partial)) => {
            let (exif, errors) = partial.into_inner();
            for e in errors {
                warn!("Skipped malformed EXIF data: {}", e);
            }
            exif
        }
        Err(e) => {
            debug!("No EXIF data: {}", e);
            return Vec::new();
        }
    };

    let mut entries = Vec::new();
    let mut gps = TagMap::new();
    let mut has_gps_pointer = false;

    for field in exif.fields() {
        if field.ifd_num != In::PRIMARY {
            continue;
        }
        if field.tag == Tag::GPSInfoIFDPointer {
            has_gps_pointer = true;
            continue;
        }
        let Some(value) = convert_value(&field.value) else {
            continue;
        };
        match field.tag.context() {
            exif::Context::Gps => {
                gps.insert(TagKey::Id(field.tag.number()), value);
            }
            exif::Context::Tiff | exif::Context::Exif => {
                entries.push((field.tag.number(), value));
            }
            _ => {}
        }
    }

    if has_gps_pointer || !gps.is_empty() {
        entries.push((GPS_INFO_TAG, TagValue::Block(gps)));
    }

    entries
}

/// Convert a kamadak-exif value into the crate's value model
fn convert_value(value: &Value) -> Option<TagValue> {
    fn numbers<T: Copy + Into<f64>>(vec: &[T]) -> TagValue {
        match vec {
            [single] => TagValue::Number((*single).into()),
            many => TagValue::List(many.iter().map(|&n| TagValue::Number(n.into())).collect()),
        }
    }

    fn rationals(pairs: Vec<(i64, i64)>) -> TagValue {
        match pairs.as_slice() {
            [(num, den)] => TagValue::Rational { num: *num, den: *den },
            many => TagValue::List(
                many.iter()
                    .map(|&(num, den)| TagValue::Rational { num, den })
                    .collect(),
            ),
        }
    }

    let converted = match value {
        Value::Ascii(strings) => {
            let mut texts: Vec<TagValue> = strings
                .iter()
                .map(|s| TagValue::Text(String::from_utf8_lossy(s).to_string()))
                .collect();
            match texts.len() {
                0 => TagValue::Text(String::new()),
                1 => texts.remove(0),
                _ => TagValue::List(texts),
            }
        }
        Value::Byte(v) => numbers(v),
        Value::Short(v) => numbers(v),
        Value::Long(v) => numbers(v),
        Value::SByte(v) => numbers(v),
        Value::SShort(v) => numbers(v),
        Value::SLong(v) => numbers(v),
        Value::Float(v) => numbers(v),
        Value::Double(v) => numbers(v),
        Value::Rational(v) => rationals(
            v.iter()
                .map(|r| (i64::from(r.num), i64::from(r.denom)))
                .collect(),
        ),
        Value::SRational(v) => rationals(
            v.iter()
                .map(|r| (i64::from(r.num), i64::from(r.denom)))
                .collect(),
        ),
        Value::Undefined(bytes, _) => TagValue::Bytes(bytes.clone()),
        _ => return None,
    };
    Some(converted)
}

const XMP_PREFIX: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const ICC_PREFIX: &[u8] = b"ICC_PROFILE\0";

/// Summarize the metadata segments of a JPEG into an info map
pub fn jpeg_info(bytes: &[u8]) -> BTreeMap<String, TagValue> {
    let mut info = BTreeMap::new();
    let jpeg = match Jpeg::from_bytes(Bytes::copy_from_slice(bytes)) {
        Ok(jpeg) => jpeg,
        Err(e) => {
            debug!("Failed to list JPEG segments: {}", e);
            return info;
        }
    };

    let mut icc = Vec::new();
    for segment in jpeg.segments() {
        let data: &[u8] = segment.contents();
        match segment.marker() {
            markers::APP0 if data.starts_with(b"JFIF\0") && data.len() >= 12 => {
                let version = u16::from_be_bytes([data[5], data[6]]);
                info.insert("jfif".to_string(), TagValue::Number(f64::from(version)));
                info.insert(
                    "jfif_version".to_string(),
                    TagValue::List(vec![
                        TagValue::Number(f64::from(data[5])),
                        TagValue::Number(f64::from(data[6])),
                    ]),
                );
                info.insert("jfif_unit".to_string(), TagValue::Number(f64::from(data[7])));
                info.insert(
                    "jfif_density".to_string(),
                    TagValue::List(vec![
                        TagValue::Number(f64::from(u16::from_be_bytes([data[8], data[9]]))),
                        TagValue::Number(f64::from(u16::from_be_bytes([data[10], data[11]]))),
                    ]),
                );
            }
            markers::APP1 if data.starts_with(b"Exif\0\0") => {
                info.insert("exif".to_string(), TagValue::Bytes(data.to_vec()));
            }
            markers::APP1 if data.starts_with(XMP_PREFIX) => {
                info.insert(
                    "xmp".to_string(),
                    TagValue::Bytes(data[XMP_PREFIX.len()..].to_vec()),
                );
            }
            markers::APP2 if data.starts_with(ICC_PREFIX) && data.len() >= ICC_PREFIX.len() + 2 => {
                // Chunk sequence number and count follow the prefix
                icc.extend_from_slice(&data[ICC_PREFIX.len() + 2..]);
            }
            markers::APP14 if data.starts_with(b"Adobe") && data.len() >= 7 => {
                let version = u16::from_be_bytes([data[5], data[6]]);
                info.insert("adobe".to_string(), TagValue::Number(f64::from(version)));
                if let Some(&transform) = data.get(11) {
                    info.insert(
                        "adobe_transform".to_string(),
                        TagValue::Number(f64::from(transform)),
                    );
                }
            }
            markers::SOF2 => {
                info.insert("progressive".to_string(), TagValue::Number(1.0));
                info.insert("progression".to_string(), TagValue::Number(1.0));
            }
            markers::COM => {
                info.insert("comment".to_string(), TagValue::Bytes(data.to_vec()));
            }
            _ => {}
        }
    }

    if !icc.is_empty() {
        info.insert("icc_profile".to_string(), TagValue::Bytes(icc));
    }

    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{self, MockExif};

    #[test]
    fn test_decode_plain_jpeg() -> Result<()> {
        let bytes = mock::jpeg_bytes(16, 8)?;
        let decoded = decode_bytes(&bytes)?;

        assert_eq!(decoded.kind, ImageKind::Jpeg);
        assert_eq!((decoded.width, decoded.height), (16, 8));
        assert!(decoded.exif.is_empty());
        assert!(decoded.info.is_empty());
        Ok(())
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_bytes(b"definitely not an image").is_err());
        assert!(decode_bytes(&[0xFF, 0xD8, 0xFF]).is_err());
    }

    #[test]
    fn test_decode_image_reads_from_disk() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let exif = MockExif::default().with_text(Tag::Artist, "someone");
        let path = mock::write_fixture(temp_dir.path(), "disk.jpg", &mock::jpeg_with_exif(&exif)?)?;

        let decoded = decode_image(&path)?;
        assert_eq!((decoded.width, decoded.height), (8, 8));
        assert!(decoded.exif.iter().any(|(id, _)| *id == Tag::Artist.number()));
        assert!(decoded.info.contains_key("exif"));
        Ok(())
    }

    #[test]
    fn test_exif_entries_flatten_and_nest_gps() -> Result<()> {
        let exif = MockExif::default()
            .with_text(Tag::Model, "X100V")
            .with_text(Tag::DateTimeOriginal, "2024:05:01 10:00:00")
            .with_text(Tag::GPSLatitudeRef, "N");
        let decoded = decode_bytes(&mock::jpeg_with_exif(&exif)?)?;

        let ids: Vec<u16> = decoded.exif.iter().map(|(id, _)| *id).collect();
        assert!(ids.contains(&Tag::Model.number()));
        assert!(ids.contains(&Tag::DateTimeOriginal.number()));
        assert!(!ids.contains(&Tag::GPSLatitudeRef.number()));

        let gps = decoded
            .exif
            .iter()
            .find(|(id, _)| *id == GPS_INFO_TAG)
            .map(|(_, value)| value.clone());
        let Some(TagValue::Block(block)) = gps else {
            panic!("GPS block missing");
        };
        assert_eq!(
            block.get(&TagKey::Id(Tag::GPSLatitudeRef.number())),
            Some(&TagValue::Text("N".to_string()))
        );
        assert!(decoded.info.contains_key("exif"));
        Ok(())
    }

    #[test]
    fn test_broken_gps_pointer_keeps_main_entries() -> Result<()> {
        let exif = MockExif::default()
            .with_text(Tag::Model, "Z6")
            .with_text(Tag::GPSLatitudeRef, "N");
        let mut tiff = exif.tiff_bytes()?;
        assert!(mock::redirect_gps_pointer(&mut tiff, 0xFFF0));

        let entries = read_exif_entries(&mut Cursor::new(mock::jpeg_with_tiff(&tiff)?));
        assert!(entries.contains(&(Tag::Model.number(), TagValue::Text("Z6".to_string()))));
        assert!(!entries.iter().any(|(_, value)| matches!(
            value,
            TagValue::Block(block) if !block.is_empty()
        )));
        Ok(())
    }

    #[test]
    fn test_exif_entries_from_heif_container() {
        let entries = read_exif_entries(&mut Cursor::new(mock::HEIC_SAMPLE));

        assert!(entries.contains(&(
            Tag::Software.number(),
            TagValue::Text("libheif + kamadak-exif".to_string())
        )));
        assert!(entries.contains(&(Tag::ExifVersion.number(), TagValue::Bytes(b"0231".to_vec()))));
    }

    #[cfg(feature = "heif")]
    #[test]
    fn test_decode_heif_sample() -> Result<()> {
        let decoded = decode_bytes(mock::HEIC_SAMPLE)?;
        assert_eq!(decoded.kind, ImageKind::Heif);
        assert_eq!((decoded.width, decoded.height), (64, 64));
        assert!(!decoded.exif.is_empty());
        assert!(decoded.info.is_empty());
        Ok(())
    }

    #[cfg(not(feature = "heif"))]
    #[test]
    fn test_heif_needs_feature() {
        let err = decode_bytes(mock::HEIC_SAMPLE).unwrap_err();
        assert!(err.to_string().contains("heif"));
    }

    #[test]
    fn test_jpeg_info_reads_comment_and_jfif() -> Result<()> {
        let bytes = mock::jpeg_with_comment("hello")?;
        let info = jpeg_info(&bytes);
        assert_eq!(info.get("comment"), Some(&TagValue::Bytes(b"hello".to_vec())));

        let jfif = mock::with_segments(&mock::jpeg_bytes(4, 4)?, vec![mock::jfif_segment()])?;
        let info = jpeg_info(&jfif);
        assert_eq!(info.get("jfif"), Some(&TagValue::Number(257.0)));
        assert_eq!(info.get("jfif_unit"), Some(&TagValue::Number(0.0)));
        Ok(())
    }

    #[test]
    fn test_jpeg_info_of_non_jpeg_is_empty() {
        assert!(jpeg_info(b"not a jpeg").is_empty());
    }
}
