//! EXIF metadata extraction for exifcheck.
//!
//! This module decides whether a path points at a supported image, whether
//! that image carries embedded metadata, and on request builds a normalized
//! `ImageMetadata` record out of it.
//!
//! Nothing here returns an error to the caller. Unsupported extensions and
//! files that don't decode come back as `supported == false`; a tag that is
//! missing or can't be converted comes back as `None` for that one field.

use chrono::NaiveDateTime;
use log::{debug, warn};
use serde::Serialize;
use std::path::Path;

use crate::decode::{self, DecodedImage};
use crate::gps;
use crate::tags::{self, TagMap, TagValue};

/// File extensions accepted for inspection (compared case-insensitively)
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "heic"];

/// Info map keys that suggest the container carries metadata
const METADATA_KEYS: &[&str] = &["exif", "comment", "text", "description", "author", "meta"];

/// Normalized metadata of a single image
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImageMetadata {
    /// When the photo was taken (`DateTimeOriginal`, falling back to `DateTime`)
    pub date_taken: Option<String>,
    /// When the photo was digitized (`DateTimeDigitized`)
    pub date_acquired: Option<String>,
    /// Software that produced the file
    pub program_name: Option<String>,
    pub copyright_notice: Option<String>,
    pub image_unique_id: Option<String>,
    /// Make of the camera (e.g., "Apple")
    pub camera_maker: Option<String>,
    /// Model of the camera (e.g., "iPhone 15 Pro")
    pub camera_model: Option<String>,
    pub lens_maker: Option<String>,
    pub lens_model: Option<String>,
    pub exif_version: Option<String>,
    /// Decimal degrees, negative in the southern hemisphere
    pub latitude: Option<f64>,
    pub latitude_ref: Option<String>,
    /// Decimal degrees, negative west of Greenwich
    pub longitude: Option<f64>,
    pub longitude_ref: Option<String>,
    /// Altitude in meters
    pub altitude: Option<f64>,
    pub altitude_ref: Option<String>,
}

impl ImageMetadata {
    /// Build the record from a name-resolved tag map
    pub fn from_tags(entries: &TagMap) -> Self {
        let text = |name: &str| tags::get(entries, name).and_then(TagValue::as_text);

        // An empty DateTimeOriginal counts as missing
        let date_taken = match text("DateTimeOriginal") {
            Some(original) if !original.is_empty() => Some(original),
            _ => text("DateTime"),
        };

        let gps = match tags::get(entries, "GPSInfo") {
            Some(TagValue::Block(block)) if !block.is_empty() => {
                gps::resolve_gps_fields(&tags::resolve_gps(block))
            }
            Some(TagValue::Block(_)) | None => gps::GpsFields::default(),
            Some(other) => {
                warn!("GPSInfo is not a sub-block: {:?}", other);
                gps::GpsFields::default()
            }
        };

        Self {
            date_taken,
            date_acquired: text("DateTimeDigitized"),
            program_name: text("Software"),
            copyright_notice: text("Copyright"),
            image_unique_id: text("ImageUniqueID"),
            camera_maker: text("Make"),
            camera_model: text("Model"),
            lens_maker: text("LensMake"),
            lens_model: text("LensModel"),
            exif_version: text("ExifVersion"),
            latitude: gps.latitude,
            latitude_ref: gps.latitude_ref,
            longitude: gps.longitude,
            longitude_ref: gps.longitude_ref,
            altitude: gps.altitude,
            altitude_ref: gps.altitude_ref,
        }
    }

    /// Whether every field is absent
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Parse `date_taken` (e.g., "2023:12:25 15:30:00")
    pub fn capture_time(&self) -> Option<NaiveDateTime> {
        self.date_taken.as_deref().and_then(parse_exif_datetime)
    }

    /// Display label and formatted value of every field, in panel order
    pub fn labeled_fields(&self) -> Vec<(&'static str, Option<String>)> {
        let coord = |v: Option<f64>| v.map(|d| format!("{d:.6}"));
        vec![
            ("Date Taken", self.date_taken.clone()),
            ("Program Name", self.program_name.clone()),
            ("Date Acquired", self.date_acquired.clone()),
            ("Copyright", self.copyright_notice.clone()),
            ("Image ID", self.image_unique_id.clone()),
            ("Camera Maker", self.camera_maker.clone()),
            ("Camera Model", self.camera_model.clone()),
            ("Lens Maker", self.lens_maker.clone()),
            ("Lens Model", self.lens_model.clone()),
            ("EXIF Version", self.exif_version.clone()),
            ("Latitude", coord(self.latitude)),
            ("Latitude Ref", self.latitude_ref.clone()),
            ("Longitude", coord(self.longitude)),
            ("Longitude Ref", self.longitude_ref.clone()),
            ("Altitude", self.altitude.map(|a| format!("{a:.2} m"))),
            ("Altitude Ref", self.altitude_ref.clone()),
        ]
    }
}

/// Parse an EXIF timestamp ("YYYY:MM:DD HH:MM:SS")
pub fn parse_exif_datetime(date_str: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(date_str.trim(), "%Y:%m:%d %H:%M:%S").ok()
}

/// How much work `inspect` should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// Only check format and metadata presence
    CheckOnly,
    /// Also build the `ImageMetadata` record
    Full,
}

/// Outcome of inspecting one path
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Inspection {
    /// Allowed extension and the file decodes as an image
    pub supported: bool,
    pub has_metadata: bool,
    /// Present only for supported files inspected in `ExtractMode::Full`
    pub metadata: Option<ImageMetadata>,
}

/// Whether the extension is on the allow-list
pub fn is_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
}

/// Inspect an image path.
///
/// An unsupported extension is rejected before any I/O happens.
pub fn inspect<P: AsRef<Path>>(path: P, mode: ExtractMode) -> Inspection {
    let path = path.as_ref();

    if !is_supported_extension(path) {
        debug!("Unsupported extension: {}", path.display());
        return Inspection::default();
    }

    let decoded = match decode::decode_image(path) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("Could not decode image {}: {:#}", path.display(), e);
            return Inspection::default();
        }
    };

    let has_metadata = has_metadata(&decoded);
    let metadata = match mode {
        ExtractMode::CheckOnly => None,
        ExtractMode::Full => {
            let resolved = tags::resolve_main(&decoded.exif);
            debug!("Resolved {} EXIF entries from {}", resolved.len(), path.display());
            Some(ImageMetadata::from_tags(&resolved))
        }
    };

    Inspection {
        supported: true,
        has_metadata,
        metadata,
    }
}

/// Returns `(is_supported_format, has_metadata)`
pub fn check_validity<P: AsRef<Path>>(path: P) -> (bool, bool) {
    let inspection = inspect(path, ExtractMode::CheckOnly);
    (inspection.supported, inspection.has_metadata)
}

/// Returns `(is_supported_format, has_metadata, metadata)`.
///
/// The record has every field absent when the file isn't supported.
pub fn extract_metadata<P: AsRef<Path>>(path: P) -> (bool, bool, ImageMetadata) {
    let inspection = inspect(path, ExtractMode::Full);
    (
        inspection.supported,
        inspection.has_metadata,
        inspection.metadata.unwrap_or_default(),
    )
}

/// EXIF entries, or a metadata-suggestive or non-empty info map entry
fn has_metadata(decoded: &DecodedImage) -> bool {
    let has_exif = !decoded.exif.is_empty();
    let info_has_meta = decoded.info.iter().any(|(key, value)| {
        METADATA_KEYS.contains(&key.to_lowercase().as_str()) || value.is_truthy()
    });
    has_exif || info_has_meta
}
