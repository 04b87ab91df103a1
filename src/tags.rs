//! Tag dictionaries and the value model for resolved EXIF metadata.
//!
//! Raw metadata coming out of the decoder is keyed by numeric tag ids. Before
//! any field lookup those ids are resolved to canonical names through one of
//! two fixed tables: the main table (TIFF and Exif IFD tags) or the GPS table.
//! Ids that are not in the table keep their numeric key, so they stay in the
//! map but never match a named lookup.

use std::collections::BTreeMap;

/// Numeric id of the GPS sub-IFD pointer in the main table.
pub const GPS_INFO_TAG: u16 = 0x8825;

/// Key of a resolved metadata entry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TagKey {
    /// Id with no entry in the dictionary
    Id(u16),
    /// Canonical tag name (e.g., "DateTimeOriginal")
    Name(String),
}

impl TagKey {
    pub fn name(name: &str) -> Self {
        TagKey::Name(name.to_string())
    }
}

/// Ordered key/value map of metadata entries
pub type TagMap = BTreeMap<TagKey, TagValue>;

/// A single metadata value, independent of the on-disk encoding
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// ASCII text
    Text(String),
    /// Opaque bytes (UNDEFINED fields, raw marker payloads)
    Bytes(Vec<u8>),
    /// Any integer or floating point scalar
    Number(f64),
    /// Numerator/denominator pair
    Rational { num: i64, den: i64 },
    /// Multi-valued field
    List(Vec<TagValue>),
    /// Nested IFD, such as the GPS sub-block
    Block(TagMap),
}

impl TagValue {
    /// Whether the value carries anything.
    ///
    /// Zero, empty text, empty bytes and empty collections count as empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            TagValue::Text(s) => !s.is_empty(),
            TagValue::Bytes(b) => !b.is_empty(),
            TagValue::Number(n) => *n != 0.0,
            TagValue::Rational { num, .. } => *num != 0,
            TagValue::List(items) => !items.is_empty(),
            TagValue::Block(map) => !map.is_empty(),
        }
    }

    /// Render the value as free text, if it has a textual form
    pub fn as_text(&self) -> Option<String> {
        match self {
            TagValue::Text(s) => Some(s.clone()),
            TagValue::Bytes(b) => Some(
                String::from_utf8_lossy(b)
                    .trim_end_matches('\0')
                    .to_string(),
            ),
            TagValue::Number(n) => Some(format_number(*n)),
            TagValue::Rational { num, den } => Some(format!("{num}/{den}")),
            TagValue::List(items) => {
                let parts: Option<Vec<String>> = items.iter().map(TagValue::as_text).collect();
                parts.map(|p| p.join(", "))
            }
            TagValue::Block(_) => None,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Main EXIF dictionary (TIFF and Exif IFD), sorted by id
static MAIN_TAGS: &[(u16, &str)] = &[
    (0x000B, "ProcessingSoftware"),
    (0x00FE, "NewSubfileType"),
    (0x00FF, "SubfileType"),
    (0x0100, "ImageWidth"),
    (0x0101, "ImageLength"),
    (0x0102, "BitsPerSample"),
    (0x0103, "Compression"),
    (0x0106, "PhotometricInterpretation"),
    (0x010E, "ImageDescription"),
    (0x010F, "Make"),
    (0x0110, "Model"),
    (0x0111, "StripOffsets"),
    (0x0112, "Orientation"),
    (0x0115, "SamplesPerPixel"),
    (0x0116, "RowsPerStrip"),
    (0x0117, "StripByteCounts"),
    (0x011A, "XResolution"),
    (0x011B, "YResolution"),
    (0x011C, "PlanarConfiguration"),
    (0x0128, "ResolutionUnit"),
    (0x012D, "TransferFunction"),
    (0x0131, "Software"),
    (0x0132, "DateTime"),
    (0x013B, "Artist"),
    (0x013E, "WhitePoint"),
    (0x013F, "PrimaryChromaticities"),
    (0x0201, "JpegIFOffset"),
    (0x0202, "JpegIFByteCount"),
    (0x0211, "YCbCrCoefficients"),
    (0x0212, "YCbCrSubSampling"),
    (0x0213, "YCbCrPositioning"),
    (0x0214, "ReferenceBlackWhite"),
    (0x8298, "Copyright"),
    (0x829A, "ExposureTime"),
    (0x829D, "FNumber"),
    (0x8769, "ExifOffset"),
    (0x8822, "ExposureProgram"),
    (0x8824, "SpectralSensitivity"),
    (0x8825, "GPSInfo"),
    (0x8827, "ISOSpeedRatings"),
    (0x8828, "OECF"),
    (0x8830, "SensitivityType"),
    (0x8832, "RecommendedExposureIndex"),
    (0x9000, "ExifVersion"),
    (0x9003, "DateTimeOriginal"),
    (0x9004, "DateTimeDigitized"),
    (0x9010, "OffsetTime"),
    (0x9011, "OffsetTimeOriginal"),
    (0x9012, "OffsetTimeDigitized"),
    (0x9101, "ComponentsConfiguration"),
    (0x9102, "CompressedBitsPerPixel"),
    (0x9201, "ShutterSpeedValue"),
    (0x9202, "ApertureValue"),
    (0x9203, "BrightnessValue"),
    (0x9204, "ExposureBiasValue"),
    (0x9205, "MaxApertureValue"),
    (0x9206, "SubjectDistance"),
    (0x9207, "MeteringMode"),
    (0x9208, "LightSource"),
    (0x9209, "Flash"),
    (0x920A, "FocalLength"),
    (0x9214, "SubjectArea"),
    (0x927C, "MakerNote"),
    (0x9286, "UserComment"),
    (0x9290, "SubsecTime"),
    (0x9291, "SubsecTimeOriginal"),
    (0x9292, "SubsecTimeDigitized"),
    (0xA000, "FlashPixVersion"),
    (0xA001, "ColorSpace"),
    (0xA002, "ExifImageWidth"),
    (0xA003, "ExifImageHeight"),
    (0xA004, "RelatedSoundFile"),
    (0xA005, "ExifInteroperabilityOffset"),
    (0xA20B, "FlashEnergy"),
    (0xA20E, "FocalPlaneXResolution"),
    (0xA20F, "FocalPlaneYResolution"),
    (0xA210, "FocalPlaneResolutionUnit"),
    (0xA214, "SubjectLocation"),
    (0xA215, "ExposureIndex"),
    (0xA217, "SensingMethod"),
    (0xA300, "FileSource"),
    (0xA301, "SceneType"),
    (0xA302, "CFAPattern"),
    (0xA401, "CustomRendered"),
    (0xA402, "ExposureMode"),
    (0xA403, "WhiteBalance"),
    (0xA404, "DigitalZoomRatio"),
    (0xA405, "FocalLengthIn35mmFilm"),
    (0xA406, "SceneCaptureType"),
    (0xA407, "GainControl"),
    (0xA408, "Contrast"),
    (0xA409, "Saturation"),
    (0xA40A, "Sharpness"),
    (0xA40B, "DeviceSettingDescription"),
    (0xA40C, "SubjectDistanceRange"),
    (0xA420, "ImageUniqueID"),
    (0xA430, "CameraOwnerName"),
    (0xA431, "BodySerialNumber"),
    (0xA432, "LensSpecification"),
    (0xA433, "LensMake"),
    (0xA434, "LensModel"),
    (0xA435, "LensSerialNumber"),
    (0xA460, "CompositeImage"),
    (0xA500, "Gamma"),
];

/// GPS IFD dictionary, sorted by id
static GPS_TAGS: &[(u16, &str)] = &[
    (0x00, "GPSVersionID"),
    (0x01, "GPSLatitudeRef"),
    (0x02, "GPSLatitude"),
    (0x03, "GPSLongitudeRef"),
    (0x04, "GPSLongitude"),
    (0x05, "GPSAltitudeRef"),
    (0x06, "GPSAltitude"),
    (0x07, "GPSTimeStamp"),
    (0x08, "GPSSatellites"),
    (0x09, "GPSStatus"),
    (0x0A, "GPSMeasureMode"),
    (0x0B, "GPSDOP"),
    (0x0C, "GPSSpeedRef"),
    (0x0D, "GPSSpeed"),
    (0x0E, "GPSTrackRef"),
    (0x0F, "GPSTrack"),
    (0x10, "GPSImgDirectionRef"),
    (0x11, "GPSImgDirection"),
    (0x12, "GPSMapDatum"),
    (0x13, "GPSDestLatitudeRef"),
    (0x14, "GPSDestLatitude"),
    (0x15, "GPSDestLongitudeRef"),
    (0x16, "GPSDestLongitude"),
    (0x17, "GPSDestBearingRef"),
    (0x18, "GPSDestBearing"),
    (0x19, "GPSDestDistanceRef"),
    (0x1A, "GPSDestDistance"),
    (0x1B, "GPSProcessingMethod"),
    (0x1C, "GPSAreaInformation"),
    (0x1D, "GPSDateStamp"),
    (0x1E, "GPSDifferential"),
    (0x1F, "GPSHPositioningError"),
];

fn lookup(table: &'static [(u16, &'static str)], id: u16) -> Option<&'static str> {
    table
        .binary_search_by_key(&id, |&(tag, _)| tag)
        .ok()
        .map(|idx| table[idx].1)
}

/// Canonical name of a main-table tag id
pub fn main_tag_name(id: u16) -> Option<&'static str> {
    lookup(MAIN_TAGS, id)
}

/// Canonical name of a GPS tag id
pub fn gps_tag_name(id: u16) -> Option<&'static str> {
    lookup(GPS_TAGS, id)
}

fn resolve_key(id: u16, table: &'static [(u16, &'static str)]) -> TagKey {
    match lookup(table, id) {
        Some(name) => TagKey::name(name),
        None => TagKey::Id(id),
    }
}

/// Resolve raw `(id, value)` entries through the main dictionary
pub fn resolve_main(raw: &[(u16, TagValue)]) -> TagMap {
    raw.iter()
        .map(|(id, value)| (resolve_key(*id, MAIN_TAGS), value.clone()))
        .collect()
}

/// Resolve a GPS sub-block.
///
/// If any key is still numeric, every numeric key goes through the GPS
/// dictionary. A block that is already keyed by name is returned as-is.
pub fn resolve_gps(block: &TagMap) -> TagMap {
    let any_numeric = block.keys().any(|k| matches!(k, TagKey::Id(_)));
    if !any_numeric {
        return block.clone();
    }

    block
        .iter()
        .map(|(key, value)| {
            let key = match key {
                TagKey::Id(id) => resolve_key(*id, GPS_TAGS),
                named => named.clone(),
            };
            (key, value.clone())
        })
        .collect()
}

/// Look up an entry by canonical name
pub fn get<'a>(map: &'a TagMap, name: &str) -> Option<&'a TagValue> {
    map.get(&TagKey::name(name))
}
