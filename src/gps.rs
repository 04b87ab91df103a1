//! GPS coordinate normalization.
//!
//! EXIF stores latitude and longitude as degree/minute/second triples of
//! rationals plus a hemisphere reference. These helpers turn them into signed
//! decimal degrees. Every conversion returns `None` on malformed input so a
//! bad GPS field never takes the rest of the metadata down with it.

use log::warn;

use crate::tags::{self, TagMap, TagValue};

/// Resolved GPS fields of an image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpsFields {
    pub latitude: Option<f64>,
    pub latitude_ref: Option<String>,
    pub longitude: Option<f64>,
    pub longitude_ref: Option<String>,
    pub altitude: Option<f64>,
    pub altitude_ref: Option<String>,
}

/// Convert a rational-or-numeric value to a float.
///
/// A zero denominator yields the numerator instead of failing.
pub fn rational_to_float(value: &TagValue) -> Option<f64> {
    match value {
        TagValue::Rational { num, den } => Some(divide(*num as f64, *den as f64)),
        TagValue::List(pair) if pair.len() == 2 => match (&pair[0], &pair[1]) {
            (TagValue::Number(num), TagValue::Number(den)) => Some(divide(*num, *den)),
            _ => None,
        },
        TagValue::Number(n) => Some(*n),
        TagValue::Text(s) => s.trim().parse::<f64>().ok(),
        TagValue::Bytes(b) => std::str::from_utf8(b).ok()?.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn divide(num: f64, den: f64) -> f64 {
    if den == 0.0 { num } else { num / den }
}

/// Decode a hemisphere or altitude reference.
///
/// Raw bytes are decoded as UTF-8 with invalid sequences dropped.
pub fn decode_reference(value: &TagValue) -> Option<String> {
    match value {
        TagValue::Text(s) => Some(s.clone()),
        TagValue::Bytes(b) => Some(
            String::from_utf8_lossy(b)
                .chars()
                .filter(|&c| c != char::REPLACEMENT_CHARACTER)
                .collect::<String>()
                .trim_end_matches('\0')
                .to_string(),
        ),
        TagValue::Number(_) => value.as_text(),
        _ => None,
    }
}

/// Convert a (degrees, minutes, seconds) triple to decimal degrees.
///
/// A reference of `S` or `W` forces the result negative.
pub fn dms_to_decimal(dms: &TagValue, reference: Option<&TagValue>) -> Option<f64> {
    let TagValue::List(components) = dms else {
        return None;
    };
    if components.len() < 3 {
        return None;
    }

    let degrees = rational_to_float(&components[0])?;
    let minutes = rational_to_float(&components[1])?;
    let seconds = rational_to_float(&components[2])?;
    let decimal = degrees + minutes / 60.0 + seconds / 3600.0;

    let southern_or_western = reference
        .and_then(decode_reference)
        .is_some_and(|r| r.eq_ignore_ascii_case("S") || r.eq_ignore_ascii_case("W"));

    if southern_or_western {
        Some(-decimal.abs())
    } else {
        Some(decimal)
    }
}

/// Pull latitude, longitude and altitude out of a resolved GPS block
pub fn resolve_gps_fields(gps: &TagMap) -> GpsFields {
    let lat_ref = tags::get(gps, "GPSLatitudeRef");
    let lon_ref = tags::get(gps, "GPSLongitudeRef");
    let alt_ref = tags::get(gps, "GPSAltitudeRef");

    GpsFields {
        latitude: coordinate(gps, "GPSLatitude", lat_ref),
        latitude_ref: lat_ref.and_then(decode_reference),
        longitude: coordinate(gps, "GPSLongitude", lon_ref),
        longitude_ref: lon_ref.and_then(decode_reference),
        altitude: tags::get(gps, "GPSAltitude").and_then(|alt| {
            let converted = rational_to_float(alt);
            if converted.is_none() {
                warn!("Ignoring malformed GPSAltitude value: {:?}", alt);
            }
            converted
        }),
        altitude_ref: alt_ref.and_then(decode_reference),
    }
}

fn coordinate(gps: &TagMap, name: &str, reference: Option<&TagValue>) -> Option<f64> {
    let dms = tags::get(gps, name)?;
    let decimal = dms_to_decimal(dms, reference);
    if decimal.is_none() {
        warn!("Ignoring malformed {} value: {:?}", name, dms);
    }
    decimal
}
