//! Capture-metadata inspection.
//!
//! Raw tag decoding is delegated to `kamadak-exif`; this module owns the
//! mapping from raw tags to [`CaptureMetadata`]. Any parsing failure is
//! downgraded to "no metadata" and never escapes as an error.

use std::io::Cursor;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use exif::{Exif, In, Reader, Tag, Value};

use crate::domain::{CaptureMetadata, Coordinate};

/// EXIF `DateTime` / `DateTimeOriginal` layout.
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Extract capture metadata from raw photo bytes.
///
/// Returns `None` when the image carries no metadata block or the block
/// cannot be decoded.
pub fn extract(photo: &[u8]) -> Option<CaptureMetadata> {
    let exif = match Reader::new().read_from_container(&mut Cursor::new(photo)) {
        Ok(exif) => exif,
        Err(e) => {
            tracing::debug!(error = %e, "no readable capture metadata");
            return None;
        }
    };

    Some(CaptureMetadata {
        device_make: ascii_field(&exif, Tag::Make),
        captured_at: capture_time(&exif),
        coordinate: gps_coordinate(&exif),
    })
}

fn ascii_field(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(parts) => {
            let text = parts
                .iter()
                .map(|p| String::from_utf8_lossy(p).into_owned())
                .collect::<Vec<_>>()
                .join(" ");
            let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
            (!text.is_empty()).then(|| text.to_string())
        }
        _ => None,
    }
}

/// Parse an EXIF timestamp as UTC. Unparsable text yields `None`.
pub fn parse_exif_datetime(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), EXIF_DATETIME_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn capture_time(exif: &Exif) -> Option<DateTime<Utc>> {
    [Tag::DateTimeOriginal, Tag::DateTime]
        .into_iter()
        .find_map(|tag| ascii_field(exif, tag).and_then(|raw| parse_exif_datetime(&raw)))
}

fn dms_to_degrees(exif: &Exif, tag: Tag) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Rational(parts) if !parts.is_empty() => {
            let component = |i: usize| parts.get(i).map(|r| r.to_f64()).unwrap_or(0.0);
            let degrees = component(0) + component(1) / 60.0 + component(2) / 3600.0;
            degrees.is_finite().then_some(degrees)
        }
        _ => None,
    }
}

/// Apply the hemisphere reference: `S` and `W` negate the magnitude.
/// A missing reference leaves the magnitude positive.
pub fn apply_hemisphere(magnitude: f64, reference: Option<&str>) -> f64 {
    match reference.map(|r| r.trim().to_ascii_uppercase()) {
        Some(r) if r == "S" || r == "W" => -magnitude,
        _ => magnitude,
    }
}

fn gps_coordinate(exif: &Exif) -> Option<Coordinate> {
    let latitude = dms_to_degrees(exif, Tag::GPSLatitude)?;
    let longitude = dms_to_degrees(exif, Tag::GPSLongitude)?;
    let lat_ref = ascii_field(exif, Tag::GPSLatitudeRef);
    let lng_ref = ascii_field(exif, Tag::GPSLongitudeRef);

    Coordinate::new(
        apply_hemisphere(latitude, lat_ref.as_deref()),
        apply_hemisphere(longitude, lng_ref.as_deref()),
    )
    .ok()
}
