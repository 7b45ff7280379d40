//! Fraud-signal evaluators.
//!
//! Each evaluator is a pure function producing a [`SignalVerdict`]. A failed
//! plausibility check is data, never an error, so callers can always collect
//! the complete reason set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CaptureMetadata, Coordinate, FeatureVector};
use crate::geo::distance_km;
use crate::policy::{normalize, FraudPolicy};

/// The fixed battery of fraud signals, in aggregation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    LocationPlausibility,
    YieldPlausibility,
    MetadataFreshness,
    GpsConsistency,
    VisualSimilarity,
}

impl Signal {
    pub const ALL: [Signal; 5] = [
        Signal::LocationPlausibility,
        Signal::YieldPlausibility,
        Signal::MetadataFreshness,
        Signal::GpsConsistency,
        Signal::VisualSimilarity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::LocationPlausibility => "location_plausibility",
            Signal::YieldPlausibility => "yield_plausibility",
            Signal::MetadataFreshness => "metadata_freshness",
            Signal::GpsConsistency => "gps_consistency",
            Signal::VisualSimilarity => "visual_similarity",
        }
    }
}

/// Outcome of one evaluator.
///
/// A triggered verdict always carries a reason: the only constructors are
/// [`SignalVerdict::clear`] and [`SignalVerdict::flag`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalVerdict {
    signal: Signal,
    triggered: bool,
    reason: Option<String>,
}

impl SignalVerdict {
    pub fn clear(signal: Signal) -> Self {
        Self {
            signal,
            triggered: false,
            reason: None,
        }
    }

    pub fn flag(signal: Signal, reason: impl Into<String>) -> Self {
        Self {
            signal,
            triggered: true,
            reason: Some(reason.into()),
        }
    }

    pub fn signal(&self) -> Signal {
        self.signal
    }

    pub fn triggered(&self) -> bool {
        self.triggered
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

/// "sweet corn" → "Sweet Corn".
fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Round to two decimals for display; drops float noise like `120.00000000000001`.
fn display_amount(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Flags a crop claimed in a region outside its known growing regions.
///
/// Crops without a region table are always plausible.
pub fn check_location(policy: &FraudPolicy, crop: &str, region: &str) -> SignalVerdict {
    let signal = Signal::LocationPlausibility;
    let Some(allowed) = policy.allowed_regions(crop) else {
        return SignalVerdict::clear(signal);
    };

    let claimed = normalize(region);
    if allowed.iter().any(|r| *r == claimed) {
        SignalVerdict::clear(signal)
    } else {
        SignalVerdict::flag(
            signal,
            format!(
                "{} cannot be grown in {}",
                title_case(&normalize(crop)),
                region.trim()
            ),
        )
    }
}

/// Flags a claimed quantity above `max_yield_per_acre * land_area`.
///
/// Crops without a yield ceiling are always plausible.
pub fn check_yield(
    policy: &FraudPolicy,
    crop: &str,
    quantity_kg: f64,
    land_area_acres: f64,
) -> SignalVerdict {
    let signal = Signal::YieldPlausibility;
    let Some(per_acre) = policy.max_yield_per_acre(crop) else {
        return SignalVerdict::clear(signal);
    };

    let max_allowed = per_acre * land_area_acres;
    if quantity_kg > max_allowed {
        SignalVerdict::flag(
            signal,
            format!(
                "Reported quantity {}kg exceeds expected max {}kg for {} acres",
                display_amount(quantity_kg),
                display_amount(max_allowed),
                display_amount(land_area_acres),
            ),
        )
    } else {
        SignalVerdict::clear(signal)
    }
}

/// Flags missing metadata, a missing camera make, or a stale capture time.
///
/// Sub-checks run in that order and the first match is reported.
pub fn check_metadata_freshness(
    policy: &FraudPolicy,
    metadata: Option<&CaptureMetadata>,
    now: DateTime<Utc>,
) -> SignalVerdict {
    let signal = Signal::MetadataFreshness;
    let Some(metadata) = metadata else {
        return SignalVerdict::flag(signal, "No EXIF metadata found");
    };
    if metadata.device_make.is_none() {
        return SignalVerdict::flag(signal, "Camera make missing");
    }
    if let Some(captured_at) = metadata.captured_at {
        if now - captured_at > policy.max_photo_age() {
            return SignalVerdict::flag(signal, "Photo is too old");
        }
    }
    SignalVerdict::clear(signal)
}

/// Flags a photo taken further than the GPS tolerance from the claim.
pub fn check_gps_consistency(
    policy: &FraudPolicy,
    claimed: Coordinate,
    embedded: Coordinate,
) -> SignalVerdict {
    let signal = Signal::GpsConsistency;
    let distance = distance_km(claimed, embedded);
    if distance > policy.gps_tolerance_km() {
        SignalVerdict::flag(
            signal,
            format!("GPS mismatch: photo taken {distance:.2} km from claimed location"),
        )
    } else {
        SignalVerdict::clear(signal)
    }
}

/// Cosine similarity `dot(u, v) / (|u| * |v|)`.
///
/// `None` when the vectors differ in length, are empty, or either has zero
/// magnitude.
pub fn cosine_similarity(u: &[f32], v: &[f32]) -> Option<f64> {
    if u.len() != v.len() || u.is_empty() {
        return None;
    }
    let (dot, norm_u, norm_v) = u.iter().zip(v).fold(
        (0.0f64, 0.0f64, 0.0f64),
        |(dot, nu, nv), (&a, &b)| {
            let (a, b) = (f64::from(a), f64::from(b));
            (dot + a * b, nu + a * a, nv + b * b)
        },
    );
    let denominator = norm_u.sqrt() * norm_v.sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }
    Some(dot / denominator)
}

/// Flags visual drift between a later-stage photo and the originating
/// stage's reference embedding.
///
/// Only meaningful after the originating stage; a missing reference is
/// itself a flag so the comparison can never be skipped silently.
pub fn check_visual_similarity(
    policy: &FraudPolicy,
    current: Option<&FeatureVector>,
    reference: Option<&FeatureVector>,
) -> SignalVerdict {
    let signal = Signal::VisualSimilarity;
    let Some(reference) = reference else {
        return SignalVerdict::flag(signal, "Missing reference image for comparison");
    };
    let Some(current) = current else {
        return SignalVerdict::flag(signal, "Missing feature vector for current photo");
    };
    if current.len() != reference.len() {
        return SignalVerdict::flag(
            signal,
            format!(
                "Feature vector dimensions differ ({} vs reference {})",
                current.len(),
                reference.len()
            ),
        );
    }

    if [current, reference]
        .iter()
        .any(|v| v.as_slice().iter().any(|x| !x.is_finite()))
    {
        return SignalVerdict::flag(
            signal,
            "Image similarity could not be computed for a feature vector with non-finite values",
        );
    }

    match cosine_similarity(current.as_slice(), reference.as_slice()) {
        Some(similarity) if similarity < policy.min_visual_similarity() => SignalVerdict::flag(
            signal,
            format!("Image similarity too low ({similarity:.2})"),
        ),
        Some(_) => SignalVerdict::clear(signal),
        None => SignalVerdict::flag(
            signal,
            "Image similarity could not be computed for a zero-magnitude feature vector",
        ),
    }
}
