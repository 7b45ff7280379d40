//! Photographic evidence attached to a batch submission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::canonical;
use crate::capture;
use crate::domain::claim::Coordinate;

/// The three semantic fields read from a photo's embedded metadata block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CaptureMetadata {
    /// Camera manufacturer (`Make` tag).
    pub device_make: Option<String>,
    /// Capture time, interpreted as UTC.
    pub captured_at: Option<DateTime<Utc>>,
    /// Embedded GPS position in signed decimal degrees.
    pub coordinate: Option<Coordinate>,
}

/// Opaque image embedding returned by the feature-vector provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(pub Vec<f32>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// Everything the evaluators need to know about one photo.
///
/// Raw bytes are not retained; only the extracted metadata and the
/// content digest (used for duplicate detection) survive construction.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureEvidence {
    /// SHA-256 hex digest of the raw photo bytes.
    pub content_digest: String,
    /// `None` when the photo carried no readable metadata block.
    pub metadata: Option<CaptureMetadata>,
    /// Present only for stages after the originating stage.
    pub feature_vector: Option<FeatureVector>,
}

impl CaptureEvidence {
    /// Inspect raw photo bytes.
    pub fn from_photo(bytes: &[u8]) -> Self {
        Self {
            content_digest: canonical::digest(bytes),
            metadata: capture::extract(bytes),
            feature_vector: None,
        }
    }

    pub fn with_feature_vector(mut self, vector: FeatureVector) -> Self {
        self.feature_vector = Some(vector);
        self
    }

    /// Embedded GPS position, if the metadata block carried one.
    pub fn embedded_coordinate(&self) -> Option<Coordinate> {
        self.metadata.as_ref().and_then(|m| m.coordinate)
    }
}

/// The ordered set of photos for one submission plus the originating
/// stage's reference embedding.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EvidenceSet {
    /// Photos in submission order; the first one is the primary photo.
    pub photos: Vec<CaptureEvidence>,
    /// Embedding captured at the originating stage, if one exists.
    pub reference_vector: Option<FeatureVector>,
}

impl EvidenceSet {
    pub fn new(photos: Vec<CaptureEvidence>) -> Self {
        Self {
            photos,
            reference_vector: None,
        }
    }

    pub fn with_reference(mut self, reference: FeatureVector) -> Self {
        self.reference_vector = Some(reference);
        self
    }

    /// The first submitted photo.
    pub fn primary(&self) -> Option<&CaptureEvidence> {
        self.photos.first()
    }

    /// Embedded GPS of the primary photo. Later photos are never consulted.
    pub fn embedded_coordinate(&self) -> Option<Coordinate> {
        self.primary().and_then(CaptureEvidence::embedded_coordinate)
    }
}
