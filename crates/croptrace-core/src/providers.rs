//! External model services consumed by the intake pipeline.
//!
//! Implementations report outages as
//! [`CroptraceError::DependencyUnavailable`](crate::domain::CroptraceError);
//! the core never converts an outage into a fraud flag.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{FeatureVector, Result};

/// Image-to-embedding model.
///
/// Vectors must have a fixed length across calls for comparisons to be
/// meaningful.
#[async_trait]
pub trait FeatureVectorProvider: Send + Sync {
    async fn vectorize(&self, image: &[u8]) -> Result<FeatureVector>;
}

/// Produce-freshness assessment of a photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreshnessAssessment {
    /// 0 to 100.
    pub freshness_score: u8,
    pub quality_grade: String,
    pub estimated_shelf_life_days: u32,
    pub visual_defects: Vec<String>,
}

impl FreshnessAssessment {
    /// Conservative assessment applied when the estimator is unreachable
    /// and the intake configuration allows a fallback.
    pub fn fallback() -> Self {
        Self {
            freshness_score: 85,
            quality_grade: "B".to_string(),
            estimated_shelf_life_days: 4,
            visual_defects: Vec::new(),
        }
    }
}

/// Freshness and shelf-life model; drives the record's expiry date.
#[async_trait]
pub trait ShelfLifeEstimator: Send + Sync {
    async fn assess(&self, image: &[u8]) -> Result<FreshnessAssessment>;
}
