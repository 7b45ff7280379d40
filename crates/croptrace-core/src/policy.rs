//! Fraud policy tables and thresholds.
//!
//! A [`PolicyConfig`] is the serializable form (built-in defaults or a JSON
//! file). [`FraudPolicy`] is the validated, normalized, read-only form the
//! evaluators consume. [`PolicyStore`] publishes a policy to concurrent
//! readers with copy-and-swap semantics.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::error::{Result, ValidationError};

/// Serializable policy as loaded from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Crop → regions the crop can plausibly be grown in.
    pub valid_regions: BTreeMap<String, Vec<String>>,
    /// Crop → maximum plausible yield in kg per acre.
    pub max_yield_per_acre: BTreeMap<String, f64>,
    /// Maximum claimed-vs-photographed distance before flagging.
    pub gps_tolerance_km: f64,
    /// Cosine similarity below which later-stage photos are flagged.
    pub min_visual_similarity: f64,
    /// Photos captured more than this many days ago are flagged.
    pub max_photo_age_days: i64,
    /// Minimum photo count accepted at intake.
    pub min_photos: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        let valid_regions = [
            ("saffron", vec!["Jammu & Kashmir"]),
            ("apple", vec!["Himachal Pradesh", "Jammu & Kashmir"]),
            ("wheat", vec!["Punjab", "Haryana"]),
        ]
        .into_iter()
        .map(|(crop, regions)| {
            (
                crop.to_string(),
                regions.into_iter().map(str::to_string).collect(),
            )
        })
        .collect();

        let max_yield_per_acre = [("saffron", 3.0), ("wheat", 1200.0), ("apple", 8000.0)]
            .into_iter()
            .map(|(crop, max)| (crop.to_string(), max))
            .collect();

        Self {
            valid_regions,
            max_yield_per_acre,
            gps_tolerance_km: 2.0,
            min_visual_similarity: 0.40,
            max_photo_age_days: 7,
            min_photos: 2,
        }
    }
}

impl PolicyConfig {
    /// Read a JSON policy file. Missing keys fall back to the defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Validated, read-only fraud policy.
///
/// Crop keys and region names are trimmed and lower-cased once at
/// construction so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq)]
pub struct FraudPolicy {
    valid_regions: BTreeMap<String, Vec<String>>,
    max_yield_per_acre: BTreeMap<String, f64>,
    gps_tolerance_km: f64,
    min_visual_similarity: f64,
    max_photo_age: Duration,
    min_photos: usize,
    config: PolicyConfig,
}

pub(crate) fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

impl FraudPolicy {
    pub fn from_config(config: PolicyConfig) -> std::result::Result<Self, ValidationError> {
        if !config.gps_tolerance_km.is_finite() || config.gps_tolerance_km < 0.0 {
            return Err(ValidationError::InvalidPolicy(format!(
                "gps_tolerance_km must be non-negative, got {}",
                config.gps_tolerance_km
            )));
        }
        if !(-1.0..=1.0).contains(&config.min_visual_similarity) {
            return Err(ValidationError::InvalidPolicy(format!(
                "min_visual_similarity must be within [-1, 1], got {}",
                config.min_visual_similarity
            )));
        }
        if config.max_photo_age_days < 0 {
            return Err(ValidationError::InvalidPolicy(format!(
                "max_photo_age_days must be non-negative, got {}",
                config.max_photo_age_days
            )));
        }
        if let Some((crop, max)) = config
            .max_yield_per_acre
            .iter()
            .find(|(_, max)| !max.is_finite() || **max < 0.0)
        {
            return Err(ValidationError::InvalidPolicy(format!(
                "max_yield_per_acre for '{crop}' must be non-negative, got {max}"
            )));
        }

        Ok(Self::build(config))
    }

    fn build(config: PolicyConfig) -> Self {
        let valid_regions = config
            .valid_regions
            .iter()
            .map(|(crop, regions)| {
                (
                    normalize(crop),
                    regions.iter().map(|r| normalize(r)).collect(),
                )
            })
            .collect();
        let max_yield_per_acre = config
            .max_yield_per_acre
            .iter()
            .map(|(crop, max)| (normalize(crop), *max))
            .collect();

        Self {
            valid_regions,
            max_yield_per_acre,
            gps_tolerance_km: config.gps_tolerance_km,
            min_visual_similarity: config.min_visual_similarity,
            max_photo_age: Duration::days(config.max_photo_age_days),
            min_photos: config.min_photos,
            config,
        }
    }

    /// Allowed regions (normalized) for a crop, if the crop is listed.
    pub fn allowed_regions(&self, crop: &str) -> Option<&[String]> {
        self.valid_regions.get(&normalize(crop)).map(Vec::as_slice)
    }

    /// Maximum kg per acre for a crop, if the crop is listed.
    pub fn max_yield_per_acre(&self, crop: &str) -> Option<f64> {
        self.max_yield_per_acre.get(&normalize(crop)).copied()
    }

    pub fn gps_tolerance_km(&self) -> f64 {
        self.gps_tolerance_km
    }

    pub fn min_visual_similarity(&self) -> f64 {
        self.min_visual_similarity
    }

    pub fn max_photo_age(&self) -> Duration {
        self.max_photo_age
    }

    pub fn min_photos(&self) -> usize {
        self.min_photos
    }

    /// The configuration this policy was built from.
    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }
}

impl Default for FraudPolicy {
    fn default() -> Self {
        Self::build(PolicyConfig::default())
    }
}

/// Publishes the current policy to concurrent readers.
///
/// Readers take an `Arc` snapshot and keep using it for the whole
/// evaluation; `replace` swaps in a new policy without mutating any table a
/// reader may still hold.
#[derive(Debug)]
pub struct PolicyStore {
    current: RwLock<Arc<FraudPolicy>>,
}

impl PolicyStore {
    pub fn new(policy: FraudPolicy) -> Self {
        Self {
            current: RwLock::new(Arc::new(policy)),
        }
    }

    /// The policy in effect right now.
    pub fn snapshot(&self) -> Arc<FraudPolicy> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Swap in a new policy, returning the previous one.
    pub fn replace(&self, policy: FraudPolicy) -> Arc<FraudPolicy> {
        let next = Arc::new(policy);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tracing::info!(event = "policy.replaced", "fraud policy replaced");
        std::mem::replace(&mut *guard, next)
    }
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new(FraudPolicy::default())
    }
}
