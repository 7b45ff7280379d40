//! Farmer- and handler-asserted batch facts.

use serde::{Deserialize, Serialize};

use crate::domain::error::ValidationError;

/// A point on the Earth's surface in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Construct a coordinate, rejecting non-finite or out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        let coordinate = Self {
            latitude,
            longitude,
        };
        coordinate.validate()?;
        Ok(coordinate)
    }

    /// Check `latitude ∈ [-90, 90]` and `longitude ∈ [-180, 180]`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ValidationError::LatitudeOutOfRange(self.latitude));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ValidationError::LongitudeOutOfRange(self.longitude));
        }
        Ok(())
    }
}

/// Who is submitting the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Farmer,
    Processor,
    Distributor,
    Retailer,
}

impl ActorRole {
    /// The life-cycle stage this role normally submits at.
    pub fn default_stage(&self) -> LifecycleStage {
        match self {
            ActorRole::Farmer => LifecycleStage::Harvested,
            ActorRole::Processor => LifecycleStage::Processing,
            ActorRole::Distributor => LifecycleStage::InTransit,
            ActorRole::Retailer => LifecycleStage::Retail,
        }
    }
}

/// Position of a submission in the supply chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    /// The originating stage; the reference feature vector is captured here.
    Harvested,
    Processing,
    InTransit,
    Retail,
}

impl LifecycleStage {
    pub fn is_originating(&self) -> bool {
        matches!(self, LifecycleStage::Harvested)
    }
}

/// The asserted facts of a batch submission.
///
/// Never mutated after submission; a correction is a new claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchClaim {
    pub crop_type: String,
    pub quantity_kg: f64,
    pub land_area_acres: f64,
    pub region: String,
    pub coordinate: Coordinate,
    pub actor_role: ActorRole,
    pub stage: LifecycleStage,
}

impl BatchClaim {
    /// Validate every claim field. Values are never silently corrected.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.crop_type.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "crop_type" });
        }
        if self.region.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "region" });
        }
        if !self.quantity_kg.is_finite() || self.quantity_kg < 0.0 {
            return Err(ValidationError::InvalidNumber {
                field: "quantity_kg",
                value: self.quantity_kg,
                reason: "must be a finite, non-negative number",
            });
        }
        if !self.land_area_acres.is_finite() || self.land_area_acres <= 0.0 {
            return Err(ValidationError::InvalidNumber {
                field: "land_area_acres",
                value: self.land_area_acres,
                reason: "must be a finite, positive number",
            });
        }
        self.coordinate.validate()
    }
}
