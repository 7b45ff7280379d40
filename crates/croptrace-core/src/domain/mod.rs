//! Domain models for croptrace.
//!
//! Canonical definitions for the core entities:
//! - `BatchClaim`: asserted facts of a submission
//! - `CaptureEvidence` / `EvidenceSet`: photos and their extracted metadata
//! - `ProvenanceRecord`: public facts of an accepted batch

pub mod claim;
pub mod error;
pub mod evidence;
pub mod record;

pub use claim::{ActorRole, BatchClaim, Coordinate, LifecycleStage};
pub use error::{CroptraceError, Dependency, Result, ValidationError};
pub use evidence::{CaptureEvidence, CaptureMetadata, EvidenceSet, FeatureVector};
pub use record::ProvenanceRecord;
