//! croptrace core library
//!
//! Batch integrity and provenance pipeline for agricultural supply chains:
//! fraud-signal evaluation, aggregation into an admit/reject decision, and
//! canonical content digests for ledger anchoring.

pub mod aggregator;
pub mod canonical;
pub mod capture;
pub mod domain;
pub mod fakes;
pub mod geo;
pub mod intake;
pub mod ledger;
pub mod metrics;
pub mod obs;
pub mod policy;
pub mod provenance;
pub mod providers;
pub mod signals;
pub mod telemetry;

pub use domain::{
    ActorRole, BatchClaim, CaptureEvidence, CaptureMetadata, Coordinate, CroptraceError,
    Dependency, EvidenceSet, FeatureVector, LifecycleStage, ProvenanceRecord, Result,
    ValidationError,
};

pub use aggregator::{FraudAggregator, FraudDecision};
pub use canonical::{canonical_json, canonicalize, digest, digest_fields, origin_digest};
pub use geo::distance_km;
pub use intake::{
    validate_photo_set, AdmittedBatch, BatchIntake, BatchSubmission, IntakeConfig, IntakeOutcome,
};
pub use ledger::{verify_anchored, LedgerClient, TransactionId};
pub use policy::{FraudPolicy, PolicyConfig, PolicyStore};
pub use provenance::{
    build_record, build_record_at, record_digest, verify_record, verify_record_digest,
};
pub use providers::{FeatureVectorProvider, FreshnessAssessment, ShelfLifeEstimator};
pub use signals::{cosine_similarity, Signal, SignalVerdict};

pub use metrics::METRICS;
pub use obs::BatchSpan;
pub use telemetry::init_tracing;

/// croptrace version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
