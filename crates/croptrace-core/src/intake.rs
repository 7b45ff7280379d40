//! Batch intake orchestration.
//!
//! Wires the pure pipeline (validation → metadata inspection → fraud
//! aggregation → provenance record) to its external collaborators:
//! feature-vector provider, shelf-life estimator and ledger client.
//!
//! Collaborator failures surface as `DependencyUnavailable`, never as fraud
//! flags. The one documented fallback is the shelf-life estimate, governed
//! by [`IntakeConfig::freshness_fallback`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Days, Utc};
use serde::Serialize;
use tracing::Instrument;

use crate::aggregator::{FraudAggregator, FraudDecision};
use crate::domain::{
    BatchClaim, CaptureEvidence, CroptraceError, Dependency, EvidenceSet, FeatureVector,
    ProvenanceRecord, Result, ValidationError,
};
use crate::ledger::{self, LedgerClient, TransactionId};
use crate::metrics::METRICS;
use crate::obs;
use crate::policy::PolicyStore;
use crate::provenance::{build_record_at, record_digest};
use crate::providers::{FeatureVectorProvider, FreshnessAssessment, ShelfLifeEstimator};

/// A batch as submitted: asserted facts plus raw photos.
#[derive(Debug, Clone)]
pub struct BatchSubmission {
    pub claim: BatchClaim,
    /// Raw photo bytes in submission order; the first is the primary photo.
    pub photos: Vec<Vec<u8>>,
    /// Embedding captured at the originating stage, if one exists.
    pub reference_vector: Option<FeatureVector>,
}

/// Orchestration settings.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeConfig {
    /// Assessment used when the shelf-life estimator is unreachable.
    /// `None` propagates the outage instead.
    pub freshness_fallback: Option<FreshnessAssessment>,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            freshness_fallback: Some(FreshnessAssessment::fallback()),
        }
    }
}

/// An accepted and anchored batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdmittedBatch {
    pub record: ProvenanceRecord,
    /// `record_digest(record)`, the pre-anchoring content hash.
    pub content_digest: String,
    pub transaction_id: TransactionId,
    pub freshness: FreshnessAssessment,
    pub decision: FraudDecision,
}

/// Result of a completed intake.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IntakeOutcome {
    /// Rejected; nothing was built or anchored.
    Flagged { decision: FraudDecision },
    Admitted(Box<AdmittedBatch>),
}

impl IntakeOutcome {
    pub fn decision(&self) -> &FraudDecision {
        match self {
            IntakeOutcome::Flagged { decision } => decision,
            IntakeOutcome::Admitted(batch) => &batch.decision,
        }
    }
}

/// Reject photo sets that are too small or contain byte-identical photos.
pub fn validate_photo_set(
    photos: &[CaptureEvidence],
    min_photos: usize,
) -> std::result::Result<(), ValidationError> {
    if photos.len() < min_photos {
        return Err(ValidationError::TooFewPhotos {
            required: min_photos,
            actual: photos.len(),
        });
    }
    let mut seen: HashMap<&str, usize> = HashMap::with_capacity(photos.len());
    for (position, photo) in photos.iter().enumerate() {
        if let Some(first) = seen.insert(photo.content_digest.as_str(), position) {
            return Err(ValidationError::DuplicatePhoto {
                first,
                second: position,
            });
        }
    }
    Ok(())
}

/// Short random batch identifier (8 lower-case hex characters).
pub fn generate_batch_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

fn report_outage(err: CroptraceError) -> CroptraceError {
    if let CroptraceError::DependencyUnavailable { dependency, .. } = &err {
        METRICS.inc_dependency_failures();
        obs::emit_dependency_unavailable(*dependency, &err);
    }
    err
}

/// Admits batches into the provenance ledger.
pub struct BatchIntake {
    policy: Arc<PolicyStore>,
    vectors: Arc<dyn FeatureVectorProvider>,
    freshness: Arc<dyn ShelfLifeEstimator>,
    ledger: Arc<dyn LedgerClient>,
    config: IntakeConfig,
}

impl BatchIntake {
    pub fn new(
        policy: Arc<PolicyStore>,
        vectors: Arc<dyn FeatureVectorProvider>,
        freshness: Arc<dyn ShelfLifeEstimator>,
        ledger: Arc<dyn LedgerClient>,
    ) -> Self {
        Self {
            policy,
            vectors,
            freshness,
            ledger,
            config: IntakeConfig::default(),
        }
    }

    pub fn with_config(mut self, config: IntakeConfig) -> Self {
        self.config = config;
        self
    }

    /// Run a submission through the full pipeline as of now.
    pub async fn admit(&self, submission: &BatchSubmission) -> Result<IntakeOutcome> {
        self.admit_at(submission, Utc::now()).await
    }

    /// Run a submission through the full pipeline as of `now`.
    ///
    /// Input errors return `Validation`; collaborator outages return
    /// `DependencyUnavailable`. A flagged batch is `Ok(Flagged)` and
    /// never reaches the ledger.
    pub async fn admit_at(
        &self,
        submission: &BatchSubmission,
        now: DateTime<Utc>,
    ) -> Result<IntakeOutcome> {
        let policy = self.policy.snapshot();
        let claim = &submission.claim;
        claim.validate()?;

        let mut photos: Vec<CaptureEvidence> = submission
            .photos
            .iter()
            .map(|bytes| CaptureEvidence::from_photo(bytes))
            .collect();
        validate_photo_set(&photos, policy.min_photos())?;

        // Only the primary photo is compared against the reference.
        if !claim.stage.is_originating() {
            if let (Some(primary), Some(bytes)) = (photos.first_mut(), submission.photos.first()) {
                let vector = self
                    .vectors
                    .vectorize(bytes)
                    .await
                    .map_err(report_outage)?;
                primary.feature_vector = Some(vector);
            }
        }

        let evidence = EvidenceSet {
            photos,
            reference_vector: submission.reference_vector.clone(),
        };
        let decision = FraudAggregator::new(policy).evaluate_at(claim, &evidence, claim.stage, now);
        if decision.flagged() {
            return Ok(IntakeOutcome::Flagged { decision });
        }

        let batch_id = generate_batch_id();
        let span = obs::batch_span(&batch_id);
        self.anchor(submission, decision, batch_id, now)
            .instrument(span)
            .await
    }

    async fn anchor(
        &self,
        submission: &BatchSubmission,
        decision: FraudDecision,
        batch_id: String,
        now: DateTime<Utc>,
    ) -> Result<IntakeOutcome> {
        let claim = &submission.claim;
        let primary = submission.photos.first().map(Vec::as_slice).unwrap_or_default();
        let freshness = self.assess_freshness(primary).await?;

        let expiry_date = now
            .date_naive()
            .checked_add_days(Days::new(u64::from(freshness.estimated_shelf_life_days)))
            .ok_or(ValidationError::ShelfLifeOutOfRange {
                days: freshness.estimated_shelf_life_days,
            })?;

        let record = build_record_at(
            &batch_id,
            &claim.crop_type,
            claim.coordinate,
            &claim.region,
            expiry_date,
            now,
        );
        let content_digest = record_digest(&record);

        let transaction_id = self.ledger.submit(&record).await.map_err(report_outage)?;
        METRICS.inc_records_anchored();
        obs::emit_record_anchored(record.batch_id(), &transaction_id.0);

        Ok(IntakeOutcome::Admitted(Box::new(AdmittedBatch {
            record,
            content_digest,
            transaction_id,
            freshness,
            decision,
        })))
    }

    async fn assess_freshness(&self, primary: &[u8]) -> Result<FreshnessAssessment> {
        match self.freshness.assess(primary).await {
            Ok(assessment) => Ok(assessment),
            Err(err) if err.is_retryable() => {
                let err = report_outage(err);
                match &self.config.freshness_fallback {
                    Some(fallback) => {
                        obs::emit_fallback_applied(
                            Dependency::ShelfLifeEstimator,
                            &format!("{} days", fallback.estimated_shelf_life_days),
                        );
                        Ok(fallback.clone())
                    }
                    None => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Confirm the ledger holds exactly `expected`.
    pub async fn verify_anchored(&self, expected: &ProvenanceRecord) -> Result<()> {
        ledger::verify_anchored(self.ledger.as_ref(), expected)
            .await
            .map_err(report_outage)
    }
}
