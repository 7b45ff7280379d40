use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use croptrace_core::fakes::{
    FixedShelfLifeEstimator, MemoryLedger, PhotoSpec, StaticVectorProvider,
};
use croptrace_core::{
    build_record, origin_digest, record_digest, verify_record, ActorRole, BatchClaim,
    BatchIntake, BatchSubmission, Coordinate, CroptraceError, Dependency, FeatureVector,
    FreshnessAssessment, IntakeConfig, IntakeOutcome, LedgerClient, LifecycleStage, PolicyStore,
    ValidationError,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-10-19T12:00:00.750Z")
        .expect("parse timestamp")
        .with_timezone(&Utc)
}

struct Harness {
    ledger: Arc<MemoryLedger>,
    vectors: Arc<StaticVectorProvider>,
    freshness: Arc<FixedShelfLifeEstimator>,
    intake: BatchIntake,
}

fn harness() -> Harness {
    let ledger = Arc::new(MemoryLedger::new());
    let vectors = Arc::new(StaticVectorProvider::new(FeatureVector(vec![1.0, 0.0, 0.0])));
    let freshness = Arc::new(FixedShelfLifeEstimator::days(10));
    let intake = BatchIntake::new(
        Arc::new(PolicyStore::default()),
        vectors.clone(),
        freshness.clone(),
        ledger.clone(),
    );
    Harness {
        ledger,
        vectors,
        freshness,
        intake,
    }
}

fn photo(description: &'static str) -> Vec<u8> {
    PhotoSpec {
        make: Some("Canon"),
        datetime: Some("2026:10:18 09:00:00".to_string()),
        latitude: Some((30, 54, 0.0, "N")),
        longitude: Some((75, 51, 0.0, "E")),
        description: Some(description),
    }
    .to_bytes()
    .expect("write photo")
}

fn wheat_submission() -> BatchSubmission {
    BatchSubmission {
        claim: BatchClaim {
            crop_type: "Wheat".to_string(),
            quantity_kg: 1000.0,
            land_area_acres: 1.0,
            region: "Punjab".to_string(),
            coordinate: Coordinate::new(30.9, 75.85).expect("coordinate"),
            actor_role: ActorRole::Farmer,
            stage: LifecycleStage::Harvested,
        },
        photos: vec![photo("field"), photo("sacks")],
        reference_vector: None,
    }
}

fn admitted(outcome: IntakeOutcome) -> croptrace_core::AdmittedBatch {
    match outcome {
        IntakeOutcome::Admitted(batch) => *batch,
        IntakeOutcome::Flagged { decision } => {
            panic!("expected admission, got reasons {:?}", decision.reasons())
        }
    }
}

// ---------------------------------------------------------------------------
// Admission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn clean_batch_is_anchored() {
    let h = harness();

    let batch = admitted(
        h.intake
            .admit_at(&wheat_submission(), now())
            .await
            .expect("admit"),
    );

    assert_eq!(batch.record.batch_id().len(), 8);
    assert_eq!(batch.record.crop_type(), "wheat");
    assert_eq!(
        batch.record.origin_hash(),
        origin_digest(30.9, 75.85, "Punjab")
    );
    assert_eq!(
        batch.record.expiry_date(),
        NaiveDate::from_ymd_opt(2026, 10, 29).expect("date")
    );
    assert_eq!(batch.record.timestamp().timestamp_subsec_nanos(), 0);
    assert_eq!(batch.content_digest, record_digest(&batch.record));
    assert_eq!(batch.transaction_id.0, "tx-000000");
    assert!(!batch.decision.flagged());

    let anchored = h
        .ledger
        .fetch(batch.record.batch_id())
        .await
        .expect("fetch")
        .expect("anchored record");
    assert!(verify_record(&anchored.to_fields(), &batch.content_digest));
    h.intake
        .verify_anchored(&batch.record)
        .await
        .expect("verify anchored");
}

#[tokio::test]
async fn flagged_batch_never_reaches_the_ledger() {
    let h = harness();
    let mut submission = wheat_submission();
    submission.claim.quantity_kg = 5000.0;

    let outcome = h
        .intake
        .admit_at(&submission, now())
        .await
        .expect("admit");

    assert!(matches!(outcome, IntakeOutcome::Flagged { .. }));
    assert!(outcome.decision().flagged());
    assert!(h.ledger.is_empty());
}

#[tokio::test]
async fn later_stage_compares_against_reference() {
    let h = harness();
    let mut submission = wheat_submission();
    submission.claim.actor_role = ActorRole::Distributor;
    submission.claim.stage = LifecycleStage::InTransit;
    submission.reference_vector = Some(FeatureVector(vec![0.0, 1.0, 0.0]));

    let outcome = h
        .intake
        .admit_at(&submission, now())
        .await
        .expect("admit");
    assert_eq!(
        outcome.decision().reasons(),
        ["Image similarity too low (0.00)"]
    );

    submission.reference_vector = Some(FeatureVector(vec![1.0, 0.0, 0.0]));
    let outcome = h
        .intake
        .admit_at(&submission, now())
        .await
        .expect("admit");
    assert!(matches!(outcome, IntakeOutcome::Admitted(_)));
    assert_eq!(h.ledger.len(), 1);
}

// ---------------------------------------------------------------------------
// Input validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn too_few_photos_is_a_validation_error() {
    let h = harness();
    let mut submission = wheat_submission();
    submission.photos.truncate(1);

    let err = h
        .intake
        .admit_at(&submission, now())
        .await
        .expect_err("one photo");

    assert!(matches!(
        err,
        CroptraceError::Validation(ValidationError::TooFewPhotos {
            required: 2,
            actual: 1
        })
    ));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn duplicate_photos_are_rejected() {
    let h = harness();
    let mut submission = wheat_submission();
    submission.photos[1] = submission.photos[0].clone();

    let err = h
        .intake
        .admit_at(&submission, now())
        .await
        .expect_err("duplicate");

    assert!(matches!(
        err,
        CroptraceError::Validation(ValidationError::DuplicatePhoto {
            first: 0,
            second: 1
        })
    ));
}

#[tokio::test]
async fn invalid_claim_is_rejected_before_evaluation() {
    let h = harness();
    let mut submission = wheat_submission();
    submission.claim.land_area_acres = 0.0;

    let err = h
        .intake
        .admit_at(&submission, now())
        .await
        .expect_err("zero area");

    assert!(matches!(
        err,
        CroptraceError::Validation(ValidationError::InvalidNumber {
            field: "land_area_acres",
            ..
        })
    ));
    assert!(h.ledger.is_empty());
}

// ---------------------------------------------------------------------------
// Collaborator outages
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ledger_outage_is_retryable_not_a_flag() {
    let h = harness();
    h.ledger.set_unreachable(true);

    let err = h
        .intake
        .admit_at(&wheat_submission(), now())
        .await
        .expect_err("ledger down");

    assert!(err.is_retryable());
    assert!(matches!(
        err,
        CroptraceError::DependencyUnavailable {
            dependency: Dependency::Ledger,
            ..
        }
    ));
}

#[tokio::test]
async fn vector_provider_outage_is_retryable() {
    let h = harness();
    h.vectors.set_unreachable(true);
    let mut submission = wheat_submission();
    submission.claim.stage = LifecycleStage::Retail;

    let err = h
        .intake
        .admit_at(&submission, now())
        .await
        .expect_err("provider down");

    assert!(matches!(
        err,
        CroptraceError::DependencyUnavailable {
            dependency: Dependency::FeatureVectorProvider,
            ..
        }
    ));
}

#[tokio::test]
async fn originating_stage_never_calls_vector_provider() {
    let h = harness();
    h.vectors.set_unreachable(true);

    let outcome = h
        .intake
        .admit_at(&wheat_submission(), now())
        .await
        .expect("admit");

    assert!(matches!(outcome, IntakeOutcome::Admitted(_)));
    assert_eq!(h.vectors.calls(), 0);
}

#[tokio::test]
async fn later_stage_vectorizes_only_the_primary_photo() {
    let h = harness();
    let mut submission = wheat_submission();
    submission.claim.stage = LifecycleStage::Processing;
    submission.photos.push(photo("crates"));
    submission.reference_vector = Some(FeatureVector(vec![1.0, 0.0, 0.0]));

    let outcome = h
        .intake
        .admit_at(&submission, now())
        .await
        .expect("admit");

    assert!(matches!(outcome, IntakeOutcome::Admitted(_)));
    assert_eq!(h.vectors.calls(), 1);
}

#[tokio::test]
async fn shelf_life_outage_uses_fallback() {
    let h = harness();
    h.freshness.set_unreachable(true);

    let batch = admitted(
        h.intake
            .admit_at(&wheat_submission(), now())
            .await
            .expect("admit"),
    );

    assert_eq!(batch.freshness, FreshnessAssessment::fallback());
    assert_eq!(
        batch.record.expiry_date(),
        NaiveDate::from_ymd_opt(2026, 10, 23).expect("date")
    );
}

#[tokio::test]
async fn shelf_life_outage_without_fallback_propagates() {
    let h = harness();
    h.freshness.set_unreachable(true);
    let intake = h.intake.with_config(IntakeConfig {
        freshness_fallback: None,
    });

    let err = intake
        .admit_at(&wheat_submission(), now())
        .await
        .expect_err("estimator down");

    assert!(matches!(
        err,
        CroptraceError::DependencyUnavailable {
            dependency: Dependency::ShelfLifeEstimator,
            ..
        }
    ));
    assert!(h.ledger.is_empty());
}

#[tokio::test]
async fn calendar_overflowing_shelf_life_is_not_retryable() {
    let ledger = Arc::new(MemoryLedger::new());
    let intake = BatchIntake::new(
        Arc::new(PolicyStore::default()),
        Arc::new(StaticVectorProvider::new(FeatureVector(vec![1.0]))),
        Arc::new(FixedShelfLifeEstimator::days(u32::MAX)),
        ledger.clone(),
    );

    let err = intake
        .admit_at(&wheat_submission(), now())
        .await
        .expect_err("expiry overflows");

    assert!(matches!(
        err,
        CroptraceError::Validation(ValidationError::ShelfLifeOutOfRange { days: u32::MAX })
    ));
    assert!(!err.is_retryable());
    assert!(ledger.is_empty());
}

// ---------------------------------------------------------------------------
// Anchored read-back
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tampered_record_fails_verification() {
    let h = harness();
    let batch = admitted(
        h.intake
            .admit_at(&wheat_submission(), now())
            .await
            .expect("admit"),
    );

    let forged = build_record(
        batch.record.batch_id(),
        "wheat",
        Coordinate::new(31.5, 75.85).expect("coordinate"),
        "Punjab",
        batch.record.expiry_date(),
    );
    h.ledger.tamper(forged);

    let err = h
        .intake
        .verify_anchored(&batch.record)
        .await
        .expect_err("tampered");
    match err {
        CroptraceError::DigestMismatch { expected, actual } => {
            assert_eq!(expected, batch.content_digest);
            assert_ne!(actual, expected);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unanchored_record_is_not_found() {
    let h = harness();
    let record = build_record(
        "deadbeef",
        "wheat",
        Coordinate::new(30.9, 75.85).expect("coordinate"),
        "Punjab",
        NaiveDate::from_ymd_opt(2026, 10, 29).expect("date"),
    );

    let err = h
        .intake
        .verify_anchored(&record)
        .await
        .expect_err("missing");

    assert!(matches!(err, CroptraceError::RecordNotFound(id) if id == "deadbeef"));
}

#[tokio::test]
async fn policy_replacement_applies_to_next_admission() {
    let store = Arc::new(PolicyStore::default());
    let ledger = Arc::new(MemoryLedger::new());
    let intake = BatchIntake::new(
        store.clone(),
        Arc::new(StaticVectorProvider::new(FeatureVector(vec![1.0]))),
        Arc::new(FixedShelfLifeEstimator::days(5)),
        ledger.clone(),
    );
    let submission = wheat_submission();

    let outcome = intake.admit_at(&submission, now()).await.expect("admit");
    assert!(matches!(outcome, IntakeOutcome::Admitted(_)));

    let config = croptrace_core::PolicyConfig {
        min_photos: 3,
        ..Default::default()
    };
    store.replace(croptrace_core::FraudPolicy::from_config(config).expect("policy"));

    let err = intake
        .admit_at(&submission, now())
        .await
        .expect_err("needs three photos");
    assert!(matches!(
        err,
        CroptraceError::Validation(ValidationError::TooFewPhotos { required: 3, .. })
    ));
    assert_eq!(ledger.len(), 1);
}
