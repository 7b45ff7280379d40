//! Provenance record construction and content digests.
//!
//! `record_digest` is the pre-anchoring content hash handed to the ledger
//! client. Any verifier holding the same five wire fields recomputes it
//! byte-for-byte.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};

use crate::canonical;
use crate::domain::{Coordinate, CroptraceError, ProvenanceRecord, Result};
use crate::metrics::METRICS;
use crate::obs;

/// Build a record for an accepted batch, stamped with the current time.
pub fn build_record(
    batch_id: &str,
    crop_type: &str,
    coordinate: Coordinate,
    region: &str,
    expiry_date: NaiveDate,
) -> ProvenanceRecord {
    build_record_at(batch_id, crop_type, coordinate, region, expiry_date, Utc::now())
}

/// Build a record stamped with `timestamp` (truncated to whole seconds).
///
/// The raw coordinate only ever reaches the record through the origin
/// digest.
pub fn build_record_at(
    batch_id: &str,
    crop_type: &str,
    coordinate: Coordinate,
    region: &str,
    expiry_date: NaiveDate,
    timestamp: DateTime<Utc>,
) -> ProvenanceRecord {
    let origin_hash = canonical::origin_digest(coordinate.latitude, coordinate.longitude, region);
    let record = ProvenanceRecord::new(
        batch_id.to_string(),
        crop_type,
        origin_hash,
        expiry_date,
        timestamp,
    );
    METRICS.inc_records_built();
    obs::emit_record_built(record.batch_id(), &record_digest(&record));
    record
}

/// Canonical SHA-256 digest of a record's wire fields.
pub fn record_digest(record: &ProvenanceRecord) -> String {
    canonical::digest_fields(&record.to_fields())
}

/// Whether `fields` digest to `expected_hash`.
pub fn verify_record(fields: &Map<String, Value>, expected_hash: &str) -> bool {
    canonical::digest_fields(fields) == expected_hash.trim().to_ascii_lowercase()
}

/// Check a record against an expected digest, reporting both on mismatch.
pub fn verify_record_digest(record: &ProvenanceRecord, expected: &str) -> Result<()> {
    let actual = record_digest(record);
    if actual == expected.trim().to_ascii_lowercase() {
        Ok(())
    } else {
        Err(CroptraceError::DigestMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}
