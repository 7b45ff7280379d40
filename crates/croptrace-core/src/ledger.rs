//! Ledger client interface and read-back verification.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{CroptraceError, ProvenanceRecord, Result};
use crate::provenance::record_digest;

/// Identifier returned by the ledger for an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tamper-evident ledger the accepted records are anchored in.
///
/// Submissions may fail transiently; the core does not retry them.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Anchor a record and return the ledger's transaction id.
    async fn submit(&self, record: &ProvenanceRecord) -> Result<TransactionId>;

    /// Read back the record anchored for `batch_id`, if any.
    async fn fetch(&self, batch_id: &str) -> Result<Option<ProvenanceRecord>>;
}

/// Confirm the ledger holds exactly `expected`.
///
/// Returns `RecordNotFound` when nothing is anchored for the batch and
/// `DigestMismatch` when the anchored fields differ.
pub async fn verify_anchored(ledger: &dyn LedgerClient, expected: &ProvenanceRecord) -> Result<()> {
    let anchored = ledger
        .fetch(expected.batch_id())
        .await?
        .ok_or_else(|| CroptraceError::RecordNotFound(expected.batch_id().to_string()))?;

    let expected_digest = record_digest(expected);
    let actual_digest = record_digest(&anchored);
    if expected_digest != actual_digest {
        return Err(CroptraceError::DigestMismatch {
            expected: expected_digest,
            actual: actual_digest,
        });
    }
    Ok(())
}
