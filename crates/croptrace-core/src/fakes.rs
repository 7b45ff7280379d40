//! In-memory fakes for external collaborators (testing only).
//!
//! Provides `MemoryLedger`, `StaticVectorProvider` and
//! `FixedShelfLifeEstimator`, each of which can be switched into an
//! "unreachable" mode to exercise `DependencyUnavailable` handling.
//! `PhotoSpec` writes minimal TIFF images carrying capture metadata.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};

use crate::canonical;
use crate::domain::{CroptraceError, Dependency, FeatureVector, ProvenanceRecord, Result};
use crate::ledger::{LedgerClient, TransactionId};
use crate::providers::{FeatureVectorProvider, FreshnessAssessment, ShelfLifeEstimator};

// ---------------------------------------------------------------------------
// MemoryLedger
// ---------------------------------------------------------------------------

/// Ledger backed by a `HashMap<batch_id, record>`.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: Mutex<HashMap<String, ProvenanceRecord>>,
    next_tx: AtomicU64,
    unreachable: AtomicBool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `DependencyUnavailable`.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Overwrite an anchored record, simulating tampering.
    pub fn tamper(&self, record: ProvenanceRecord) {
        let mut records = self.records.lock().unwrap();
        records.insert(record.batch_id().to_string(), record);
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_reachable(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(CroptraceError::unavailable(
                Dependency::Ledger,
                "connection refused",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn submit(&self, record: &ProvenanceRecord) -> Result<TransactionId> {
        self.check_reachable()?;
        let n = self.next_tx.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().unwrap();
        records.insert(record.batch_id().to_string(), record.clone());
        Ok(TransactionId(format!("tx-{n:06}")))
    }

    async fn fetch(&self, batch_id: &str) -> Result<Option<ProvenanceRecord>> {
        self.check_reachable()?;
        let records = self.records.lock().unwrap();
        Ok(records.get(batch_id).cloned())
    }
}

// ---------------------------------------------------------------------------
// StaticVectorProvider
// ---------------------------------------------------------------------------

/// Returns a pre-registered vector per photo (keyed by content digest),
/// falling back to a default vector.
#[derive(Debug)]
pub struct StaticVectorProvider {
    by_digest: HashMap<String, FeatureVector>,
    default: FeatureVector,
    unreachable: AtomicBool,
    calls: AtomicU64,
}

impl StaticVectorProvider {
    pub fn new(default: FeatureVector) -> Self {
        Self {
            by_digest: HashMap::new(),
            default,
            unreachable: AtomicBool::new(false),
            calls: AtomicU64::new(0),
        }
    }

    /// Register the vector returned for a specific photo.
    pub fn with_photo(mut self, photo: &[u8], vector: FeatureVector) -> Self {
        self.by_digest.insert(canonical::digest(photo), vector);
        self
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Number of `vectorize` calls made so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeatureVectorProvider for StaticVectorProvider {
    async fn vectorize(&self, image: &[u8]) -> Result<FeatureVector> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(CroptraceError::unavailable(
                Dependency::FeatureVectorProvider,
                "model service timed out",
            ));
        }
        Ok(self
            .by_digest
            .get(&canonical::digest(image))
            .cloned()
            .unwrap_or_else(|| self.default.clone()))
    }
}

// ---------------------------------------------------------------------------
// FixedShelfLifeEstimator
// ---------------------------------------------------------------------------

/// Returns the same assessment for every photo.
#[derive(Debug)]
pub struct FixedShelfLifeEstimator {
    assessment: FreshnessAssessment,
    unreachable: AtomicBool,
}

impl FixedShelfLifeEstimator {
    pub fn new(assessment: FreshnessAssessment) -> Self {
        Self {
            assessment,
            unreachable: AtomicBool::new(false),
        }
    }

    /// Assessment with the given shelf life and otherwise neutral values.
    pub fn days(days: u32) -> Self {
        Self::new(FreshnessAssessment {
            freshness_score: 92,
            quality_grade: "A".to_string(),
            estimated_shelf_life_days: days,
            visual_defects: Vec::new(),
        })
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }
}

#[async_trait]
impl ShelfLifeEstimator for FixedShelfLifeEstimator {
    async fn assess(&self, _image: &[u8]) -> Result<FreshnessAssessment> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(CroptraceError::unavailable(
                Dependency::ShelfLifeEstimator,
                "invalid JSON from model",
            ));
        }
        Ok(self.assessment.clone())
    }
}

// ---------------------------------------------------------------------------
// PhotoSpec
// ---------------------------------------------------------------------------

/// Degrees, minutes, seconds and hemisphere reference.
pub type Dms = (u32, u32, f64, &'static str);

/// Capture metadata to embed in a synthetic photo.
#[derive(Debug, Clone, Default)]
pub struct PhotoSpec {
    pub make: Option<&'static str>,
    /// EXIF-formatted `DateTimeOriginal`, e.g. `2026:10:15 09:45:00`.
    pub datetime: Option<String>,
    pub latitude: Option<Dms>,
    pub longitude: Option<Dms>,
    /// Free text; distinct descriptions yield distinct photo digests.
    pub description: Option<&'static str>,
}

fn ascii(tag: Tag, text: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    }
}

fn dms(tag: Tag, (deg, min, sec, _): Dms) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Rational(vec![
            Rational { num: deg, denom: 1 },
            Rational { num: min, denom: 1 },
            Rational {
                num: (sec * 1000.0).round() as u32,
                denom: 1000,
            },
        ]),
    }
}

impl PhotoSpec {
    /// Serialize as a big-endian TIFF container.
    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, exif::Error> {
        let mut fields = Vec::new();
        if let Some(make) = self.make {
            fields.push(ascii(Tag::Make, make));
        }
        if let Some(description) = self.description {
            fields.push(ascii(Tag::ImageDescription, description));
        }
        if let Some(datetime) = &self.datetime {
            fields.push(ascii(Tag::DateTimeOriginal, datetime));
        }
        if let Some(latitude) = self.latitude {
            fields.push(dms(Tag::GPSLatitude, latitude));
            fields.push(ascii(Tag::GPSLatitudeRef, latitude.3));
        }
        if let Some(longitude) = self.longitude {
            fields.push(dms(Tag::GPSLongitude, longitude));
            fields.push(ascii(Tag::GPSLongitudeRef, longitude.3));
        }

        let mut writer = Writer::new();
        for field in &fields {
            writer.push_field(field);
        }
        let mut out = Cursor::new(Vec::new());
        writer.write(&mut out, false)?;
        Ok(out.into_inner())
    }
}
