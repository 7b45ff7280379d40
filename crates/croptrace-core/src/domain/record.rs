//! The provenance record handed to the ledger client.

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::error::ValidationError;

/// Public facts of an accepted batch.
///
/// Wire shape is exactly `batchId`, `cropType`, `originHash`, `expiryDate`
/// (`YYYY-MM-DD`) and `timestamp` (`YYYY-MM-DDTHH:MM:SSZ`). Fields are
/// read-only once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProvenanceRecord {
    batch_id: String,
    crop_type: String,
    origin_hash: String,
    expiry_date: NaiveDate,
    #[serde(with = "iso_utc")]
    timestamp: DateTime<Utc>,
}

impl ProvenanceRecord {
    pub(crate) fn new(
        batch_id: String,
        crop_type: &str,
        origin_hash: String,
        expiry_date: NaiveDate,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            batch_id,
            crop_type: crop_type.trim().to_lowercase(),
            origin_hash,
            expiry_date,
            timestamp: timestamp.trunc_subsecs(0),
        }
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    pub fn crop_type(&self) -> &str {
        &self.crop_type
    }

    pub fn origin_hash(&self) -> &str {
        &self.origin_hash
    }

    pub fn expiry_date(&self) -> NaiveDate {
        self.expiry_date
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The wire mapping of this record.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("batchId".into(), Value::String(self.batch_id.clone()));
        fields.insert("cropType".into(), Value::String(self.crop_type.clone()));
        fields.insert("originHash".into(), Value::String(self.origin_hash.clone()));
        fields.insert(
            "expiryDate".into(),
            Value::String(self.expiry_date.format("%Y-%m-%d").to_string()),
        );
        fields.insert(
            "timestamp".into(),
            Value::String(iso_utc::format(&self.timestamp)),
        );
        fields
    }

    /// Parse and validate a wire mapping, e.g. one fetched from the ledger.
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, ValidationError> {
        let record: ProvenanceRecord = serde_json::from_value(Value::Object(fields.clone()))
            .map_err(|e| ValidationError::InvalidRecordField {
                field: "record",
                reason: e.to_string(),
            })?;
        record.validate()?;
        Ok(record)
    }

    /// Check the record-level invariants that serde alone cannot express.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.batch_id.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "batchId" });
        }
        if self.crop_type.is_empty() || self.crop_type != self.crop_type.to_lowercase() {
            return Err(ValidationError::InvalidRecordField {
                field: "cropType",
                reason: format!("'{}' must be non-empty lower-case text", self.crop_type),
            });
        }
        if !is_valid_hex_digest(&self.origin_hash) {
            return Err(ValidationError::InvalidRecordField {
                field: "originHash",
                reason: format!(
                    "'{}' is not a valid 64-char lowercase hex string",
                    self.origin_hash
                ),
            });
        }
        Ok(())
    }
}

pub(crate) fn is_valid_hex_digest(s: &str) -> bool {
    s.len() == 64
        && s.chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

/// Second-precision RFC 3339 timestamps with a trailing `Z`.
mod iso_utc {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if !raw.ends_with('Z') {
            return Err(serde::de::Error::custom(format!(
                "timestamp '{raw}' must carry a trailing 'Z'"
            )));
        }
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
