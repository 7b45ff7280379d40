//! croptrace - batch integrity and provenance tooling
//!
//! ## Commands
//!
//! - `evaluate`: Run the fraud battery against a claim and its photos
//! - `origin-hash`: Print the origin digest of a coordinate and region
//! - `record`: Build a provenance record and print it with its digest
//! - `digest`: Print the content digest of a record file
//! - `verify`: Check a record file against an expected digest
//! - `policy`: Print the effective fraud policy

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

use croptrace_core::{
    build_record, origin_digest, record_digest, verify_record_digest, BatchClaim, BatchSpan,
    CaptureEvidence, Coordinate, EvidenceSet, FeatureVector, FraudAggregator, FraudDecision,
    FraudPolicy, PolicyConfig, ProvenanceRecord,
};

#[derive(Parser)]
#[command(name = "croptrace")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Batch integrity checks and provenance digests", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Policy file (JSON) overriding the built-in tables and thresholds
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a batch claim against its photos and print the decision
    Evaluate {
        /// Claim file (JSON)
        #[arg(long)]
        claim: PathBuf,

        /// Photo files; the first one is the primary photo
        #[arg(long = "photo", required = true)]
        photos: Vec<PathBuf>,

        /// Reference feature vector from the originating stage (JSON array)
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Feature vector per photo, in photo order (JSON array)
        #[arg(long = "vector")]
        vectors: Vec<PathBuf>,
    },

    /// Print the origin digest of a coordinate and region
    OriginHash {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lng: f64,

        #[arg(long)]
        region: String,
    },

    /// Build a provenance record stamped with the current time
    Record {
        #[arg(long)]
        batch_id: String,

        #[arg(long)]
        crop: String,

        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lng: f64,

        #[arg(long)]
        region: String,

        /// Expiry date (YYYY-MM-DD)
        #[arg(long)]
        expiry: NaiveDate,
    },

    /// Print the content digest of a record file
    Digest {
        /// Record file (JSON wire form)
        #[arg(long)]
        record: PathBuf,
    },

    /// Check a record file against an expected digest (non-zero exit on mismatch)
    Verify {
        #[arg(long)]
        record: PathBuf,

        /// Expected SHA-256 hex digest
        #[arg(long)]
        expected: String,
    },

    /// Print the effective fraud policy
    Policy,
}

#[derive(Serialize)]
struct RecordOutput<'a> {
    record: &'a ProvenanceRecord,
    digest: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    croptrace_core::init_tracing(cli.json, level);

    let policy = load_policy(cli.policy.as_deref())?;

    let result = match cli.command {
        Commands::Evaluate {
            claim,
            photos,
            reference,
            vectors,
        } => cmd_evaluate(policy, &claim, &photos, reference.as_deref(), &vectors),
        Commands::OriginHash { lat, lng, region } => cmd_origin_hash(lat, lng, &region),
        Commands::Record {
            batch_id,
            crop,
            lat,
            lng,
            region,
            expiry,
        } => cmd_record(&batch_id, &crop, lat, lng, &region, expiry),
        Commands::Digest { record } => cmd_digest(&record),
        Commands::Verify { record, expected } => cmd_verify(&record, &expected),
        Commands::Policy => cmd_policy(&policy),
    };
    croptrace_core::METRICS.flush();
    result
}

fn load_policy(path: Option<&Path>) -> Result<FraudPolicy> {
    let Some(path) = path else {
        return Ok(FraudPolicy::default());
    };
    let config = PolicyConfig::from_json_file(path)
        .with_context(|| format!("Failed to load policy file: {:?}", path))?;
    let policy = FraudPolicy::from_config(config)
        .with_context(|| format!("Invalid policy in {:?}", path))?;
    info!(path = %path.display(), "policy loaded");
    Ok(policy)
}

fn cmd_evaluate(
    policy: FraudPolicy,
    claim: &Path,
    photos: &[PathBuf],
    reference: Option<&Path>,
    vectors: &[PathBuf],
) -> Result<()> {
    let claim: BatchClaim = read_json_file(claim)?;
    let decision = evaluate(policy, &claim, photos, reference, vectors)?;
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

fn evaluate(
    policy: FraudPolicy,
    claim: &BatchClaim,
    photos: &[PathBuf],
    reference: Option<&Path>,
    vectors: &[PathBuf],
) -> Result<FraudDecision> {
    claim.validate().context("Invalid claim")?;
    if vectors.len() > photos.len() {
        bail!(
            "{} feature vectors given for {} photos",
            vectors.len(),
            photos.len()
        );
    }

    let mut evidence = Vec::with_capacity(photos.len());
    for path in photos {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read photo: {:?}", path))?;
        evidence.push(CaptureEvidence::from_photo(&bytes));
    }
    for (photo, path) in evidence.iter_mut().zip(vectors) {
        let vector: FeatureVector = read_json_file(path)?;
        photo.feature_vector = Some(vector);
    }

    let mut evidence = EvidenceSet::new(evidence);
    if let Some(path) = reference {
        evidence = evidence.with_reference(read_json_file(path)?);
    }

    let aggregator = FraudAggregator::new(Arc::new(policy));
    Ok(aggregator.evaluate(claim, &evidence, claim.stage))
}

fn cmd_origin_hash(lat: f64, lng: f64, region: &str) -> Result<()> {
    let coordinate = Coordinate::new(lat, lng).context("Invalid coordinate")?;
    println!(
        "{}",
        origin_digest(coordinate.latitude, coordinate.longitude, region)
    );
    Ok(())
}

fn cmd_record(
    batch_id: &str,
    crop: &str,
    lat: f64,
    lng: f64,
    region: &str,
    expiry: NaiveDate,
) -> Result<()> {
    if batch_id.trim().is_empty() {
        bail!("--batch-id must not be empty");
    }
    if crop.trim().is_empty() {
        bail!("--crop must not be empty");
    }
    let coordinate = Coordinate::new(lat, lng).context("Invalid coordinate")?;
    let _span = BatchSpan::enter(batch_id);
    let record = build_record(batch_id, crop, coordinate, region, expiry);
    let output = RecordOutput {
        digest: record_digest(&record),
        record: &record,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cmd_digest(path: &Path) -> Result<()> {
    let record = read_record_file(path)?;
    println!("{}", record_digest(&record));
    Ok(())
}

fn cmd_verify(path: &Path, expected: &str) -> Result<()> {
    let record = read_record_file(path)?;
    verify_record_digest(&record, expected)
        .with_context(|| format!("Record {:?} failed verification", path))?;
    println!("ok {}", record.batch_id());
    Ok(())
}

fn cmd_policy(policy: &FraudPolicy) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(policy.config())?);
    Ok(())
}

fn read_record_file(path: &Path) -> Result<ProvenanceRecord> {
    let fields: Map<String, Value> = read_json_file(path)?;
    ProvenanceRecord::from_fields(&fields).with_context(|| format!("Invalid record in {:?}", path))
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSON file: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use croptrace_core::{ActorRole, LifecycleStage};

    fn wheat_claim() -> BatchClaim {
        BatchClaim {
            crop_type: "wheat".to_string(),
            quantity_kg: 5000.0,
            land_area_acres: 1.0,
            region: "Punjab".to_string(),
            coordinate: Coordinate::new(30.9, 75.85).unwrap(),
            actor_role: ActorRole::Farmer,
            stage: LifecycleStage::Harvested,
        }
    }

    #[test]
    fn test_cli_parses_evaluate() {
        let cli = Cli::try_parse_from([
            "croptrace",
            "--json",
            "evaluate",
            "--claim",
            "claim.json",
            "--photo",
            "a.jpg",
            "--photo",
            "b.jpg",
            "--vector",
            "a.json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Evaluate {
                photos, vectors, ..
            } => {
                assert_eq!(photos.len(), 2);
                assert_eq!(vectors, vec![PathBuf::from("a.json")]);
            }
            _ => panic!("expected evaluate"),
        }
    }

    #[test]
    fn test_cli_accepts_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "croptrace",
            "origin-hash",
            "--lat",
            "-33.86",
            "--lng",
            "-151.21",
            "--region",
            "NSW",
        ])
        .unwrap();
        match cli.command {
            Commands::OriginHash { lat, lng, .. } => {
                assert_eq!(lat, -33.86);
                assert_eq!(lng, -151.21);
            }
            _ => panic!("expected origin-hash"),
        }
    }

    #[test]
    fn test_evaluate_flags_overclaim_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.jpg");
        let b = dir.path().join("b.jpg");
        std::fs::write(&a, b"first photo").unwrap();
        std::fs::write(&b, b"second photo").unwrap();

        let decision = evaluate(
            FraudPolicy::default(),
            &wheat_claim(),
            &[a, b],
            None,
            &[],
        )
        .unwrap();

        assert!(decision.flagged());
        assert_eq!(decision.reasons().len(), 2);
    }

    #[test]
    fn test_evaluate_rejects_extra_vectors() {
        let err = evaluate(
            FraudPolicy::default(),
            &wheat_claim(),
            &[PathBuf::from("a.jpg")],
            None,
            &[PathBuf::from("a.json"), PathBuf::from("b.json")],
        )
        .unwrap_err();
        assert!(err.to_string().contains("2 feature vectors"));
    }

    #[test]
    fn test_load_policy_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.json");
        std::fs::write(&path, r#"{"gps_tolerance_km": 5.0}"#).unwrap();

        let policy = load_policy(Some(&path)).unwrap();
        assert_eq!(policy.gps_tolerance_km(), 5.0);

        std::fs::write(&path, r#"{"gps_tolerance_km": -1.0}"#).unwrap();
        assert!(load_policy(Some(&path)).is_err());
    }

    #[test]
    fn test_record_file_roundtrip_verifies() {
        let record = build_record(
            "a1b2c3d4",
            "Wheat",
            Coordinate::new(30.9, 75.85).unwrap(),
            "Punjab",
            NaiveDate::from_ymd_opt(2026, 10, 23).unwrap(),
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("record.json");
        std::fs::write(&path, serde_json::to_string(&record).unwrap()).unwrap();

        let digest = record_digest(&record);
        assert!(cmd_verify(&path, &digest).is_ok());
        assert!(cmd_verify(&path, &"0".repeat(64)).is_err());
        assert_eq!(read_record_file(&path).unwrap(), record);
    }
}
