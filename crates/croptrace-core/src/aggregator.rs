//! Fraud aggregation.
//!
//! Runs the applicable subset of [`signals`](crate::signals) for a
//! submission's life-cycle stage and reduces the verdicts into one
//! [`FraudDecision`]. Every applicable check runs even after an earlier one
//! flags, so the decision carries the complete reason set.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::domain::{BatchClaim, CaptureEvidence, EvidenceSet, LifecycleStage};
use crate::metrics::METRICS;
use crate::obs;
use crate::policy::FraudPolicy;
use crate::signals::{self, Signal, SignalVerdict};

/// Admit/reject decision for one submission.
///
/// `flagged` is derived from `reasons` and cannot be set independently.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FraudDecision {
    verdicts: Vec<SignalVerdict>,
    reasons: Vec<String>,
}

impl FraudDecision {
    /// Build a decision from verdicts in evaluation order.
    pub fn from_verdicts(verdicts: Vec<SignalVerdict>) -> Self {
        let reasons = verdicts
            .iter()
            .filter(|v| v.triggered())
            .filter_map(|v| v.reason().map(str::to_string))
            .collect();
        Self { verdicts, reasons }
    }

    pub fn flagged(&self) -> bool {
        !self.reasons.is_empty()
    }

    /// Reasons of every triggered signal, in evaluation order.
    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    /// Every verdict that was evaluated, triggered or not.
    pub fn verdicts(&self) -> &[SignalVerdict] {
        &self.verdicts
    }

    /// Whether a given signal was evaluated for this submission.
    pub fn evaluated(&self, signal: Signal) -> bool {
        self.verdicts.iter().any(|v| v.signal() == signal)
    }
}

impl Serialize for FraudDecision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            flagged: bool,
            reasons: &'a [String],
            verdicts: &'a [SignalVerdict],
        }

        Wire {
            flagged: self.flagged(),
            reasons: &self.reasons,
            verdicts: &self.verdicts,
        }
        .serialize(serializer)
    }
}

/// Runs the fraud battery against a fixed, read-only policy.
#[derive(Debug, Clone)]
pub struct FraudAggregator {
    policy: Arc<FraudPolicy>,
}

impl FraudAggregator {
    pub fn new(policy: Arc<FraudPolicy>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &FraudPolicy {
        &self.policy
    }

    /// Evaluate a submission against the current wall-clock time.
    pub fn evaluate(
        &self,
        claim: &BatchClaim,
        evidence: &EvidenceSet,
        stage: LifecycleStage,
    ) -> FraudDecision {
        self.evaluate_at(claim, evidence, stage, Utc::now())
    }

    /// Evaluate a submission as of `now`.
    ///
    /// Order: location, yield, metadata freshness (primary photo), GPS
    /// consistency (when the primary photo carries embedded GPS), visual
    /// similarity (non-originating stages only). Verdicts are slotted by position, so
    /// reason order never depends on evaluation order.
    pub fn evaluate_at(
        &self,
        claim: &BatchClaim,
        evidence: &EvidenceSet,
        stage: LifecycleStage,
        now: DateTime<Utc>,
    ) -> FraudDecision {
        let policy = self.policy.as_ref();
        let primary = evidence.primary();
        let mut slots: [Option<SignalVerdict>; 5] = Default::default();

        slots[0] = Some(signals::check_location(
            policy,
            &claim.crop_type,
            &claim.region,
        ));
        slots[1] = Some(signals::check_yield(
            policy,
            &claim.crop_type,
            claim.quantity_kg,
            claim.land_area_acres,
        ));
        slots[2] = Some(signals::check_metadata_freshness(
            policy,
            primary.and_then(|p| p.metadata.as_ref()),
            now,
        ));
        slots[3] = primary
            .and_then(CaptureEvidence::embedded_coordinate)
            .map(|embedded| signals::check_gps_consistency(policy, claim.coordinate, embedded));
        if !stage.is_originating() {
            slots[4] = Some(signals::check_visual_similarity(
                policy,
                primary.and_then(|p| p.feature_vector.as_ref()),
                evidence.reference_vector.as_ref(),
            ));
        }

        let decision = FraudDecision::from_verdicts(slots.into_iter().flatten().collect());
        decision.verdicts().iter().for_each(obs::emit_signal_evaluated);

        METRICS.inc_batches_evaluated();
        if decision.flagged() {
            METRICS.inc_batches_flagged();
        }
        obs::emit_decision_rendered(&claim.crop_type, stage, decision.flagged(), decision.reasons());

        decision
    }
}

impl Default for FraudAggregator {
    fn default() -> Self {
        Self::new(Arc::new(FraudPolicy::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_decision_is_not_flagged() {
        let decision = FraudDecision::from_verdicts(Vec::new());
        assert!(!decision.flagged());
        assert!(decision.reasons().is_empty());
    }

    #[test]
    fn test_reasons_follow_verdict_order() {
        let decision = FraudDecision::from_verdicts(vec![
            SignalVerdict::flag(Signal::LocationPlausibility, "first"),
            SignalVerdict::clear(Signal::YieldPlausibility),
            SignalVerdict::flag(Signal::MetadataFreshness, "second"),
        ]);
        assert!(decision.flagged());
        assert_eq!(decision.reasons(), ["first", "second"]);
        assert_eq!(decision.verdicts().len(), 3);
        assert!(decision.evaluated(Signal::YieldPlausibility));
        assert!(!decision.evaluated(Signal::GpsConsistency));
    }

    #[test]
    fn test_serialized_flag_matches_reasons() {
        let decision = FraudDecision::from_verdicts(vec![SignalVerdict::flag(
            Signal::YieldPlausibility,
            "too much",
        )]);
        let json = serde_json::to_value(&decision).expect("serialize");
        assert_eq!(json["flagged"], true);
        assert_eq!(json["reasons"], serde_json::json!(["too much"]));
        assert_eq!(json["verdicts"][0]["signal"], "yield_plausibility");
    }
}
