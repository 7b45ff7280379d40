//! Structured observability hooks for the batch pipeline.
//!
//! - Batch-scoped tracing spans via the `BatchSpan` RAII guard
//! - Emission functions for decision, record and ledger events
//!
//! Events are emitted at `info!` level; dependency outages at `warn!`.
//! Raw coordinates are never logged.

use tracing::{debug, info, warn};

use crate::domain::{Dependency, LifecycleStage};
use crate::signals::SignalVerdict;

/// RAII guard that enters a batch-scoped tracing span.
///
/// ```ignore
/// let _span = BatchSpan::enter("a1b2c3d4");
/// // every event below is tagged with batch_id = "a1b2c3d4"
/// ```
pub struct BatchSpan {
    _span: tracing::span::EnteredSpan,
}

impl BatchSpan {
    pub fn enter(batch_id: &str) -> Self {
        Self {
            _span: batch_span(batch_id).entered(),
        }
    }
}

/// Batch-scoped span for instrumenting futures, which must not hold an
/// entered guard across `.await`.
pub fn batch_span(batch_id: &str) -> tracing::Span {
    tracing::info_span!("croptrace.batch", batch_id = %batch_id)
}

/// Emit event: fraud decision rendered.
pub fn emit_decision_rendered(
    crop_type: &str,
    stage: LifecycleStage,
    flagged: bool,
    reasons: &[String],
) {
    info!(
        event = "decision.rendered",
        crop_type = %crop_type,
        stage = ?stage,
        flagged = flagged,
        reason_count = reasons.len(),
        reasons = ?reasons,
    );
}

/// Emit event: one signal evaluated (debug level).
pub fn emit_signal_evaluated(verdict: &SignalVerdict) {
    debug!(
        event = "signal.evaluated",
        signal = verdict.signal().as_str(),
        triggered = verdict.triggered(),
    );
}

/// Emit event: provenance record built.
pub fn emit_record_built(batch_id: &str, content_digest: &str) {
    info!(
        event = "record.built",
        batch_id = %batch_id,
        content_digest = %content_digest,
    );
}

/// Emit event: record accepted by the ledger.
pub fn emit_record_anchored(batch_id: &str, transaction_id: &str) {
    info!(
        event = "record.anchored",
        batch_id = %batch_id,
        transaction_id = %transaction_id,
    );
}

/// Emit event: an external collaborator failed (warning level).
pub fn emit_dependency_unavailable(dependency: Dependency, error: &dyn std::fmt::Display) {
    warn!(event = "dependency.unavailable", dependency = %dependency, error = %error);
}

/// Emit event: a documented fallback replaced a collaborator's answer.
pub fn emit_fallback_applied(dependency: Dependency, fallback: &dyn std::fmt::Display) {
    warn!(event = "dependency.fallback", dependency = %dependency, fallback = %fallback);
}
