//! Per-run state
//!
//! [`RunContext`] is the only mutable state of a run. It is threaded through
//! the orchestrator and reconciler explicitly; nothing else accumulates.

use crate::receipt::{Outcome, Receipt, ReceiptHeader, ReceiptRecord};
use mig_key::NaturalKey;
use mig_model::{EntityId, EntityKind};
use std::fmt::{self, Display, Formatter};
use ulid::Ulid;

/// Unique run identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Ulid);

impl RunId {
    /// Generate new run ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receipt accumulator plus run counters
#[derive(Debug)]
pub struct RunContext {
    run_id: RunId,
    receipt: Receipt,
    limit: Option<usize>,
    candidates: usize,
}

impl RunContext {
    /// Start a run; `header.run_id` is overwritten with the new id
    #[must_use]
    pub fn new(mut header: ReceiptHeader, limit: Option<usize>) -> Self {
        let run_id = RunId::new();
        header.run_id = run_id.to_string();
        Self {
            run_id,
            receipt: Receipt::new(header),
            limit,
            candidates: 0,
        }
    }

    /// Run identifier
    #[inline]
    #[must_use]
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Receipt so far
    #[inline]
    #[must_use]
    pub fn receipt(&self) -> &Receipt {
        &self.receipt
    }

    /// Finish the run
    #[inline]
    #[must_use]
    pub fn into_receipt(self) -> Receipt {
        self.receipt
    }

    /// Count one top-level candidate against the limit
    #[inline]
    pub fn count_candidate(&mut self) {
        self.candidates += 1;
    }

    /// Whether the processed-candidate limit has been hit
    #[inline]
    #[must_use]
    pub fn limit_reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.candidates >= limit)
    }

    /// Append a record and log it
    pub fn record(
        &mut self,
        kind: EntityKind,
        name: &str,
        source_id: Option<EntityId>,
        key: Option<&NaturalKey>,
        outcome: Outcome,
        reason: impl Into<String>,
    ) {
        let record = self.receipt.push(ReceiptRecord {
            seq: 0,
            kind,
            name: name.to_string(),
            source_id,
            natural_key: key.map(ToString::to_string),
            outcome,
            reason: reason.into(),
        });

        let line = record.render();
        let seq = record.seq;
        match record.outcome {
            Outcome::Failed { .. } => tracing::error!("[{}] {}", seq, line),
            Outcome::Skipped { .. } => tracing::debug!("[{}] {}", seq, line),
            _ => tracing::info!("[{}] {}", seq, line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receipt::Creation;

    fn header() -> ReceiptHeader {
        ReceiptHeader {
            run_id: String::new(),
            mode: "projects".into(),
            source: "s".into(),
            reference: None,
            target: "t".into(),
            organization: EntityId(1),
            dry_run: true,
            prefix: None,
            started_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn header_gets_run_id() {
        let ctx = RunContext::new(header(), None);
        assert_eq!(ctx.receipt().header.run_id, ctx.run_id().to_string());
    }

    #[test]
    fn limit_counts_candidates() {
        let mut ctx = RunContext::new(header(), Some(2));
        assert!(!ctx.limit_reached());
        ctx.count_candidate();
        ctx.count_candidate();
        assert!(ctx.limit_reached());

        let mut unlimited = RunContext::new(header(), None);
        unlimited.count_candidate();
        assert!(!unlimited.limit_reached());
    }

    #[test]
    fn records_are_sequenced() {
        let mut ctx = RunContext::new(header(), None);
        let key = NaturalKey::named("a", "");
        ctx.record(
            EntityKind::Project,
            "a",
            Some(EntityId(3)),
            Some(&key),
            Outcome::Created(Creation::DryRun),
            "would create",
        );
        let receipt = ctx.into_receipt();
        assert_eq!(receipt.records()[0].seq, 1);
        assert_eq!(receipt.records()[0].natural_key.as_deref(), Some("a"));
    }
}
