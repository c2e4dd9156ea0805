//! Two-system reconciler
//!
//! Classifies every candidate from one platform against a reference
//! platform's entity set of the same kind:
//!
//! 1. Names rejected by the filter are `Skipped` and not processed
//! 2. A natural-key hit in the reference index is `Matched`
//! 3. Otherwise the prefixed name is checked on the target (reruns match
//!    what an earlier run created)
//! 4. Anything left is created under the prefixed name
//!
//! Errors are contained per candidate; the limit is checked between
//! candidates.

use crate::context::RunContext;
use crate::error::MigrationError;
use crate::filter::NameFilter;
use crate::guard::IdempotencyGuard;
use crate::keylock::KeyLocks;
use crate::payload;
use crate::receipt::{Creation, Outcome};
use mig_key::{NaturalKey, NaturalKeyIndex};
use mig_model::{Entity, EntityId, EntityKind, Scope, TargetClient};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Payload builder used for creates
pub type PayloadFn = fn(&Entity, EntityId) -> Map<String, Value>;

/// Compare-mode classifier
pub struct Reconciler<'a> {
    target: Arc<dyn TargetClient>,
    guard: IdempotencyGuard,
    locks: &'a KeyLocks,
    filter: &'a NameFilter,
    organization: EntityId,
    prefix: String,
    dry_run: bool,
    payload: PayloadFn,
}

impl<'a> Reconciler<'a> {
    /// Create reconciler for a target organization
    #[must_use]
    pub fn new(
        target: Arc<dyn TargetClient>,
        locks: &'a KeyLocks,
        filter: &'a NameFilter,
        organization: EntityId,
    ) -> Self {
        Self {
            guard: IdempotencyGuard::new(Arc::clone(&target)),
            target,
            locks,
            filter,
            organization,
            prefix: String::new(),
            dry_run: false,
            payload: payload::generic,
        }
    }

    /// With created-name prefix
    #[inline]
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// With dry-run
    #[inline]
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// With payload builder
    #[inline]
    #[must_use]
    pub fn with_payload(mut self, payload: PayloadFn) -> Self {
        self.payload = payload;
        self
    }

    /// Classify every candidate, appending to the run's receipt
    pub async fn reconcile(
        &self,
        kind: EntityKind,
        reference: &NaturalKeyIndex,
        candidates: Vec<Entity>,
        ctx: &mut RunContext,
    ) {
        tracing::info!(
            "Reconciling {} candidate {}(s) against {} reference key(s)",
            candidates.len(),
            kind,
            reference.len()
        );

        for candidate in candidates {
            if !self.filter.allows(&candidate.name) {
                ctx.record(
                    kind,
                    &candidate.name,
                    Some(candidate.id),
                    None,
                    Outcome::Skipped {
                        reason: "filtered".into(),
                    },
                    "filtered",
                );
                continue;
            }

            ctx.count_candidate();
            let key = NaturalKey::for_entity(&candidate);

            if let Some(existing) = reference.get(&key) {
                ctx.record(
                    kind,
                    &candidate.name,
                    Some(candidate.id),
                    Some(&key),
                    Outcome::Matched {
                        existing: existing.id,
                    },
                    format!("matched reference '{}'", existing.name),
                );
            } else {
                let name = format!("{}{}", self.prefix, candidate.name.trim());
                let (outcome, reason) = match self.migrate(kind, &candidate, &name).await {
                    Ok(pair) => pair,
                    Err(e) => (
                        Outcome::failed(&e),
                        format!("from '{}'", candidate.name),
                    ),
                };
                ctx.record(kind, &name, Some(candidate.id), Some(&key), outcome, reason);
            }

            if ctx.limit_reached() {
                tracing::info!("Limit reached, stopping.");
                break;
            }
        }
    }

    async fn migrate(
        &self,
        kind: EntityKind,
        candidate: &Entity,
        name: &str,
    ) -> Result<(Outcome, String), MigrationError> {
        let scope = Scope::Organization(self.organization);
        let _lock = self.locks.lock(kind, name, scope).await;

        if let Some(existing) = self.guard.ensure_unique(kind, name, scope).await? {
            return Ok((
                Outcome::Matched { existing },
                "already in target".to_string(),
            ));
        }

        let mut payload = (self.payload)(candidate, self.organization);
        payload.insert("name".into(), Value::String(name.to_string()));

        if self.dry_run {
            return Ok((
                Outcome::Created(Creation::DryRun),
                format!("would create from '{}'", candidate.name),
            ));
        }

        let created = self.target.create(kind, Value::Object(payload)).await?;
        Ok((
            Outcome::Created(Creation::Applied(created.id)),
            format!("created from '{}'", candidate.name),
        ))
    }
}
