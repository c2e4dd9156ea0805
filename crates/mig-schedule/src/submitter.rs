//! Variant-retry submitter
//!
//! Provides [`VariantSubmitter`], which creates a schedule on the target by
//! trying each [`SubmissionVariant`](crate::SubmissionVariant) in order.
//!
//! - A validation rejection advances to the next variant
//! - Any other error stops the sequence for this schedule
//! - The first accepted variant ends the sequence
//!
//! Every attempt is recorded so an exhausted schedule reports all of them.

use crate::candidate::ScheduleCandidate;
use crate::error::SubmitError;
use crate::rrule::{synthesize, Repair, Synthesized};
use crate::variant::{OwnerRef, VariantRegistry};
use mig_model::{Entity, EntityId, EntityKind, TargetClient};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Result of one submission attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Target created the schedule
    Accepted { id: EntityId },
    /// Target refused the payload
    Rejected { error: String },
}

/// Diagnostics for one variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    /// Variant label
    pub label: String,
    /// Payload field names sent
    pub fields: Vec<String>,
    /// Owner reference sent
    pub owner: Value,
    /// What the target said
    pub outcome: AttemptOutcome,
}

impl Display for Attempt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] owner={}: ", self.label, self.fields.join(","), self.owner)?;
        match &self.outcome {
            AttemptOutcome::Accepted { id } => write!(f, "accepted as {id}"),
            AttemptOutcome::Rejected { error } => write!(f, "rejected: {error}"),
        }
    }
}

/// Successful submission
#[derive(Debug, Clone)]
pub struct Submission {
    /// Schedule as created on the target
    pub created: Entity,
    /// Attempts up to and including the accepted one
    pub attempts: Vec<Attempt>,
    /// Rule repair that was applied before submitting
    pub repair: Repair,
}

/// Submits schedules through an ordered variant list
#[derive(Clone)]
pub struct VariantSubmitter {
    target: Arc<dyn TargetClient>,
    variants: VariantRegistry,
}

impl VariantSubmitter {
    /// Create submitter with the built-in variants
    #[must_use]
    pub fn new(target: Arc<dyn TargetClient>) -> Self {
        Self {
            target,
            variants: VariantRegistry::default(),
        }
    }

    /// Replace the variant list
    #[inline]
    #[must_use]
    pub fn with_variants(mut self, variants: VariantRegistry) -> Self {
        self.variants = variants;
        self
    }

    /// Variant list in use
    #[inline]
    #[must_use]
    pub fn variants(&self) -> &VariantRegistry {
        &self.variants
    }

    /// Repaired rule for a candidate
    #[must_use]
    pub fn rule_for(candidate: &ScheduleCandidate) -> Synthesized {
        let schedule = &candidate.schedule;
        synthesize(
            schedule.str_field("rrule").unwrap_or_default(),
            schedule.str_field("next_run"),
            schedule.str_field("timezone"),
        )
    }

    /// Create the schedule on the target
    ///
    /// # Errors
    /// - [`SubmitError::Exhausted`] if every variant was rejected
    /// - [`SubmitError::Aborted`] on the first non-validation error
    pub async fn submit(&self, candidate: &ScheduleCandidate) -> Result<Submission, SubmitError> {
        let rule = Self::rule_for(candidate);
        if rule.repair == Repair::Missing {
            tracing::warn!(
                "Schedule {} has no start anchor and no next run; submitting as-is",
                candidate.name()
            );
        }

        let mut attempts = Vec::with_capacity(self.variants.len());

        for variant in self.variants.iter() {
            let owner = self.owner_ref(variant.owner, candidate.owner);
            let payload = variant.build(candidate, &rule, owner.clone());
            let fields = payload.keys().cloned().collect();

            tracing::debug!("Submitting schedule {} as {}", candidate.name(), variant.label);

            match self
                .target
                .create(EntityKind::Schedule, Value::Object(payload))
                .await
            {
                Ok(created) => {
                    attempts.push(Attempt {
                        label: variant.label.clone(),
                        fields,
                        owner,
                        outcome: AttemptOutcome::Accepted { id: created.id },
                    });
                    tracing::info!(
                        "Schedule {} accepted with variant {} (id {})",
                        candidate.name(),
                        variant.label,
                        created.id
                    );
                    return Ok(Submission {
                        created,
                        attempts,
                        repair: rule.repair,
                    });
                }
                Err(error) => {
                    let retry = error.is_validation();
                    attempts.push(Attempt {
                        label: variant.label.clone(),
                        fields,
                        owner,
                        outcome: AttemptOutcome::Rejected {
                            error: error.to_string(),
                        },
                    });
                    if !retry {
                        return Err(SubmitError::Aborted { attempts, error });
                    }
                    tracing::debug!("Variant {} rejected: {}", variant.label, error);
                }
            }
        }

        Err(SubmitError::Exhausted { attempts })
    }

    fn owner_ref(&self, owner: OwnerRef, id: EntityId) -> Value {
        match owner {
            OwnerRef::Id => Value::from(id.0),
            OwnerRef::Url => Value::String(self.target.resource_url(EntityKind::JobTemplate, id)),
        }
    }
}

impl fmt::Debug for VariantSubmitter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariantSubmitter")
            .field("variants", &self.variants.labels())
            .finish_non_exhaustive()
    }
}
