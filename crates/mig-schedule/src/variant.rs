//! Submission variants
//!
//! Provides [`VariantRegistry`], the ordered list of payload shapes the
//! submitter probes. Target versions disagree on how a schedule's owner is
//! referenced and which optional fields are accepted; each variant is one
//! guess, and new guesses are appended as data.

use crate::candidate::{non_blank, ScheduleCandidate};
use crate::rrule::Synthesized;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Owner reference field on schedule payloads
pub const OWNER_FIELD: &str = "unified_job_template";

/// Which fields a variant sends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSet {
    /// Minimal fields plus description, extra data, inventory and overrides
    Full,
    /// Name, enabled, owner, rule, timezone and limit only
    Minimal,
}

/// How a variant references the owning template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerRef {
    /// Numeric id
    Id,
    /// API resource URL
    Url,
}

/// One labeled payload shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionVariant {
    pub label: String,
    pub fields: FieldSet,
    pub owner: OwnerRef,
}

impl SubmissionVariant {
    /// Create variant
    #[must_use]
    pub fn new(label: impl Into<String>, fields: FieldSet, owner: OwnerRef) -> Self {
        Self {
            label: label.into(),
            fields,
            owner,
        }
    }

    /// Build this variant's payload
    ///
    /// `owner` is the already-rendered owner reference (id or URL).
    #[must_use]
    pub fn build(
        &self,
        candidate: &ScheduleCandidate,
        rule: &Synthesized,
        owner: Value,
    ) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("name".into(), Value::String(candidate.name().to_string()));
        payload.insert("enabled".into(), Value::Bool(candidate.enabled()));
        payload.insert(OWNER_FIELD.into(), owner);
        payload.insert("rrule".into(), Value::String(rule.rule.clone()));
        if let Some(tz) = &rule.timezone {
            payload.insert("timezone".into(), Value::String(tz.clone()));
        }
        if let Some(limit) = candidate.limit() {
            payload.insert("limit".into(), Value::String(limit));
        }

        if self.fields == FieldSet::Minimal {
            return payload;
        }

        let schedule = &candidate.schedule;
        payload.insert(
            "description".into(),
            Value::String(schedule.str_field("description").unwrap_or_default().to_string()),
        );
        let extra_data = schedule
            .field("extra_data")
            .filter(|v| v.is_object())
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        payload.insert("extra_data".into(), extra_data);
        if let Some(inventory) = candidate.inventory {
            payload.insert("inventory".into(), Value::from(inventory.0));
        }

        let overrides = &candidate.overrides;
        if let Some(tags) = non_blank(overrides.job_tags.as_deref()) {
            payload.insert("job_tags".into(), Value::String(tags.to_string()));
        }
        if let Some(tags) = non_blank(overrides.skip_tags.as_deref()) {
            payload.insert("skip_tags".into(), Value::String(tags.to_string()));
        }
        if let Some(verbosity) = overrides.verbosity {
            payload.insert("verbosity".into(), Value::from(verbosity));
        }
        if let Some(timeout) = overrides.timeout.filter(|t| *t > 0) {
            payload.insert("timeout".into(), Value::from(timeout));
        }
        if let Some(ee) = overrides.execution_environment {
            payload.insert("execution_environment".into(), Value::from(ee.0));
        }

        payload
    }
}

/// Ordered variant list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRegistry {
    variants: Vec<SubmissionVariant>,
}

impl VariantRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            variants: Vec::new(),
        }
    }

    /// Append a variant (tried after every existing one)
    pub fn push(&mut self, variant: SubmissionVariant) {
        self.variants.push(variant);
    }

    /// Append a variant, builder style
    #[inline]
    #[must_use]
    pub fn with_variant(mut self, variant: SubmissionVariant) -> Self {
        self.push(variant);
        self
    }

    /// Variant labels in order
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.variants.iter().map(|v| v.label.as_str()).collect()
    }

    /// Number of variants
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Iterate in submission order
    pub fn iter(&self) -> impl Iterator<Item = &SubmissionVariant> {
        self.variants.iter()
    }
}

impl Default for VariantRegistry {
    /// The four built-in variants, most complete first
    fn default() -> Self {
        Self::new()
            .with_variant(SubmissionVariant::new("full/owner-id", FieldSet::Full, OwnerRef::Id))
            .with_variant(SubmissionVariant::new("full/owner-url", FieldSet::Full, OwnerRef::Url))
            .with_variant(SubmissionVariant::new(
                "minimal/owner-id",
                FieldSet::Minimal,
                OwnerRef::Id,
            ))
            .with_variant(SubmissionVariant::new(
                "minimal/owner-url",
                FieldSet::Minimal,
                OwnerRef::Url,
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::ScheduleOverrides;
    use crate::rrule::synthesize;
    use mig_model::{Entity, EntityId, EntityKind};
    use serde_json::json;

    fn candidate() -> ScheduleCandidate {
        let schedule = Entity::new(EntityKind::Schedule, EntityId(7), " nightly ")
            .with_field("description", "run at night")
            .with_field("extra_data", json!({ "env": "prod" }));
        ScheduleCandidate::new(schedule, EntityId(40))
            .with_inventory(Some(EntityId(3)))
            .with_overrides(ScheduleOverrides {
                job_tags: Some("deploy".into()),
                skip_tags: Some("  ".into()),
                verbosity: Some(2),
                ..ScheduleOverrides::default()
            })
    }

    #[test]
    fn default_order() {
        assert_eq!(
            VariantRegistry::default().labels(),
            vec![
                "full/owner-id",
                "full/owner-url",
                "minimal/owner-id",
                "minimal/owner-url"
            ]
        );
    }

    #[test]
    fn full_payload_carries_non_empty_overrides() {
        let rule = synthesize("RRULE:FREQ=DAILY", Some("2025-10-16T14:00:00Z"), None);
        let variant = SubmissionVariant::new("full", FieldSet::Full, OwnerRef::Id);
        let payload = variant.build(&candidate(), &rule, json!(40));

        assert_eq!(payload["name"], json!("nightly"));
        assert_eq!(payload[OWNER_FIELD], json!(40));
        assert_eq!(payload["inventory"], json!(3));
        assert_eq!(payload["job_tags"], json!("deploy"));
        assert_eq!(payload["verbosity"], json!(2));
        assert_eq!(payload["extra_data"], json!({ "env": "prod" }));
        assert!(!payload.contains_key("skip_tags"));
        assert!(!payload.contains_key("execution_environment"));
    }

    #[test]
    fn minimal_payload_is_minimal() {
        let rule = synthesize("RRULE:FREQ=DAILY", Some("2025-10-16T14:00:00Z"), None);
        let variant = SubmissionVariant::new("min", FieldSet::Minimal, OwnerRef::Url);
        let payload = variant.build(&candidate(), &rule, json!("/api/x/40/"));

        let mut keys: Vec<_> = payload.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["enabled", "name", "rrule", "timezone", OWNER_FIELD]);
    }
}
