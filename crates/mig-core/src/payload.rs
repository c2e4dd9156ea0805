//! Creation payloads
//!
//! Source records carry ids, audit timestamps, computed status and
//! denormalised summaries that the target must not receive. Each builder
//! starts from a whitelist of writable fields, coercing absent values to the
//! target's defaults (`false`, `0`, `""`).

use mig_model::{Entity, EntityId};
use serde_json::{Map, Value};

/// Fields that are never sent to the target
pub const READ_ONLY_FIELDS: &[&str] = &[
    "id",
    "type",
    "url",
    "related",
    "summary_fields",
    "created",
    "modified",
    "last_job",
    "last_job_run",
    "last_job_failed",
    "next_job_run",
    "current_job",
    "current_update",
    "scm_last_revision",
    "default_environment",
    "signature_validation_credential",
    "last_update_failed",
    "last_updated",
    "status",
    "scm_revision",
    "organization",
];

/// Copy every field except the read-only ones
#[must_use]
pub fn strip_internal(entity: &Entity) -> Map<String, Value> {
    entity
        .fields
        .iter()
        .filter(|(k, _)| !READ_ONLY_FIELDS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

struct Builder<'a> {
    source: Map<String, Value>,
    entity: &'a Entity,
    out: Map<String, Value>,
}

impl<'a> Builder<'a> {
    fn new(entity: &'a Entity) -> Self {
        let mut out = Map::new();
        out.insert("name".into(), Value::String(entity.name.trim().to_string()));
        Self {
            source: strip_internal(entity),
            entity,
            out,
        }
    }

    fn text(mut self, key: &str) -> Self {
        let value = self.source.get(key).and_then(Value::as_str).unwrap_or_default();
        self.out.insert(key.into(), Value::String(value.to_string()));
        self
    }

    fn text_or(mut self, key: &str, default: &str) -> Self {
        let value = self
            .source
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(default);
        self.out.insert(key.into(), Value::String(value.to_string()));
        self
    }

    fn flag(mut self, key: &str) -> Self {
        let value = self.source.get(key).and_then(Value::as_bool).unwrap_or(false);
        self.out.insert(key.into(), Value::Bool(value));
        self
    }

    fn int(mut self, key: &str) -> Self {
        let value = self.source.get(key).and_then(Value::as_i64).unwrap_or(0);
        self.out.insert(key.into(), Value::from(value));
        self
    }

    fn id(mut self, key: &str, id: Option<EntityId>) -> Self {
        self.out
            .insert(key.into(), id.map_or(Value::Null, |id| Value::from(id.0)));
        self
    }

    fn raw(mut self, key: &str, value: Value) -> Self {
        self.out.insert(key.into(), value);
        self
    }

    fn finish(self) -> Map<String, Value> {
        tracing::debug!(
            "Payload for {} '{}': {:?}",
            self.entity.kind,
            self.entity.name,
            self.out.keys().collect::<Vec<_>>()
        );
        self.out
    }
}

/// Project creation payload
///
/// An SCM URL without a type defaults the type to `git`.
#[must_use]
pub fn project(entity: &Entity, organization: EntityId) -> Map<String, Value> {
    let mut payload = Builder::new(entity)
        .text("description")
        .text("scm_type")
        .text("scm_url")
        .text("scm_branch")
        .flag("scm_clean")
        .flag("scm_track_submodules")
        .flag("scm_delete_on_update")
        .flag("scm_update_on_launch")
        .int("scm_update_cache_timeout")
        .int("timeout")
        .flag("allow_override")
        .id("organization", Some(organization))
        .finish();

    let has_url = payload
        .get("scm_url")
        .and_then(Value::as_str)
        .is_some_and(|u| !u.is_empty());
    let has_type = payload
        .get("scm_type")
        .and_then(Value::as_str)
        .is_some_and(|t| !t.is_empty());
    if has_url && !has_type {
        payload.insert("scm_type".into(), Value::String("git".into()));
    }
    payload
}

/// Target ids a job template payload points at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobTemplateRefs {
    pub project: Option<EntityId>,
    pub inventory: Option<EntityId>,
    pub execution_environment: Option<EntityId>,
}

/// Job template creation payload
///
/// `survey_spec` is carried only when the survey is enabled and present.
#[must_use]
pub fn job_template(
    entity: &Entity,
    organization: EntityId,
    refs: JobTemplateRefs,
) -> Map<String, Value> {
    let mut payload = Builder::new(entity)
        .text("description")
        .text_or("job_type", "run")
        .text("playbook")
        .id("project", refs.project)
        .id("inventory", refs.inventory)
        .id("execution_environment", refs.execution_environment)
        .int("forks")
        .int("verbosity")
        .flag("become_enabled")
        .text("limit")
        .int("timeout")
        .id("organization", Some(organization))
        .flag("allow_simultaneous")
        .flag("use_fact_cache")
        .flag("ask_inventory_on_launch")
        .flag("ask_variables_on_launch")
        .flag("ask_limit_on_launch")
        .flag("ask_scm_branch_on_launch")
        .flag("ask_execution_environment_on_launch")
        .flag("ask_credential_on_launch")
        .flag("survey_enabled")
        .text("extra_vars")
        .finish();

    if entity.bool_field("survey_enabled") {
        let survey = entity
            .field("survey_spec")
            .or_else(|| entity.field("survey"))
            .filter(|s| !s.is_null());
        if let Some(survey) = survey {
            payload.insert("survey_spec".into(), survey.clone());
        }
    }
    payload
}

/// Credential creation payload with already-merged inputs
#[must_use]
pub fn credential(
    entity: &Entity,
    organization: EntityId,
    credential_type: EntityId,
    inputs: Map<String, Value>,
) -> Map<String, Value> {
    Builder::new(entity)
        .text("description")
        .id("organization", Some(organization))
        .id("credential_type", Some(credential_type))
        .raw("inputs", Value::Object(inputs))
        .finish()
}

/// Notification template creation payload with already-merged configuration
#[must_use]
pub fn notification_template(
    entity: &Entity,
    organization: EntityId,
    configuration: Map<String, Value>,
) -> Map<String, Value> {
    let messages = entity
        .field("messages")
        .filter(|m| m.is_object())
        .cloned()
        .unwrap_or(Value::Null);
    Builder::new(entity)
        .text("description")
        .id("organization", Some(organization))
        .text("notification_type")
        .raw("notification_configuration", Value::Object(configuration))
        .raw("messages", messages)
        .finish()
}

/// Generic payload for kinds without a dedicated builder
#[must_use]
pub fn generic(entity: &Entity, organization: EntityId) -> Map<String, Value> {
    let mut payload = strip_internal(entity);
    payload.insert("name".into(), Value::String(entity.name.trim().to_string()));
    payload.insert("organization".into(), Value::from(organization.0));
    payload
}
