//! Entity fixtures
//!
//! Ids are placeholders; [`FakePlatform::seed`](crate::FakePlatform::seed)
//! assigns real ones.

use mig_model::{Entity, EntityId, EntityKind};
use serde_json::{json, Value};

const UNSEEDED: EntityId = EntityId(0);

fn owned(kind: EntityKind, name: &str, org: u64) -> Entity {
    Entity::new(kind, UNSEEDED, name)
        .with_organization(EntityId(org))
        .with_related_name("organization", format!("org-{org}"))
}

pub fn organization(name: &str) -> Entity {
    Entity::new(EntityKind::Organization, UNSEEDED, name)
}

pub fn project(name: &str, org: u64, url: &str, branch: &str) -> Entity {
    owned(EntityKind::Project, name, org)
        .with_field("scm_type", "git")
        .with_field("scm_url", url)
        .with_field("scm_branch", branch)
}

pub fn inventory(name: &str, org: u64) -> Entity {
    owned(EntityKind::Inventory, name, org)
}

pub fn credential_type(name: &str) -> Entity {
    Entity::new(EntityKind::CredentialType, UNSEEDED, name).with_field("kind", "ssh")
}

/// Credential with the given type name and empty inputs
pub fn credential(name: &str, org: u64, type_name: &str) -> Entity {
    owned(EntityKind::Credential, name, org)
        .with_related_name("credential_type", type_name)
        .with_field("inputs", json!({}))
}

pub fn execution_environment(name: &str, org: Option<u64>) -> Entity {
    let ee = Entity::new(EntityKind::ExecutionEnvironment, UNSEEDED, name)
        .with_field("image", format!("quay.io/example/{name}:latest"));
    match org {
        Some(org) => ee.with_organization(EntityId(org)),
        None => ee,
    }
}

pub fn notification_template(name: &str, org: u64, notification_type: &str) -> Entity {
    owned(EntityKind::NotificationTemplate, name, org)
        .with_field("notification_type", notification_type)
        .with_field("notification_configuration", json!({}))
}

/// Job template referencing a project and inventory by name
pub fn job_template(name: &str, org: u64, project: &str, inventory: &str) -> Entity {
    owned(EntityKind::JobTemplate, name, org)
        .with_related_name("project", project)
        .with_related_name("inventory", inventory)
        .with_field("playbook", "site.yml")
        .with_field("job_type", "run")
        .with_field("extra_vars", "---")
}

/// Schedule with a raw recurrence rule
pub fn schedule(name: &str, rrule: &str) -> Entity {
    Entity::new(EntityKind::Schedule, UNSEEDED, name)
        .with_field("rrule", rrule)
        .with_field("enabled", true)
        .with_field("extra_data", Value::Object(serde_json::Map::new()))
}
