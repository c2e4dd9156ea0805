//! Entity kinds, scopes and relations
//!
//! The controller REST API addresses every collection by a fixed endpoint
//! segment; [`EntityKind::endpoint`] is the single source of those names.

use crate::entity::EntityId;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Collection an entity belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Source-control backed playbook project
    Project,
    /// Launchable job definition
    JobTemplate,
    /// Recurrence attached to a job template
    Schedule,
    /// Stored secret material
    Credential,
    /// Shape of a credential's inputs
    CredentialType,
    /// Outbound notification target
    NotificationTemplate,
    /// Host inventory
    Inventory,
    /// Container image jobs run in
    ExecutionEnvironment,
    /// Organization (the usual scope)
    Organization,
}

impl EntityKind {
    /// REST collection segment
    #[inline]
    #[must_use]
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Project => "projects",
            Self::JobTemplate => "job_templates",
            Self::Schedule => "schedules",
            Self::Credential => "credentials",
            Self::CredentialType => "credential_types",
            Self::NotificationTemplate => "notification_templates",
            Self::Inventory => "inventories",
            Self::ExecutionEnvironment => "execution_environments",
            Self::Organization => "organizations",
        }
    }

    /// Human-readable label used in receipts and logs
    #[inline]
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::JobTemplate => "job template",
            Self::Schedule => "schedule",
            Self::Credential => "credential",
            Self::CredentialType => "credential type",
            Self::NotificationTemplate => "notification template",
            Self::Inventory => "inventory",
            Self::ExecutionEnvironment => "execution environment",
            Self::Organization => "organization",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Boundary within which a name is unique
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Scope {
    /// Platform-wide (credential types, global execution environments)
    Global,
    /// Within one organization
    Organization(EntityId),
    /// Within one owning template (schedules)
    Owner(EntityId),
}

impl Scope {
    /// Query parameter that narrows a listing to this scope
    #[inline]
    #[must_use]
    pub fn query_pair(&self) -> Option<(&'static str, String)> {
        match self {
            Self::Global => None,
            Self::Organization(id) => Some(("organization", id.to_string())),
            Self::Owner(id) => Some(("unified_job_template", id.to_string())),
        }
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Organization(id) => write!(f, "org {id}"),
            Self::Owner(id) => write!(f, "owner {id}"),
        }
    }
}

/// Sub-collection hanging off a parent entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// Credentials used by a job template
    Credentials,
    /// Schedules owned by a job template
    Schedules,
    /// Notification templates fired when a job starts
    NotificationsStarted,
    /// Notification templates fired on success
    NotificationsSuccess,
    /// Notification templates fired on error
    NotificationsError,
}

impl Relation {
    /// Notification relations in the order they are attached
    pub const NOTIFICATIONS: [Relation; 3] = [
        Relation::NotificationsStarted,
        Relation::NotificationsSuccess,
        Relation::NotificationsError,
    ];

    /// REST sub-collection segment
    #[inline]
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Credentials => "credentials",
            Self::Schedules => "schedules",
            Self::NotificationsStarted => "notification_templates_started",
            Self::NotificationsSuccess => "notification_templates_success",
            Self::NotificationsError => "notification_templates_error",
        }
    }

    /// Kind of the entities on the child side
    #[inline]
    #[must_use]
    pub fn child_kind(self) -> EntityKind {
        match self {
            Self::Credentials => EntityKind::Credential,
            Self::Schedules => EntityKind::Schedule,
            Self::NotificationsStarted
            | Self::NotificationsSuccess
            | Self::NotificationsError => EntityKind::NotificationTemplate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_query_pairs() {
        assert_eq!(Scope::Global.query_pair(), None);
        assert_eq!(
            Scope::Organization(EntityId(4)).query_pair(),
            Some(("organization", "4".to_string()))
        );
        assert_eq!(
            Scope::Owner(EntityId(9)).query_pair(),
            Some(("unified_job_template", "9".to_string()))
        );
    }

    #[test]
    fn relation_child_kinds() {
        assert_eq!(Relation::Credentials.child_kind(), EntityKind::Credential);
        for relation in Relation::NOTIFICATIONS {
            assert_eq!(relation.child_kind(), EntityKind::NotificationTemplate);
        }
    }

    #[test]
    fn kind_endpoints_are_distinct() {
        let kinds = [
            EntityKind::Project,
            EntityKind::JobTemplate,
            EntityKind::Schedule,
            EntityKind::Credential,
            EntityKind::CredentialType,
            EntityKind::NotificationTemplate,
            EntityKind::Inventory,
            EntityKind::ExecutionEnvironment,
            EntityKind::Organization,
        ];
        let mut endpoints: Vec<_> = kinds.iter().map(|k| k.endpoint()).collect();
        endpoints.sort_unstable();
        endpoints.dedup();
        assert_eq!(endpoints.len(), kinds.len());
    }
}
