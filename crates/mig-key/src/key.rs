//! Natural keys
//!
//! Provides [`NaturalKey`], the system-independent identity of an entity.

use crate::normalize::normalize;
use mig_model::{Entity, EntityKind};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Identifying attributes as read from a platform, before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawKey {
    /// Repository URL plus optional branch
    Scm {
        url: String,
        branch: Option<String>,
    },
    /// Name plus optional scope label
    Named {
        name: String,
        scope: Option<String>,
    },
}

/// Normalized identity; equal keys mean the same logical entity
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NaturalKey {
    /// Project identity: normalized repository URL and branch (`""` when blank)
    Scm { url: String, branch: String },
    /// Everything else: trimmed name within a scope label (`""` when global)
    Named { name: String, scope: String },
}

impl NaturalKey {
    /// Repository identity
    #[inline]
    #[must_use]
    pub fn scm(url: &str, branch: Option<&str>) -> Self {
        normalize(&RawKey::Scm {
            url: url.to_string(),
            branch: branch.map(str::to_string),
        })
    }

    /// Name identity within a scope label
    #[inline]
    #[must_use]
    pub fn named(name: &str, scope: &str) -> Self {
        normalize(&RawKey::Named {
            name: name.to_string(),
            scope: Some(scope.to_string()),
        })
    }

    /// Key of a platform entity
    ///
    /// Projects are keyed by repository; every other kind by name within its
    /// organization. The organization's *name* is preferred over its id so
    /// that keys line up across platforms whose ids differ.
    #[must_use]
    pub fn for_entity(entity: &Entity) -> Self {
        match entity.kind {
            EntityKind::Project => Self::scm(
                entity.str_field("scm_url").unwrap_or_default(),
                entity.str_field("scm_branch"),
            ),
            _ => {
                let scope = entity
                    .related_name("organization")
                    .map(str::to_string)
                    .or_else(|| entity.organization.map(|id| id.to_string()))
                    .unwrap_or_default();
                Self::named(&entity.name, &scope)
            }
        }
    }
}

impl From<NaturalKey> for RawKey {
    fn from(key: NaturalKey) -> Self {
        match key {
            NaturalKey::Scm { url, branch } => RawKey::Scm {
                url,
                branch: Some(branch),
            },
            NaturalKey::Named { name, scope } => RawKey::Named {
                name,
                scope: Some(scope),
            },
        }
    }
}

impl Display for NaturalKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scm { url, branch } if branch.is_empty() => write!(f, "{url}@(default)"),
            Self::Scm { url, branch } => write!(f, "{url}@{branch}"),
            Self::Named { name, scope } if scope.is_empty() => write!(f, "{name}"),
            Self::Named { name, scope } => write!(f, "{name}@{scope}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mig_model::EntityId;

    #[test]
    fn blank_and_missing_branch_compare_equal() {
        let a = NaturalKey::scm("https://git.example.com/repo", None);
        let b = NaturalKey::scm("https://git.example.com/repo", Some("   "));
        assert_eq!(a, b);
    }

    #[test]
    fn project_key_uses_url_and_branch() {
        let project = Entity::new(EntityKind::Project, EntityId(1), "infra")
            .with_field("scm_url", "https://GIT.example.com/infra.git")
            .with_field("scm_branch", "main");

        assert_eq!(
            NaturalKey::for_entity(&project),
            NaturalKey::Scm {
                url: "https://git.example.com/infra".into(),
                branch: "main".into(),
            }
        );
    }

    #[test]
    fn named_key_prefers_organization_name() {
        let jt = Entity::new(EntityKind::JobTemplate, EntityId(1), " deploy ")
            .with_organization(EntityId(3))
            .with_related_name("organization", "Ops");
        assert_eq!(NaturalKey::for_entity(&jt), NaturalKey::named("deploy", "Ops"));

        let bare = Entity::new(EntityKind::JobTemplate, EntityId(1), "deploy")
            .with_organization(EntityId(3));
        assert_eq!(NaturalKey::for_entity(&bare), NaturalKey::named("deploy", "3"));
    }

    #[test]
    fn display_forms() {
        assert_eq!(
            NaturalKey::scm("https://h/r", None).to_string(),
            "https://h/r@(default)"
        );
        assert_eq!(NaturalKey::named("x", "").to_string(), "x");
        assert_eq!(NaturalKey::named("x", "Ops").to_string(), "x@Ops");
    }
}
