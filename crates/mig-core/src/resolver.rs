//! Reference resolution
//!
//! Source entities point at projects, inventories, credentials and
//! execution environments by id, but ids differ per platform. The resolver
//! turns the referenced *name* back into a target id.
//!
//! # Algorithm
//! 1. Query the target for `kind` named `name` within `scope`
//! 2. Exactly one match resolves; zero fails with `NotFound`
//! 3. Several matches are narrowed by a discriminator (credential type name)
//! 4. Credentials still ambiguous are re-queried by the credential type's id
//! 5. Otherwise the [`AmbiguityPolicy`] decides
//!
//! Successful resolutions are cached for the run; failures are not.

use crate::config::AmbiguityPolicy;
use crate::error::{MigrationError, ReferenceKind, ResolutionFailure};
use mig_model::{Entity, EntityId, EntityKind, Scope, TargetClient};
use moka::future::Cache;
use std::sync::Arc;

const CACHE_CAPACITY: u64 = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    kind: ReferenceKind,
    name: String,
    scope: Scope,
    discriminator: Option<String>,
}

/// Name → target id resolver
#[derive(Clone)]
pub struct ReferenceResolver {
    target: Arc<dyn TargetClient>,
    policy: AmbiguityPolicy,
    cache: Cache<CacheKey, EntityId>,
}

impl ReferenceResolver {
    /// Create resolver with the default (first-match) policy
    #[must_use]
    pub fn new(target: Arc<dyn TargetClient>) -> Self {
        Self {
            target,
            policy: AmbiguityPolicy::default(),
            cache: Cache::new(CACHE_CAPACITY),
        }
    }

    /// With ambiguity policy
    #[inline]
    #[must_use]
    pub fn with_policy(mut self, policy: AmbiguityPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Resolve a name within a scope
    ///
    /// # Errors
    /// [`MigrationError::Resolution`] when nothing (or, under
    /// [`AmbiguityPolicy::Reject`], more than one thing) matches;
    /// [`MigrationError::Transport`] when the target cannot be queried.
    pub async fn resolve(
        &self,
        kind: ReferenceKind,
        name: &str,
        scope: Scope,
    ) -> Result<EntityId, MigrationError> {
        self.resolve_with(kind, name, scope, None).await
    }

    /// Resolve a credential, disambiguating by credential type name
    ///
    /// # Errors
    /// As [`resolve`](Self::resolve).
    pub async fn resolve_credential(
        &self,
        name: &str,
        type_name: Option<&str>,
        scope: Scope,
    ) -> Result<EntityId, MigrationError> {
        self.resolve_with(ReferenceKind::Credential, name, scope, type_name)
            .await
    }

    /// Resolve with an optional discriminator value
    ///
    /// # Errors
    /// As [`resolve`](Self::resolve).
    pub async fn resolve_with(
        &self,
        kind: ReferenceKind,
        name: &str,
        scope: Scope,
        discriminator: Option<&str>,
    ) -> Result<EntityId, MigrationError> {
        let name = name.trim();
        let discriminator = discriminator.map(str::trim).filter(|d| !d.is_empty());
        let key = CacheKey {
            kind,
            name: name.to_string(),
            scope,
            discriminator: discriminator.map(str::to_string),
        };

        if let Some(id) = self.cache.get(&key).await {
            tracing::debug!("Resolved {} '{}' from cache: {}", kind, name, id);
            return Ok(id);
        }

        let id = self.lookup(kind, name, scope, discriminator).await?;
        tracing::debug!("Resolved {} '{}' in {} to {}", kind, name, scope, id);
        self.cache.insert(key, id).await;
        Ok(id)
    }

    async fn lookup(
        &self,
        kind: ReferenceKind,
        name: &str,
        scope: Scope,
        discriminator: Option<&str>,
    ) -> Result<EntityId, MigrationError> {
        let matches = self
            .target
            .find_by_name(kind.entity_kind(), name, scope)
            .await?;

        match matches.as_slice() {
            [] => {
                return Err(ResolutionFailure::NotFound {
                    kind,
                    name: name.to_string(),
                    scope,
                }
                .into())
            }
            [only] => return Ok(only.id),
            _ => {}
        }

        if let (Some(field), Some(wanted)) = (kind.discriminator_field(), discriminator) {
            let narrowed: Vec<&Entity> = matches
                .iter()
                .filter(|e| e.related_name(field) == Some(wanted))
                .collect();
            if let [only] = narrowed.as_slice() {
                return Ok(only.id);
            }

            if kind == ReferenceKind::Credential {
                if let Some(id) = self.credential_by_type_id(name, wanted, scope).await? {
                    return Ok(id);
                }
            }
        }

        self.choose(kind, name, scope, &matches)
    }

    /// Re-query credentials filtered by the credential type's target id
    async fn credential_by_type_id(
        &self,
        name: &str,
        type_name: &str,
        scope: Scope,
    ) -> Result<Option<EntityId>, MigrationError> {
        let types = self
            .target
            .find_by_name(EntityKind::CredentialType, type_name, Scope::Global)
            .await?;
        let Some(credential_type) = types.first() else {
            return Ok(None);
        };

        let mut filters = vec![
            ("name".to_string(), name.to_string()),
            ("credential_type".to_string(), credential_type.id.to_string()),
        ];
        if let Some((field, value)) = scope.query_pair() {
            filters.push((field.to_string(), value));
        }

        let matches = self.target.find(EntityKind::Credential, &filters).await?;
        match matches.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(only.id)),
            _ => self
                .choose(ReferenceKind::Credential, name, scope, &matches)
                .map(Some),
        }
    }

    fn choose(
        &self,
        kind: ReferenceKind,
        name: &str,
        scope: Scope,
        matches: &[Entity],
    ) -> Result<EntityId, MigrationError> {
        match (self.policy, matches.first()) {
            (AmbiguityPolicy::FirstMatch, Some(first)) => {
                tracing::warn!(
                    "{} '{}' matched {} entities in {}; using first (id {})",
                    kind,
                    name,
                    matches.len(),
                    scope,
                    first.id
                );
                Ok(first.id)
            }
            _ => Err(ResolutionFailure::Ambiguous {
                kind,
                name: name.to_string(),
                scope,
                candidates: matches.len(),
            }
            .into()),
        }
    }

    /// Check that a forced execution environment is usable by `organization`
    ///
    /// # Errors
    /// [`MigrationError::Configuration`] when the environment does not exist
    /// or belongs to another organization.
    pub async fn verify_execution_environment(
        &self,
        id: EntityId,
        organization: EntityId,
    ) -> Result<(), MigrationError> {
        let ee = match self.target.get(EntityKind::ExecutionEnvironment, id).await {
            Ok(ee) => ee,
            Err(e) if e.is_not_found() => {
                return Err(MigrationError::config(format!(
                    "execution environment id {id} not found on target"
                )))
            }
            Err(e) => return Err(e.into()),
        };

        match ee.organization {
            None => Ok(()),
            Some(owner) if owner == organization => Ok(()),
            Some(owner) => Err(MigrationError::config(format!(
                "execution environment id {id} belongs to organization {owner}, \
                 which does not match target organization {organization}"
            ))),
        }
    }
}

impl std::fmt::Debug for ReferenceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceResolver")
            .field("policy", &self.policy)
            .field("cached", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mig_test_utils::{fixtures, FakePlatform};

    const ORG: Scope = Scope::Organization(EntityId(5));

    #[tokio::test]
    async fn single_match_resolves() {
        let target = FakePlatform::new();
        let id = target.seed(fixtures::inventory("Prod Inv", 5));
        let resolver = ReferenceResolver::new(Arc::new(target));

        let got = resolver
            .resolve(ReferenceKind::Inventory, " Prod Inv ", ORG)
            .await
            .unwrap();
        assert_eq!(got, id);
    }

    #[tokio::test]
    async fn missing_reference_is_not_found_and_not_cached() {
        let target = Arc::new(FakePlatform::new());
        let resolver = ReferenceResolver::new(target.clone());

        let err = resolver
            .resolve(ReferenceKind::Inventory, "Prod Inv", ORG)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MigrationError::Resolution(ResolutionFailure::NotFound { .. })
        ));

        let id = target.seed(fixtures::inventory("Prod Inv", 5));
        let got = resolver
            .resolve(ReferenceKind::Inventory, "Prod Inv", ORG)
            .await
            .unwrap();
        assert_eq!(got, id);
    }

    #[tokio::test]
    async fn successes_are_cached() {
        let target = Arc::new(FakePlatform::new());
        target.seed(fixtures::project("infra", 5, "https://h/infra", "main"));
        let resolver = ReferenceResolver::new(target.clone());

        resolver.resolve(ReferenceKind::Project, "infra", ORG).await.unwrap();
        resolver.resolve(ReferenceKind::Project, "infra", ORG).await.unwrap();
        assert_eq!(target.lookup_count(), 1);
    }

    #[tokio::test]
    async fn credential_type_narrows_duplicates() {
        let target = FakePlatform::new();
        target.seed(fixtures::credential("deploy", 5, "Machine"));
        let vault = target.seed(fixtures::credential("deploy", 5, "Vault"));
        let resolver = ReferenceResolver::new(Arc::new(target));

        let got = resolver
            .resolve_credential("deploy", Some("Vault"), ORG)
            .await
            .unwrap();
        assert_eq!(got, vault);
    }

    #[tokio::test]
    async fn credential_type_id_requery_without_summary_fields() {
        let target = FakePlatform::new();
        let machine = target.seed(fixtures::credential_type("Machine"));
        let vault = target.seed(fixtures::credential_type("Vault"));
        let bare = |type_id: EntityId| {
            Entity::new(EntityKind::Credential, EntityId(0), "deploy")
                .with_organization(EntityId(5))
                .with_field("credential_type", type_id.0)
        };
        target.seed(bare(machine));
        let wanted = target.seed(bare(vault));
        let resolver =
            ReferenceResolver::new(Arc::new(target)).with_policy(AmbiguityPolicy::Reject);

        let got = resolver
            .resolve_credential("deploy", Some("Vault"), ORG)
            .await
            .unwrap();
        assert_eq!(got, wanted);
    }

    #[tokio::test]
    async fn ambiguity_policy() {
        let target = Arc::new(FakePlatform::new());
        let first = target.seed(fixtures::inventory("dup", 5));
        target.seed(fixtures::inventory("dup", 5));

        let lenient = ReferenceResolver::new(target.clone());
        assert_eq!(
            lenient.resolve(ReferenceKind::Inventory, "dup", ORG).await.unwrap(),
            first
        );

        let strict = ReferenceResolver::new(target).with_policy(AmbiguityPolicy::Reject);
        let err = strict
            .resolve(ReferenceKind::Inventory, "dup", ORG)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MigrationError::Resolution(ResolutionFailure::Ambiguous { candidates: 2, .. })
        ));
    }

    #[tokio::test]
    async fn execution_environment_must_be_global_or_same_org() {
        let target = FakePlatform::new();
        let global = target.seed(fixtures::execution_environment("default", None));
        let own = target.seed(fixtures::execution_environment("own", Some(5)));
        let foreign = target.seed(fixtures::execution_environment("other", Some(6)));
        let resolver = ReferenceResolver::new(Arc::new(target));

        let org = EntityId(5);
        assert!(resolver.verify_execution_environment(global, org).await.is_ok());
        assert!(resolver.verify_execution_environment(own, org).await.is_ok());

        let err = resolver
            .verify_execution_environment(foreign, org)
            .await
            .unwrap_err();
        assert!(err.is_run_fatal());

        let err = resolver
            .verify_execution_environment(EntityId(999), org)
            .await
            .unwrap_err();
        assert!(err.is_run_fatal());
    }
}
