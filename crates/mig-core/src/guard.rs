//! Idempotency guard
//!
//! Identity is by name within scope only; content is not compared, so a
//! same-named target entity with different content is treated as already
//! migrated.

use crate::error::MigrationError;
use mig_model::{EntityId, EntityKind, Scope, TargetClient};
use std::sync::Arc;

/// Existence check run before every create
#[derive(Clone)]
pub struct IdempotencyGuard {
    target: Arc<dyn TargetClient>,
}

impl IdempotencyGuard {
    /// Create guard over a target
    #[inline]
    #[must_use]
    pub fn new(target: Arc<dyn TargetClient>) -> Self {
        Self { target }
    }

    /// Id of an existing target entity with this name in scope
    ///
    /// # Errors
    /// Returns a transport error when the target cannot be queried.
    pub async fn ensure_unique(
        &self,
        kind: EntityKind,
        name: &str,
        scope: Scope,
    ) -> Result<Option<EntityId>, MigrationError> {
        let existing = self.target.find_by_name(kind, name.trim(), scope).await?;
        let id = existing.first().map(|e| e.id);
        if let Some(id) = id {
            tracing::debug!("{} '{}' already exists in {} as {}", kind, name, scope, id);
        }
        Ok(id)
    }
}

impl std::fmt::Debug for IdempotencyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdempotencyGuard").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mig_test_utils::{fixtures, FakePlatform};

    #[tokio::test]
    async fn reports_existing_by_name_and_scope() {
        let target = FakePlatform::new();
        let id = target.seed(fixtures::project("infra", 5, "https://h/infra", ""));
        let guard = IdempotencyGuard::new(Arc::new(target));

        let org5 = Scope::Organization(EntityId(5));
        let org6 = Scope::Organization(EntityId(6));
        assert_eq!(
            guard.ensure_unique(EntityKind::Project, "infra", org5).await.unwrap(),
            Some(id)
        );
        assert_eq!(
            guard.ensure_unique(EntityKind::Project, "infra", org6).await.unwrap(),
            None
        );
        assert_eq!(
            guard.ensure_unique(EntityKind::Project, "other", org5).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        let target = FakePlatform::new();
        target.fail_lookups("connection reset");
        let guard = IdempotencyGuard::new(Arc::new(target));

        let err = guard
            .ensure_unique(EntityKind::Project, "infra", Scope::Global)
            .await
            .unwrap_err();
        assert_eq!(err.kind_label(), "transport");
    }
}
