//! Platform collaborators
//!
//! The migration engine never speaks HTTP itself. It reads from a
//! [`SourceReader`] and writes through a [`TargetClient`]; both are object
//! safe so the orchestrator can hold them as `Arc<dyn ...>`.

use crate::entity::{Entity, EntityId};
use crate::error::ClientError;
use crate::kind::{EntityKind, Relation, Scope};
use serde_json::Value;

/// Read-only access to the platform entities are migrated from
#[async_trait::async_trait]
pub trait SourceReader: Send + Sync {
    /// Every entity of a kind, in listing order (pagination drained)
    async fn list(&self, kind: EntityKind) -> Result<Vec<Entity>, ClientError>;

    /// One entity by id
    ///
    /// # Errors
    /// [`ClientError::NotFound`] when the id does not exist.
    async fn get(&self, kind: EntityKind, id: EntityId) -> Result<Entity, ClientError>;

    /// Entities in a parent's sub-collection
    async fn related(
        &self,
        kind: EntityKind,
        id: EntityId,
        relation: Relation,
    ) -> Result<Vec<Entity>, ClientError>;
}

/// Read/write access to the platform entities are migrated to
#[async_trait::async_trait]
pub trait TargetClient: Send + Sync {
    /// Reachability and authentication check
    async fn ping(&self) -> Result<(), ClientError>;

    /// One entity by id
    async fn get(&self, kind: EntityKind, id: EntityId) -> Result<Entity, ClientError>;

    /// Entities of `kind` named exactly `name` within `scope`
    async fn find_by_name(
        &self,
        kind: EntityKind,
        name: &str,
        scope: Scope,
    ) -> Result<Vec<Entity>, ClientError>;

    /// Entities of `kind` matching arbitrary equality filters
    async fn find(
        &self,
        kind: EntityKind,
        filters: &[(String, String)],
    ) -> Result<Vec<Entity>, ClientError>;

    /// Create an entity
    ///
    /// # Errors
    /// [`ClientError::Validation`] when the platform rejects the payload
    /// content, [`ClientError::Transport`] for everything else.
    async fn create(&self, kind: EntityKind, payload: Value) -> Result<Entity, ClientError>;

    /// Partially update an entity
    async fn patch(
        &self,
        kind: EntityKind,
        id: EntityId,
        partial: Value,
    ) -> Result<Entity, ClientError>;

    /// Associate an existing child with a parent
    ///
    /// Association endpoints may acknowledge with an empty body.
    async fn attach(
        &self,
        parent_kind: EntityKind,
        parent_id: EntityId,
        relation: Relation,
        child_id: EntityId,
    ) -> Result<(), ClientError>;

    /// API path of an entity, used when a payload references its owner by URL
    fn resource_url(&self, kind: EntityKind, id: EntityId) -> String;
}
